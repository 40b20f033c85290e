//! Pairwise compatibility scoring
//!
//! Leaf scorers for harmonic and tempo compatibility, and the staged
//! pipeline that combines them with stem, spectral, groove, and cultural
//! dimensions into one explained score per track pair.

pub mod compat;
pub mod harmonic;
pub mod tempo;

pub use compat::{
    CompatibilityResult, CompatibilityScorer, Dimension, DimensionScore, ScoringMode, StemPattern,
};
pub use harmonic::{DistanceTiers, HarmonicScorer};
pub use tempo::{TempoScorer, TempoThresholds, TempoTier, TempoVerdict};
