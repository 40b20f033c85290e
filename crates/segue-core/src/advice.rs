//! Transition execution advice
//!
//! Turns scoring outcomes into actionable mixing guidance: bass-conflict
//! detection with concrete EQ settings, a technique recommendation per score
//! band, and transpose hints for out-of-key pairings.

use serde::{Deserialize, Serialize};

use crate::features::FeatureRecord;
use crate::music::{self, CanonicalKey};
use crate::scoring::CompatibilityResult;

/// Sub-bass energy above which a track's low end dominates the mix bus
const SUB_BASS_DOMINANT: f32 = 0.7;

/// How severe the low-end collision is at the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BassSeverity {
    None,
    /// One dominant low end; normal EQ riding is enough
    Low,
    /// Both low ends dominant; needs a bass swap to stay clean
    High,
}

/// Channel EQ settings for a bass swap, in Hz; zero means leave the band alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqSuggestion {
    pub a_low_cut: u32,
    pub b_low_cut: u32,
    pub a_high_pass: u32,
    pub b_high_pass: u32,
}

/// Bass-conflict verdict for one transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BassConflict {
    pub severity: BassSeverity,
    pub sub_bass_a: f32,
    pub sub_bass_b: f32,
    pub suggestion: String,
    /// Present only for a High conflict
    pub eq: Option<EqSuggestion>,
}

/// Recommended transition technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixTechnique {
    /// Clean pairing; a plain crossfade works
    StandardBlend,
    /// Mask the seam with a filter ride
    FilterSweep,
    /// Swap low ends and keep the vocals apart
    BassSwap,
}

/// Detect a low-end collision between the outgoing and incoming track.
///
/// Both sub-bass bands dominant means the summed low end will pump and
/// cancel; the weaker side gets cut at 200 Hz with a 50 Hz high-pass so the
/// stronger side owns the bass until the swap point.
pub fn bass_conflict(a: &FeatureRecord, b: &FeatureRecord) -> BassConflict {
    let sub_a = a.spectral_or_default().sub_bass;
    let sub_b = b.spectral_or_default().sub_bass;

    let (severity, suggestion, eq) = if sub_a > SUB_BASS_DOMINANT && sub_b > SUB_BASS_DOMINANT {
        let eq = if sub_a > sub_b {
            EqSuggestion {
                a_low_cut: 0,
                b_low_cut: 200,
                a_high_pass: 0,
                b_high_pass: 50,
            }
        } else {
            EqSuggestion {
                a_low_cut: 200,
                b_low_cut: 0,
                a_high_pass: 50,
                b_high_pass: 0,
            }
        };
        (
            BassSeverity::High,
            "Severe low-end conflict, use a bass swap".to_string(),
            Some(eq),
        )
    } else if sub_a > SUB_BASS_DOMINANT || sub_b > SUB_BASS_DOMINANT {
        (
            BassSeverity::Low,
            "Mild low-end overlap, ride the EQ".to_string(),
            None,
        )
    } else {
        (BassSeverity::None, "No low-end conflict".to_string(), None)
    };

    BassConflict {
        severity,
        sub_bass_a: sub_a,
        sub_bass_b: sub_b,
        suggestion,
        eq,
    }
}

/// Technique recommendation from a pair's compatibility score
pub fn technique_for(result: &CompatibilityResult) -> MixTechnique {
    if result.final_score >= 90.0 {
        MixTechnique::StandardBlend
    } else if result.final_score >= 70.0 {
        MixTechnique::FilterSweep
    } else {
        MixTechnique::BassSwap
    }
}

/// Smallest transpose interval that would bring `b` into `a`'s key, or None
/// when either key is unknown
pub fn transpose_hint(a: &FeatureRecord, b: &FeatureRecord) -> Option<i8> {
    let to = a.canonical_key();
    let from = b.canonical_key();
    if to == CanonicalKey::Unknown || from == CanonicalKey::Unknown {
        return None;
    }
    music::semitone_shift(&from, &to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SpectralBands;
    use crate::scoring::{CompatibilityScorer, ScoringMode};

    fn track_with_sub_bass(id: &str, sub_bass: f32) -> FeatureRecord {
        FeatureRecord {
            spectral: Some(SpectralBands {
                sub_bass,
                ..SpectralBands::default()
            }),
            ..FeatureRecord::new(id, format!("Title {id}"), format!("Artist {id}"))
        }
    }

    #[test]
    fn test_dual_dominant_bass_is_high_with_eq() {
        let a = track_with_sub_bass("t1", 0.9);
        let b = track_with_sub_bass("t2", 0.8);
        let conflict = bass_conflict(&a, &b);
        assert_eq!(conflict.severity, BassSeverity::High);

        // A's low end is stronger, so B yields
        let eq = conflict.eq.unwrap();
        assert_eq!(eq.b_low_cut, 200);
        assert_eq!(eq.b_high_pass, 50);
        assert_eq!(eq.a_low_cut, 0);
    }

    #[test]
    fn test_weaker_side_yields() {
        let a = track_with_sub_bass("t1", 0.75);
        let b = track_with_sub_bass("t2", 0.95);
        let eq = bass_conflict(&a, &b).eq.unwrap();
        assert_eq!(eq.a_low_cut, 200);
        assert_eq!(eq.a_high_pass, 50);
        assert_eq!(eq.b_low_cut, 0);
    }

    #[test]
    fn test_single_dominant_bass_is_low() {
        let a = track_with_sub_bass("t1", 0.9);
        let b = track_with_sub_bass("t2", 0.3);
        let conflict = bass_conflict(&a, &b);
        assert_eq!(conflict.severity, BassSeverity::Low);
        assert!(conflict.eq.is_none());
    }

    #[test]
    fn test_quiet_low_ends_are_clear() {
        let a = track_with_sub_bass("t1", 0.2);
        let b = track_with_sub_bass("t2", 0.3);
        assert_eq!(bass_conflict(&a, &b).severity, BassSeverity::None);
    }

    #[test]
    fn test_technique_bands() {
        let result = |score: f64| CompatibilityResult {
            final_score: score,
            rejected: false,
            rejection_reason: None,
            breakdown: Vec::new(),
        };
        assert_eq!(technique_for(&result(95.0)), MixTechnique::StandardBlend);
        assert_eq!(technique_for(&result(90.0)), MixTechnique::StandardBlend);
        assert_eq!(technique_for(&result(75.0)), MixTechnique::FilterSweep);
        assert_eq!(technique_for(&result(40.0)), MixTechnique::BassSwap);
    }

    #[test]
    fn test_technique_from_scored_pair() {
        let mut a = FeatureRecord::new("t1", "Alpha", "Artist A");
        let mut b = FeatureRecord::new("t2", "Beta", "Artist B");
        for (r, bpm) in [(&mut a, 124.0), (&mut b, 125.0)] {
            r.bpm = Some(bpm);
            r.key = Some("8A".to_string());
            r.vocal_ratio = Some(0.5);
            r.source_id = format!("/library/{}.flac", r.id);
        }
        let result = CompatibilityScorer::default().score(&a, &b, ScoringMode::Standard);
        assert!(!result.rejected);
        // Any non-rejected score lands in exactly one technique band
        let _ = technique_for(&result);
    }

    #[test]
    fn test_transpose_hint_matches_key_shift() {
        let mut a = FeatureRecord::new("t1", "Alpha", "Artist A");
        let mut b = FeatureRecord::new("t2", "Beta", "Artist B");
        a.key = Some("Am".to_string());
        b.key = Some("Em".to_string());
        // E minor up to A minor wheel position
        assert_eq!(transpose_hint(&a, &b), Some(5));

        b.key = None;
        assert_eq!(transpose_hint(&a, &b), None);
    }
}
