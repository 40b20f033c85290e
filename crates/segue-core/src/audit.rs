//! Post-hoc audit of an ordered set
//!
//! Scores a finished running order 0-100 across four 25-point lanes and
//! classifies the energy arc. Useful as a sanity report on sequences built
//! elsewhere (manual crates, imported playlists) as much as on our own.

use serde::{Deserialize, Serialize};

use crate::features::FeatureRecord;
use crate::profile::ScoringProfile;
use crate::scoring::compat::classify_stem_pattern;
use crate::scoring::HarmonicScorer;

/// Adjacent BPM gaps above this count against tempo stability
const BPM_GAP_LIMIT: f64 = 8.0;
/// Both tracks above this vocal ratio is an overlap risk at the transition
const VOCAL_RISK_LEVEL: f32 = 0.6;

/// Overall quality band of an audited set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Professional,
    Standard,
    NeedsImprovement,
}

/// Shape of the set's energy trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyArc {
    /// Warm-up into a late peak with a falling outro
    ClassicArc,
    /// Keeps climbing to the end
    AscendingTension,
    /// No dominant direction
    VariableVibe,
}

/// Lane-by-lane audit result, each lane 0-25
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub total: f64,
    pub harmonic_flow: f64,
    pub tempo_stability: f64,
    pub stem_quality: f64,
    pub vocal_safety: f64,
    pub rating: Rating,
}

/// Audits ordered track lists
#[derive(Debug, Clone, Default)]
pub struct SetAudit {
    harmonic: HarmonicScorer,
}

impl SetAudit {
    pub fn new(profile: &ScoringProfile) -> Self {
        Self {
            harmonic: HarmonicScorer::new(profile.harmonic.clone()),
        }
    }

    /// Score an ordered set. Fewer than two tracks audits to zero.
    pub fn score(&self, ordered: &[FeatureRecord]) -> AuditReport {
        if ordered.len() < 2 {
            return AuditReport {
                total: 0.0,
                harmonic_flow: 0.0,
                tempo_stability: 0.0,
                stem_quality: 0.0,
                vocal_safety: 0.0,
                rating: Rating::NeedsImprovement,
            };
        }

        let transitions = ordered.len() - 1;
        let mut harmonic_sum = 0.0;
        let mut bad_bpm_gaps = 0usize;
        let mut elite_patterns = 0usize;
        let mut vocal_risks = 0usize;

        for pair in ordered.windows(2) {
            let (curr, next) = (&pair[0], &pair[1]);

            let (h, _) = self
                .harmonic
                .score(&curr.canonical_key(), &next.canonical_key());
            harmonic_sum += f64::from(h);

            let gap = (curr.bpm.unwrap_or(0.0) - next.bpm.unwrap_or(0.0)).abs();
            if gap > BPM_GAP_LIMIT {
                bad_bpm_gaps += 1;
            }

            if classify_stem_pattern(curr.vocal_ratio_or_default(), next.vocal_ratio_or_default())
                .is_elite()
            {
                elite_patterns += 1;
            }

            if curr.vocal_ratio_or_default() > VOCAL_RISK_LEVEL
                && next.vocal_ratio_or_default() > VOCAL_RISK_LEVEL
            {
                vocal_risks += 1;
            }
        }

        let harmonic_flow = harmonic_sum / transitions as f64 / 4.0;
        let tempo_stability = (25.0 - 5.0 * bad_bpm_gaps as f64).max(0.0);
        let stem_quality = elite_patterns as f64 / transitions as f64 * 25.0;
        let vocal_safety = (25.0 - 10.0 * vocal_risks as f64).max(0.0);

        let total = harmonic_flow + tempo_stability + stem_quality + vocal_safety;
        let rating = if total > 85.0 {
            Rating::Professional
        } else if total > 70.0 {
            Rating::Standard
        } else {
            Rating::NeedsImprovement
        };

        AuditReport {
            total,
            harmonic_flow,
            tempo_stability,
            stem_quality,
            vocal_safety,
            rating,
        }
    }
}

/// Classify the energy trajectory of an ordered set
pub fn energy_arc(ordered: &[FeatureRecord]) -> EnergyArc {
    if ordered.is_empty() {
        return EnergyArc::VariableVibe;
    }

    let energies: Vec<f32> = ordered.iter().map(|t| t.energy_or_default()).collect();
    let start = energies[0];
    let end = energies[energies.len() - 1];

    let (peak_idx, peak) = energies
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, &e)| (i, e))
        .unwrap_or((0, 0.0));

    if peak_idx as f32 > energies.len() as f32 * 0.6 && end < peak {
        EnergyArc::ClassicArc
    } else if end > start + 20.0 {
        EnergyArc::AscendingTension
    } else {
        EnergyArc::VariableVibe
    }
}
