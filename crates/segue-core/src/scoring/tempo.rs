//! Tempo ratio compatibility
//!
//! Many genres are notated at half or double their perceived tempo, so a
//! 70 BPM track can sit rhythmically against a 140 BPM one. The scorer tests
//! the musically meaningful ratios (half-time, unity, double-time), keeps
//! the best fit, and maps its relative deviation onto mixing tiers.

use serde::{Deserialize, Serialize};

/// Candidate playback ratios; triplet ratios (1.5x, 0.75x) are deliberately
/// excluded as too far for a standard blend.
const RATIOS: [f64; 3] = [1.0, 0.5, 2.0];

/// Tier of tempo compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempoTier {
    /// Within beatmatching tolerance, no audible artifacts
    Golden,
    /// Standard pitch-fader range
    Professional,
    /// Possible but risky; flagged with a warning and a reduced score
    CreativeRisk,
    /// Beyond what tempo manipulation can bridge
    Reject,
}

/// Outcome of scoring one BPM pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoVerdict {
    pub tier: TempoTier,
    /// The ratio that fit best (0.5, 1.0, or 2.0)
    pub ratio_used: f64,
    /// Relative deviation at that ratio, in percent
    pub deviation_percent: f64,
    /// Points this verdict contributes to the tempo dimension; may be
    /// negative for CreativeRisk
    pub score_contribution: f64,
    pub reason: String,
}

impl TempoVerdict {
    fn reject(reason: impl Into<String>) -> Self {
        Self {
            tier: TempoTier::Reject,
            ratio_used: 1.0,
            deviation_percent: 100.0,
            score_contribution: 0.0,
            reason: reason.into(),
        }
    }
}

/// Tier boundaries and point values
///
/// Boundaries are inclusive: a deviation of exactly 4.0% is still Golden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoThresholds {
    /// Golden tier ceiling as a fraction (0.04 = 4%)
    pub golden: f64,
    pub professional: f64,
    pub creative_risk: f64,
    pub golden_points: f64,
    pub professional_points: f64,
    pub creative_risk_points: f64,
    /// Deducted when the best fit is not the unity ratio, since executing a
    /// half/double-time blend needs pitch or tempo manipulation
    pub ratio_shift_penalty: f64,
}

impl Default for TempoThresholds {
    fn default() -> Self {
        Self {
            golden: 0.04,
            professional: 0.08,
            creative_risk: 0.12,
            golden_points: 10.0,
            professional_points: 5.0,
            creative_risk_points: -10.0,
            ratio_shift_penalty: 5.0,
        }
    }
}

/// Tempo scorer over BPM pairs
#[derive(Debug, Clone, Default)]
pub struct TempoScorer {
    thresholds: TempoThresholds,
}

impl TempoScorer {
    pub fn new(thresholds: TempoThresholds) -> Self {
        Self { thresholds }
    }

    /// Score a BPM pair.
    ///
    /// A missing or non-positive BPM is rejected immediately; no ratio math
    /// runs against a zero denominator.
    pub fn score(&self, bpm_a: f64, bpm_b: f64) -> TempoVerdict {
        if bpm_a <= 0.0 || bpm_b <= 0.0 || !bpm_a.is_finite() || !bpm_b.is_finite() {
            return TempoVerdict::reject("BPM missing or non-positive");
        }

        let (ratio_used, deviation) = RATIOS
            .iter()
            .map(|&r| (r, relative_deviation(bpm_a, bpm_b, r)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .expect("ratio list is non-empty");

        let t = &self.thresholds;
        let deviation_percent = deviation * 100.0;

        let (tier, mut contribution, label) = if deviation <= t.golden {
            (TempoTier::Golden, t.golden_points, "Golden")
        } else if deviation <= t.professional {
            (TempoTier::Professional, t.professional_points, "Professional")
        } else if deviation <= t.creative_risk {
            (TempoTier::CreativeRisk, t.creative_risk_points, "Creative Risk")
        } else {
            return TempoVerdict::reject(format!(
                "BPM deviation {deviation_percent:.1}% exceeds {:.0}% limit",
                t.creative_risk * 100.0
            ));
        };

        let mut reason = format!("{label} tier at {ratio_used}x ({deviation_percent:.1}% off)");
        if (ratio_used - 1.0).abs() > f64::EPSILON {
            contribution -= t.ratio_shift_penalty;
            reason.push_str(", tempo manipulation required");
        }
        if tier == TempoTier::CreativeRisk {
            log::debug!("tempo: creative-risk pairing {bpm_a} vs {bpm_b} ({deviation_percent:.1}%)");
        }

        TempoVerdict {
            tier,
            ratio_used,
            deviation_percent,
            score_contribution: contribution,
            reason,
        }
    }
}

/// Relative deviation of `a * ratio` against `b`
fn relative_deviation(a: f64, b: f64, ratio: f64) -> f64 {
    let scaled = a * ratio;
    (scaled - b).abs() / scaled.max(b)
}
