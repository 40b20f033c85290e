//! Wheel-distance harmonic compatibility
//!
//! Scores two canonical keys 0-100 from their circular distance on the
//! 12-position wheel and whether their modes match. The tier values are
//! music-theory conventions (adjacent on the wheel is most harmonious), not
//! computed quantities, and downstream consumers expect these exact numbers.

use serde::{Deserialize, Serialize};

use crate::music::CanonicalKey;

/// Fixed score tiers indexed by circular wheel distance (1..=6)
///
/// Injected at construction so an alternative musical convention can swap
/// the table without touching scoring control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceTiers {
    /// Scores for distances 1..=6 when both keys share a mode
    pub same_mode: [u8; 6],
    /// Scores for distances 1..=6 across modes
    pub cross_mode: [u8; 6],
    /// Neutral score when either key is unknown
    pub unknown: u8,
    /// Identical keys and relative major/minor pairs
    pub exact: u8,
}

impl Default for DistanceTiers {
    fn default() -> Self {
        Self {
            same_mode: [95, 85, 70, 70, 45, 30],
            cross_mode: [85, 75, 60, 60, 35, 20],
            unknown: 50,
            exact: 100,
        }
    }
}

/// Harmonic scorer over canonical wheel keys
#[derive(Debug, Clone, Default)]
pub struct HarmonicScorer {
    tiers: DistanceTiers,
}

impl HarmonicScorer {
    pub fn new(tiers: DistanceTiers) -> Self {
        Self { tiers }
    }

    /// Score two keys, returning the tier value and a display-ready reason.
    ///
    /// Unknown keys score neutral rather than being penalized: a missing key
    /// tag is an analysis gap, not evidence of dissonance.
    pub fn score(&self, a: &CanonicalKey, b: &CanonicalKey) -> (u8, &'static str) {
        let (ka, kb) = match (a, b) {
            (CanonicalKey::Wheel(ka), CanonicalKey::Wheel(kb)) => (ka, kb),
            _ => return (self.tiers.unknown, "Missing/Unknown Key"),
        };

        if ka == kb {
            return (self.tiers.exact, "Perfect Match");
        }

        if ka.position == kb.position {
            // Same wheel number, opposite ring: the relative-key switch
            return (self.tiers.exact, "Relative Major/Minor");
        }

        let d = circular_distance(ka.position, kb.position);
        let same_mode = ka.mode == kb.mode;
        let idx = (d - 1) as usize;
        let score = if same_mode {
            self.tiers.same_mode[idx]
        } else {
            self.tiers.cross_mode[idx]
        };

        let reason = match (d, same_mode) {
            (1, true) => "Adjacent (same mode)",
            (1, false) => "Adjacent (cross mode)",
            (2, true) => "Two steps (same mode)",
            (2, false) => "Two steps (cross mode)",
            (3 | 4, true) => "Workable with technique (same mode)",
            (3 | 4, false) => "Workable with technique (cross mode)",
            (5, true) => "Difficult (same mode)",
            (5, false) => "Difficult (cross mode)",
            (_, true) => "Opposite side of wheel (same mode)",
            (_, false) => "Opposite side of wheel (cross mode)",
        };

        (score, reason)
    }
}

/// Circular distance on the 12-position wheel, always in 0..=6
fn circular_distance(a: u8, b: u8) -> u8 {
    let direct = a.abs_diff(b);
    direct.min(12 - direct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CanonicalKey {
        CanonicalKey::normalize(s)
    }

    #[test]
    fn test_identity_is_perfect_match() {
        let scorer = HarmonicScorer::default();
        for pos in 1..=12 {
            for suffix in ['A', 'B'] {
                let k = key(&format!("{pos}{suffix}"));
                assert_eq!(scorer.score(&k, &k), (100, "Perfect Match"));
            }
        }
    }

    #[test]
    fn test_relative_major_minor() {
        let scorer = HarmonicScorer::default();
        let (score, reason) = scorer.score(&key("8A"), &key("8B"));
        assert_eq!(score, 100);
        assert_eq!(reason, "Relative Major/Minor");
    }

    #[test]
    fn test_adjacent_same_mode_scores_95() {
        let scorer = HarmonicScorer::default();
        let (score, reason) = scorer.score(&key("8A"), &key("9A"));
        assert_eq!(score, 95);
        assert_eq!(reason, "Adjacent (same mode)");
    }

    #[test]
    fn test_tier_table() {
        let scorer = HarmonicScorer::default();
        // distance / same-mode / cross-mode expectations
        let cases = [
            (key("8A"), key("9A"), 95),
            (key("8A"), key("9B"), 85),
            (key("8A"), key("10A"), 85),
            (key("8A"), key("10B"), 75),
            (key("8A"), key("11A"), 70),
            (key("8A"), key("12A"), 70),
            (key("8A"), key("12B"), 60),
            (key("8A"), key("1A"), 45),
            (key("8A"), key("1B"), 35),
            (key("8A"), key("2A"), 30),
            (key("8A"), key("2B"), 20),
        ];
        for (a, b, expected) in cases {
            assert_eq!(scorer.score(&a, &b).0, expected, "{a} vs {b}");
        }
    }

    #[test]
    fn test_wraparound_distance() {
        let scorer = HarmonicScorer::default();
        // 12 and 1 are adjacent on the wheel
        assert_eq!(scorer.score(&key("12A"), &key("1A")).0, 95);
        assert_eq!(scorer.score(&key("11B"), &key("1B")).0, 85);
    }

    #[test]
    fn test_symmetry() {
        let scorer = HarmonicScorer::default();
        for a_pos in 1..=12u8 {
            for b_pos in 1..=12u8 {
                for (sa, sb) in [('A', 'A'), ('A', 'B'), ('B', 'A'), ('B', 'B')] {
                    let a = key(&format!("{a_pos}{sa}"));
                    let b = key(&format!("{b_pos}{sb}"));
                    assert_eq!(scorer.score(&a, &b), scorer.score(&b, &a));
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_distance() {
        let scorer = HarmonicScorer::default();
        // From 8A, same-mode scores never increase as distance grows 1..=6
        let mut prev = u8::MAX;
        for pos in [9u8, 10, 11, 12, 1, 2] {
            let score = scorer.score(&key("8A"), &key(&format!("{pos}A"))).0;
            assert!(score <= prev);
            prev = score;
        }
    }

    #[test]
    fn test_unknown_is_neutral() {
        let scorer = HarmonicScorer::default();
        let (score, reason) = scorer.score(&key("8A"), &CanonicalKey::Unknown);
        assert_eq!(score, 50);
        assert_eq!(reason, "Missing/Unknown Key");
        assert_eq!(
            scorer.score(&CanonicalKey::Unknown, &CanonicalKey::Unknown).0,
            50
        );
    }
}
