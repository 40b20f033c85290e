//! Scoring profile configuration
//!
//! Every tunable the compatibility pipeline consults lives here: tier
//! tables, tempo thresholds, per-dimension point budgets, score caps, genre
//! cluster keyword lists, and the timbre synergy table. The defaults
//! carry the field-tested tuning; a profile can be swapped wholesale from
//! YAML without touching scoring control flow.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::harmonic::DistanceTiers;
use crate::scoring::tempo::TempoThresholds;

/// Maximum points each scoring dimension can award
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointBudgets {
    /// Overlay stem pattern (one vocal-forward track over one instrumental)
    pub overlay: f64,
    /// Alternation pattern (both vocal-capable, phrase trading)
    pub alternation: f64,
    /// Floor for the free-mix pattern
    pub free_mix_floor: f64,
    /// Free-mix points scale with vocal-ratio difference
    pub free_mix_scale: f64,
    /// Harmonic score is rescaled from 0-100 into this budget
    pub harmonic_weight: f64,
    /// Onset-density and busyness similarity, each half of this budget
    pub perceptual_speed: f64,
    pub energy_close_bonus: f64,
    pub tonal_similarity: f64,
    pub high_band_bonus: f64,
    pub drum_pattern_match: f64,
    pub genre_match: f64,
    pub swing_bonus: f64,
}

impl Default for PointBudgets {
    fn default() -> Self {
        Self {
            overlay: 25.0,
            alternation: 15.0,
            free_mix_floor: 5.0,
            free_mix_scale: 20.0,
            harmonic_weight: 10.0,
            perceptual_speed: 8.0,
            energy_close_bonus: 5.0,
            tonal_similarity: 10.0,
            high_band_bonus: 2.0,
            drum_pattern_match: 7.0,
            genre_match: 8.0,
            swing_bonus: 5.0,
        }
    }
}

/// Post-summation caps and penalties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreCaps {
    /// Ceiling for pairings without an elite stem pattern or timbre synergy
    pub elite_cap: f64,
    /// Absolute ceiling on any score
    pub max_score: f64,
    /// Harmonic scores below this count as near-dissonant
    pub dissonance_floor: f64,
    /// Flat deduction for near-dissonant pairings with no synergy offset
    pub dissonance_penalty: f64,
}

impl Default for ScoreCaps {
    fn default() -> Self {
        Self {
            elite_cap: 70.0,
            max_score: 120.0,
            dissonance_floor: 10.0,
            dissonance_penalty: 20.0,
        }
    }
}

/// Genre-cluster keyword lists and cultural bonus/penalty magnitudes
///
/// Keywords are matched case-insensitively against a track's genre label and
/// timbre tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CultureTables {
    pub mandarin_pop: Vec<String>,
    pub kpop: Vec<String>,
    pub western_pop: Vec<String>,
    pub remix: Vec<String>,
    /// Vocals-absent machine genres behind the anti-machine barrier
    pub pure_electronic: Vec<String>,
    pub urban: Vec<String>,

    /// Pop tracks from two different clusters
    pub cross_cluster_bonus: f64,
    /// Pop tracks from the same cluster
    pub same_cluster_bonus: f64,
    /// Pop track paired with a professional remix/edit
    pub pop_remix_bonus: f64,
    /// Pop track paired with unrelated material
    pub pop_mismatch_penalty: f64,
    /// Vocal-forward pop against vocals-absent machine music
    pub anti_machine_penalty: f64,
    pub urban_synergy_bonus: f64,

    /// Arousal/valence distance below which profiles mirror each other
    pub emotion_mirror_distance: f64,
    pub emotion_mirror_bonus: f64,
    /// Distance above which moods clash
    pub emotion_clash_distance: f64,
    pub emotion_clash_penalty: f64,
    /// Arousal gap beyond which intensity levels disconnect
    pub arousal_gap_limit: f64,
    pub arousal_gap_penalty: f64,
    /// Arousal gap under which intensity locks in
    pub arousal_lock_window: f64,
    pub arousal_lock_bonus: f64,

    pub same_artist_penalty: f64,
    /// Cultural dimension multiplier in Discovery mode
    pub discovery_scale: f64,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for CultureTables {
    fn default() -> Self {
        Self {
            mandarin_pop: words(&["mandarin", "c-pop", "cpop", "chinese"]),
            kpop: words(&["k-pop", "kpop", "korean"]),
            western_pop: words(&["pop", "hip hop", "hip-hop", "rap", "r&b", "billboard"]),
            remix: words(&["remix", "edit", "bootleg", "rework", "vip"]),
            pure_electronic: words(&["techno", "minimal", "tech house", "psytrance", "trance"]),
            urban: words(&["trap", "afro", "jersey", "club", "banger", "urban"]),
            cross_cluster_bonus: 30.0,
            same_cluster_bonus: 10.0,
            pop_remix_bonus: 15.0,
            pop_mismatch_penalty: 30.0,
            anti_machine_penalty: 20.0,
            urban_synergy_bonus: 15.0,
            emotion_mirror_distance: 0.15,
            emotion_mirror_bonus: 15.0,
            emotion_clash_distance: 0.6,
            emotion_clash_penalty: 15.0,
            arousal_gap_limit: 0.35,
            arousal_gap_penalty: 15.0,
            arousal_lock_window: 0.12,
            arousal_lock_bonus: 5.0,
            same_artist_penalty: 10.0,
            discovery_scale: 1.5,
        }
    }
}

/// One timbre synergy rule: fires when one track carries any `a_any` tag and
/// the other carries any `b_any` tag (checked in both orientations).
/// Negative points encode known texture clashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyRule {
    pub label: String,
    pub a_any: Vec<String>,
    pub b_any: Vec<String>,
    pub points: f64,
}

impl SynergyRule {
    fn new(label: &str, a_any: &[&str], b_any: &[&str], points: f64) -> Self {
        Self {
            label: label.to_string(),
            a_any: words(a_any),
            b_any: words(b_any),
            points,
        }
    }
}

/// Guard values for large synergy bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyGuard {
    /// Bonuses at or above this size are subject to the vibe guard
    pub large_bonus_floor: f64,
    /// Arousal gap beyond which a large bonus is suppressed
    pub vibe_gap_limit: f64,
    /// Points awarded instead when suppressed
    pub suppressed_points: f64,
}

impl Default for SynergyGuard {
    fn default() -> Self {
        Self {
            large_bonus_floor: 20.0,
            vibe_gap_limit: 0.3,
            suppressed_points: 2.0,
        }
    }
}

/// Complete scoring profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringProfile {
    pub tempo: TempoThresholds,
    pub harmonic: DistanceTiers,
    pub budgets: PointBudgets,
    pub caps: ScoreCaps,
    pub culture: CultureTables,
    pub synergy_guard: SynergyGuard,
    pub synergy: Vec<SynergyRule>,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            tempo: TempoThresholds::default(),
            harmonic: DistanceTiers::default(),
            budgets: PointBudgets::default(),
            caps: ScoreCaps::default(),
            culture: CultureTables::default(),
            synergy_guard: SynergyGuard::default(),
            synergy: default_synergy_rules(),
        }
    }
}

fn default_synergy_rules() -> Vec<SynergyRule> {
    vec![
        SynergyRule::new(
            "plucked-string cousins",
            &["oriental_pluck", "zither", "koto"],
            &["pizzicato", "plucked_string"],
            30.0,
        ),
        SynergyRule::new(
            "staccato flow mirror",
            &["staccato_vocal"],
            &["staccato_vocal"],
            15.0,
        ),
        SynergyRule::new(
            "percussion meets flow",
            &["oriental_percussion", "taiko"],
            &["west_coast", "gangsta_flow"],
            25.0,
        ),
        SynergyRule::new(
            "aggressive energy lock",
            &["aggressive_flow"],
            &["aggressive_flow", "nu_metal"],
            15.0,
        ),
        SynergyRule::new(
            "ballad/urban texture clash",
            &["ballad", "acoustic", "folk"],
            &["banger", "trap", "urban"],
            -15.0,
        ),
    ]
}

impl ScoringProfile {
    /// Load a profile from a YAML file.
    ///
    /// A missing file yields the default profile; an unreadable or
    /// unparseable file logs a warning and yields the default, so a bad
    /// profile on disk never takes scoring down.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("scoring profile {:?} not found, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Self>(&contents) {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!("failed to parse scoring profile: {e}, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("failed to read scoring profile: {e}, using defaults");
                Self::default()
            }
        }
    }

    /// Save this profile as YAML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create profile directory {parent:?}"))?;
        }
        let yaml = serde_yaml::to_string(self).context("failed to serialize scoring profile")?;
        std::fs::write(path, yaml).with_context(|| format!("failed to write profile {path:?}"))?;
        Ok(())
    }
}
