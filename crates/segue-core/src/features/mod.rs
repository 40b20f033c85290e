//! Per-track feature records consumed by the scoring engine
//!
//! Records are produced by an external analysis pipeline and treated as
//! read-only here. Optional fields that the pipeline could not measure read
//! back as neutral midpoints, so a partially-analyzed track scores without
//! special-casing.

use serde::{Deserialize, Serialize};

/// Opaque track identifier assigned by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        TrackId(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        TrackId(s)
    }
}

/// Four-band spectral energy distribution, each band 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralBands {
    pub sub_bass: f32,
    pub low_mid: f32,
    pub mid_range: f32,
    pub high_presence: f32,
}

impl Default for SpectralBands {
    fn default() -> Self {
        // Neutral profile used when the analyzer produced no band data
        Self {
            sub_bass: 0.1,
            low_mid: 0.5,
            mid_range: 0.4,
            high_presence: 0.2,
        }
    }
}

/// Rhythm and style descriptors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrooveProfile {
    /// Swing amount 0.0 (straight) to 1.0 (fully swung)
    pub swing: Option<f32>,
    /// Note onsets per unit time, normalized 0.0-1.0
    pub onset_density: Option<f32>,
    /// Overall rhythmic busyness, normalized 0.0-1.0
    pub busyness: Option<f32>,
    pub drum_pattern: Option<String>,
    pub genre: Option<String>,
}

/// Immutable feature vector for one track
///
/// Built once by the analysis pipeline; the engine only reads it. `bpm` and
/// `key` are the primary fields; everything else degrades gracefully to a
/// neutral default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRecord {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    /// Identity of the underlying source (file path or catalog row); two
    /// records sharing a source are the same recording
    pub source_id: String,
    pub bpm: Option<f64>,
    /// Raw key string in whatever notation the analyzer emitted
    pub key: Option<String>,
    /// Perceived intensity 0-100
    pub energy: Option<f32>,
    /// Fraction of the track carrying vocals, 0.0-1.0
    pub vocal_ratio: Option<f32>,
    pub spectral: Option<SpectralBands>,
    pub groove: GrooveProfile,
    /// Free-form timbre descriptors matched against the synergy table
    pub timbre_tags: Vec<String>,
    /// Emotional activation 0.0-1.0
    pub arousal: Option<f32>,
    /// Emotional positivity 0.0-1.0
    pub valence: Option<f32>,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            id: TrackId(String::new()),
            title: String::new(),
            artist: String::new(),
            source_id: String::new(),
            bpm: None,
            key: None,
            energy: None,
            vocal_ratio: None,
            spectral: None,
            groove: GrooveProfile::default(),
            timbre_tags: Vec::new(),
            arousal: None,
            valence: None,
        }
    }
}

impl FeatureRecord {
    /// Minimal record with just identity fields; the rest defaults to unset
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    pub fn energy_or_default(&self) -> f32 {
        self.energy.unwrap_or(50.0)
    }

    pub fn vocal_ratio_or_default(&self) -> f32 {
        self.vocal_ratio.unwrap_or(0.5)
    }

    pub fn spectral_or_default(&self) -> SpectralBands {
        self.spectral.unwrap_or_default()
    }

    pub fn onset_density_or_default(&self) -> f32 {
        self.groove.onset_density.unwrap_or(0.5)
    }

    pub fn busyness_or_default(&self) -> f32 {
        self.groove.busyness.unwrap_or(0.5)
    }

    pub fn arousal_or_default(&self) -> f32 {
        self.arousal.unwrap_or(0.5)
    }

    pub fn valence_or_default(&self) -> f32 {
        self.valence.unwrap_or(0.5)
    }

    /// Canonical key parsed from the raw key string
    pub fn canonical_key(&self) -> crate::music::CanonicalKey {
        match &self.key {
            Some(raw) => crate::music::CanonicalKey::normalize(raw),
            None => crate::music::CanonicalKey::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::CanonicalKey;

    #[test]
    fn test_defaults_are_neutral_midpoints() {
        let record = FeatureRecord::new("t1".to_string(), "Test", "Nobody");
        assert_eq!(record.energy_or_default(), 50.0);
        assert_eq!(record.vocal_ratio_or_default(), 0.5);
        assert_eq!(record.onset_density_or_default(), 0.5);
        assert_eq!(record.arousal_or_default(), 0.5);
        assert_eq!(record.canonical_key(), CanonicalKey::Unknown);
    }

    #[test]
    fn test_canonical_key_uses_raw_string() {
        let record = FeatureRecord {
            key: Some("8A".to_string()),
            ..FeatureRecord::new("t1".to_string(), "Test", "Nobody")
        };
        assert_eq!(record.canonical_key(), CanonicalKey::normalize("Am"));
    }

    #[test]
    fn test_yaml_roundtrip_with_sparse_fields() {
        let record = FeatureRecord {
            bpm: Some(126.0),
            energy: Some(72.0),
            ..FeatureRecord::new("t2".to_string(), "Sparse", "Somebody")
        };
        let yaml = serde_yaml::to_string(&record).unwrap();
        let back: FeatureRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, record);
    }
}
