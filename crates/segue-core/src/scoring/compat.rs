//! Staged compatibility pipeline
//!
//! Scoring runs in two stages: hard gates that reject a pair outright
//! (returning an explained zero), then cumulative weighted scoring across
//! six dimensions. Rejection is a normal outcome carried in the result, not
//! an error.

use serde::{Deserialize, Serialize};

use crate::features::FeatureRecord;
use crate::profile::ScoringProfile;
use crate::scoring::harmonic::HarmonicScorer;
use crate::scoring::tempo::{TempoScorer, TempoTier, TempoVerdict};

// Spectral interaction constants. Masking is multiplicative in perceptual
// terms, so the mid-range penalty scales with the product of both tracks'
// mid energy rather than their sum.
const SUB_BASS_CLASH_LEVEL: f32 = 0.6;
const SUB_BASS_CLASH_PENALTY: f64 = 8.0;
const SUB_BASS_STACK_LEVEL: f32 = 0.4;
const SUB_BASS_STACK_PENALTY: f64 = 3.0;
const MASKING_BUDGET: f64 = 7.0;
const MASKING_FLOOR: f64 = -5.0;
const MASKING_GAIN: f64 = 2.5;
const HIGH_BAND_WINDOW: f32 = 0.1;

/// Vocal ratio below which a track counts as pure ambience
const AMBIENCE_FLOOR: f32 = 0.05;

/// Scoring mode threaded through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringMode {
    /// Conservative defaults for set building
    Standard,
    /// Amplifies the cultural-affinity dimension to surface cross-catalog
    /// pairings that physics alone would rank lower
    Discovery,
}

/// Scoring dimensions, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    TempoSpeed,
    Harmonic,
    StemPattern,
    SpectralVibe,
    GrooveStyle,
    CulturalAffinity,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dimension::TempoSpeed => "tempo & perceptual speed",
            Dimension::Harmonic => "harmonic",
            Dimension::StemPattern => "stem pattern",
            Dimension::SpectralVibe => "spectral vibe",
            Dimension::GrooveStyle => "groove & style",
            Dimension::CulturalAffinity => "cultural affinity",
        };
        write!(f, "{name}")
    }
}

/// One dimension's contribution with its display-ready explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub points: f64,
    pub note: String,
}

/// Result of scoring one pair
///
/// Built fresh per call; inputs are cheap to re-score and the same records
/// may be evaluated under different profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Capped at the profile maximum (120 by default). Penalties can drive
    /// a non-rejected score below zero; only hard gates produce exactly 0
    /// with `rejected` set.
    pub final_score: f64,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    /// Per-dimension contributions in pipeline order; empty when rejected
    pub breakdown: Vec<DimensionScore>,
}

impl CompatibilityResult {
    fn rejection(reason: String) -> Self {
        Self {
            final_score: 0.0,
            rejected: true,
            rejection_reason: Some(reason),
            breakdown: Vec::new(),
        }
    }
}

/// Vocal-stem interaction pattern of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemPattern {
    /// One vocal-forward track over one near-instrumental: ideal layering
    Overlay,
    /// Both vocal-capable: phrase trading between the two
    Alternation,
    /// Neither pattern; mixable freely but without a signature technique
    FreeMix,
}

impl StemPattern {
    /// Overlay and Alternation are the patterns with a genuinely
    /// exploitable mixing technique
    pub fn is_elite(&self) -> bool {
        !matches!(self, StemPattern::FreeMix)
    }
}

/// Classify the vocal-stem pattern from two vocal ratios
pub(crate) fn classify_stem_pattern(v1: f32, v2: f32) -> StemPattern {
    if (v1 > 0.6 && v2 < 0.3) || (v2 > 0.6 && v1 < 0.3) {
        StemPattern::Overlay
    } else if v1 >= 0.45 && v2 >= 0.45 {
        StemPattern::Alternation
    } else {
        StemPattern::FreeMix
    }
}

/// The central pairwise scorer
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    profile: ScoringProfile,
    harmonic: HarmonicScorer,
    tempo: TempoScorer,
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new(ScoringProfile::default())
    }
}

impl CompatibilityScorer {
    pub fn new(profile: ScoringProfile) -> Self {
        let harmonic = HarmonicScorer::new(profile.harmonic.clone());
        let tempo = TempoScorer::new(profile.tempo.clone());
        Self {
            profile,
            harmonic,
            tempo,
        }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    /// Score a pair of records.
    ///
    /// Never fails on malformed data: absent optional fields read as neutral
    /// midpoints, and every rejection path returns an explained zero.
    pub fn score(
        &self,
        a: &FeatureRecord,
        b: &FeatureRecord,
        mode: ScoringMode,
    ) -> CompatibilityResult {
        let verdict = match self.check_gates(a, b) {
            Ok(verdict) => verdict,
            Err(reason) => {
                log::debug!("rejected {} vs {}: {reason}", a.id, b.id);
                return CompatibilityResult::rejection(reason);
            }
        };

        let mut breakdown = Vec::with_capacity(6);

        let (stem_pattern, harmonic_score) =
            self.score_fixed_dimensions(a, b, &verdict, &mut breakdown);
        let synergy_points = self.score_cultural(a, b, mode, &mut breakdown);

        let mut total: f64 = breakdown.iter().map(|d| d.points).sum();
        let caps = &self.profile.caps;
        let synergy_fired = synergy_points > 0.0;

        if f64::from(harmonic_score) < caps.dissonance_floor && !synergy_fired {
            total -= caps.dissonance_penalty;
            log::debug!("{} vs {}: near-dissonant pairing penalized", a.id, b.id);
        }

        if !stem_pattern.is_elite() && !synergy_fired && total > caps.elite_cap {
            total = caps.elite_cap;
        }

        CompatibilityResult {
            final_score: total.min(caps.max_score),
            rejected: false,
            rejection_reason: None,
            breakdown,
        }
    }

    /// Run the hard gates in order; a pass yields the tempo verdict so the
    /// scoring stage doesn't recompute it.
    fn check_gates(&self, a: &FeatureRecord, b: &FeatureRecord) -> Result<TempoVerdict, String> {
        let bpm_a = a.bpm.filter(|v| *v > 0.0);
        let bpm_b = b.bpm.filter(|v| *v > 0.0);

        // 1. Tempo gate: beyond what ratio manipulation can bridge
        let verdict = match (bpm_a, bpm_b) {
            (Some(x), Some(y)) => {
                let verdict = self.tempo.score(x, y);
                if verdict.tier == TempoTier::Reject {
                    return Err(verdict.reason);
                }
                Some(verdict)
            }
            _ => None,
        };

        // 2. Identity collision: the same song under a variant title
        let title_a = normalize_title(&a.title);
        let title_b = normalize_title(&b.title);
        if !title_a.is_empty()
            && !title_b.is_empty()
            && (title_a == title_b || title_a.contains(&title_b) || title_b.contains(&title_a))
        {
            return Err(format!("duplicate/variant of same track (\"{title_a}\")"));
        }

        // 3. Same underlying source
        if !a.source_id.is_empty() && a.source_id == b.source_id {
            return Err("same source recording".to_string());
        }

        // 4. Two pure-ambience tracks have nothing to mix against
        if a.vocal_ratio_or_default() < AMBIENCE_FLOOR
            && b.vocal_ratio_or_default() < AMBIENCE_FLOOR
        {
            return Err("both tracks are pure ambience".to_string());
        }

        // 5. Tempo data is mandatory
        match verdict {
            Some(verdict) => Ok(verdict),
            None => Err("missing BPM data".to_string()),
        }
    }

    /// Dimensions 1-5: tempo/speed, harmonic, stems, spectral, groove.
    /// Returns the stem pattern and raw harmonic score for the capping stage.
    fn score_fixed_dimensions(
        &self,
        a: &FeatureRecord,
        b: &FeatureRecord,
        verdict: &TempoVerdict,
        breakdown: &mut Vec<DimensionScore>,
    ) -> (StemPattern, u8) {
        let budgets = &self.profile.budgets;

        // 1. Tempo tier plus perceptual speed alignment
        let od_sim = 1.0 - (a.onset_density_or_default() - b.onset_density_or_default()).abs();
        let busy_sim = 1.0 - (a.busyness_or_default() - b.busyness_or_default()).abs();
        let speed_points =
            (f64::from(od_sim) + f64::from(busy_sim)) * (budgets.perceptual_speed / 2.0);
        breakdown.push(DimensionScore {
            dimension: Dimension::TempoSpeed,
            points: verdict.score_contribution.max(0.0) + speed_points,
            note: verdict.reason.clone(),
        });

        // 2. Harmonic, rescaled into its point budget
        let (h_score, h_reason) = self.harmonic.score(&a.canonical_key(), &b.canonical_key());
        breakdown.push(DimensionScore {
            dimension: Dimension::Harmonic,
            points: f64::from(h_score) / 100.0 * budgets.harmonic_weight,
            note: h_reason.to_string(),
        });

        // 3. Stem pattern
        let v1 = a.vocal_ratio_or_default();
        let v2 = b.vocal_ratio_or_default();
        let pattern = classify_stem_pattern(v1, v2);
        let (stem_points, stem_note) = match pattern {
            StemPattern::Overlay => (
                budgets.overlay,
                "Overlay: one vocal lead over one instrumental bed".to_string(),
            ),
            StemPattern::Alternation => (
                budgets.alternation,
                "Alternation: trade phrases rather than layering vocals".to_string(),
            ),
            StemPattern::FreeMix => (
                (budgets.free_mix_scale * f64::from((v1 - v2).abs())).max(budgets.free_mix_floor),
                "Free mix: no signature stem technique".to_string(),
            ),
        };
        breakdown.push(DimensionScore {
            dimension: Dimension::StemPattern,
            points: stem_points,
            note: stem_note,
        });

        // 4. Spectral vibe
        breakdown.push(self.score_spectral(a, b));

        // 5. Groove and style
        breakdown.push(self.score_groove(a, b));

        (pattern, h_score)
    }

    fn score_spectral(&self, a: &FeatureRecord, b: &FeatureRecord) -> DimensionScore {
        let budgets = &self.profile.budgets;
        let mut points = 0.0;
        let mut notes: Vec<String> = Vec::new();

        let energy_sim = 1.0 - (a.energy_or_default() - b.energy_or_default()).abs() / 100.0;
        if energy_sim > 0.8 {
            points += budgets.energy_close_bonus;
            notes.push("energy levels aligned".to_string());
        }

        let sa = a.spectral_or_default();
        let sb = b.spectral_or_default();

        let tonal_dist = f64::from(
            (sa.low_mid - sb.low_mid).powi(2)
                + (sa.mid_range - sb.mid_range).powi(2)
                + (sa.high_presence - sb.high_presence).powi(2),
        )
        .sqrt();
        let tonal_sim = (1.0 - tonal_dist * 2.0).max(0.0);
        points += tonal_sim * budgets.tonal_similarity;

        if sa.sub_bass > SUB_BASS_CLASH_LEVEL && sb.sub_bass > SUB_BASS_CLASH_LEVEL {
            points -= SUB_BASS_CLASH_PENALTY;
            notes.push("sub-bass clash, cut one side's low EQ".to_string());
        } else if sa.sub_bass > SUB_BASS_STACK_LEVEL && sb.sub_bass > SUB_BASS_STACK_LEVEL {
            points -= SUB_BASS_STACK_PENALTY;
            notes.push("moderate low-end stacking".to_string());
        }

        let masking = f64::from(sa.mid_range) * f64::from(sb.mid_range);
        points += (MASKING_BUDGET * (1.0 - masking * MASKING_GAIN)).max(MASKING_FLOOR);

        if (sa.high_presence - sb.high_presence).abs() < HIGH_BAND_WINDOW {
            points += budgets.high_band_bonus;
        }

        if notes.is_empty() {
            notes.push("balanced spectra".to_string());
        }

        DimensionScore {
            dimension: Dimension::SpectralVibe,
            points,
            note: notes.join("; "),
        }
    }

    fn score_groove(&self, a: &FeatureRecord, b: &FeatureRecord) -> DimensionScore {
        let budgets = &self.profile.budgets;
        let mut points = 0.0;
        let mut notes: Vec<String> = Vec::new();

        if let (Some(pa), Some(pb)) = (&a.groove.drum_pattern, &b.groove.drum_pattern) {
            if !pa.is_empty() && pa.eq_ignore_ascii_case(pb) {
                points += budgets.drum_pattern_match;
                notes.push(format!("matching {pa} drum pattern"));
            }
        }

        if let (Some(ga), Some(gb)) = (&a.groove.genre, &b.groove.genre) {
            if !ga.is_empty() && ga.eq_ignore_ascii_case(gb) {
                points += budgets.genre_match;
                notes.push(format!("same genre ({ga})"));
            }
        }

        if let (Some(s1), Some(s2)) = (a.groove.swing, b.groove.swing) {
            if 1.0 - (s1 - s2).abs() > 0.85 {
                points += budgets.swing_bonus;
                notes.push("swing amounts locked".to_string());
            }
        }

        if notes.is_empty() {
            notes.push("no groove overlap".to_string());
        }

        DimensionScore {
            dimension: Dimension::GrooveStyle,
            points,
            note: notes.join("; "),
        }
    }

    /// Dimension 6: cultural and timbre affinity. Returns the raw synergy
    /// points so the capping stage knows whether a synergy rule fired.
    fn score_cultural(
        &self,
        a: &FeatureRecord,
        b: &FeatureRecord,
        mode: ScoringMode,
        breakdown: &mut Vec<DimensionScore>,
    ) -> f64 {
        let culture = &self.profile.culture;
        let mut points = 0.0;
        let mut notes: Vec<String> = Vec::new();

        let soup_a = tag_soup(a);
        let soup_b = tag_soup(b);

        if has_any(&soup_a, &culture.urban) || has_any(&soup_b, &culture.urban) {
            points += culture.urban_synergy_bonus;
            notes.push("urban/banger synergy".to_string());
        }

        // Pop symmetry: pop pairs with pop or a professional remix, nothing else
        let pop_clusters = |soup: &str| {
            [
                has_any(soup, &culture.mandarin_pop),
                has_any(soup, &culture.kpop),
                has_any(soup, &culture.western_pop),
            ]
        };
        let clusters_a = pop_clusters(&soup_a);
        let clusters_b = pop_clusters(&soup_b);
        let is_pop_a = clusters_a.iter().any(|&c| c);
        let is_pop_b = clusters_b.iter().any(|&c| c);
        let is_remix_a = has_any(&soup_a, &culture.remix);
        let is_remix_b = has_any(&soup_b, &culture.remix);

        if is_pop_a || is_pop_b {
            if is_pop_a && is_pop_b {
                let clusters_present = clusters_a
                    .iter()
                    .zip(clusters_b.iter())
                    .map(|(&x, &y)| x || y)
                    .filter(|&present| present)
                    .count();
                if clusters_present >= 2 {
                    points += culture.cross_cluster_bonus;
                    notes.push("cross-cluster pop symmetry".to_string());
                } else {
                    points += culture.same_cluster_bonus;
                    notes.push("pop symmetry".to_string());
                }
            } else if (is_pop_a && is_remix_b) || (is_pop_b && is_remix_a) {
                points += culture.pop_remix_bonus;
                notes.push("pop/remix pairing".to_string());
            } else {
                points -= culture.pop_mismatch_penalty;
                notes.push("pop paired with unrelated material".to_string());
            }
        }

        // Anti-machine barrier: a vocal-forward pop track against vocals-absent
        // machine music empties the floor
        let vocal_a = a.vocal_ratio_or_default();
        let vocal_b = b.vocal_ratio_or_default();
        let machine = |soup: &str, vocal: f32| has_any(soup, &culture.pure_electronic) && vocal < 0.3;
        let vocal_soul = |is_pop: bool, vocal: f32| is_pop && vocal > 0.6;
        if (vocal_soul(is_pop_a, vocal_a) && machine(&soup_b, vocal_b))
            || (vocal_soul(is_pop_b, vocal_b) && machine(&soup_a, vocal_a))
        {
            points -= culture.anti_machine_penalty;
            notes.push("vocal pop against machine music".to_string());
        }

        // Emotional profile distance
        let arousal_gap = f64::from((a.arousal_or_default() - b.arousal_or_default()).abs());
        let valence_gap = f64::from((a.valence_or_default() - b.valence_or_default()).abs());
        let emo_dist = (arousal_gap.powi(2) + valence_gap.powi(2)).sqrt();
        if emo_dist < culture.emotion_mirror_distance {
            points += culture.emotion_mirror_bonus;
            notes.push("emotional mirroring".to_string());
        } else if emo_dist > culture.emotion_clash_distance {
            points -= culture.emotion_clash_penalty;
            notes.push("mood clash".to_string());
        }

        if arousal_gap > culture.arousal_gap_limit {
            points -= culture.arousal_gap_penalty;
            notes.push("intensity levels disconnected".to_string());
        } else if arousal_gap < culture.arousal_lock_window {
            points += culture.arousal_lock_bonus;
        }

        if !a.artist.is_empty() && a.artist.eq_ignore_ascii_case(&b.artist) {
            points -= culture.same_artist_penalty;
            notes.push("same artist".to_string());
        }

        // Timbre synergy table
        let guard = &self.profile.synergy_guard;
        let mut synergy_points = 0.0;
        for rule in &self.profile.synergy {
            let fired = (has_any(&soup_a, &rule.a_any) && has_any(&soup_b, &rule.b_any))
                || (has_any(&soup_b, &rule.a_any) && has_any(&soup_a, &rule.b_any));
            if !fired {
                continue;
            }
            if rule.points >= guard.large_bonus_floor && arousal_gap > guard.vibe_gap_limit {
                synergy_points += guard.suppressed_points;
                notes.push(format!("{} (suppressed: intensity mismatch)", rule.label));
            } else {
                synergy_points += rule.points;
                notes.push(rule.label.clone());
            }
        }
        points += synergy_points;

        let scale = match mode {
            ScoringMode::Standard => 1.0,
            ScoringMode::Discovery => culture.discovery_scale,
        };

        if notes.is_empty() {
            notes.push("no cultural signal".to_string());
        }

        breakdown.push(DimensionScore {
            dimension: Dimension::CulturalAffinity,
            points: points * scale,
            note: notes.join("; "),
        });

        synergy_points
    }
}

/// Strip bracketed/parenthetical content and punctuation, lowercase.
/// "Foot Fungus (Slowed Edit)" and "Foot Fungus" collapse to the same form.
pub(crate) fn normalize_title(title: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                if c.is_alphanumeric() {
                    out.extend(c.to_lowercase());
                } else if c.is_whitespace() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Genre label plus timbre tags, lowercased into one searchable string
fn tag_soup(record: &FeatureRecord) -> String {
    let mut soup = record
        .groove
        .genre
        .clone()
        .unwrap_or_default()
        .to_lowercase();
    for tag in &record.timbre_tags {
        soup.push(' ');
        soup.push_str(&tag.to_lowercase());
    }
    soup
}

fn has_any(soup: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| soup.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{GrooveProfile, SpectralBands};

    fn record(id: &str, title: &str, artist: &str, bpm: f64) -> FeatureRecord {
        FeatureRecord {
            bpm: Some(bpm),
            key: Some("8A".to_string()),
            energy: Some(60.0),
            vocal_ratio: Some(0.7),
            source_id: format!("/library/{id}.flac"),
            ..FeatureRecord::new(id, title, artist)
        }
    }

    fn scorer() -> CompatibilityScorer {
        CompatibilityScorer::default()
    }

    #[test]
    fn test_self_pair_is_rejected() {
        let a = record("t1", "Night Drive", "Artist A", 124.0);
        let result = scorer().score(&a, &a, ScoringMode::Standard);
        assert!(result.rejected);
        assert_eq!(result.final_score, 0.0);
        let reason = result.rejection_reason.unwrap();
        assert!(reason.contains("duplicate") || reason.contains("same source"));
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_variant_title_is_rejected() {
        let a = record("t1", "Night Drive", "Artist A", 124.0);
        let b = record("t2", "Night Drive (Slowed Remix)", "Artist B", 124.0);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(result.rejected);
        assert!(result.rejection_reason.unwrap().contains("duplicate"));
    }

    #[test]
    fn test_tempo_gate_short_circuits() {
        // Harmonically perfect pair, but tempos unbridgeable at any ratio
        let a = record("t1", "Alpha", "Artist A", 100.0);
        let b = record("t2", "Beta", "Artist B", 160.0);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(result.rejected);
        assert_eq!(result.final_score, 0.0);
        assert!(result.rejection_reason.unwrap().contains("BPM"));
    }

    #[test]
    fn test_ambience_gate() {
        let mut a = record("t1", "Drone One", "Artist A", 124.0);
        let mut b = record("t2", "Drone Two", "Artist B", 124.0);
        a.vocal_ratio = Some(0.01);
        b.vocal_ratio = Some(0.02);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(result.rejected);
        assert!(result.rejection_reason.unwrap().contains("ambience"));
    }

    #[test]
    fn test_missing_bpm_gate() {
        let a = record("t1", "Alpha", "Artist A", 124.0);
        let mut b = record("t2", "Beta", "Artist B", 124.0);
        b.bpm = None;
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(result.rejected);
        assert!(result.rejection_reason.unwrap().contains("missing BPM"));
    }

    #[test]
    fn test_overlay_pattern_gets_full_budget() {
        let mut a = record("t1", "Vocal Lead", "Artist A", 124.0);
        let mut b = record("t2", "Instrumental Bed", "Artist B", 124.0);
        a.vocal_ratio = Some(0.85);
        b.vocal_ratio = Some(0.1);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(!result.rejected);
        let stems = result
            .breakdown
            .iter()
            .find(|d| d.dimension == Dimension::StemPattern)
            .unwrap();
        assert_eq!(stems.points, 25.0);
        assert!(stems.note.contains("Overlay"));
    }

    #[test]
    fn test_alternation_pattern_carries_advisory() {
        let mut a = record("t1", "Singer One", "Artist A", 124.0);
        let mut b = record("t2", "Singer Two", "Artist B", 124.0);
        a.vocal_ratio = Some(0.6);
        b.vocal_ratio = Some(0.55);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        let stems = result
            .breakdown
            .iter()
            .find(|d| d.dimension == Dimension::StemPattern)
            .unwrap();
        assert_eq!(stems.points, 15.0);
        assert!(stems.note.contains("phrases"));
    }

    #[test]
    fn test_breakdown_is_ordered_and_explained() {
        let a = record("t1", "Alpha", "Artist A", 124.0);
        let b = record("t2", "Beta", "Artist B", 125.0);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        let order: Vec<Dimension> = result.breakdown.iter().map(|d| d.dimension).collect();
        assert_eq!(
            order,
            vec![
                Dimension::TempoSpeed,
                Dimension::Harmonic,
                Dimension::StemPattern,
                Dimension::SpectralVibe,
                Dimension::GrooveStyle,
                Dimension::CulturalAffinity,
            ]
        );
        assert!(result.breakdown.iter().all(|d| !d.note.is_empty()));
    }

    #[test]
    fn test_idempotent_rescoring() {
        let a = record("t1", "Alpha", "Artist A", 124.0);
        let b = record("t2", "Beta", "Artist B", 126.0);
        let first = scorer().score(&a, &b, ScoringMode::Standard);
        let second = scorer().score(&a, &b, ScoringMode::Standard);
        assert_eq!(first, second);
    }

    fn high_scoring_free_mix_pair() -> (FeatureRecord, FeatureRecord) {
        let spectral = SpectralBands {
            sub_bass: 0.1,
            low_mid: 0.5,
            mid_range: 0.3,
            high_presence: 0.2,
        };
        let groove = GrooveProfile {
            swing: Some(0.2),
            onset_density: Some(0.5),
            busyness: Some(0.5),
            drum_pattern: Some("four_on_floor".to_string()),
            genre: Some("k-pop".to_string()),
        };
        let mut a = record("t1", "Alpha", "Artist A", 124.0);
        let mut b = record("t2", "Beta", "Artist B", 124.0);
        for r in [&mut a, &mut b] {
            r.spectral = Some(spectral);
            r.groove = groove.clone();
            r.arousal = Some(0.6);
            r.valence = Some(0.6);
        }
        // Free-mix vocal ratios: no overlay, no alternation
        a.vocal_ratio = Some(0.9);
        b.vocal_ratio = Some(0.35);
        (a, b)
    }

    #[test]
    fn test_non_elite_pattern_capped_at_70() {
        let (a, b) = high_scoring_free_mix_pair();
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(!result.rejected);
        assert_eq!(result.final_score, 70.0);
        // The raw dimension sum was higher than the cap
        let raw: f64 = result.breakdown.iter().map(|d| d.points).sum();
        assert!(raw > 70.0);
    }

    #[test]
    fn test_timbre_synergy_lifts_the_cap() {
        let (mut a, mut b) = high_scoring_free_mix_pair();
        a.timbre_tags = vec!["oriental_pluck".to_string()];
        b.timbre_tags = vec!["pizzicato".to_string()];
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(!result.rejected);
        assert!(result.final_score > 70.0);
        assert!(result.final_score <= 120.0);
    }

    #[test]
    fn test_large_synergy_suppressed_by_intensity_gap() {
        let (mut a, mut b) = high_scoring_free_mix_pair();
        a.timbre_tags = vec!["oriental_pluck".to_string()];
        b.timbre_tags = vec!["pizzicato".to_string()];
        a.arousal = Some(0.9);
        b.arousal = Some(0.2);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        let cultural = result
            .breakdown
            .iter()
            .find(|d| d.dimension == Dimension::CulturalAffinity)
            .unwrap();
        assert!(cultural.note.contains("suppressed"));
    }

    #[test]
    fn test_anti_machine_barrier() {
        let mut pop = record("t1", "Chart Hit", "Artist A", 124.0);
        let mut techno = record("t2", "Warehouse Tool", "Artist B", 124.0);
        pop.groove.genre = Some("pop".to_string());
        pop.vocal_ratio = Some(0.9);
        techno.groove.genre = Some("techno".to_string());
        techno.vocal_ratio = Some(0.1);
        let result = scorer().score(&pop, &techno, ScoringMode::Standard);
        let cultural = result
            .breakdown
            .iter()
            .find(|d| d.dimension == Dimension::CulturalAffinity)
            .unwrap();
        assert!(cultural.note.contains("machine"));
        assert!(cultural.points < 0.0);
    }

    #[test]
    fn test_discovery_mode_scales_cultural_dimension() {
        let (a, b) = high_scoring_free_mix_pair();
        let standard = scorer().score(&a, &b, ScoringMode::Standard);
        let discovery = scorer().score(&a, &b, ScoringMode::Discovery);
        let cultural = |r: &CompatibilityResult| {
            r.breakdown
                .iter()
                .find(|d| d.dimension == Dimension::CulturalAffinity)
                .unwrap()
                .points
        };
        assert!(cultural(&discovery) > cultural(&standard));
        assert!((cultural(&discovery) - cultural(&standard) * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_same_artist_penalized() {
        let a = record("t1", "Alpha", "Shared Artist", 124.0);
        let b = record("t2", "Beta", "shared artist", 124.0);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        let cultural = result
            .breakdown
            .iter()
            .find(|d| d.dimension == Dimension::CulturalAffinity)
            .unwrap();
        assert!(cultural.note.contains("same artist"));
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Foot Fungus (Slowed Edit)"), "foot fungus");
        assert_eq!(normalize_title("Foot Fungus [VIP Mix]"), "foot fungus");
        assert_eq!(normalize_title("Don't Stop!"), "dont stop");
        assert_eq!(normalize_title("  Night   Drive  "), "night drive");
    }

    #[test]
    fn test_half_time_pair_scores() {
        // 70 vs 140 is a valid double-time pairing, not a rejection
        let a = record("t1", "Slow Burner", "Artist A", 70.0);
        let b = record("t2", "Fast Mover", "Artist B", 140.0);
        let result = scorer().score(&a, &b, ScoringMode::Standard);
        assert!(!result.rejected);
        let tempo = &result.breakdown[0];
        assert!(tempo.note.contains("manipulation"));
    }
}
