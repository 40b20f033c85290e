//! Set sequencing over a candidate pool
//!
//! Orders a pool of tracks into a set that follows a target energy arc while
//! maximizing adjacent-pair compatibility. The greedy nearest-neighbor walk
//! is the default; small pools get a bounded exhaustive permutation search
//! behind the same surface. Each step's candidate scoring is independent, so
//! the inner loop fans out across a thread pool and reduces to the maximum.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FeatureRecord, TrackId};
use crate::scoring::{CompatibilityResult, CompatibilityScorer, ScoringMode};

/// Pool sizes at or below this get the exhaustive search automatically
const EXHAUSTIVE_AUTO_LIMIT: usize = 8;
/// Absolute ceiling for the permutation search; factorial guard
const EXHAUSTIVE_HARD_LIMIT: usize = 10;

/// Errors from sequence building
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The caller supplied no candidates at all
    #[error("candidate pool is empty")]
    EmptyPool,
}

/// Segment of the set's energy arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    WarmUp,
    BuildUp,
    Peak,
    CoolDown,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::WarmUp => "Warm-up",
            Phase::BuildUp => "Build-up",
            Phase::Peak => "Peak",
            Phase::CoolDown => "Cool-down",
        };
        write!(f, "{name}")
    }
}

/// Energy band one phase allows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub energy_min: f32,
    pub energy_max: f32,
}

/// Target energy arc for a set
///
/// Positions map onto phases by set fraction: the first fifth warms up, up
/// to two fifths builds, up to four fifths peaks, and the rest cools down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseShape {
    pub specs: Vec<PhaseSpec>,
    /// How far each band edge stretches when a step would otherwise starve
    pub band_slack: f32,
    /// Stop after this many tracks; the whole pool when unset
    pub target_len: Option<usize>,
}

impl Default for PhaseShape {
    fn default() -> Self {
        Self::classic_arc()
    }
}

impl PhaseShape {
    fn with_bands(bands: [(f32, f32); 4]) -> Self {
        let phases = [Phase::WarmUp, Phase::BuildUp, Phase::Peak, Phase::CoolDown];
        Self {
            specs: phases
                .iter()
                .zip(bands.iter())
                .map(|(&phase, &(energy_min, energy_max))| PhaseSpec {
                    phase,
                    energy_min,
                    energy_max,
                })
                .collect(),
            band_slack: 15.0,
            target_len: None,
        }
    }

    /// The standard arc: warm-up, build, peak past the midpoint, cool out
    pub fn classic_arc() -> Self {
        Self::with_bands([(30.0, 55.0), (50.0, 70.0), (65.0, 90.0), (40.0, 75.0)])
    }

    /// Higher floor throughout; the room is already moving
    pub fn club() -> Self {
        Self::with_bands([(40.0, 60.0), (55.0, 75.0), (70.0, 95.0), (45.0, 80.0)])
    }

    /// Compact arc for broadcast slots
    pub fn radio() -> Self {
        Self::with_bands([(35.0, 55.0), (45.0, 65.0), (60.0, 85.0), (40.0, 70.0)])
    }

    /// Opening-slot shape; stays low and leaves headroom for the next act
    pub fn warm_up() -> Self {
        Self::with_bands([(25.0, 45.0), (35.0, 60.0), (50.0, 75.0), (35.0, 60.0)])
    }

    /// Phase governing a given position in a set of `total` tracks
    pub fn phase_for(position: usize, total: usize) -> Phase {
        if position < total / 5 {
            Phase::WarmUp
        } else if position < 2 * total / 5 {
            Phase::BuildUp
        } else if position < 4 * total / 5 {
            Phase::Peak
        } else {
            Phase::CoolDown
        }
    }

    /// Energy band at a position; permissive when the shape has no spec for
    /// the phase
    pub fn band_at(&self, position: usize, total: usize) -> (f32, f32) {
        let phase = Self::phase_for(position, total);
        self.specs
            .iter()
            .find(|s| s.phase == phase)
            .map(|s| (s.energy_min, s.energy_max))
            .unwrap_or((0.0, 100.0))
    }
}

/// Catalog diversity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityRule {
    /// An artist may not reappear within this many consecutive slots;
    /// 0 disables the rule
    pub min_artist_gap: usize,
}

impl Default for DiversityRule {
    fn default() -> Self {
        Self { min_artist_gap: 1 }
    }
}

/// One placed track with the scoring that justified it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub track: TrackId,
    /// None for the seed track
    pub transition: Option<CompatibilityResult>,
}

/// Ordered set with per-transition justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePlan {
    pub entries: Vec<PlanEntry>,
    /// Sum of adjacent-pair scores
    pub total_score: f64,
}

impl SequencePlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn track_ids(&self) -> impl Iterator<Item = &TrackId> {
        self.entries.iter().map(|e| &e.track)
    }
}

/// Ordering strategy behind the single build surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Pick per pool size: exhaustive for small pools, greedy otherwise
    Auto,
    Greedy,
    Exhaustive,
}

/// Builds ordered sets from a candidate pool
#[derive(Debug, Clone)]
pub struct SetSequencer {
    scorer: CompatibilityScorer,
    mode: ScoringMode,
    strategy: Strategy,
}

impl Default for SetSequencer {
    fn default() -> Self {
        Self::new(CompatibilityScorer::default())
    }
}

impl SetSequencer {
    pub fn new(scorer: CompatibilityScorer) -> Self {
        Self {
            scorer,
            mode: ScoringMode::Standard,
            strategy: Strategy::Auto,
        }
    }

    pub fn with_mode(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Order the pool into a set following the target arc.
    ///
    /// Never fails on a non-empty pool: when no candidate fits the current
    /// energy band, the band widens once, and failing that the best
    /// available candidate is accepted; an incomplete-but-usable set beats
    /// no output.
    pub fn build_sequence(
        &self,
        pool: &[FeatureRecord],
        shape: &PhaseShape,
        diversity: &DiversityRule,
    ) -> Result<SequencePlan, SequenceError> {
        if pool.is_empty() {
            return Err(SequenceError::EmptyPool);
        }

        let strategy = match self.strategy {
            Strategy::Auto => {
                if pool.len() <= EXHAUSTIVE_AUTO_LIMIT {
                    Strategy::Exhaustive
                } else {
                    Strategy::Greedy
                }
            }
            Strategy::Exhaustive if pool.len() > EXHAUSTIVE_HARD_LIMIT => {
                log::warn!(
                    "exhaustive ordering requested for {} tracks, falling back to greedy",
                    pool.len()
                );
                Strategy::Greedy
            }
            s => s,
        };

        let plan = match strategy {
            Strategy::Exhaustive => self.exhaustive(pool, shape, diversity).unwrap_or_else(|| {
                log::debug!("no permutation satisfies the arc, using greedy ordering");
                self.greedy(pool, shape, diversity)
            }),
            _ => self.greedy(pool, shape, diversity),
        };

        Ok(plan)
    }

    /// Greedy nearest-neighbor walk from a low-energy seed
    fn greedy(
        &self,
        pool: &[FeatureRecord],
        shape: &PhaseShape,
        diversity: &DiversityRule,
    ) -> SequencePlan {
        let target = shape
            .target_len
            .map(|t| t.min(pool.len()))
            .unwrap_or(pool.len());

        let mut remaining: Vec<&FeatureRecord> = pool.iter().collect();

        let seed_idx = remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.energy_or_default()
                    .total_cmp(&b.energy_or_default())
                    .then(a.bpm.unwrap_or(0.0).total_cmp(&b.bpm.unwrap_or(0.0)))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seed = remaining.swap_remove(seed_idx);

        let mut ordered: Vec<&FeatureRecord> = vec![seed];
        let mut entries = vec![PlanEntry {
            track: seed.id.clone(),
            transition: None,
        }];
        let mut total_score = 0.0;

        while !remaining.is_empty() && entries.len() < target {
            let position = entries.len();
            let band = shape.band_at(position, target);
            let tail = ordered[ordered.len() - 1];

            let (idx, result) =
                self.pick_next(tail, &remaining, &ordered, band, shape.band_slack, diversity);
            let chosen = remaining.swap_remove(idx);

            total_score += result.final_score;
            ordered.push(chosen);
            entries.push(PlanEntry {
                track: chosen.id.clone(),
                transition: Some(result),
            });
        }

        SequencePlan {
            entries,
            total_score,
        }
    }

    /// Score all eligible candidates against the tail and keep the best.
    ///
    /// Eligibility narrows in stages: band + diversity, then the band
    /// widened by the slack, then diversity alone, then everyone. The last
    /// stage guarantees a pick on any non-empty remainder.
    fn pick_next(
        &self,
        tail: &FeatureRecord,
        remaining: &[&FeatureRecord],
        ordered: &[&FeatureRecord],
        band: (f32, f32),
        slack: f32,
        diversity: &DiversityRule,
    ) -> (usize, CompatibilityResult) {
        let diversity_ok = |c: &FeatureRecord| {
            if diversity.min_artist_gap == 0 || c.artist.is_empty() {
                return true;
            }
            !ordered
                .iter()
                .rev()
                .take(diversity.min_artist_gap)
                .any(|prev| prev.artist.eq_ignore_ascii_case(&c.artist))
        };
        let in_band = |c: &FeatureRecord, lo: f32, hi: f32| {
            let e = c.energy_or_default();
            e >= lo && e <= hi
        };

        let mut eligible: Vec<usize> = (0..remaining.len())
            .filter(|&i| in_band(remaining[i], band.0, band.1) && diversity_ok(remaining[i]))
            .collect();

        if eligible.is_empty() {
            log::debug!(
                "no candidate in energy band {:.0}-{:.0}, widening by {slack:.0}",
                band.0,
                band.1
            );
            eligible = (0..remaining.len())
                .filter(|&i| {
                    in_band(remaining[i], band.0 - slack, band.1 + slack)
                        && diversity_ok(remaining[i])
                })
                .collect();
        }
        if eligible.is_empty() {
            eligible = (0..remaining.len())
                .filter(|&i| diversity_ok(remaining[i]))
                .collect();
        }
        if eligible.is_empty() {
            eligible = (0..remaining.len()).collect();
        }

        // Independent pairwise calls: fan out, reduce to the maximum.
        // Ties break toward the lexically smaller id so runs are repeatable.
        eligible
            .par_iter()
            .map(|&i| (i, self.scorer.score(tail, remaining[i], self.mode)))
            .reduce_with(|best, cand| {
                let ord = cand
                    .1
                    .final_score
                    .total_cmp(&best.1.final_score)
                    .then_with(|| remaining[best.0].id.cmp(&remaining[cand.0].id));
                if ord == std::cmp::Ordering::Greater {
                    cand
                } else {
                    best
                }
            })
            .expect("eligible list is non-empty")
    }

    /// Bounded permutation search maximizing cumulative adjacent score.
    ///
    /// Returns None when no permutation satisfies the arc and diversity
    /// constraints; the caller falls back to the greedy walk.
    fn exhaustive(
        &self,
        pool: &[FeatureRecord],
        shape: &PhaseShape,
        diversity: &DiversityRule,
    ) -> Option<SequencePlan> {
        let n = pool.len();
        let target = shape.target_len.map(|t| t.min(n)).unwrap_or(n);

        // Pairwise matrix up front; the search then only does lookups
        let matrix: Vec<Vec<CompatibilityResult>> = pool
            .par_iter()
            .map(|a| {
                pool.iter()
                    .map(|b| self.scorer.score(a, b, self.mode))
                    .collect()
            })
            .collect();

        let max_pair = self.scorer.profile().caps.max_score;
        let mut best: Option<(f64, Vec<usize>)> = None;
        let mut order: Vec<usize> = Vec::with_capacity(target);
        let mut used = vec![false; n];

        self.search(
            pool, shape, diversity, &matrix, target, max_pair, &mut order, &mut used, 0.0,
            &mut best,
        );

        let (total_score, order) = best?;
        let entries = order
            .iter()
            .enumerate()
            .map(|(pos, &i)| PlanEntry {
                track: pool[i].id.clone(),
                transition: if pos == 0 {
                    None
                } else {
                    Some(matrix[order[pos - 1]][i].clone())
                },
            })
            .collect();

        Some(SequencePlan {
            entries,
            total_score,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        pool: &[FeatureRecord],
        shape: &PhaseShape,
        diversity: &DiversityRule,
        matrix: &[Vec<CompatibilityResult>],
        target: usize,
        max_pair: f64,
        order: &mut Vec<usize>,
        used: &mut [bool],
        score: f64,
        best: &mut Option<(f64, Vec<usize>)>,
    ) {
        if order.len() == target {
            if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                *best = Some((score, order.clone()));
            }
            return;
        }

        // Even a perfect remainder can't beat the incumbent
        if let Some((best_score, _)) = best {
            let remaining_max = (target - order.len()) as f64 * max_pair;
            if score + remaining_max <= *best_score {
                return;
            }
        }

        let position = order.len();
        let band = shape.band_at(position, target);

        for i in 0..pool.len() {
            if used[i] {
                continue;
            }
            let candidate = &pool[i];
            let e = candidate.energy_or_default();
            if e < band.0 || e > band.1 {
                continue;
            }
            if diversity.min_artist_gap > 0 && !candidate.artist.is_empty() {
                let repeat = order
                    .iter()
                    .rev()
                    .take(diversity.min_artist_gap)
                    .any(|&prev| pool[prev].artist.eq_ignore_ascii_case(&candidate.artist));
                if repeat {
                    continue;
                }
            }

            let step_score = match order.last() {
                Some(&prev) => matrix[prev][i].final_score,
                None => 0.0,
            };

            order.push(i);
            used[i] = true;
            self.search(
                pool, shape, diversity, matrix, target, max_pair, order, used,
                score + step_score, best,
            );
            used[i] = false;
            order.pop();
        }
    }
}
