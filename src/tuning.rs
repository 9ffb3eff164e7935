//! Brute-force weight calibration
//!
//! Every combination of the configured ranges is scored with a leave-one-out
//! evaluation. Cost is the product of the range sizes times the epoch count
//! times one index build, so the grid is bounded at construction.
//!
//! Each combination is evaluated with its own profile and the same seed, so
//! sequential and parallel sweeps produce identical rankings.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::casebase::CaseBase;
use crate::evaluation::Evaluator;
use crate::profile::{Profile, WeightSet};
use crate::{Error, Result};

/// Most values a single range may produce
pub const MAX_RANGE_VALUES: usize = 1_000_000;

/// Closed range `start..=end` walked by `step`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScalarRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ScalarRange {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Single-value range
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, 1.0)
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !(self.start.is_finite() && self.end.is_finite() && self.step.is_finite()) {
            return Err(Error::config(format!("{} range bounds must be finite", name)));
        }
        if self.step <= 0.0 {
            return Err(Error::config(format!(
                "{} range step must be positive, got {}",
                name, self.step
            )));
        }
        if self.start > self.end {
            return Err(Error::config(format!(
                "{} range is empty: start {} > end {}",
                name, self.start, self.end
            )));
        }

        let steps = self.steps();
        if !steps.is_finite() || steps >= MAX_RANGE_VALUES as f64 {
            return Err(Error::config(format!(
                "{} range {}..={} by {} has more than {} values",
                name, self.start, self.end, self.step, MAX_RANGE_VALUES
            )));
        }
        Ok(())
    }

    /// Number of values; a validated range always has at least one
    pub fn count(&self) -> usize {
        (self.steps() as usize).saturating_add(1)
    }

    fn steps(&self) -> f64 {
        // Tolerance keeps `end` when it is reached through accumulated steps.
        ((self.end - self.start) / self.step + 1e-9).floor()
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.count())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

impl Default for ScalarRange {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

/// Search space for the adaptation weights
///
/// Location scores follow `location_ranking`: the value at rank `i` scores
/// `i * scale`, for every scale in `location_scale`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WeightGrid {
    pub location_ranking: Vec<String>,
    pub location_scale: ScalarRange,
    pub rooms: ScalarRange,
    pub surface: ScalarRange,
    pub lot: ScalarRange,
}

impl WeightGrid {
    pub fn validate(&self) -> Result<()> {
        if self.location_ranking.is_empty() {
            return Err(Error::config("location ranking must not be empty"));
        }

        let mut seen = HashSet::new();
        for location in &self.location_ranking {
            if location.trim().is_empty() {
                return Err(Error::config("location ranking contains a blank entry"));
            }
            if !seen.insert(location.as_str()) {
                return Err(Error::config(format!(
                    "location ranking lists {:?} twice",
                    location
                )));
            }
        }

        self.location_scale.validate("location_scale")?;
        self.rooms.validate("rooms")?;
        self.surface.validate("surface")?;
        self.lot.validate("lot")?;
        Ok(())
    }

    /// Number of weight combinations, saturating on overflow
    pub fn combinations(&self) -> usize {
        [self.location_scale, self.rooms, self.surface, self.lot]
            .iter()
            .fold(1usize, |acc, r| acc.saturating_mul(r.count()))
    }

    /// Every weight combination, in lexicographic range order
    pub fn weight_sets(&self) -> Vec<WeightSet> {
        let mut sets = Vec::with_capacity(self.combinations());

        for scale in self.location_scale.values() {
            let location: HashMap<String, f64> = self
                .location_ranking
                .iter()
                .enumerate()
                .map(|(rank, name)| (name.clone(), rank as f64 * scale))
                .collect();

            for rooms in self.rooms.values() {
                for surface in self.surface.values() {
                    for lot in self.lot.values() {
                        sets.push(WeightSet {
                            location: location.clone(),
                            rooms,
                            surface,
                            lot,
                        });
                    }
                }
            }
        }

        sets
    }
}

/// Error measured for one weight combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningResult {
    pub weights: WeightSet,
    pub mape: f64,
}

#[derive(Debug, Clone)]
pub struct WeightTuner {
    grid: WeightGrid,
    epochs: usize,
    seed: u64,
    parallel: bool,
}

impl WeightTuner {
    /// Validate the grid before any sweep can start
    pub fn new(
        grid: WeightGrid,
        epochs: usize,
        seed: u64,
        max_combinations: usize,
    ) -> Result<Self> {
        grid.validate()?;

        if epochs == 0 {
            return Err(Error::config("tuning needs at least one epoch per combination"));
        }

        let combinations = grid.combinations();
        if combinations > max_combinations {
            return Err(Error::config(format!(
                "grid has {} combinations, limit is {}",
                combinations, max_combinations
            )));
        }

        Ok(Self {
            grid,
            epochs,
            seed,
            parallel: false,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn grid(&self) -> &WeightGrid {
        &self.grid
    }

    /// Score every combination, best (lowest MAPE) first
    pub fn run(&self, base: &CaseBase) -> Result<Vec<TuningResult>> {
        self.check_base(base)?;

        let sets = self.grid.weight_sets();
        tracing::info!(
            combinations = sets.len(),
            epochs = self.epochs,
            parallel = self.parallel,
            "Starting weight grid search"
        );

        let mut results = if self.parallel {
            sets.into_par_iter()
                .map(|weights| self.score(base, weights))
                .collect::<Result<Vec<_>>>()?
        } else {
            sets.into_iter()
                .map(|weights| self.score(base, weights))
                .collect::<Result<Vec<_>>>()?
        };

        results.sort_by(|a, b| a.mape.total_cmp(&b.mape));

        if let Some(best) = results.first() {
            tracing::info!(
                mape = best.mape,
                rooms = best.weights.rooms,
                surface = best.weights.surface,
                lot = best.weights.lot,
                "Grid search finished"
            );
        }

        Ok(results)
    }

    /// Every combination scores the same ranked locations, so one check
    /// covers the whole grid.
    fn check_base(&self, base: &CaseBase) -> Result<()> {
        for case in base.cases() {
            if !self.grid.location_ranking.contains(&case.location) {
                return Err(Error::config(format!(
                    "location ranking does not list {:?}, which appears in the case base",
                    case.location
                )));
            }
        }

        let weights = WeightSet {
            location: self
                .grid
                .location_ranking
                .iter()
                .map(|name| (name.clone(), 0.0))
                .collect(),
            ..Default::default()
        };
        let profile = Profile::from_weights(&weights)?;
        Evaluator::new(base, &profile, self.seed).check_base()
    }

    fn score(&self, base: &CaseBase, weights: WeightSet) -> Result<TuningResult> {
        let profile = Profile::from_weights(&weights)?;
        let report = Evaluator::new(base, &profile, self.seed).run(self.epochs)?;

        tracing::debug!(
            mape = report.mape,
            rooms = weights.rooms,
            surface = weights.surface,
            lot = weights.lot,
            "Scored weight combination"
        );

        Ok(TuningResult {
            weights,
            mape: report.mape,
        })
    }
}
