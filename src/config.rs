use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::profile::{Profile, WeightSet};
use crate::tuning::{WeightGrid, WeightTuner};

const DEFAULT_EVALUATION_EPOCHS: usize = 100;
const DEFAULT_TUNING_EPOCHS: usize = 50;
const DEFAULT_SEED: u64 = 0x5eed;
const DEFAULT_MAX_COMBINATIONS: usize = 10_000;

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingSection,
    pub weights: WeightsSection,
    pub evaluation: EvaluationSection,
    pub tuning: TuningSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("CASEPRICE_CONFIG").unwrap_or_else(|_| "caseprice.toml".to_string());
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = config::Config::builder();

        if path.exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CASEPRICE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        Ok(config)
    }

    /// Validate the configured weights into a descriptor profile.
    pub fn profile(&self) -> Result<Profile> {
        let weights = self.weights.to_weight_set()?;
        Profile::from_weights(&weights).context("invalid [weights] configuration")
    }

    /// Validate the tuning grid; nothing is evaluated until `run`.
    pub fn tuner(&self) -> Result<WeightTuner> {
        let tuning = &self.tuning;
        let tuner = WeightTuner::new(
            tuning.grid.clone(),
            tuning.epochs,
            tuning.seed,
            tuning.max_combinations,
        )
        .context("invalid [tuning] configuration")?;

        Ok(tuner.with_parallel(tuning.parallel))
    }
}

/// Adaptation weights. Location scores are a list rather than a table so
/// that location names keep their case.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WeightsSection {
    pub location: Vec<LocationScore>,
    pub rooms: f64,
    pub surface: f64,
    pub lot: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LocationScore {
    pub name: String,
    pub score: f64,
}

impl WeightsSection {
    pub fn to_weight_set(&self) -> Result<WeightSet> {
        let mut location = HashMap::with_capacity(self.location.len());
        for entry in &self.location {
            if location.insert(entry.name.clone(), entry.score).is_some() {
                bail!("weights.location lists {:?} twice", entry.name);
            }
        }

        Ok(WeightSet {
            location,
            rooms: self.rooms,
            surface: self.surface,
            lot: self.lot,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationSection {
    pub epochs: usize,
    pub seed: u64,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EVALUATION_EPOCHS,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuningSection {
    pub grid: WeightGrid,
    pub epochs: usize,
    pub seed: u64,
    pub max_combinations: usize,
    pub parallel: bool,
}

impl Default for TuningSection {
    fn default() -> Self {
        Self {
            grid: WeightGrid::default(),
            epochs: DEFAULT_TUNING_EPOCHS,
            seed: DEFAULT_SEED,
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            parallel: false,
        }
    }
}
