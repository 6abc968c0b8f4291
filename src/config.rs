use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::simulation::{Execution, OverflowPolicy, SimulationParameters};
use crate::treaty::TreatyParameters;

// ── Defaults ────────────────────────────────────────────────────────────────
// Monetary values are in millions; the defaults reproduce the dashboard's
// opening state.

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TRIAL_COUNT: usize = 10_000;
pub const DEFAULT_EVENT_RATE: f64 = 2.0;
pub const DEFAULT_SEVERITY_SHAPE: f64 = 1.5;
pub const DEFAULT_SEVERITY_SCALE: f64 = 50.0;
pub const DEFAULT_RETENTION: f64 = 400.0;
pub const DEFAULT_LIMIT: f64 = 2_800.0;

// ── Slider ranges offered to presentation layers ────────────────────────────
// Advisory only: validation accepts anything in the mathematical domain.

pub const EVENT_RATE_RANGE: RangeInclusive<f64> = 0.5..=5.0;
pub const SEVERITY_SHAPE_RANGE: RangeInclusive<f64> = 1.01..=2.5;

/// Everything one run needs: the loss model, the layer, and how to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub seed: u64,
    pub simulation: SimulationParameters,
    pub treaty: TreatyParameters,
    pub execution: Execution,
    pub overflow: OverflowPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ModelConfig {
    pub fn canonical() -> Self {
        ModelConfig {
            seed: DEFAULT_SEED,
            simulation: SimulationParameters::default(),
            treaty: TreatyParameters::default(),
            execution: Execution::Sequential,
            overflow: OverflowPolicy::Saturate,
        }
    }

    /// Parse a (possibly partial) JSON config; missing keys take canonical values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.display().to_string(), source })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.treaty.validate()
    }
}
