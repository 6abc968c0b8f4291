use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{
    DEFAULT_EVENT_RATE, DEFAULT_SEVERITY_SCALE, DEFAULT_SEVERITY_SHAPE, DEFAULT_TRIAL_COUNT,
};
use crate::draws::{self, DrawProvider};
use crate::error::{Error, Result};
use crate::types::Trial;

/// Trials per random stream. Fixed so that sequential and parallel runs
/// partition the trials identically and therefore agree bit-for-bit.
pub const BLOCK_TRIALS: usize = 1_024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Number of simulated years.
    pub trial_count: usize,
    /// Poisson λ: expected number of events per year.
    pub event_rate: f64,
    /// Pareto tail index α. The mean annual loss is infinite for α ≤ 1.
    pub severity_shape: f64,
    /// Minimum cost of a single event.
    pub severity_scale: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            trial_count: DEFAULT_TRIAL_COUNT,
            event_rate: DEFAULT_EVENT_RATE,
            severity_shape: DEFAULT_SEVERITY_SHAPE,
            severity_scale: DEFAULT_SEVERITY_SCALE,
        }
    }
}

impl SimulationParameters {
    /// Reject anything outside the documented domain.
    ///
    /// A shape in (0, 1] is accepted but logged: the severity mean is
    /// infinite there and sample averages will not converge.
    pub fn validate(&self) -> Result<()> {
        if self.trial_count == 0 {
            return Err(Error::invalid("trial_count", "must be a positive integer"));
        }
        draws::check_event_rate(self.event_rate)?;
        draws::check_severity(self.severity_shape, self.severity_scale)?;
        if self.severity_shape <= 1.0 {
            warn!(
                severity_shape = self.severity_shape,
                "severity shape <= 1: Pareto mean is infinite, averages will not converge"
            );
        }
        Ok(())
    }

    /// E[cost per event] = scale * shape / (shape − 1); `None` when infinite.
    pub fn expected_severity(&self) -> Option<f64> {
        (self.severity_shape > 1.0)
            .then(|| self.severity_scale * self.severity_shape / (self.severity_shape - 1.0))
    }

    /// E[annual gross loss] = λ * E[cost per event] (compound Poisson).
    pub fn expected_annual_loss(&self) -> Option<f64> {
        if self.event_rate == 0.0 {
            return Some(0.0);
        }
        self.expected_severity().map(|s| self.event_rate * s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    #[default]
    Sequential,
    /// Trial blocks fan out over the rayon pool.
    Parallel,
}

/// What happens when an annual sum leaves the representable range.
///
/// With α close to 1 single events can be astronomically large, and their
/// sum can overflow to +∞.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Clamp the annual loss to `f64::MAX`. Summary means stay finite.
    #[default]
    Saturate,
    /// Keep +∞; downstream means become infinite.
    Propagate,
    /// Fail the run with `Error::NumericOverflow`.
    Reject,
}

/// One simulated year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub trial: Trial,
    pub event_count: u64,
    pub gross_loss: f64,
}

/// Monte Carlo generator of annual aggregate gross losses.
#[derive(Debug, Clone)]
pub struct LossSimulator {
    params: SimulationParameters,
    seed: u64,
    execution: Execution,
    overflow: OverflowPolicy,
}

impl LossSimulator {
    pub fn new(params: SimulationParameters) -> Self {
        LossSimulator {
            params,
            seed: 0,
            execution: Execution::default(),
            overflow: OverflowPolicy::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_overflow_policy(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Simulate `trial_count` independent years, returned in trial order.
    ///
    /// Parameters are validated before any draw; on error nothing is returned.
    pub fn run(&self) -> Result<Vec<TrialOutcome>> {
        self.params.validate()?;

        let started = Instant::now();
        let blocks = self.params.trial_count.div_ceil(BLOCK_TRIALS);
        let per_block: Vec<Vec<TrialOutcome>> = match self.execution {
            Execution::Sequential => (0..blocks).map(|b| self.simulate_block(b)).collect::<Result<_>>()?,
            Execution::Parallel => {
                (0..blocks).into_par_iter().map(|b| self.simulate_block(b)).collect::<Result<_>>()?
            }
        };
        let outcomes: Vec<TrialOutcome> = per_block.into_iter().flatten().collect();

        debug!(
            trials = outcomes.len(),
            blocks,
            seed = self.seed,
            execution = ?self.execution,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loss simulation complete"
        );
        Ok(outcomes)
    }

    fn simulate_block(&self, block: usize) -> Result<Vec<TrialOutcome>> {
        let start = block * BLOCK_TRIALS;
        let end = (start + BLOCK_TRIALS).min(self.params.trial_count);
        let mut draws = DrawProvider::for_stream(self.seed, block as u64);

        let counts = draws.draw_event_counts(self.params.event_rate, end - start)?;
        counts
            .into_iter()
            .enumerate()
            .map(|(i, event_count)| {
                let trial = Trial((start + i) as u64);
                // A quiet year is exactly zero and never touches the severity stream.
                let gross_loss = if event_count == 0 {
                    0.0
                } else {
                    let costs = draws.draw_severities(
                        self.params.severity_shape,
                        self.params.severity_scale,
                        event_count as usize,
                    )?;
                    settle_annual_loss(self.overflow, trial, costs.iter().sum())?
                };
                Ok(TrialOutcome { trial, event_count, gross_loss })
            })
            .collect()
    }
}

/// Single-shot form of `LossSimulator::new(params).with_seed(seed).run()`.
pub fn simulate(params: &SimulationParameters, seed: u64) -> Result<Vec<TrialOutcome>> {
    LossSimulator::new(*params).with_seed(seed).run()
}

/// Apply `policy` to one annual sum.
pub fn settle_annual_loss(policy: OverflowPolicy, trial: Trial, total: f64) -> Result<f64> {
    if total.is_finite() {
        return Ok(total);
    }
    match policy {
        OverflowPolicy::Saturate => {
            warn!(%trial, "annual loss overflowed, saturating to f64::MAX");
            Ok(f64::MAX)
        }
        OverflowPolicy::Propagate => {
            warn!(%trial, "annual loss overflowed, propagating infinity");
            Ok(total)
        }
        OverflowPolicy::Reject => Err(Error::NumericOverflow { trial }),
    }
}
