use serde::Serialize;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::metrics::{self, ExceedanceCurve, RiskSummary};
use crate::simulation::{LossSimulator, TrialOutcome};
use crate::treaty::{self, TreatyOutcome, TreatyParameters};
use crate::types::Trial;

/// One trial's full record, as written to the per-trial NDJSON log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial: Trial,
    pub event_count: u64,
    pub gross_loss: f64,
    pub payout: f64,
    pub net_loss: f64,
}

/// Exceedance curves of the three per-trial series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curves {
    pub gross: ExceedanceCurve,
    pub payout: ExceedanceCurve,
    pub net: ExceedanceCurve,
}

/// Everything a run produces. Per-trial vectors stay in trial-index order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub config: ModelConfig,
    pub trials: Vec<TrialOutcome>,
    pub layer: Vec<TreatyOutcome>,
    pub summary: RiskSummary,
    pub curves: Curves,
}

impl RunResult {
    pub fn gross_losses(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.gross_loss).collect()
    }

    pub fn payouts(&self) -> Vec<f64> {
        self.layer.iter().map(|o| o.payout).collect()
    }

    pub fn net_losses(&self) -> Vec<f64> {
        self.layer.iter().map(|o| o.net_loss).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = TrialRecord> + '_ {
        self.trials.iter().zip(&self.layer).map(|(t, o)| TrialRecord {
            trial: t.trial,
            event_count: t.event_count,
            gross_loss: t.gross_loss,
            payout: o.payout,
            net_loss: o.net_loss,
        })
    }

    /// Re-price a different layer against the same simulated years.
    pub fn with_treaty(&self, treaty: TreatyParameters) -> Result<RunResult> {
        let (layer, summary, curves) = assess(&self.trials, &treaty)?;
        let mut config = self.config.clone();
        config.treaty = treaty;
        Ok(RunResult { config, trials: self.trials.clone(), layer, summary, curves })
    }
}

/// Simulate, apply the layer and summarise, all from `config`.
pub fn run(config: &ModelConfig) -> Result<RunResult> {
    // Layer first; the simulator checks its own parameters.
    config.treaty.validate()?;
    info!(
        seed = config.seed,
        trials = config.simulation.trial_count,
        event_rate = config.simulation.event_rate,
        severity_shape = config.simulation.severity_shape,
        severity_scale = config.simulation.severity_scale,
        retention = config.treaty.retention,
        limit = config.treaty.limit,
        "starting treaty simulation"
    );

    let trials = LossSimulator::new(config.simulation)
        .with_seed(config.seed)
        .with_execution(config.execution)
        .with_overflow_policy(config.overflow)
        .run()?;
    let (layer, summary, curves) = assess(&trials, &config.treaty)?;

    Ok(RunResult { config: config.clone(), trials, layer, summary, curves })
}

/// Apply `treaty` to already-simulated years and derive every metric.
pub fn assess(
    trials: &[TrialOutcome],
    treaty: &TreatyParameters,
) -> Result<(Vec<TreatyOutcome>, RiskSummary, Curves)> {
    let layer = treaty::apply(trials, treaty)?;

    let gross: Vec<f64> = trials.iter().map(|t| t.gross_loss).collect();
    let payouts: Vec<f64> = layer.iter().map(|o| o.payout).collect();
    let nets: Vec<f64> = layer.iter().map(|o| o.net_loss).collect();

    let summary = metrics::summarize(&gross, &payouts, treaty.limit)?;
    let curves = Curves {
        gross: ExceedanceCurve::from_series(&gross),
        payout: ExceedanceCurve::from_series(&payouts),
        net: ExceedanceCurve::from_series(&nets),
    };

    debug!(
        expected_payout = summary.expected_payout,
        attachment_probability = summary.attachment_probability,
        exhaustion_probability = summary.exhaustion_probability,
        pml_100 = summary.pml_100,
        pml_250 = summary.pml_250,
        "layer assessed"
    );
    Ok((layer, summary, curves))
}
