use rayon::prelude::*;
use serde::Serialize;

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::metrics::{percentile, RiskSummary};
use crate::run;

/// Distribution statistics for a continuous metric across N seeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

fn percentile_stats(values: &mut [f64]) -> Option<DistStats> {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let p5 = percentile(values, 5.0)?;
    let p50 = percentile(values, 50.0)?;
    let p95 = percentile(values, 95.0)?;

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };

    Some(DistStats {
        n,
        min: values[0],
        p5,
        p50,
        p95,
        max: values[n - 1],
        mean,
        std_dev: variance.sqrt(),
    })
}

/// Seed-to-seed spread of the headline metrics: how much of a number is
/// sampling noise at the configured trial count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedDispersion {
    pub seeds: Vec<u64>,
    pub expected_payout: DistStats,
    pub attachment_probability: DistStats,
    pub pml_100: DistStats,
    pub pml_250: DistStats,
}

/// Run `config` once per seed (in parallel) and return the per-seed summaries
/// in seed order.
pub fn run_seeds(config: &ModelConfig, seeds: &[u64]) -> Result<Vec<RiskSummary>> {
    seeds
        .par_iter()
        .map(|&seed| {
            let mut config = config.clone();
            config.seed = seed;
            run::run(&config).map(|r| r.summary)
        })
        .collect()
}

/// Cross-seed distributions of the per-seed summaries.
///
/// Requires at least two summaries; one seed says nothing about spread.
pub fn seed_dispersion(seeds: &[u64], summaries: &[RiskSummary]) -> Result<SeedDispersion> {
    if summaries.len() < 2 {
        return Err(Error::invalid("runs", format!("need at least 2 seeds, got {}", summaries.len())));
    }
    if seeds.len() != summaries.len() {
        return Err(Error::invalid(
            "seeds",
            format!("{} seeds for {} summaries", seeds.len(), summaries.len()),
        ));
    }

    let stats = |f: fn(&RiskSummary) -> f64| {
        let mut values: Vec<f64> = summaries.iter().map(f).collect();
        percentile_stats(&mut values).ok_or(Error::EmptySample)
    };

    Ok(SeedDispersion {
        seeds: seeds.to_vec(),
        expected_payout: stats(|s| s.expected_payout)?,
        attachment_probability: stats(|s| s.attachment_probability)?,
        pml_100: stats(|s| s.pml_100)?,
        pml_250: stats(|s| s.pml_250)?,
    })
}
