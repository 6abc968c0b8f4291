use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catxl::analysis::{self, DistStats, SeedDispersion};
use catxl::config::ModelConfig;
use catxl::metrics::Protection;
use catxl::run::{self, RunResult};
use catxl::simulation::Execution;

/// Monte Carlo burn analysis of a catastrophe excess-of-loss layer.
#[derive(Parser)]
#[command(name = "catxl", author, version, about, long_about = None)]
struct Cli {
    /// JSON model config; missing keys take canonical values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of simulated years
    #[arg(short = 'n', long)]
    trials: Option<usize>,

    /// Poisson λ, events per year
    #[arg(long)]
    event_rate: Option<f64>,

    /// Pareto tail index α
    #[arg(long)]
    shape: Option<f64>,

    /// Minimum cost per event
    #[arg(long)]
    scale: Option<f64>,

    #[arg(long)]
    retention: Option<f64>,

    #[arg(long)]
    limit: Option<f64>,

    /// Spread trial blocks over all cores
    #[arg(long)]
    parallel: bool,

    /// Repeat over N consecutive seeds and report the spread
    #[arg(long)]
    runs: Option<u64>,

    /// Per-trial NDJSON output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exceedance curves as CSV
    #[arg(long)]
    curves: Option<PathBuf>,

    /// Print the summary as JSON instead of a table
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn model_config(&self) -> Result<ModelConfig> {
        let mut config = match &self.config {
            Some(path) => ModelConfig::from_path(path)?,
            None => ModelConfig::canonical(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(n) = self.trials {
            config.simulation.trial_count = n;
        }
        if let Some(rate) = self.event_rate {
            config.simulation.event_rate = rate;
        }
        if let Some(shape) = self.shape {
            config.simulation.severity_shape = shape;
        }
        if let Some(scale) = self.scale {
            config.simulation.severity_scale = scale;
        }
        if let Some(retention) = self.retention {
            config.treaty.retention = retention;
        }
        if let Some(limit) = self.limit {
            config.treaty.limit = limit;
        }
        if self.parallel {
            config.execution = Execution::Parallel;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.model_config()?;

    if let Some(n) = cli.runs {
        let seeds: Vec<u64> = (0..n).map(|i| config.seed.wrapping_add(i)).collect();
        let summaries = analysis::run_seeds(&config, &seeds)?;
        let dispersion = analysis::seed_dispersion(&seeds, &summaries)?;
        info!(runs = n, "multi-seed run complete");
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&dispersion)?);
        } else if !cli.quiet {
            print_dispersion(&dispersion, config.simulation.trial_count);
        }
        return Ok(());
    }

    let result = run::run(&config)?;

    if let Some(path) = &cli.output {
        write_trials_ndjson(&result, path)?;
        info!(path = %path.display(), trials = result.trials.len(), "wrote per-trial records");
    }
    if let Some(path) = &cli.curves {
        write_curves_csv(&result, path)?;
        info!(path = %path.display(), "wrote exceedance curves");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.summary)?);
    } else if !cli.quiet {
        print_summary(&result);
    }
    Ok(())
}

fn write_trials_ndjson(result: &RunResult, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in result.records() {
        serde_json::to_writer(&mut writer, &record)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_curves_csv(result: &RunResult, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "rank,probability,gross_loss,payout,net_loss")?;
    let c = &result.curves;
    for (i, ((g, p), n)) in c.gross.points().iter().zip(c.payout.points()).zip(c.net.points()).enumerate() {
        writeln!(w, "{},{:.8},{:.6},{:.6},{:.6}", i + 1, g.probability, g.loss, p.loss, n.loss)?;
    }
    w.flush()?;
    Ok(())
}

fn print_summary(result: &RunResult) {
    let s = &result.summary;
    let sim = &result.config.simulation;
    let treaty = &result.config.treaty;

    println!(
        "\n=== Layer {:.0} xs {:.0} (seed {}, {} years, λ={}, α={}, scale={}) ===",
        treaty.limit,
        treaty.retention,
        result.config.seed,
        s.trial_count,
        sim.event_rate,
        sim.severity_shape,
        sim.severity_scale,
    );
    println!("  Expected payout (AAL):  {:>12.2}", s.expected_payout);
    println!("  Attachment probability: {:>11.1}%", s.attachment_probability * 100.0);
    println!("  Exhaustion probability: {:>11.1}%", s.exhaustion_probability * 100.0);
    println!("  1-in-100 PML:           {:>12.1}", s.pml_100);
    println!("  1-in-250 PML:           {:>12.1}", s.pml_250);
    println!("  Mean gross loss:        {:>12.2}", s.mean_gross_loss);
    println!("  Mean net loss:          {:>12.2}", s.mean_net_loss);

    match s.protection(treaty) {
        Protection::Adequate { headroom } => {
            println!("\n  Exhaustion point covers the 1-in-250 PML ({headroom:.1} headroom).")
        }
        Protection::UnderProtected { shortfall } => println!(
            "\n  WARNING: 1-in-250 PML exceeds the exhaustion point by {shortfall:.1}; the cedant may be under-protected."
        ),
    }
}

fn print_dist_row(name: &str, ds: &DistStats, scale: f64) {
    println!(
        "{:<10} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2} | {:>10.2}",
        name,
        ds.min * scale,
        ds.p5 * scale,
        ds.p50 * scale,
        ds.p95 * scale,
        ds.max * scale,
        ds.mean * scale,
        ds.std_dev * scale,
    );
}

fn print_dispersion(d: &SeedDispersion, trial_count: usize) {
    println!("\n=== Multi-seed distribution (N={} seeds × {trial_count} years) ===", d.seeds.len());
    println!(
        "{:<10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
        "Metric", "min", "p5", "p50", "p95", "max", "mean", "stddev"
    );
    println!("{}", "-".repeat(10 + 7 * 13));
    print_dist_row("AAL", &d.expected_payout, 1.0);
    print_dist_row("Attach%", &d.attachment_probability, 100.0);
    print_dist_row("PML100", &d.pml_100, 1.0);
    print_dist_row("PML250", &d.pml_250, 1.0);
}
