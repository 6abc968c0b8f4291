use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use catxl::config::ModelConfig;
use catxl::draws::DrawProvider;
use catxl::metrics::{self, ExceedanceCurve};
use catxl::simulation::{Execution, LossSimulator, SimulationParameters};
use catxl::treaty::{self, TreatyParameters};

fn params(trial_count: usize) -> SimulationParameters {
    SimulationParameters { trial_count, ..SimulationParameters::default() }
}

// ── Group 1: draws — raw severity sampling ──────────────────────────────────

fn bench_draws(c: &mut Criterion) {
    let mut group = c.benchmark_group("draws");
    for &count in &[1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            b.iter_batched(
                || DrawProvider::from_seed(42),
                |mut draws| draws.draw_severities(1.5, 50.0, n),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// ── Group 2: simulate — trial count scaling, sequential vs parallel ─────────

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    group.sample_size(20);
    for &trials in &[10_000usize, 100_000] {
        group.throughput(Throughput::Elements(trials as u64));
        for (name, execution) in [("sequential", Execution::Sequential), ("parallel", Execution::Parallel)] {
            group.bench_with_input(BenchmarkId::new(name, trials), &trials, |b, &n| {
                let sim = LossSimulator::new(params(n)).with_seed(42).with_execution(execution);
                b.iter(|| sim.run())
            });
        }
    }
    group.finish();
}

// ── Group 3: assess — layer + metrics over a fixed sample ───────────────────

fn bench_assess(c: &mut Criterion) {
    let mut group = c.benchmark_group("assess");
    let trials = LossSimulator::new(params(100_000)).with_seed(42).run().expect("simulation");
    let gross: Vec<f64> = trials.iter().map(|t| t.gross_loss).collect();
    let treaty = TreatyParameters::default();
    group.throughput(Throughput::Elements(gross.len() as u64));

    group.bench_function("apply", |b| b.iter(|| treaty::apply(&trials, &treaty)));

    let layer = treaty::apply(&trials, &treaty).expect("valid layer");
    let payouts: Vec<f64> = layer.iter().map(|o| o.payout).collect();
    group.bench_function("summarize", |b| b.iter(|| metrics::summarize(&gross, &payouts, treaty.limit)));
    group.bench_function("exceedance_curve", |b| b.iter(|| ExceedanceCurve::from_series(&gross)));
    group.finish();
}

// ── Group 4: end_to_end — canonical dashboard run ───────────────────────────

fn bench_end_to_end(c: &mut Criterion) {
    let config = ModelConfig::canonical();
    c.bench_function("end_to_end/canonical", |b| b.iter(|| catxl::run::run(&config)));
}

criterion_group!(benches, bench_draws, bench_simulate, bench_assess, bench_end_to_end);
criterion_main!(benches);
