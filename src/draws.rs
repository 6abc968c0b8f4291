use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Pareto, Poisson};

use crate::error::{Error, Result};

/// Owned source of frequency and severity draws.
///
/// Wraps a ChaCha20 generator keyed by `(seed, stream)`. Providers built from
/// the same seed but different streams produce independent sequences, which
/// is what lets trial blocks run on separate threads without sharing state.
#[derive(Debug, Clone)]
pub struct DrawProvider {
    rng: ChaCha20Rng,
    seed: u64,
    stream: u64,
}

impl DrawProvider {
    pub fn from_seed(seed: u64) -> Self {
        Self::for_stream(seed, 0)
    }

    pub fn for_stream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        DrawProvider { rng, seed, stream }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// `n` independent Poisson(`rate`) event counts.
    ///
    /// A zero rate is degenerate but valid: it yields `n` zeros and consumes
    /// nothing from the stream.
    pub fn draw_event_counts(&mut self, rate: f64, n: usize) -> Result<Vec<u64>> {
        check_event_rate(rate)?;
        if rate == 0.0 {
            return Ok(vec![0; n]);
        }
        let poisson = Poisson::new(rate).map_err(|e| Error::invalid("event_rate", e.to_string()))?;
        Ok((0..n)
            .map(|_| {
                let count: f64 = poisson.sample(&mut self.rng);
                count as u64
            })
            .collect())
    }

    /// `count` independent per-event costs, each `(Lomax(shape) + 1) * scale`.
    ///
    /// That shifted Lomax is the classical Pareto with minimum `scale` and
    /// tail index `shape`, so every cost is at least `scale`.
    /// E[X] = scale * shape / (shape − 1), finite only for shape > 1.
    pub fn draw_severities(&mut self, shape: f64, scale: f64, count: usize) -> Result<Vec<f64>> {
        check_severity(shape, scale)?;
        let pareto =
            Pareto::new(scale, shape).map_err(|e| Error::invalid("severity_shape", e.to_string()))?;
        Ok((&mut self.rng).sample_iter(pareto).take(count).collect())
    }
}

pub(crate) fn check_event_rate(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(Error::invalid("event_rate", format!("must be finite and >= 0, got {rate}")));
    }
    Ok(())
}

pub(crate) fn check_severity(shape: f64, scale: f64) -> Result<()> {
    if !shape.is_finite() || shape <= 0.0 {
        return Err(Error::invalid("severity_shape", format!("must be finite and > 0, got {shape}")));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::invalid("severity_scale", format!("must be finite and > 0, got {scale}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> DrawProvider {
        DrawProvider::from_seed(42)
    }

    /// λ=2.0 over 10k draws: the sample mean must lie in [1.9, 2.1].
    #[test]
    fn poisson_mean_is_reasonable() {
        let counts = provider().draw_event_counts(2.0, 10_000).unwrap();
        assert_eq!(counts.len(), 10_000);
        let mean = counts.iter().sum::<u64>() as f64 / counts.len() as f64;
        assert!((1.9..=2.1).contains(&mean), "mean annual count {mean:.3} outside [1.9, 2.1]");
    }

    #[test]
    fn zero_rate_yields_zero_counts_without_drawing() {
        let mut a = provider();
        let mut b = provider();
        assert_eq!(a.draw_event_counts(0.0, 5).unwrap(), vec![0; 5]);
        // Stream untouched: the next severity draw matches a fresh provider.
        assert_eq!(
            a.draw_severities(1.5, 50.0, 3).unwrap(),
            b.draw_severities(1.5, 50.0, 3).unwrap()
        );
    }

    #[test]
    fn severities_never_fall_below_scale() {
        let costs = provider().draw_severities(1.01, 50.0, 10_000).unwrap();
        assert!(costs.iter().all(|&c| c >= 50.0), "a cost fell below the scale");
    }

    /// Pareto(scale=50, shape=2.5): E[X] = 50 * 2.5 / 1.5 ≈ 83.3.
    /// 20k samples must land within ±10 % of that.
    #[test]
    fn severity_mean_in_expected_range() {
        let costs = provider().draw_severities(2.5, 50.0, 20_000).unwrap();
        let mean = costs.iter().sum::<f64>() / costs.len() as f64;
        let expected = 50.0 * 2.5 / 1.5;
        assert!(
            mean >= expected * 0.9 && mean <= expected * 1.1,
            "Pareto mean {mean:.2} outside ±10% of {expected:.2}"
        );
    }

    /// Lighter-tailed shape must give a lower 99th percentile from the same stream layout.
    #[test]
    fn smaller_shape_has_heavier_tail() {
        let n = 10_000usize;
        let mut heavy = DrawProvider::for_stream(7, 1).draw_severities(1.1, 50.0, n).unwrap();
        let mut light = DrawProvider::for_stream(7, 1).draw_severities(2.5, 50.0, n).unwrap();
        heavy.sort_by(f64::total_cmp);
        light.sort_by(f64::total_cmp);
        assert!(heavy[n * 99 / 100] > light[n * 99 / 100]);
    }

    #[test]
    fn same_seed_and_stream_reproduce() {
        let a = DrawProvider::for_stream(9, 3).draw_severities(1.5, 50.0, 100).unwrap();
        let b = DrawProvider::for_stream(9, 3).draw_severities(1.5, 50.0, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_streams_diverge() {
        let a = DrawProvider::for_stream(9, 0).draw_severities(1.5, 50.0, 100).unwrap();
        let b = DrawProvider::for_stream(9, 1).draw_severities(1.5, 50.0, 100).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_draws_are_empty() {
        let mut p = provider();
        assert!(p.draw_event_counts(2.0, 0).unwrap().is_empty());
        assert!(p.draw_severities(1.5, 50.0, 0).unwrap().is_empty());
    }

    #[test]
    fn invalid_parameters_are_rejected_not_clamped() {
        let mut p = provider();
        assert!(p.draw_event_counts(-0.1, 10).unwrap_err().is_invalid("event_rate"));
        assert!(p.draw_event_counts(f64::NAN, 10).unwrap_err().is_invalid("event_rate"));
        assert!(p.draw_severities(0.0, 50.0, 10).unwrap_err().is_invalid("severity_shape"));
        assert!(p.draw_severities(-1.5, 50.0, 10).unwrap_err().is_invalid("severity_shape"));
        assert!(p.draw_severities(1.5, 0.0, 10).unwrap_err().is_invalid("severity_scale"));
        assert!(p.draw_severities(1.5, -50.0, 10).unwrap_err().is_invalid("severity_scale"));
    }

    #[test]
    fn accessors_report_key() {
        let p = DrawProvider::for_stream(11, 4);
        assert_eq!(p.seed(), 11);
        assert_eq!(p.stream(), 4);
    }
}
