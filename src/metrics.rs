use serde::Serialize;

use crate::error::{Error, Result};
use crate::treaty::TreatyParameters;

/// Percentile of the 1-in-100 year loss.
pub const PML_100_PERCENTILE: f64 = 99.0;
/// Percentile of the 1-in-250 year loss, the Canadian regulatory capital standard.
pub const PML_250_PERCENTILE: f64 = 99.6;

// ── Percentiles & return periods ────────────────────────────────────────────

/// p-th percentile of an ascending-sorted slice; `None` when it is empty.
///
/// Linear interpolation between closest ranks: `h = p/100 · (n − 1)`, the
/// NumPy default. Written as `lo + (hi − lo)·frac` so saturated and infinite
/// samples never produce NaN. `p` outside [0, 100] is pinned to the nearest
/// end of the sample.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let h = (p / 100.0 * last as f64).clamp(0.0, last as f64);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = h - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    if frac == 0.0 || a == b {
        Some(a)
    } else {
        Some(a + (b - a) * frac)
    }
}

/// Arithmetic mean that does not overflow on saturated samples.
///
/// A sum past `f64::MAX` is redone as a sum of `x / n`, which stays finite
/// unless a term is itself infinite.
fn mean(values: impl Iterator<Item = f64> + Clone, n: f64) -> f64 {
    let total: f64 = values.clone().sum();
    if total.is_finite() || total.is_nan() {
        return total / n;
    }
    if values.clone().any(f64::is_infinite) {
        return total;
    }
    values.map(|x| x / n).sum::<f64>().min(f64::MAX)
}

/// Average years between exceedances of the p-th percentile: 100 / (100 − p).
pub fn return_period(p: f64) -> f64 {
    100.0 / (100.0 - p)
}

/// Inverse of [`return_period`]: 250 years → 99.6.
pub fn percentile_for_return_period(years: f64) -> Result<f64> {
    if !years.is_finite() || years < 1.0 {
        return Err(Error::invalid("return_period", format!("must be >= 1 year, got {years}")));
    }
    Ok(100.0 * (1.0 - 1.0 / years))
}

fn check_percentile(p: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&p) {
        return Err(Error::invalid("percentile", format!("must lie in [0, 100], got {p}")));
    }
    Ok(())
}

// ── Exceedance curves ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExceedancePoint {
    pub loss: f64,
    /// Empirical annual probability of meeting or exceeding `loss`.
    pub probability: f64,
}

/// Empirical exceedance-probability curve of one series.
///
/// Points are sorted by descending loss; the i-th point (1-indexed) carries
/// probability i / n.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceedanceCurve {
    points: Vec<ExceedancePoint>,
}

impl ExceedanceCurve {
    pub fn from_series(series: &[f64]) -> Self {
        let mut sorted = series.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let n = sorted.len() as f64;
        let points = sorted
            .into_iter()
            .enumerate()
            .map(|(i, loss)| ExceedancePoint { loss, probability: (i + 1) as f64 / n })
            .collect();
        ExceedanceCurve { points }
    }

    pub fn points(&self) -> &[ExceedancePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn losses(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.loss)
    }

    pub fn probabilities(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.probability)
    }

    /// Fraction of years whose value is at least `loss`.
    pub fn exceedance_probability(&self, loss: f64) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let at_or_above = self.points.partition_point(|p| p.loss >= loss);
        at_or_above as f64 / self.points.len() as f64
    }
}

// ── Summary ─────────────────────────────────────────────────────────────────

/// Scalar risk view of one simulated layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub trial_count: usize,
    pub limit: f64,
    /// Mean payout, a.k.a. AAL or burn cost.
    pub expected_payout: f64,
    /// Fraction of years with any payout.
    pub attachment_probability: f64,
    /// Fraction of years paying the full limit.
    pub exhaustion_probability: f64,
    pub pml_100: f64,
    pub pml_250: f64,
    pub mean_gross_loss: f64,
    pub mean_net_loss: f64,
    #[serde(skip)]
    sorted_gross: Vec<f64>,
}

impl RiskSummary {
    /// Gross loss at percentile `p` of the annual distribution.
    pub fn pml_at(&self, p: f64) -> Result<f64> {
        check_percentile(p)?;
        percentile(&self.sorted_gross, p).ok_or(Error::EmptySample)
    }

    /// Gross loss exceeded on average once every `years`.
    pub fn pml_for_return_period(&self, years: f64) -> Result<f64> {
        self.pml_at(percentile_for_return_period(years)?)
    }

    pub fn median_gross_loss(&self) -> Result<f64> {
        self.pml_at(50.0)
    }

    /// Does the layer reach the 1-in-250 gross loss?
    pub fn protection(&self, treaty: &TreatyParameters) -> Protection {
        let top = treaty.exhaustion_point();
        if top >= self.pml_250 {
            Protection::Adequate { headroom: top - self.pml_250 }
        } else {
            Protection::UnderProtected { shortfall: self.pml_250 - top }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Protection {
    /// Exhaustion point sits at or above the 1-in-250 PML.
    Adequate { headroom: f64 },
    /// The 1-in-250 loss pierces the top of the layer by `shortfall`.
    UnderProtected { shortfall: f64 },
}

/// Reduce per-trial gross losses and payouts of a layer with `limit` to a
/// [`RiskSummary`]. Recomputed from scratch on every call.
pub fn summarize(gross: &[f64], payouts: &[f64], limit: f64) -> Result<RiskSummary> {
    if gross.len() != payouts.len() {
        return Err(Error::LengthMismatch { gross: gross.len(), payouts: payouts.len() });
    }
    if gross.is_empty() {
        return Err(Error::EmptySample);
    }

    let n = gross.len() as f64;
    let fraction = |pred: fn(f64, f64) -> bool| {
        payouts.iter().filter(|&&x| pred(x, limit)).count() as f64 / n
    };

    let mut sorted_gross = gross.to_vec();
    sorted_gross.sort_by(f64::total_cmp);

    let pml_100 = percentile(&sorted_gross, PML_100_PERCENTILE).ok_or(Error::EmptySample)?;
    let pml_250 = percentile(&sorted_gross, PML_250_PERCENTILE).ok_or(Error::EmptySample)?;
    let nets = gross.iter().zip(payouts).map(|(g, p)| g - p);

    Ok(RiskSummary {
        trial_count: gross.len(),
        limit,
        expected_payout: mean(payouts.iter().copied(), n),
        attachment_probability: fraction(|x, _| x > 0.0),
        exhaustion_probability: fraction(|x, limit| x == limit),
        pml_100,
        pml_250,
        mean_gross_loss: mean(gross.iter().copied(), n),
        mean_net_loss: mean(nets, n),
        sorted_gross,
    })
}
