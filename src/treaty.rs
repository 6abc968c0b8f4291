use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_LIMIT, DEFAULT_RETENTION};
use crate::error::{Error, Result};
use crate::simulation::TrialOutcome;

/// Excess-of-loss layer: pays the part of an annual loss above `retention`,
/// up to `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatyParameters {
    pub retention: f64,
    pub limit: f64,
}

impl Default for TreatyParameters {
    fn default() -> Self {
        TreatyParameters { retention: DEFAULT_RETENTION, limit: DEFAULT_LIMIT }
    }
}

impl TreatyParameters {
    pub fn new(retention: f64, limit: f64) -> Result<Self> {
        let treaty = TreatyParameters { retention, limit };
        treaty.validate()?;
        Ok(treaty)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.retention.is_finite() || self.retention < 0.0 {
            return Err(Error::invalid(
                "retention",
                format!("must be finite and >= 0, got {}", self.retention),
            ));
        }
        if !self.limit.is_finite() || self.limit < 0.0 {
            return Err(Error::invalid("limit", format!("must be finite and >= 0, got {}", self.limit)));
        }
        Ok(())
    }

    /// Gross loss at which the layer is fully used.
    pub fn exhaustion_point(&self) -> f64 {
        self.retention + self.limit
    }

    /// Cession for one annual gross loss.
    ///
    /// Boundaries are decided by comparison, not by the subtraction, so a
    /// loss sitting exactly on the exhaustion point pays exactly `limit`.
    /// With continuous severities that is a probability-zero event, but the
    /// exhaustion count depends on it being exact.
    ///
    /// Assumes a validated layer; the public entry points are [`apply`] and
    /// [`apply_to_losses`].
    pub(crate) fn payout(&self, gross_loss: f64) -> f64 {
        if gross_loss <= self.retention {
            0.0
        } else if gross_loss >= self.exhaustion_point() {
            self.limit
        } else {
            (gross_loss - self.retention).max(0.0).min(self.limit)
        }
    }

    pub(crate) fn outcome(&self, gross_loss: f64) -> TreatyOutcome {
        let payout = self.payout(gross_loss);
        TreatyOutcome { payout, net_loss: gross_loss - payout }
    }
}

/// Per-trial split of the gross loss between the layer and the cedant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreatyOutcome {
    /// Amount ceded to the layer, in [0, limit].
    pub payout: f64,
    /// Amount retained: gross loss − payout.
    pub net_loss: f64,
}

/// Apply `treaty` to every trial, preserving order.
///
/// The layer is validated first, so literal or deserialised parameters that
/// bypassed [`TreatyParameters::new`] are rejected rather than priced.
pub fn apply(outcomes: &[TrialOutcome], treaty: &TreatyParameters) -> Result<Vec<TreatyOutcome>> {
    treaty.validate()?;
    Ok(outcomes.iter().map(|t| treaty.outcome(t.gross_loss)).collect())
}

/// Same as [`apply`] over a bare gross-loss series.
pub fn apply_to_losses(gross_losses: &[f64], treaty: &TreatyParameters) -> Result<Vec<TreatyOutcome>> {
    treaty.validate()?;
    Ok(gross_losses.iter().map(|&g| treaty.outcome(g)).collect())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::Trial;

    fn layer() -> TreatyParameters {
        TreatyParameters::new(400.0, 2_800.0).unwrap()
    }

    #[test]
    fn dashboard_layer_on_known_losses() {
        let out = apply_to_losses(&[0.0, 100.0, 500.0, 3_500.0], &layer()).unwrap();
        let payouts: Vec<f64> = out.iter().map(|o| o.payout).collect();
        let nets: Vec<f64> = out.iter().map(|o| o.net_loss).collect();
        assert_eq!(payouts, vec![0.0, 0.0, 100.0, 2_800.0]);
        assert_eq!(nets, vec![0.0, 100.0, 400.0, 700.0]);
    }

    #[test]
    fn loss_at_retention_pays_nothing() {
        assert_eq!(layer().payout(400.0), 0.0);
    }

    #[test]
    fn loss_at_exhaustion_point_pays_exact_limit() {
        assert_eq!(layer().payout(3_200.0), 2_800.0);

        // 0.1 + 0.2 != 0.3 in binary; the subtraction alone would miss the limit.
        let awkward = TreatyParameters::new(0.1, 0.2).unwrap();
        let point = awkward.exhaustion_point();
        assert_eq!(awkward.payout(point), 0.2);
        assert_eq!(awkward.payout(point * 2.0), 0.2);
    }

    #[test]
    fn zero_limit_never_pays() {
        let t = TreatyParameters::new(100.0, 0.0).unwrap();
        for g in [0.0, 50.0, 100.0, 1e9] {
            assert_eq!(t.payout(g), 0.0);
        }
    }

    #[test]
    fn infinite_loss_exhausts_layer() {
        let o = layer().outcome(f64::INFINITY);
        assert_eq!(o.payout, 2_800.0);
        assert_eq!(o.net_loss, f64::INFINITY);
    }

    #[test]
    fn apply_preserves_length_and_order() {
        let trials: Vec<TrialOutcome> = [3_500.0, 0.0, 500.0]
            .iter()
            .enumerate()
            .map(|(i, &g)| TrialOutcome { trial: Trial(i as u64), event_count: 1, gross_loss: g })
            .collect();
        let out = apply(&trials, &layer()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].payout, 2_800.0);
        assert_eq!(out[1].payout, 0.0);
        assert_eq!(out[2].payout, 100.0);
    }

    #[test]
    fn invalid_layers_are_rejected() {
        assert!(TreatyParameters::new(-1.0, 10.0).unwrap_err().is_invalid("retention"));
        assert!(TreatyParameters::new(1.0, -10.0).unwrap_err().is_invalid("limit"));
        assert!(TreatyParameters::new(f64::NAN, 10.0).unwrap_err().is_invalid("retention"));
        assert!(TreatyParameters::new(1.0, f64::INFINITY).unwrap_err().is_invalid("limit"));
    }

    #[test]
    fn unvalidated_layers_are_rejected_by_apply() {
        let trials = [TrialOutcome { trial: Trial(0), event_count: 1, gross_loss: 10.0 }];

        let negative = TreatyParameters { retention: 0.0, limit: -5.0 };
        assert!(apply(&trials, &negative).unwrap_err().is_invalid("limit"));
        assert!(apply_to_losses(&[10.0], &negative).unwrap_err().is_invalid("limit"));

        let nan = TreatyParameters { retention: 0.0, limit: f64::NAN };
        assert!(apply(&trials, &nan).unwrap_err().is_invalid("limit"));
        assert!(apply_to_losses(&[10.0], &nan).unwrap_err().is_invalid("limit"));

        let deserialised: TreatyParameters =
            serde_json::from_str(r#"{ "retention": -1.0, "limit": 100.0 }"#).unwrap();
        assert!(apply_to_losses(&[10.0], &deserialised).unwrap_err().is_invalid("retention"));
    }

    #[test]
    fn payout_does_not_panic_on_nan_limit() {
        let nan = TreatyParameters { retention: 0.0, limit: f64::NAN };
        // Never reachable through `apply`, but the per-loss path must not abort.
        let _ = nan.payout(10.0);
    }

    proptest! {
        #[test]
        fn payout_bounded_and_net_non_negative(
            gross in 0.0f64..1e7,
            retention in 0.0f64..1e6,
            limit in 0.0f64..1e6,
        ) {
            let t = TreatyParameters::new(retention, limit).unwrap();
            let o = t.outcome(gross);
            prop_assert!(o.payout >= 0.0);
            prop_assert!(o.payout <= limit);
            prop_assert!(o.net_loss >= 0.0);
            prop_assert_eq!(o.net_loss, gross - o.payout);
        }

        #[test]
        fn payout_monotone_in_gross(a in 0.0f64..1e5, b in 0.0f64..1e5) {
            let t = layer();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.payout(lo) <= t.payout(hi));
        }
    }
}
