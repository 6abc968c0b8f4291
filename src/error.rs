use thiserror::Error;

use crate::types::Trial;

/// Errors surfaced by the simulation, treaty and metrics stages.
///
/// Every error is raised before any output is produced: a run either
/// completes or returns one of these, never a partial result.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter lies outside its documented domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An annual loss summed to a non-finite value under `OverflowPolicy::Reject`.
    #[error("annual gross loss overflowed f64 in trial {trial}")]
    NumericOverflow { trial: Trial },

    #[error("cannot summarise an empty sample")]
    EmptySample,

    #[error("series length mismatch: {gross} gross losses vs {payouts} payouts")]
    LengthMismatch { gross: usize, payouts: usize },

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter { name, reason: reason.into() }
    }

    /// True for `InvalidParameter` errors naming `param`.
    pub fn is_invalid(&self, param: &str) -> bool {
        matches!(self, Error::InvalidParameter { name, .. } if *name == param)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
