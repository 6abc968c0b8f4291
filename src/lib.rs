pub mod analysis;
pub mod config;
pub mod draws;
pub mod error;
pub mod metrics;
pub mod run;
pub mod simulation;
pub mod treaty;
pub mod types;

pub use error::{Error, Result};
