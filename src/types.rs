use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based index of a simulated year. Trials are emitted in index order
/// regardless of how they were scheduled across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Trial(pub u64);

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
