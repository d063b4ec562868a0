//! Unix timestamp with sub-second precision, as used on the wire.

use crate::unix_now;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Seconds since the Unix epoch, sub-second precision, as an `f64`.
///
/// `collected_at`, `received_at`, and retry-eligibility scores are all this
/// type — the pipeline never sorts or compares on anything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(f64);

impl UnixTimestamp {
    pub fn now() -> Self {
        Self(unix_now())
    }

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}

impl Eq for UnixTimestamp {}

impl Ord for UnixTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for UnixTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add<f64> for UnixTimestamp {
    type Output = UnixTimestamp;

    fn add(self, rhs: f64) -> Self::Output {
        UnixTimestamp(self.0 + rhs)
    }
}

impl fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
