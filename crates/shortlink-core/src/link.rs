use crate::normalize::normalize;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Click deltas or totals keyed by short display name.
///
/// Passed to [`Storage::save_stats`](crate::Storage::save_stats) it holds the
/// clicks observed since the previous flush. Returned from
/// [`ReadStorage::load_stats`](crate::ReadStorage::load_stats) it holds the
/// running total per link.
pub type ClickStats = HashMap<String, u64>;

/// A short link as stored by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Display name the link was created with, e.g. `Team-Docs`.
    pub short: String,
    /// Destination address.
    pub long: String,
    pub created: Timestamp,
    pub last_edit: Timestamp,
    pub owner: String,
}

impl Link {
    /// Creates a link whose creation and last edit time are both `at`.
    pub fn new(
        short: impl Into<String>,
        long: impl Into<String>,
        owner: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            short: short.into(),
            long: long.into(),
            created: at,
            last_edit: at,
            owner: owner.into(),
        }
    }

    /// Returns the normalized storage key of this link.
    pub fn key(&self) -> String {
        normalize(&self.short)
    }
}

/// Converts a timestamp to whole epoch seconds.
///
/// Sub-second precision is dropped; storage keeps seconds only.
pub fn to_epoch_seconds(ts: Timestamp) -> i64 {
    ts.as_second()
}

/// Converts whole epoch seconds back to a timestamp.
///
/// Returns `None` when `seconds` is outside the range jiff supports.
pub fn from_epoch_seconds(seconds: i64) -> Option<Timestamp> {
    Timestamp::from_second(seconds).ok()
}
