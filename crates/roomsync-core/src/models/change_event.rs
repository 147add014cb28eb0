//! Transient change events produced by the diff step

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Dates the feed now reports as occupied
    BecameBlocked,
    /// Dates that were occupied or blocked and are now free
    BecameAvailable,
}

/// A contiguous date range of one unit that changed in one direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub unit_id: String,
    /// First changed date (inclusive)
    pub start: NaiveDate,
    /// Last changed date (inclusive)
    pub end: NaiveDate,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Number of nights covered by the range
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}
