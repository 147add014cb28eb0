//! Per-date availability model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Surrogate identifier of an availability row, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Stored status of a unit on a calendar date.
///
/// A date without a stored record is `Available` by convention; the store
/// only holds exceptions to full availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    /// Free to book
    #[default]
    Available,
    /// Occupied by a reservation (set by the feed)
    Booked,
    /// Closed manually from the dashboard
    Blocked,
}

impl AvailabilityStatus {
    /// Column value used by the store
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown availability status '{other}'")),
        }
    }
}

/// Stored availability exception for one unit on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// Row identity used for update-by-identity
    pub id: RecordId,
    /// Owning unit
    pub unit_id: String,
    /// Calendar date
    pub date: NaiveDate,
    /// Status on that date
    pub status: AvailabilityStatus,
    /// Opaque reservation reference, never cleared by reconciliation
    pub reservation_id: Option<String>,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl AvailabilityRecord {
    /// Create a record with a fresh identity
    #[must_use]
    pub fn new(unit_id: impl Into<String>, date: NaiveDate, status: AvailabilityStatus) -> Self {
        Self {
            id: RecordId::new(),
            unit_id: unit_id.into(),
            date,
            status,
            reservation_id: None,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Attach a reservation reference
    #[must_use]
    pub fn with_reservation(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }
}
