//! User-facing availability change notifications

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ChangeKind;

/// A unique identifier for a notification, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Create a new unique notification ID using UUID v7
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

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Change type shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Available,
    Blocked,
}

impl ChangeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Blocked => "blocked",
        }
    }
}

impl From<ChangeKind> for ChangeType {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::BecameAvailable => Self::Available,
            ChangeKind::BecameBlocked => Self::Blocked,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown change type '{other}'")),
        }
    }
}

/// Persisted notification about a date range that changed availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    /// Recipient
    pub user_id: String,
    pub property_id: String,
    pub unit_id: String,
    /// Property display name at emission time
    pub property_name: String,
    /// Unit display name at emission time
    pub unit_name: String,
    pub change_type: ChangeType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_read: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Notification {
    /// Human-readable one-line message
    #[must_use]
    pub fn message(&self) -> String {
        let verb = match self.change_type {
            ChangeType::Available => "became available",
            ChangeType::Blocked => "was booked",
        };
        if self.start_date == self.end_date {
            format!(
                "{} / {} {verb} on {}",
                self.property_name, self.unit_name, self.start_date
            )
        } else {
            format!(
                "{} / {} {verb} from {} to {}",
                self.property_name, self.unit_name, self.start_date, self.end_date
            )
        }
    }
}
