//! Property model

use serde::{Deserialize, Serialize};

/// A rentable property whose availability may be fed by an external calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    /// Display name
    pub name: String,
    /// User who owns the property
    pub owner_id: String,
    /// Identifier of the property in the upstream feed; `None` means not sync-enabled
    pub external_id: Option<String>,
    /// Completion time of the last successful sync (Unix ms)
    pub last_synced_at: Option<i64>,
    /// Persisted guard flag; only the sync coordinator changes it
    pub sync_in_progress: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Property {
    /// Create a new, never-synced property
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            external_id,
            last_synced_at: None,
            sync_in_progress: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Whether the property has a feed to sync from
    #[must_use]
    pub fn is_sync_enabled(&self) -> bool {
        self.external_id
            .as_deref()
            .is_some_and(|external_id| !external_id.trim().is_empty())
    }

    /// Whether no sync has ever completed for this property
    #[must_use]
    pub const fn is_first_sync(&self) -> bool {
        self.last_synced_at.is_none()
    }
}
