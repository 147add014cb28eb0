//! Unit model

use serde::{Deserialize, Serialize};

/// A bookable unit (room, apartment, room type) inside a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub property_id: String,
    /// Display name
    pub name: String,
    /// Identifier assigned by the upstream feed
    pub external_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Unit {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        property_id: impl Into<String>,
        name: impl Into<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            property_id: property_id.into(),
            name: name.into(),
            external_id,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
