//! Property repository implementation

use crate::error::Result;
use crate::models::Property;
use libsql::{params, Connection};

use super::row::{optional_integer, optional_text, text_or_null};

/// Trait for property storage operations (async)
#[allow(async_fn_in_trait)]
pub trait PropertyRepository {
    /// Insert a property (import/CRUD collaborators and tests)
    async fn create(&self, property: &Property) -> Result<()>;

    /// Get a property by ID
    async fn get(&self, id: &str) -> Result<Option<Property>>;

    /// Atomically flip the guard flag from false to true.
    ///
    /// Returns `false` when the flag was already set or the property is missing.
    async fn try_begin_sync(&self, id: &str) -> Result<bool>;

    /// Clear the guard flag, stamping `last_synced_at` when `completed_at` is given
    async fn finish_sync(&self, id: &str, completed_at: Option<i64>) -> Result<()>;

    /// Clear a guard flag regardless of its state; returns whether it was set
    async fn force_release(&self, id: &str) -> Result<bool>;
}

/// libSQL implementation of `PropertyRepository`
pub struct LibSqlPropertyRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPropertyRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_property(row: &libsql::Row) -> Result<Property> {
        Ok(Property {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_id: row.get(2)?,
            external_id: optional_text(row, 3)?,
            last_synced_at: optional_integer(row, 4)?,
            sync_in_progress: row.get::<i64>(5)? != 0,
            created_at: row.get(6)?,
        })
    }
}

impl PropertyRepository for LibSqlPropertyRepository<'_> {
    async fn create(&self, property: &Property) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO properties (id, name, owner_id, external_id, last_synced_at, sync_in_progress, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    property.id.clone(),
                    property.name.clone(),
                    property.owner_id.clone(),
                    text_or_null(property.external_id.as_deref()),
                    property
                        .last_synced_at
                        .map_or(libsql::Value::Null, libsql::Value::Integer),
                    i64::from(property.sync_in_progress),
                    property.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Property>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, owner_id, external_id, last_synced_at, sync_in_progress, created_at
                 FROM properties WHERE id = ?",
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_property(&row)?)),
            None => Ok(None),
        }
    }

    async fn try_begin_sync(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE properties SET sync_in_progress = 1 WHERE id = ? AND sync_in_progress = 0",
                [id],
            )
            .await?;
        Ok(changed == 1)
    }

    async fn finish_sync(&self, id: &str, completed_at: Option<i64>) -> Result<()> {
        let changed = match completed_at {
            Some(timestamp) => {
                self.conn
                    .execute(
                        "UPDATE properties SET sync_in_progress = 0, last_synced_at = ? WHERE id = ?",
                        params![timestamp, id],
                    )
                    .await?
            }
            None => {
                self.conn
                    .execute(
                        "UPDATE properties SET sync_in_progress = 0 WHERE id = ?",
                        [id],
                    )
                    .await?
            }
        };

        if changed == 0 {
            return Err(crate::error::Error::NotFound(format!("property {id}")));
        }
        Ok(())
    }

    async fn force_release(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE properties SET sync_in_progress = 0 WHERE id = ? AND sync_in_progress = 1",
                [id],
            )
            .await?;
        Ok(changed == 1)
    }
}
