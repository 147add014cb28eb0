//! Unit repository implementation

use crate::error::Result;
use crate::models::Unit;
use libsql::{params, Connection};

use super::row::{optional_text, text_or_null};

/// Trait for unit storage operations (async)
#[allow(async_fn_in_trait)]
pub trait UnitRepository {
    /// Insert a unit (import/CRUD collaborators and tests)
    async fn create(&self, unit: &Unit) -> Result<()>;

    /// List all units of a property, oldest first
    async fn list_by_property(&self, property_id: &str) -> Result<Vec<Unit>>;
}

/// libSQL implementation of `UnitRepository`
pub struct LibSqlUnitRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUnitRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl UnitRepository for LibSqlUnitRepository<'_> {
    async fn create(&self, unit: &Unit) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO units (id, property_id, name, external_id, created_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    unit.id.clone(),
                    unit.property_id.clone(),
                    unit.name.clone(),
                    text_or_null(unit.external_id.as_deref()),
                    unit.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_by_property(&self, property_id: &str) -> Result<Vec<Unit>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, property_id, name, external_id, created_at
                 FROM units WHERE property_id = ?
                 ORDER BY created_at ASC, id ASC",
                [property_id],
            )
            .await?;

        let mut units = Vec::new();
        while let Some(row) = rows.next().await? {
            units.push(Unit {
                id: row.get(0)?,
                property_id: row.get(1)?,
                name: row.get(2)?,
                external_id: optional_text(&row, 3)?,
                created_at: row.get(4)?,
            });
        }
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlPropertyRepository, PropertyRepository};
    use crate::models::Property;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_property() {
        let db = Database::open_in_memory().await.unwrap();
        LibSqlPropertyRepository::new(db.connection())
            .create(&Property::new("p1", "Seaside", "owner-1", None))
            .await
            .unwrap();
        LibSqlPropertyRepository::new(db.connection())
            .create(&Property::new("p2", "Hillside", "owner-1", None))
            .await
            .unwrap();

        let repo = LibSqlUnitRepository::new(db.connection());
        repo.create(&Unit::new("u1", "p1", "Room 1", Some("5".to_string())))
            .await
            .unwrap();
        repo.create(&Unit::new("u2", "p1", "Room 2", None))
            .await
            .unwrap();
        repo.create(&Unit::new("u3", "p2", "Cabin", Some("5".to_string())))
            .await
            .unwrap();

        let units = repo.list_by_property("p1").await.unwrap();
        let ids = units.iter().map(|unit| unit.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(units[0].external_id.as_deref(), Some("5"));
        assert_eq!(units[1].external_id, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_external_id_unique_within_property() {
        let db = Database::open_in_memory().await.unwrap();
        LibSqlPropertyRepository::new(db.connection())
            .create(&Property::new("p1", "Seaside", "owner-1", None))
            .await
            .unwrap();

        let repo = LibSqlUnitRepository::new(db.connection());
        repo.create(&Unit::new("u1", "p1", "Room 1", Some("5".to_string())))
            .await
            .unwrap();
        assert!(repo
            .create(&Unit::new("u2", "p1", "Room 2", Some("5".to_string())))
            .await
            .is_err());
    }
}
