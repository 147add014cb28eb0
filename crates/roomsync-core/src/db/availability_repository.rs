//! Availability repository implementation

use chrono::NaiveDate;
use libsql::params::Params;
use libsql::{Connection, Value};

use crate::error::{Error, Result};
use crate::models::{AvailabilityRecord, AvailabilityStatus};

use super::row::{date, date_value, optional_text, text_or_null, values_placeholders};

const COLUMNS: usize = 6;

/// Trait for availability storage operations (async)
#[allow(async_fn_in_trait)]
pub trait AvailabilityRepository {
    /// Records of one unit between `start` and `end` (inclusive), ordered by date
    async fn list_in_range(
        &self,
        unit_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AvailabilityRecord>>;

    /// Insert new records as one atomic statement
    async fn insert_batch(&self, records: &[AvailabilityRecord]) -> Result<()>;

    /// Upsert records keyed by record identity as one atomic statement
    async fn upsert_batch(&self, records: &[AvailabilityRecord]) -> Result<()>;
}

/// libSQL implementation of `AvailabilityRepository`
pub struct LibSqlAvailabilityRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAvailabilityRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn batch_params(records: &[AvailabilityRecord]) -> Params {
        let mut values = Vec::with_capacity(records.len() * COLUMNS);
        for record in records {
            values.push(Value::Text(record.id.as_str()));
            values.push(Value::Text(record.unit_id.clone()));
            values.push(date_value(record.date));
            values.push(Value::Text(record.status.as_str().to_string()));
            values.push(text_or_null(record.reservation_id.as_deref()));
            values.push(Value::Integer(record.updated_at));
        }
        Params::Positional(values)
    }

    fn parse_record(row: &libsql::Row) -> Result<AvailabilityRecord> {
        let id: String = row.get(0)?;
        let status: String = row.get(3)?;
        Ok(AvailabilityRecord {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid availability id '{id}'")))?,
            unit_id: row.get(1)?,
            date: date(row, 2)?,
            status: status.parse::<AvailabilityStatus>().map_err(Error::Database)?,
            reservation_id: optional_text(row, 4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl AvailabilityRepository for LibSqlAvailabilityRepository<'_> {
    async fn list_in_range(
        &self,
        unit_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AvailabilityRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, unit_id, date, status, reservation_id, updated_at
                 FROM availability
                 WHERE unit_id = ? AND date >= ? AND date <= ?
                 ORDER BY date ASC",
                Params::Positional(vec![
                    Value::Text(unit_id.to_string()),
                    date_value(start),
                    date_value(end),
                ]),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    async fn insert_batch(&self, records: &[AvailabilityRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO availability (id, unit_id, date, status, reservation_id, updated_at) VALUES {}",
            values_placeholders(records.len(), COLUMNS)
        );
        self.conn.execute(&sql, Self::batch_params(records)).await?;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[AvailabilityRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO availability (id, unit_id, date, status, reservation_id, updated_at) VALUES {}
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 reservation_id = excluded.reservation_id,
                 updated_at = excluded.updated_at",
            values_placeholders(records.len(), COLUMNS)
        );
        self.conn.execute(&sql, Self::batch_params(records)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        Database, LibSqlPropertyRepository, LibSqlUnitRepository, PropertyRepository,
        UnitRepository,
    };
    use crate::models::{Property, Unit};

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        LibSqlPropertyRepository::new(db.connection())
            .create(&Property::new("p1", "Seaside", "owner-1", Some("77".to_string())))
            .await
            .unwrap();
        LibSqlUnitRepository::new(db.connection())
            .create(&Unit::new("u1", "p1", "Room 5", Some("5".to_string())))
            .await
            .unwrap();
        db
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_list_in_range() {
        let db = setup().await;
        let repo = LibSqlAvailabilityRepository::new(db.connection());

        let records = vec![
            AvailabilityRecord::new("u1", day("2026-03-01"), AvailabilityStatus::Booked),
            AvailabilityRecord::new("u1", day("2026-03-02"), AvailabilityStatus::Blocked)
                .with_reservation("res-9"),
            AvailabilityRecord::new("u1", day("2026-04-01"), AvailabilityStatus::Booked),
        ];
        repo.insert_batch(&records).await.unwrap();

        let listed = repo
            .list_in_range("u1", day("2026-03-01"), day("2026-03-31"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], records[0]);
        assert_eq!(listed[1].reservation_id.as_deref(), Some("res-9"));
        assert_eq!(listed[1].status, AvailabilityStatus::Blocked);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_batch_is_atomic_on_duplicate_date() {
        let db = setup().await;
        let repo = LibSqlAvailabilityRepository::new(db.connection());

        repo.insert_batch(&[AvailabilityRecord::new(
            "u1",
            day("2026-03-01"),
            AvailabilityStatus::Booked,
        )])
        .await
        .unwrap();

        let result = repo
            .insert_batch(&[
                AvailabilityRecord::new("u1", day("2026-03-05"), AvailabilityStatus::Booked),
                AvailabilityRecord::new("u1", day("2026-03-01"), AvailabilityStatus::Booked),
            ])
            .await;
        assert!(result.is_err());

        let listed = repo
            .list_in_range("u1", day("2026-03-01"), day("2026-03-31"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_updates_by_identity() {
        let db = setup().await;
        let repo = LibSqlAvailabilityRepository::new(db.connection());

        let original = AvailabilityRecord::new("u1", day("2026-03-01"), AvailabilityStatus::Blocked)
            .with_reservation("res-1");
        repo.insert_batch(std::slice::from_ref(&original))
            .await
            .unwrap();

        let mut updated = original.clone();
        updated.status = AvailabilityStatus::Booked;
        updated.updated_at += 1;
        repo.upsert_batch(&[updated.clone()]).await.unwrap();

        let listed = repo
            .list_in_range("u1", day("2026-03-01"), day("2026-03-01"))
            .await
            .unwrap();
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_batches_are_noops() {
        let db = setup().await;
        let repo = LibSqlAvailabilityRepository::new(db.connection());
        repo.insert_batch(&[]).await.unwrap();
        repo.upsert_batch(&[]).await.unwrap();
    }
}
