//! Thread-safe store service used by the reconciliation engine and the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, MutexGuard};

use crate::db::{
    AvailabilityRepository, Database, LibSqlAvailabilityRepository, LibSqlNotificationRepository,
    LibSqlPropertyRepository, LibSqlUnitRepository, NotificationFilter, NotificationRepository,
    PropertyRepository, SyncConfig, UnitRepository,
};
use crate::models::{AvailabilityRecord, Notification, Property, Unit};
use crate::reconcile::AvailabilitySink;
use crate::Result;

/// Serializes access to one libSQL connection; the lock is held per operation.
#[derive(Clone)]
pub struct StoreService {
    db: Arc<Mutex<Database>>,
}

impl StoreService {
    /// Open a store at the given filesystem path, as an embedded replica when
    /// `sync_config` is given.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        sync_config: Option<SyncConfig>,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match sync_config {
            Some(config) => Database::open_replica(&db_path, &config)?,
            None => {
                tracing::info!("Opening local store at {}", db_path.display());
                Database::open(&db_path).await?
            }
        };
        Ok(Self::from_database(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory().await?))
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Pull remote changes when the store is an embedded replica.
    pub async fn sync_replica(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.pull().await
    }

    /// Whether the store replicates a remote database.
    pub async fn is_replica(&self) -> bool {
        self.db.lock().await.is_replica()
    }

    pub async fn create_property(&self, property: &Property) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlPropertyRepository::new(db.connection())
            .create(property)
            .await
    }

    pub async fn get_property(&self, id: &str) -> Result<Option<Property>> {
        let db = self.db.lock().await;
        LibSqlPropertyRepository::new(db.connection()).get(id).await
    }

    /// Atomically take the per-property guard.
    pub async fn try_begin_sync(&self, property_id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlPropertyRepository::new(db.connection())
            .try_begin_sync(property_id)
            .await
    }

    /// Release the guard, stamping `last_synced_at` on success.
    pub async fn finish_sync(&self, property_id: &str, completed_at: Option<i64>) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlPropertyRepository::new(db.connection())
            .finish_sync(property_id, completed_at)
            .await
    }

    /// Clear a guard left behind by a crashed run.
    pub async fn force_release(&self, property_id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlPropertyRepository::new(db.connection())
            .force_release(property_id)
            .await
    }

    pub async fn create_unit(&self, unit: &Unit) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlUnitRepository::new(db.connection()).create(unit).await
    }

    pub async fn list_units(&self, property_id: &str) -> Result<Vec<Unit>> {
        let db = self.db.lock().await;
        LibSqlUnitRepository::new(db.connection())
            .list_by_property(property_id)
            .await
    }

    /// Stored records of a unit between two dates (inclusive).
    pub async fn list_availability(
        &self,
        unit_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AvailabilityRecord>> {
        let db = self.db.lock().await;
        LibSqlAvailabilityRepository::new(db.connection())
            .list_in_range(unit_id, start, end)
            .await
    }

    pub async fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlNotificationRepository::new(db.connection())
            .insert_batch(notifications)
            .await
    }

    pub async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let db = self.db.lock().await;
        LibSqlNotificationRepository::new(db.connection())
            .list(filter)
            .await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlNotificationRepository::new(db.connection())
            .mark_read(id)
            .await
    }
}

impl StoreService {
    /// Lock the store and open a transaction on it.
    ///
    /// Other store operations wait until the transaction is committed or
    /// rolled back. A transaction abandoned without either is rolled back
    /// here, before the next one begins.
    pub async fn begin(&self) -> Result<StoreTransaction<'_>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        if !conn.is_autocommit() {
            tracing::warn!("Rolling back a transaction left open by an interrupted run");
            conn.execute("ROLLBACK", ()).await?;
        }
        conn.execute("BEGIN TRANSACTION", ()).await?;
        Ok(StoreTransaction { db })
    }

    #[cfg(test)]
    pub(crate) async fn execute(&self, sql: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(sql, ()).await?;
        Ok(())
    }
}

/// One open transaction holding the store lock.
///
/// Each availability batch runs in its own savepoint, so a failed batch is
/// undone without discarding the batches before it.
pub struct StoreTransaction<'a> {
    db: MutexGuard<'a, Database>,
}

impl StoreTransaction<'_> {
    pub async fn list_availability(
        &self,
        unit_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AvailabilityRecord>> {
        LibSqlAvailabilityRepository::new(self.db.connection())
            .list_in_range(unit_id, start, end)
            .await
    }

    pub async fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        LibSqlNotificationRepository::new(self.db.connection())
            .insert_batch(notifications)
            .await
    }

    pub async fn commit(self) -> Result<()> {
        let conn = self.db.connection();
        if let Err(error) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }
        Ok(())
    }

    /// Undo everything since `begin`; failures are logged, not returned.
    pub async fn rollback(self) {
        if let Err(error) = self.db.connection().execute("ROLLBACK", ()).await {
            tracing::error!(%error, "Failed to roll back store transaction");
        }
    }

    async fn in_savepoint(&self, batch: Result<()>) -> Result<()> {
        let conn = self.db.connection();
        match batch {
            Ok(()) => {
                conn.execute("RELEASE batch", ()).await?;
                Ok(())
            }
            Err(error) => {
                conn.execute("ROLLBACK TO batch", ()).await.ok();
                conn.execute("RELEASE batch", ()).await.ok();
                Err(error)
            }
        }
    }
}

impl AvailabilitySink for StoreTransaction<'_> {
    async fn insert_batch(&self, records: &[AvailabilityRecord]) -> Result<()> {
        let conn = self.db.connection();
        conn.execute("SAVEPOINT batch", ()).await?;
        let batch = LibSqlAvailabilityRepository::new(conn)
            .insert_batch(records)
            .await;
        self.in_savepoint(batch).await
    }

    async fn upsert_batch(&self, records: &[AvailabilityRecord]) -> Result<()> {
        let conn = self.db.connection();
        conn.execute("SAVEPOINT batch", ()).await?;
        let batch = LibSqlAvailabilityRepository::new(conn)
            .upsert_batch(records)
            .await;
        self.in_savepoint(batch).await
    }
}
