//! Sync coordinator: guard, pipeline, and completion bookkeeping.
//!
//! A run takes the per-property guard, fetches and parses the feed, resolves
//! units, and reconciles each unit in its own store transaction: diff, write
//! batches, then notifications for the dates that landed. A unit whose
//! notifications cannot be stored is rolled back whole. The guard is released
//! on every exit path; only a successful run stamps `last_synced_at`.

use std::fmt;

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::feed::{self, FeedEntry, FeedGateway};
use crate::models::{Notification, Property, Unit};
use crate::services::{StoreService, StoreTransaction};
use crate::util::{normalize_text_option, unix_millis_now};

use super::diff::{change_events, diff_unit, feed_window};
use super::writer::{apply_writes, WriteReport};
use super::{notify, resolver};

/// Days after today covered by one run
const SYNC_WINDOW_DAYS: u64 = 365;

/// Manual sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub property_id: String,
    /// Identifier of the property in the feed
    pub external_id: String,
    /// Notification recipient; falls back to the configured default, then the owner
    pub requested_by: Option<String>,
}

/// Counts reported by a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub units_matched: usize,
    pub entries_unmatched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed_writes: usize,
    pub notifications_created: usize,
    pub first_sync: bool,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Synced {} unit(s): {} inserted, {} updated, {} notification(s)",
            self.units_matched, self.inserted, self.updated, self.notifications_created
        )?;
        if self.failed_writes > 0 {
            write!(f, ", {} write(s) failed", self.failed_writes)?;
        }
        if self.entries_unmatched > 0 {
            let noun = if self.entries_unmatched == 1 { "entry" } else { "entries" };
            write!(f, ", {} unmatched feed {noun} skipped", self.entries_unmatched)?;
        }
        if self.first_sync {
            f.write_str(" (first sync, notifications suppressed)")?;
        }
        Ok(())
    }
}

/// Result of a sync attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncSummary),
    /// Another run holds the guard for this property
    AlreadySyncing,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(summary) => summary.fmt(f),
            Self::AlreadySyncing => f.write_str("Sync already in progress"),
        }
    }
}

/// Values fixed for the duration of one run
struct RunContext {
    property: Property,
    recipient: String,
    emit_events: bool,
    now: i64,
}

/// Reconciles stored availability with the remote feed, one property at a time.
#[derive(Clone)]
pub struct SyncCoordinator {
    store: StoreService,
    gateway: FeedGateway,
    config: EngineConfig,
}

impl SyncCoordinator {
    /// Build a coordinator whose gateway uses the configured transports.
    pub fn new(store: StoreService, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let gateway = FeedGateway::new(config.proxy_templates.clone())?;
        Ok(Self::with_gateway(store, gateway, config))
    }

    pub fn with_gateway(store: StoreService, gateway: FeedGateway, config: EngineConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub const fn store(&self) -> &StoreService {
        &self.store
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one sync for a property using its stored feed identifier.
    pub async fn sync_property(
        &self,
        property_id: &str,
        requested_by: Option<&str>,
    ) -> Result<SyncOutcome> {
        let property = self
            .store
            .get_property(property_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("property {property_id}")))?;
        let external_id = property.external_id.clone().ok_or_else(|| {
            Error::InvalidInput(format!("property {property_id} has no feed identifier"))
        })?;

        self.sync_now(&SyncRequest {
            property_id: property.id,
            external_id,
            requested_by: requested_by.map(ToString::to_string),
        })
        .await
    }

    /// Run one sync, or report `AlreadySyncing` when another run holds the guard.
    pub async fn sync_now(&self, request: &SyncRequest) -> Result<SyncOutcome> {
        let external_id = request.external_id.trim();
        if external_id.is_empty() {
            return Err(Error::InvalidInput(format!(
                "property {} has an empty feed identifier",
                request.property_id
            )));
        }

        if !self.store.try_begin_sync(&request.property_id).await? {
            return match self.store.get_property(&request.property_id).await? {
                Some(_) => {
                    tracing::info!(property_id = %request.property_id, "Sync already in progress");
                    Ok(SyncOutcome::AlreadySyncing)
                }
                None => Err(Error::NotFound(format!("property {}", request.property_id))),
            };
        }

        tracing::info!(property_id = %request.property_id, external_id, "Sync started");
        let result = self.run(request, external_id).await;

        match result {
            Ok(summary) => {
                if let Err(error) = self
                    .store
                    .finish_sync(&request.property_id, Some(unix_millis_now()))
                    .await
                {
                    self.release_guard(&request.property_id).await;
                    tracing::warn!(
                        property_id = %request.property_id,
                        %error,
                        "Failed to stamp sync completion"
                    );
                    return Err(error);
                }
                tracing::info!(property_id = %request.property_id, "{summary}");
                Ok(SyncOutcome::Completed(summary))
            }
            Err(error) => {
                self.release_guard(&request.property_id).await;
                tracing::warn!(property_id = %request.property_id, %error, "Sync failed");
                Err(error)
            }
        }
    }

    /// Clear the guard without stamping `last_synced_at`.
    async fn release_guard(&self, property_id: &str) {
        if let Err(release_error) = self.store.finish_sync(property_id, None).await {
            tracing::error!(property_id, %release_error, "Failed to release sync guard");
        }
    }

    /// Clear a guard left behind by a crashed run.
    pub async fn force_release(&self, property_id: &str) -> Result<bool> {
        let released = self.store.force_release(property_id).await?;
        if released {
            tracing::warn!(property_id, "Sync guard force-released");
        }
        Ok(released)
    }

    async fn run(&self, request: &SyncRequest, external_id: &str) -> Result<SyncSummary> {
        let property = self
            .store
            .get_property(&request.property_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("property {}", request.property_id)))?;

        let today = Utc::now().date_naive();
        let end = today
            .checked_add_days(Days::new(SYNC_WINDOW_DAYS))
            .unwrap_or(today);
        let url = self.config.feed_url(external_id, today, end)?;

        let raw = self.gateway.fetch_feed(&url).await?;
        let entries = feed::parse(&raw)?;
        tracing::debug!(entries = entries.len(), "Feed parsed");

        let index = resolver::resolve(&self.store, &property.id).await?;
        let resolved = index.partition(entries);

        let context = RunContext {
            recipient: self.recipient(request, &property),
            emit_events: !property.is_first_sync(),
            now: unix_millis_now(),
            property,
        };
        let mut report = WriteReport::default();
        let mut notifications_created = 0;

        for (unit, unit_entries) in &resolved.units {
            let Some(window) = feed_window(unit_entries) else {
                continue;
            };

            let tx = self.store.begin().await?;
            let reconciled = self
                .reconcile_unit(&tx, &context, unit, unit_entries, window)
                .await;
            match reconciled {
                Ok((unit_report, notifications)) => {
                    tx.commit().await?;
                    report.absorb(unit_report);
                    notifications_created += notifications.len();
                    notify::announce(&notifications);
                }
                Err(error) => {
                    tx.rollback().await;
                    return Err(error);
                }
            }
        }

        Ok(summarize(&resolved, &report, notifications_created, !context.emit_events))
    }

    /// Diff and write one unit, then store notifications for what landed.
    async fn reconcile_unit(
        &self,
        tx: &StoreTransaction<'_>,
        context: &RunContext,
        unit: &Unit,
        entries: &[FeedEntry],
        (start, end): (NaiveDate, NaiveDate),
    ) -> Result<(WriteReport, Vec<Notification>)> {
        let existing = tx.list_availability(&unit.id, start, end).await?;
        let diff = diff_unit(&unit.id, &existing, entries, false, context.now);
        let report = apply_writes(tx, &diff.inserts, &diff.updates, self.config.batch_size).await;
        tracing::debug!(
            unit_id = %unit.id,
            inserts = diff.inserts.len(),
            updates = diff.updates.len(),
            failed = report.failed_writes(),
            "Unit reconciled"
        );

        if !context.emit_events {
            return Ok((report, Vec::new()));
        }
        let landed = diff
            .inserts
            .iter()
            .chain(&diff.updates)
            .filter(|record| report.has_landed(record));
        let events = change_events(&unit.id, landed);
        let notifications =
            notify::emit(tx, &events, &context.property, unit, &context.recipient).await?;
        Ok((report, notifications))
    }

    fn recipient(&self, request: &SyncRequest, property: &Property) -> String {
        normalize_text_option(request.requested_by.clone())
            .or_else(|| self.config.default_user_id.clone())
            .unwrap_or_else(|| property.owner_id.clone())
    }
}

fn summarize(
    resolved: &resolver::ResolvedFeed,
    report: &WriteReport,
    notifications_created: usize,
    first_sync: bool,
) -> SyncSummary {
    SyncSummary {
        units_matched: resolved.units.len(),
        entries_unmatched: resolved.unmatched_entries,
        inserted: report.inserts_applied,
        updated: report.updates_applied,
        failed_writes: report.failed_writes(),
        notifications_created,
        first_sync,
    }
}
