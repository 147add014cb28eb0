//! Batched writer: apply inserts and updates in bounded batches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{AvailabilityRecord, RecordId};
use crate::Result;

/// Destination of availability writes; each call is one atomic batch.
#[allow(async_fn_in_trait)]
pub trait AvailabilitySink {
    async fn insert_batch(&self, records: &[AvailabilityRecord]) -> Result<()>;

    async fn upsert_batch(&self, records: &[AvailabilityRecord]) -> Result<()>;
}

/// Attempted versus applied write counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    pub inserts_attempted: usize,
    pub inserts_applied: usize,
    pub updates_attempted: usize,
    pub updates_applied: usize,
    pub batches_failed: usize,
    /// Records whose batch was applied
    #[serde(skip)]
    pub landed: HashSet<RecordId>,
}

impl WriteReport {
    /// Whether every attempted write landed
    pub const fn is_complete(&self) -> bool {
        self.batches_failed == 0
            && self.inserts_attempted == self.inserts_applied
            && self.updates_attempted == self.updates_applied
    }

    pub const fn failed_writes(&self) -> usize {
        (self.inserts_attempted - self.inserts_applied)
            + (self.updates_attempted - self.updates_applied)
    }

    /// Whether the given record was part of an applied batch
    pub fn has_landed(&self, record: &AvailabilityRecord) -> bool {
        self.landed.contains(&record.id)
    }

    /// Add another report's counts and landed records to this one.
    pub fn absorb(&mut self, other: Self) {
        self.inserts_attempted += other.inserts_attempted;
        self.inserts_applied += other.inserts_applied;
        self.updates_attempted += other.updates_attempted;
        self.updates_applied += other.updates_applied;
        self.batches_failed += other.batches_failed;
        self.landed.extend(other.landed);
    }
}

#[derive(Clone, Copy)]
enum BatchKind {
    Insert,
    Upsert,
}

impl BatchKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Upsert => "upsert",
        }
    }
}

/// Apply inserts then updates in batches of at most `batch_size` records.
///
/// A failing batch is logged and skipped; later batches still run.
pub async fn apply_writes<S: AvailabilitySink>(
    sink: &S,
    inserts: &[AvailabilityRecord],
    updates: &[AvailabilityRecord],
    batch_size: usize,
) -> WriteReport {
    let batch_size = batch_size.max(1);
    let mut report = WriteReport {
        inserts_attempted: inserts.len(),
        updates_attempted: updates.len(),
        ..WriteReport::default()
    };

    let (applied, failed) =
        apply_batches(sink, inserts, batch_size, BatchKind::Insert, &mut report.landed).await;
    report.inserts_applied = applied;
    report.batches_failed += failed;

    let (applied, failed) =
        apply_batches(sink, updates, batch_size, BatchKind::Upsert, &mut report.landed).await;
    report.updates_applied = applied;
    report.batches_failed += failed;

    report
}

async fn apply_batches<S: AvailabilitySink>(
    sink: &S,
    records: &[AvailabilityRecord],
    batch_size: usize,
    kind: BatchKind,
    landed: &mut HashSet<RecordId>,
) -> (usize, usize) {
    let mut applied = 0;
    let mut failed = 0;

    for (index, batch) in records.chunks(batch_size).enumerate() {
        let result = match kind {
            BatchKind::Insert => sink.insert_batch(batch).await,
            BatchKind::Upsert => sink.upsert_batch(batch).await,
        };
        match result {
            Ok(()) => {
                applied += batch.len();
                landed.extend(batch.iter().map(|record| record.id));
                tracing::debug!(kind = kind.label(), batch = index, records = batch.len(), "Batch applied");
            }
            Err(error) => {
                failed += 1;
                tracing::warn!(
                    kind = kind.label(),
                    batch = index,
                    records = batch.len(),
                    %error,
                    "Batch write failed; continuing with next batch"
                );
            }
        }
    }

    (applied, failed)
}
