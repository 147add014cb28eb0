//! Availability reconciliation engine.
//!
//! Data flows from the feed through unit resolution and per-unit diffing into
//! the batched writer and the notification emitter. The coordinator owns the
//! per-property guard around that pipeline; the scheduler re-invokes it on a
//! fixed interval.

pub mod coordinator;
pub mod diff;
pub mod notify;
pub mod resolver;
pub mod scheduler;
pub mod writer;

pub use coordinator::{SyncCoordinator, SyncOutcome, SyncRequest, SyncSummary};
pub use diff::{change_events, compress_ranges, diff_unit, UnitDiff};
pub use resolver::{ResolvedFeed, UnitIndex};
pub use scheduler::{AutoSync, AutoSyncHandle, SyncStatus};
pub use writer::{apply_writes, AvailabilitySink, WriteReport};
