//! Fixed-interval auto-sync.
//!
//! `AutoSync::start` spawns a timer task that re-invokes a sync closure every
//! interval. The returned handle owns the timer: `stop` cancels and joins it,
//! and dropping the handle cancels it.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::AutoSyncConfig;
use crate::util::unix_millis_now;
use crate::Result;

use super::coordinator::SyncOutcome;

/// Result of the most recent auto-sync tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Tick completion time (Unix ms)
    pub at: i64,
    pub ok: bool,
    pub message: String,
}

type SharedStatus = Arc<Mutex<Option<SyncStatus>>>;

/// Auto-sync entry point
pub struct AutoSync;

impl AutoSync {
    /// Start the timer, or return `None` when auto-sync is disabled.
    ///
    /// The first run happens one interval after start. Failures are recorded
    /// as the last status and never stop the timer.
    pub fn start<F, Fut>(config: AutoSyncConfig, sync: F) -> Option<AutoSyncHandle>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<SyncOutcome>> + Send + 'static,
    {
        if !config.enabled {
            tracing::info!("Auto-sync disabled");
            return None;
        }

        let interval = config.interval().max(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let status: SharedStatus = Arc::new(Mutex::new(None));

        let task = tokio::spawn(run_loop(interval, cancel.clone(), Arc::clone(&status), sync));
        tracing::info!(interval_secs = interval.as_secs(), "Auto-sync started");

        Some(AutoSyncHandle {
            cancel,
            task: Some(task),
            status,
        })
    }
}

async fn run_loop<F, Fut>(
    interval: Duration,
    cancel: CancellationToken,
    status: SharedStatus,
    sync: F,
) where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<SyncOutcome>> + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Auto-sync loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let next = match sync().await {
                    Ok(outcome) => SyncStatus {
                        at: unix_millis_now(),
                        ok: true,
                        message: outcome.to_string(),
                    },
                    Err(error) => {
                        tracing::warn!(%error, "Auto-sync run failed");
                        SyncStatus {
                            at: unix_millis_now(),
                            ok: false,
                            message: error.to_string(),
                        }
                    }
                };
                if let Ok(mut last) = status.lock() {
                    *last = Some(next);
                }
            }
        }
    }
}

/// Running auto-sync timer; dropping it cancels the timer.
pub struct AutoSyncHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    status: SharedStatus,
}

impl AutoSyncHandle {
    /// Cancel the timer and wait for an in-flight run to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::error!(%error, "Auto-sync task ended abnormally");
            }
        }
        tracing::info!("Auto-sync stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Status of the most recent run, if any has completed.
    pub fn last_status(&self) -> Option<SyncStatus> {
        self.status.lock().ok().and_then(|last| last.clone())
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
