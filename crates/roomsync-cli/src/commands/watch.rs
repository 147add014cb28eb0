use std::path::Path;
use std::time::Duration;

use roomsync_core::reconcile::{AutoSync, SyncStatus};
use roomsync_core::util::format_timestamp;
use roomsync_core::AutoSyncConfig;

use crate::commands::common::{normalize_identifier, open_coordinator, require_property_id};
use crate::error::CliError;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Effective auto-sync settings: an explicit interval enables auto-sync.
pub fn resolve_auto_sync(
    configured: AutoSyncConfig,
    interval: Option<u64>,
) -> Result<AutoSyncConfig, CliError> {
    match interval {
        Some(0) => Err(CliError::Config(
            "--interval must be at least 1 second".to_string(),
        )),
        Some(interval_secs) => Ok(AutoSyncConfig {
            enabled: true,
            interval_secs,
        }),
        None => Ok(configured),
    }
}

pub fn format_sync_status(status: &SyncStatus) -> String {
    let label = if status.ok { "ok" } else { "failed" };
    format!(
        "[{}] {label}: {}",
        format_timestamp(status.at),
        status.message
    )
}

pub async fn run_watch(
    property_id: &str,
    interval: Option<u64>,
    user: Option<&str>,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let property_id = require_property_id(property_id)?;
    let coordinator = open_coordinator(db_path, config_path).await?;
    let auto_sync = resolve_auto_sync(coordinator.config().auto_sync, interval)?;
    let user = user.and_then(normalize_identifier);

    let sync_property = property_id.clone();
    let Some(handle) = AutoSync::start(auto_sync, move || {
        let coordinator = coordinator.clone();
        let property_id = sync_property.clone();
        let user = user.clone();
        async move { coordinator.sync_property(&property_id, user.as_deref()).await }
    }) else {
        println!("Auto-sync is disabled in config; pass --interval to enable it.");
        return Ok(());
    };

    println!(
        "Watching property {property_id} every {}s (Ctrl-C to stop)",
        auto_sync.interval_secs
    );

    let mut poll = tokio::time::interval(STATUS_POLL_INTERVAL);
    let mut last_printed: Option<i64> = None;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = poll.tick() => {
                if let Some(status) = handle.last_status() {
                    if last_printed != Some(status.at) {
                        println!("{}", format_sync_status(&status));
                        last_printed = Some(status.at);
                    }
                }
            }
        }
    }

    handle.stop().await;
    println!("Auto-sync stopped");
    Ok(())
}
