use std::path::Path;

use roomsync_core::{SyncOutcome, SyncRequest};

use crate::commands::common::{normalize_identifier, open_coordinator, require_property_id};
use crate::error::CliError;

pub async fn run_sync(
    property_id: &str,
    external_id: Option<&str>,
    user: Option<&str>,
    db_path: &Path,
    config_path: &Path,
) -> Result<SyncOutcome, CliError> {
    let property_id = require_property_id(property_id)?;
    let coordinator = open_coordinator(db_path, config_path).await?;

    let outcome = match external_id {
        Some(external_id) => {
            coordinator
                .sync_now(&SyncRequest {
                    property_id,
                    external_id: external_id.to_string(),
                    requested_by: user.and_then(normalize_identifier),
                })
                .await?
        }
        None => coordinator.sync_property(&property_id, user).await?,
    };

    let store = coordinator.store();
    if store.is_replica().await {
        store.sync_replica().await?;
    }

    println!("{outcome}");
    Ok(outcome)
}
