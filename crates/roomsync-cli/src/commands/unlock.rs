use std::path::Path;

use crate::commands::common::{load_property, open_store, require_property_id};
use crate::error::CliError;

/// Returns whether a guard was cleared.
pub async fn run_unlock(property_id: &str, db_path: &Path) -> Result<bool, CliError> {
    let property_id = require_property_id(property_id)?;
    let store = open_store(db_path).await?;
    load_property(&store, &property_id).await?;

    let released = store.force_release(&property_id).await?;
    if released {
        tracing::warn!(property_id = %property_id, "Sync guard force-released");
        println!("Released sync guard for property {property_id}");
    } else {
        println!("No sync in progress for property {property_id}");
    }
    Ok(released)
}
