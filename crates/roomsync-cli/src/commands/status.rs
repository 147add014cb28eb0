use std::path::Path;

use crate::commands::common::{
    format_status_lines, load_property, open_store, property_to_status_item, require_property_id,
};
use crate::error::CliError;

pub async fn run_status(property_id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let property_id = require_property_id(property_id)?;
    let store = open_store(db_path).await?;
    let property = load_property(&store, &property_id).await?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&property_to_status_item(&property))?
        );
    } else {
        for line in format_status_lines(&property) {
            println!("{line}");
        }
    }
    Ok(())
}
