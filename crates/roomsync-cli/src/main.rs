//! Roomsync CLI - reconcile property availability with a booking-calendar feed
//!
//! One-shot syncs, a foreground auto-sync watcher, and inspection of the
//! notifications and sync guard a run leaves behind.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::config::run_config;
use crate::commands::notifications::run_notifications;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::unlock::run_unlock;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive: tracing_subscriber::filter::Directive = "roomsync=info"
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Sync {
            property,
            external_id,
            user,
        } => {
            run_sync(
                &property,
                external_id.as_deref(),
                user.as_deref(),
                &db_path,
                &config_path,
            )
            .await?;
        }
        Commands::Watch {
            property,
            interval,
            user,
        } => {
            run_watch(&property, interval, user.as_deref(), &db_path, &config_path).await?;
        }
        Commands::Status { property, json } => run_status(&property, json, &db_path).await?,
        Commands::Notifications { command } => run_notifications(command, &db_path).await?,
        Commands::Unlock { property } => {
            run_unlock(&property, &db_path).await?;
        }
        Commands::Config { command } => run_config(command, &config_path)?,
    }

    Ok(())
}
