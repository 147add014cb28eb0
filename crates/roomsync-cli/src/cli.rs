use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "roomsync")]
#[command(about = "Reconcile property availability with a booking-calendar feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to engine config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one reconciliation for a property
    Sync {
        /// Property ID
        #[arg(long)]
        property: String,
        /// Feed identifier; defaults to the one stored on the property
        #[arg(long, value_name = "ID")]
        external_id: Option<String>,
        /// Notification recipient; defaults to the configured user, then the owner
        #[arg(long, value_name = "ID")]
        user: Option<String>,
    },
    /// Auto-sync a property on a fixed interval until Ctrl-C
    Watch {
        /// Property ID
        #[arg(long)]
        property: String,
        /// Interval in seconds; overrides (and enables) the configured auto-sync
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Notification recipient
        #[arg(long, value_name = "ID")]
        user: Option<String>,
    },
    /// Show last sync time and guard state of a property
    Status {
        /// Property ID
        #[arg(long)]
        property: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect availability change notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
    /// Clear a sync guard left behind by a crashed run
    Unlock {
        /// Property ID
        #[arg(long)]
        property: String,
    },
    /// Manage engine configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// List notifications, newest first
    List {
        /// Only notifications for this user
        #[arg(long, value_name = "ID")]
        user: Option<String>,
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        /// Number of notifications to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a notification as read
    Read {
        /// Notification ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the engine config file
    Init {
        /// Feed URL template with {external_id}, {start} and {end} placeholders
        #[arg(long, value_name = "URL")]
        feed_url: Option<String>,
        /// Transport template with {url} or {raw_url}; repeat to set the fallback order
        #[arg(long = "proxy", value_name = "TEMPLATE")]
        proxies: Vec<String>,
        /// Records per write batch
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,
        /// Auto-sync interval in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Disable auto-sync
        #[arg(long)]
        no_auto_sync: bool,
        /// Default notification recipient
        #[arg(long, value_name = "ID")]
        default_user: Option<String>,
    },
    /// Print the effective engine config
    Show,
}
