use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] roomsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Property ID cannot be empty")]
    EmptyPropertyId,
    #[error("Property not found: {0}")]
    PropertyNotFound(String),
    #[error("Notification ID cannot be empty")]
    EmptyNotificationId,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "No feed URL configured. Run `roomsync config init --feed-url <URL>` or set ROOMSYNC_FEED_URL."
    )]
    FeedNotConfigured,
}
