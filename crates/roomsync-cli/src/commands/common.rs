use std::env;
use std::path::{Path, PathBuf};

use roomsync_core::db::SyncConfig;
use roomsync_core::models::{Notification, Property};
use roomsync_core::util::{format_timestamp, normalize_text_option};
use roomsync_core::{EngineConfig, StoreService, SyncCoordinator};
use serde::Serialize;

use crate::error::CliError;

#[derive(Serialize)]
pub struct PropertyStatusItem {
    pub id: String,
    pub name: String,
    pub external_id: Option<String>,
    pub last_synced_at: Option<i64>,
    pub sync_in_progress: bool,
}

#[derive(Serialize)]
pub struct NotificationListItem {
    pub id: String,
    pub user_id: String,
    pub property_id: String,
    pub unit_id: String,
    pub change_type: String,
    pub start_date: String,
    pub end_date: String,
    pub is_read: bool,
    pub created_at: i64,
    pub message: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("ROOMSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roomsync")
        .join("roomsync.db")
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os("ROOMSYNC_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roomsync")
        .join("config.json")
}

pub fn normalize_identifier(value: &str) -> Option<String> {
    normalize_text_option(Some(value.to_string()))
}

pub fn require_property_id(value: &str) -> Result<String, CliError> {
    normalize_identifier(value).ok_or(CliError::EmptyPropertyId)
}

fn sync_config_from_env() -> Option<SyncConfig> {
    let url = normalize_text_option(env::var("TURSO_DATABASE_URL").ok())?;
    let auth_token = normalize_text_option(env::var("TURSO_AUTH_TOKEN").ok())?;
    Some(SyncConfig::new(url, auth_token))
}

pub async fn open_store(db_path: &Path) -> Result<StoreService, CliError> {
    Ok(StoreService::open_path(db_path, sync_config_from_env()).await?)
}

/// Overlay environment values on a loaded config.
pub fn apply_env_overrides(
    mut config: EngineConfig,
    feed_url: Option<String>,
    user_id: Option<String>,
) -> EngineConfig {
    if let Some(feed_url) = normalize_text_option(feed_url) {
        config.feed_url_template = Some(feed_url);
    }
    if let Some(user_id) = normalize_text_option(user_id) {
        config.default_user_id = Some(user_id);
    }
    config
}

pub fn load_engine_config(config_path: &Path) -> Result<EngineConfig, CliError> {
    let config = EngineConfig::load_from_path(config_path)?;
    let config = apply_env_overrides(
        config,
        env::var("ROOMSYNC_FEED_URL").ok(),
        env::var("ROOMSYNC_USER_ID").ok(),
    );
    config.validate()?;
    Ok(config)
}

pub async fn open_coordinator(
    db_path: &Path,
    config_path: &Path,
) -> Result<SyncCoordinator, CliError> {
    let config = load_engine_config(config_path)?;
    if config.feed_url_template.is_none() {
        return Err(CliError::FeedNotConfigured);
    }
    let store = open_store(db_path).await?;
    Ok(SyncCoordinator::new(store, config)?)
}

pub async fn load_property(store: &StoreService, property_id: &str) -> Result<Property, CliError> {
    store
        .get_property(property_id)
        .await?
        .ok_or_else(|| CliError::PropertyNotFound(property_id.to_string()))
}

pub fn property_to_status_item(property: &Property) -> PropertyStatusItem {
    PropertyStatusItem {
        id: property.id.clone(),
        name: property.name.clone(),
        external_id: property.external_id.clone(),
        last_synced_at: property.last_synced_at,
        sync_in_progress: property.sync_in_progress,
    }
}

pub fn format_status_lines(property: &Property) -> Vec<String> {
    vec![
        format!("Property:         {} ({})", property.name, property.id),
        format!(
            "Feed ID:          {}",
            property.external_id.as_deref().unwrap_or("not configured")
        ),
        format!(
            "Last synced:      {}",
            property
                .last_synced_at
                .map_or_else(|| "never".to_string(), format_timestamp)
        ),
        format!(
            "Sync in progress: {}",
            if property.sync_in_progress { "yes" } else { "no" }
        ),
    ]
}

pub fn notification_to_list_item(notification: &Notification) -> NotificationListItem {
    NotificationListItem {
        id: notification.id.to_string(),
        user_id: notification.user_id.clone(),
        property_id: notification.property_id.clone(),
        unit_id: notification.unit_id.clone(),
        change_type: notification.change_type.to_string(),
        start_date: notification.start_date.to_string(),
        end_date: notification.end_date.to_string(),
        is_read: notification.is_read,
        created_at: notification.created_at,
        message: notification.message(),
    }
}

pub fn format_notification_lines(notifications: &[Notification]) -> Vec<String> {
    notifications
        .iter()
        .map(|notification| {
            let marker = if notification.is_read { " " } else { "*" };
            format!(
                "{marker} {}  {}  {}",
                notification.id,
                format_timestamp(notification.created_at),
                notification.message()
            )
        })
        .collect()
}
