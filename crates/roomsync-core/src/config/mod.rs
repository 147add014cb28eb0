//! Engine configuration.
//!
//! `EngineConfig` is loaded from a JSON file and describes where the feed
//! lives, which transports may be used to reach it, how writes are batched,
//! and how often auto-sync fires.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Default number of availability records per write batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default auto-sync interval (5 minutes)
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default feed transports, tried in order
pub const DEFAULT_PROXY_TEMPLATES: [&str; 3] = [
    "https://api.allorigins.win/raw?url={url}",
    "https://corsproxy.io/?url={url}",
    "https://api.codetabs.com/v1/proxy?quest={url}",
];

const URL_PLACEHOLDERS: [&str; 2] = ["{url}", "{raw_url}"];

/// Fixed-interval auto-sync settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AutoSyncConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl AutoSyncConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_proxy_templates() -> Vec<String> {
    DEFAULT_PROXY_TEMPLATES
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Reconciliation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Feed URL with `{external_id}`, `{start}` and `{end}` placeholders
    #[serde(default)]
    pub feed_url_template: Option<String>,
    /// Transport templates with a `{url}` or `{raw_url}` placeholder
    #[serde(default = "default_proxy_templates")]
    pub proxy_templates: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub auto_sync: AutoSyncConfig,
    /// Notification recipient when a run names no user
    #[serde(default)]
    pub default_user_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_url_template: None,
            proxy_templates: default_proxy_templates(),
            batch_size: DEFAULT_BATCH_SIZE,
            auto_sync: AutoSyncConfig::default(),
            default_user_id: None,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!("failed to parse {}: {error}", path.display()))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Trim text values and drop empty ones.
    pub fn normalize(&mut self) {
        self.feed_url_template = normalize_text_option(self.feed_url_template.take());
        self.default_user_id = normalize_text_option(self.default_user_id.take());
        self.proxy_templates = std::mem::take(&mut self.proxy_templates)
            .into_iter()
            .filter_map(|template| normalize_text_option(Some(template)))
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(template) = &self.feed_url_template {
            if !is_http_url(template) {
                return Err(Error::Config(format!(
                    "feed_url_template must be an http(s) URL, got '{template}'"
                )));
            }
        }

        if self.proxy_templates.is_empty() {
            return Err(Error::Config(
                "at least one proxy template is required".to_string(),
            ));
        }
        for template in &self.proxy_templates {
            if !URL_PLACEHOLDERS.iter().any(|p| template.contains(p)) {
                return Err(Error::Config(format!(
                    "proxy template '{template}' needs a {{url}} or {{raw_url}} placeholder"
                )));
            }
            if !template.starts_with("{raw_url}") && !is_http_url(template) {
                return Err(Error::Config(format!(
                    "proxy template '{template}' must be an http(s) URL"
                )));
            }
        }

        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.auto_sync.interval_secs == 0 {
            return Err(Error::Config(
                "auto_sync.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand the feed URL template for one property and date window.
    pub fn feed_url(&self, external_id: &str, start: NaiveDate, end: NaiveDate) -> Result<String> {
        let template = self
            .feed_url_template
            .as_deref()
            .ok_or_else(|| Error::Config("feed_url_template is not configured".to_string()))?;

        Ok(template
            .replace("{external_id}", &urlencoding::encode(external_id.trim()))
            .replace("{start}", &start.format("%Y-%m-%d").to_string())
            .replace("{end}", &end.format("%Y-%m-%d").to_string()))
    }
}
