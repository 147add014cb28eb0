use std::path::Path;

use roomsync_core::util::normalize_text_option;
use roomsync_core::EngineConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::load_engine_config;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            feed_url,
            proxies,
            batch_size,
            interval,
            no_auto_sync,
            default_user,
        } => {
            let existing = EngineConfig::load_from_path(config_path)?;
            let config = merge_config_init(
                existing,
                ConfigInit {
                    feed_url,
                    proxies,
                    batch_size,
                    interval,
                    no_auto_sync,
                    default_user,
                },
            );
            config.save_to_path(config_path)?;
            println!("Saved config to {}", config_path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_engine_config(config_path)?;
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Values passed to `config init`; unset values keep the existing config.
#[derive(Debug, Default)]
pub struct ConfigInit {
    pub feed_url: Option<String>,
    pub proxies: Vec<String>,
    pub batch_size: Option<usize>,
    pub interval: Option<u64>,
    pub no_auto_sync: bool,
    pub default_user: Option<String>,
}

pub fn merge_config_init(mut config: EngineConfig, init: ConfigInit) -> EngineConfig {
    if let Some(feed_url) = normalize_text_option(init.feed_url) {
        config.feed_url_template = Some(feed_url);
    }
    if !init.proxies.is_empty() {
        config.proxy_templates = init.proxies;
    }
    if let Some(batch_size) = init.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(interval) = init.interval {
        config.auto_sync.interval_secs = interval;
        config.auto_sync.enabled = true;
    }
    if init.no_auto_sync {
        config.auto_sync.enabled = false;
    }
    if let Some(default_user) = normalize_text_option(init.default_user) {
        config.default_user_id = Some(default_user);
    }
    config
}
