//! roomsync-core - Core library for roomsync
//!
//! This crate contains the data models, libSQL store layer, feed gateway and
//! parser, and the availability reconciliation engine used by the `roomsync`
//! command-line front end.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod util;

pub use config::{AutoSyncConfig, EngineConfig};
pub use error::{Error, Result};
pub use reconcile::{SyncCoordinator, SyncOutcome, SyncRequest, SyncSummary};
pub use services::StoreService;
