pub mod common;
pub mod config;
pub mod notifications;
pub mod status;
pub mod sync;
pub mod unlock;
pub mod watch;
