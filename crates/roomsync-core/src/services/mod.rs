//! Shared service layer used by the engine and clients.

pub mod store;

pub use store::{StoreService, StoreTransaction};
