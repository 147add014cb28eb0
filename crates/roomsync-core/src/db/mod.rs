//! Database layer for roomsync

mod availability_repository;
mod connection;
mod migrations;
mod notification_repository;
mod property_repository;
mod row;
mod unit_repository;

pub use availability_repository::{AvailabilityRepository, LibSqlAvailabilityRepository};
pub use connection::{Database, SyncConfig};
pub use notification_repository::{
    LibSqlNotificationRepository, NotificationFilter, NotificationRepository,
};
pub use property_repository::{LibSqlPropertyRepository, PropertyRepository};
pub use unit_repository::{LibSqlUnitRepository, UnitRepository};
