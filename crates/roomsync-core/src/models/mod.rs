//! Data models for roomsync

mod availability;
mod change_event;
mod notification;
mod property;
mod unit;

pub use availability::{AvailabilityRecord, AvailabilityStatus, RecordId};
pub use change_event::{ChangeEvent, ChangeKind};
pub use notification::{ChangeType, Notification, NotificationId};
pub use property::Property;
pub use unit::Unit;
