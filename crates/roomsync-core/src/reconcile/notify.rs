//! Notification emitter: turn change events into persisted notifications.

use crate::models::{ChangeEvent, Notification, NotificationId, Property, Unit};
use crate::services::StoreTransaction;
use crate::Result;

/// One notification per event, denormalizing current property and unit names.
pub fn build_notifications(
    events: &[ChangeEvent],
    property: &Property,
    unit: &Unit,
    user_id: &str,
    now: i64,
) -> Vec<Notification> {
    events
        .iter()
        .map(|event| Notification {
            id: NotificationId::new(),
            user_id: user_id.to_string(),
            property_id: property.id.clone(),
            unit_id: unit.id.clone(),
            property_name: property.name.clone(),
            unit_name: unit.name.clone(),
            change_type: event.kind.into(),
            start_date: event.start,
            end_date: event.end,
            is_read: false,
            created_at: now,
        })
        .collect()
}

/// Persist notifications for one unit's events inside the unit's transaction.
///
/// Returns what was written; log it with [`announce`] once the transaction
/// has committed.
pub async fn emit(
    tx: &StoreTransaction<'_>,
    events: &[ChangeEvent],
    property: &Property,
    unit: &Unit,
    user_id: &str,
) -> Result<Vec<Notification>> {
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let notifications =
        build_notifications(events, property, unit, user_id, crate::util::unix_millis_now());
    tx.insert_notifications(&notifications).await?;
    Ok(notifications)
}

pub fn announce(notifications: &[Notification]) {
    for notification in notifications {
        tracing::info!(
            notification_id = %notification.id,
            property_id = %notification.property_id,
            unit_id = %notification.unit_id,
            change_type = %notification.change_type,
            "{}",
            notification.message()
        );
    }
}
