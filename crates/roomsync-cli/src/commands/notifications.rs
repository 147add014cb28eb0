use std::path::Path;

use roomsync_core::db::NotificationFilter;
use roomsync_core::models::Notification;

use crate::cli::NotificationCommands;
use crate::commands::common::{
    format_notification_lines, normalize_identifier, notification_to_list_item, open_store,
    NotificationListItem,
};
use crate::error::CliError;

pub async fn run_notifications(
    command: NotificationCommands,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        NotificationCommands::List {
            user,
            unread,
            limit,
            json,
        } => {
            let notifications = list_notifications(user.as_deref(), unread, limit, db_path).await?;
            print_notifications(&notifications, json)
        }
        NotificationCommands::Read { id } => run_mark_read(&id, db_path).await,
    }
}

pub async fn list_notifications(
    user: Option<&str>,
    unread_only: bool,
    limit: usize,
    db_path: &Path,
) -> Result<Vec<Notification>, CliError> {
    let store = open_store(db_path).await?;
    let filter = NotificationFilter {
        user_id: user.and_then(normalize_identifier),
        unread_only,
        limit: Some(limit),
    };
    Ok(store.list_notifications(&filter).await?)
}

fn print_notifications(notifications: &[Notification], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = notifications
            .iter()
            .map(notification_to_list_item)
            .collect::<Vec<NotificationListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    for line in format_notification_lines(notifications) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_mark_read(id: &str, db_path: &Path) -> Result<(), CliError> {
    let id = normalize_identifier(id).ok_or(CliError::EmptyNotificationId)?;
    let store = open_store(db_path).await?;
    store.mark_notification_read(&id).await?;
    println!("Marked notification {id} as read");
    Ok(())
}
