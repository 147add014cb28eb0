//! Notification repository implementation

use libsql::params::Params;
use libsql::{Connection, Value};

use crate::error::{Error, Result};
use crate::models::{ChangeType, Notification};

use super::row::{date, date_value, values_placeholders};

const COLUMNS: usize = 11;

/// Listing filter for stored notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Restrict to one recipient
    pub user_id: Option<String>,
    /// Only unread notifications
    pub unread_only: bool,
    /// Maximum number of rows (newest first)
    pub limit: Option<usize>,
}

/// Trait for notification storage operations (async)
#[allow(async_fn_in_trait)]
pub trait NotificationRepository {
    /// Insert notifications as one atomic statement
    async fn insert_batch(&self, notifications: &[Notification]) -> Result<()>;

    /// List notifications matching the filter, newest first
    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>>;

    /// Mark a notification as read
    async fn mark_read(&self, id: &str) -> Result<()>;
}

/// libSQL implementation of `NotificationRepository`
pub struct LibSqlNotificationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlNotificationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_notification(row: &libsql::Row) -> Result<Notification> {
        let id: String = row.get(0)?;
        let change_type: String = row.get(6)?;
        Ok(Notification {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid notification id '{id}'")))?,
            user_id: row.get(1)?,
            property_id: row.get(2)?,
            unit_id: row.get(3)?,
            property_name: row.get(4)?,
            unit_name: row.get(5)?,
            change_type: change_type.parse::<ChangeType>().map_err(Error::Database)?,
            start_date: date(row, 7)?,
            end_date: date(row, 8)?,
            is_read: row.get::<i64>(9)? != 0,
            created_at: row.get(10)?,
        })
    }
}

impl NotificationRepository for LibSqlNotificationRepository<'_> {
    async fn insert_batch(&self, notifications: &[Notification]) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut values = Vec::with_capacity(notifications.len() * COLUMNS);
        for notification in notifications {
            values.push(Value::Text(notification.id.as_str()));
            values.push(Value::Text(notification.user_id.clone()));
            values.push(Value::Text(notification.property_id.clone()));
            values.push(Value::Text(notification.unit_id.clone()));
            values.push(Value::Text(notification.property_name.clone()));
            values.push(Value::Text(notification.unit_name.clone()));
            values.push(Value::Text(notification.change_type.as_str().to_string()));
            values.push(date_value(notification.start_date));
            values.push(date_value(notification.end_date));
            values.push(Value::Integer(i64::from(notification.is_read)));
            values.push(Value::Integer(notification.created_at));
        }

        let sql = format!(
            "INSERT INTO notifications (id, user_id, property_id, unit_id, property_name, unit_name,
                 change_type, start_date, end_date, is_read, created_at) VALUES {}",
            values_placeholders(notifications.len(), COLUMNS)
        );
        self.conn.execute(&sql, Params::Positional(values)).await?;
        Ok(())
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let mut sql = String::from(
            "SELECT id, user_id, property_id, unit_id, property_name, unit_name,
                    change_type, start_date, end_date, is_read, created_at
             FROM notifications WHERE 1 = 1",
        );
        let mut values = Vec::new();

        if let Some(user_id) = &filter.user_id {
            sql.push_str(" AND user_id = ?");
            values.push(Value::Text(user_id.clone()));
        }
        if filter.unread_only {
            sql.push_str(" AND is_read = 0");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let mut rows = self.conn.query(&sql, Params::Positional(values)).await?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next().await? {
            notifications.push(Self::parse_notification(&row)?);
        }
        Ok(notifications)
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("UPDATE notifications SET is_read = 1 WHERE id = ?", [id])
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!("notification {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NotificationId;
    use pretty_assertions::assert_eq;

    fn notification(user_id: &str, created_at: i64, change_type: ChangeType) -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id: user_id.to_string(),
            property_id: "p1".to_string(),
            unit_id: "u1".to_string(),
            property_name: "Seaside".to_string(),
            unit_name: "Room 5".to_string(),
            change_type,
            start_date: "2026-03-01".parse().unwrap(),
            end_date: "2026-03-03".parse().unwrap(),
            is_read: false,
            created_at,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_list_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNotificationRepository::new(db.connection());

        let older = notification("owner-1", 1_000, ChangeType::Blocked);
        let newer = notification("owner-1", 2_000, ChangeType::Available);
        let other = notification("owner-2", 3_000, ChangeType::Blocked);
        repo.insert_batch(&[older.clone(), newer.clone(), other])
            .await
            .unwrap();

        let listed = repo
            .list(&NotificationFilter {
                user_id: Some("owner-1".to_string()),
                ..NotificationFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(listed, vec![newer, older]);

        let all = repo.list(&NotificationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_read_and_unread_filter() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNotificationRepository::new(db.connection());

        let first = notification("owner-1", 1_000, ChangeType::Blocked);
        let second = notification("owner-1", 2_000, ChangeType::Blocked);
        repo.insert_batch(&[first.clone(), second.clone()])
            .await
            .unwrap();

        repo.mark_read(&first.id.as_str()).await.unwrap();

        let unread = repo
            .list(&NotificationFilter {
                unread_only: true,
                ..NotificationFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, second.id);

        let limited = repo
            .list(&NotificationFilter {
                limit: Some(1),
                ..NotificationFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_read_missing_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlNotificationRepository::new(db.connection());
        assert!(matches!(
            repo.mark_read("missing").await,
            Err(Error::NotFound(_))
        ));
    }
}
