use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use roomsync_core::models::{ChangeType, Notification, NotificationId, Property, Unit};
use roomsync_core::reconcile::SyncStatus;
use roomsync_core::{AutoSyncConfig, EngineConfig, StoreService, SyncOutcome};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::commands::common::{
    apply_env_overrides, format_notification_lines, format_status_lines, load_engine_config,
    normalize_identifier, notification_to_list_item, property_to_status_item,
    require_property_id, resolve_config_path, resolve_db_path,
};
use crate::commands::config::{merge_config_init, ConfigInit};
use crate::commands::notifications::{list_notifications, run_mark_read};
use crate::commands::sync::run_sync;
use crate::commands::unlock::run_unlock;
use crate::commands::watch::{format_sync_status, resolve_auto_sync};
use crate::error::CliError;

#[test]
fn normalize_identifier_trims_and_rejects_blank() {
    assert_eq!(normalize_identifier("  p1 "), Some("p1".to_string()));
    assert_eq!(normalize_identifier(" \t "), None);
}

#[test]
fn require_property_id_rejects_blank() {
    assert!(matches!(
        require_property_id("   "),
        Err(CliError::EmptyPropertyId)
    ));
    assert_eq!(require_property_id(" p1 ").unwrap(), "p1");
}

#[test]
fn explicit_paths_take_precedence() {
    let db_path = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(db_path.clone())), db_path);

    let config_path = PathBuf::from("/tmp/explicit.json");
    assert_eq!(resolve_config_path(Some(config_path.clone())), config_path);
}

#[test]
fn env_overrides_replace_feed_url_and_user() {
    let config = EngineConfig {
        feed_url_template: Some("https://old.example.com/{external_id}".to_string()),
        ..EngineConfig::default()
    };

    let overridden = apply_env_overrides(
        config.clone(),
        Some(" https://new.example.com/{external_id} ".to_string()),
        Some("user-9".to_string()),
    );
    assert_eq!(
        overridden.feed_url_template.as_deref(),
        Some("https://new.example.com/{external_id}")
    );
    assert_eq!(overridden.default_user_id.as_deref(), Some("user-9"));

    let untouched = apply_env_overrides(config.clone(), Some("  ".to_string()), None);
    assert_eq!(untouched, config);
}

#[test]
fn config_init_keeps_unset_values() {
    let existing = EngineConfig {
        feed_url_template: Some("https://feed.example.com/{external_id}".to_string()),
        batch_size: 250,
        ..EngineConfig::default()
    };

    let merged = merge_config_init(
        existing,
        ConfigInit {
            proxies: vec!["{raw_url}".to_string()],
            interval: Some(60),
            ..ConfigInit::default()
        },
    );

    assert_eq!(
        merged.feed_url_template.as_deref(),
        Some("https://feed.example.com/{external_id}")
    );
    assert_eq!(merged.batch_size, 250);
    assert_eq!(merged.proxy_templates, vec!["{raw_url}".to_string()]);
    assert_eq!(
        merged.auto_sync,
        AutoSyncConfig {
            enabled: true,
            interval_secs: 60
        }
    );
}

#[test]
fn config_init_no_auto_sync_wins_over_interval() {
    let merged = merge_config_init(
        EngineConfig::default(),
        ConfigInit {
            interval: Some(30),
            no_auto_sync: true,
            ..ConfigInit::default()
        },
    );
    assert!(!merged.auto_sync.enabled);
    assert_eq!(merged.auto_sync.interval_secs, 30);
}

#[test]
fn watch_interval_enables_auto_sync() {
    let disabled = AutoSyncConfig {
        enabled: false,
        interval_secs: 300,
    };

    assert_eq!(resolve_auto_sync(disabled, None).unwrap(), disabled);
    assert_eq!(
        resolve_auto_sync(disabled, Some(15)).unwrap(),
        AutoSyncConfig {
            enabled: true,
            interval_secs: 15
        }
    );
    assert!(matches!(
        resolve_auto_sync(disabled, Some(0)),
        Err(CliError::Config(_))
    ));
}

#[test]
fn sync_status_line_shows_outcome() {
    let status = SyncStatus {
        at: 0,
        ok: false,
        message: "Feed fetch failed".to_string(),
    };
    let line = format_sync_status(&status);
    assert!(line.contains("failed: Feed fetch failed"));
}

#[test]
fn status_lines_describe_never_synced_property() {
    let property = Property::new("p1", "Seaside", "owner-1", None);
    let lines = format_status_lines(&property);

    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("Seaside (p1)"));
    assert!(lines[1].contains("not configured"));
    assert!(lines[2].contains("never"));
    assert!(lines[3].ends_with("no"));

    let item = property_to_status_item(&property);
    assert_eq!(item.id, "p1");
    assert!(!item.sync_in_progress);
}

#[test]
fn notification_lines_mark_unread() {
    let unread = sample_notification("user-1", false);
    let read = sample_notification("user-1", true);

    let lines = format_notification_lines(&[unread.clone(), read]);
    assert!(lines[0].starts_with('*'));
    assert!(lines[1].starts_with(' '));
    assert!(lines[0].contains("Seaside / Room 5 was booked from 2026-03-01 to 2026-03-03"));

    let item = notification_to_list_item(&unread);
    assert_eq!(item.change_type, "blocked");
    assert_eq!(item.start_date, "2026-03-01");
}

#[test]
fn load_engine_config_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, "{ not json").unwrap();

    assert!(matches!(
        load_engine_config(&config_path),
        Err(CliError::Core(roomsync_core::Error::Config(_)))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn unlock_clears_stuck_guard() {
    let db_path = unique_test_db_path();
    {
        let store = seed_store(&db_path).await;
        assert!(store.try_begin_sync("p1").await.unwrap());
    }

    assert!(run_unlock("p1", &db_path).await.unwrap());
    assert!(!run_unlock("p1", &db_path).await.unwrap());

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "multi_thread")]
async fn unlock_rejects_unknown_property() {
    let db_path = unique_test_db_path();
    seed_store(&db_path).await;

    let error = run_unlock("missing", &db_path).await.unwrap_err();
    assert!(matches!(error, CliError::PropertyNotFound(id) if id == "missing"));

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "multi_thread")]
async fn notifications_filter_and_mark_read() {
    let db_path = unique_test_db_path();
    let first = sample_notification("user-1", false);
    {
        let store = seed_store(&db_path).await;
        store
            .insert_notifications(&[
                first.clone(),
                sample_notification("user-1", false),
                sample_notification("user-2", false),
            ])
            .await
            .unwrap();
    }

    let for_user = list_notifications(Some("user-1"), false, 20, &db_path)
        .await
        .unwrap();
    assert_eq!(for_user.len(), 2);
    assert!(for_user.iter().all(|n| n.user_id == "user-1"));

    let limited = list_notifications(None, false, 1, &db_path).await.unwrap();
    assert_eq!(limited.len(), 1);

    run_mark_read(&first.id.to_string(), &db_path).await.unwrap();
    let unread = list_notifications(Some("user-1"), true, 20, &db_path)
        .await
        .unwrap();
    assert_eq!(unread.len(), 1);
    assert_ne!(unread[0].id, first.id);

    assert!(matches!(
        run_mark_read("  ", &db_path).await,
        Err(CliError::EmptyNotificationId)
    ));
    assert!(run_mark_read(&NotificationId::new().to_string(), &db_path)
        .await
        .is_err());

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_requires_feed_url() {
    let db_path = unique_test_db_path();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    EngineConfig::default().save_to_path(&config_path).unwrap();

    if std::env::var("ROOMSYNC_FEED_URL").is_err() {
        let error = run_sync("p1", None, None, &db_path, &config_path)
            .await
            .unwrap_err();
        assert!(matches!(error, CliError::FeedNotConfigured));
    }

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_writes_feed_and_stamps_property() {
    let db_path = unique_test_db_path();
    seed_store(&db_path).await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let config = EngineConfig {
        feed_url_template: Some(
            spawn_feed_server(r#"[{"type_id":"5","dates":{"2026-03-01":0,"2026-03-02":1}}]"#)
                .await,
        ),
        proxy_templates: vec!["{raw_url}".to_string()],
        ..EngineConfig::default()
    };
    config.save_to_path(&config_path).unwrap();

    let outcome = run_sync("p1", None, Some("user-1"), &db_path, &config_path)
        .await
        .unwrap();
    let SyncOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.units_matched, 1);
    assert_eq!(summary.inserted, 1);
    assert!(summary.first_sync);

    let store = StoreService::open_path(&db_path, None).await.unwrap();
    let property = store.get_property("p1").await.unwrap().unwrap();
    assert!(property.last_synced_at.is_some());
    assert!(!property.sync_in_progress);

    cleanup_db_files(&db_path);
}

async fn seed_store(db_path: &Path) -> StoreService {
    let store = StoreService::open_path(db_path, None).await.unwrap();
    store
        .create_property(&Property::new(
            "p1",
            "Seaside",
            "owner-1",
            Some("77".to_string()),
        ))
        .await
        .unwrap();
    store
        .create_unit(&Unit::new("u1", "p1", "Room 5", Some("5".to_string())))
        .await
        .unwrap();
    store
}

async fn spawn_feed_server(body: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request_buffer = [0_u8; 2048];
            let _ = socket.read(&mut request_buffer).await;
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    format!("http://{address}/feed/{{external_id}}?from={{start}}&to={{end}}")
}

fn sample_notification(user_id: &str, is_read: bool) -> Notification {
    Notification {
        id: NotificationId::new(),
        user_id: user_id.to_string(),
        property_id: "p1".to_string(),
        unit_id: "u1".to_string(),
        property_name: "Seaside".to_string(),
        unit_name: "Room 5".to_string(),
        change_type: ChangeType::Blocked,
        start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
        is_read,
        created_at: 1_700_000_000_000,
    }
}

fn unique_test_db_path() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let suffix = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("roomsync-cli-test-{nanos}-{suffix}.db"))
}

fn cleanup_db_files(db_path: &Path) {
    let _ = std::fs::remove_file(db_path);
    let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
    let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
}
