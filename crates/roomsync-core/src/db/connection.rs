//! libSQL database handle: local file, in-memory, or embedded replica.

use std::path::{Path, PathBuf};

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use super::migrations;
use crate::error::{Error, Result};
use crate::util::unix_millis_now;

/// The initial replica pull needs more stack than a tokio worker thread has
const REPLICA_OPEN_STACK_BYTES: usize = 8 * 1024 * 1024;

/// Error texts of a local replica the sync protocol no longer accepts
const STALE_REPLICA_MARKERS: [&str; 3] = [
    "file is not a database",
    "invalid local state",
    "metadata file exists but db file does not",
];

/// Remote Turso database mirrored by an embedded replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: String,
    pub auth_token: String,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
        }
    }
}

/// An open database and its single connection
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replica: bool,
}

impl Database {
    /// Open (or create) a local database file and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_local(&path.as_ref().to_string_lossy()).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open_local(":memory:").await
    }

    async fn open_local(location: &str) -> Result<Self> {
        let db = Builder::new_local(location).build().await?;
        Self::prepare(db, false).await
    }

    /// Open an embedded replica of `config`'s remote at `path`.
    ///
    /// Blocks the calling thread. A local copy the remote rejects is moved
    /// aside and the replica is cloned again, once.
    pub fn open_replica(path: &Path, config: &SyncConfig) -> Result<Self> {
        tracing::info!("Opening embedded replica of {}", config.url);
        match Self::open_replica_on_thread(path, config) {
            Err(error) if is_stale_replica_error(&error) => {
                let backup = set_aside_replica(path)?;
                tracing::warn!(
                    %error,
                    backup = %backup.display(),
                    "Local replica rejected by remote; cloning it again"
                );
                Self::open_replica_on_thread(path, config)
            }
            result => result,
        }
    }

    fn open_replica_on_thread(path: &Path, config: &SyncConfig) -> Result<Self> {
        let path = path.to_path_buf();
        let config = config.clone();
        std::thread::Builder::new()
            .name("roomsync-replica-open".to_string())
            .stack_size(REPLICA_OPEN_STACK_BYTES)
            .spawn(move || -> Result<Self> {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(Self::connect_replica(&path, config))
            })?
            .join()
            .map_err(|_| Error::Database("replica open thread panicked".to_string()))?
    }

    async fn connect_replica(path: &Path, config: SyncConfig) -> Result<Self> {
        let db = Builder::new_remote_replica(path, config.url, config.auth_token)
            .build()
            .await?;
        // Pull the remote schema first so migrations see its tables
        db.sync().await?;
        Self::prepare(db, true).await
    }

    async fn prepare(db: LibSqlDatabase, replica: bool) -> Result<Self> {
        let conn = db.connect()?;
        if !replica {
            conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
        }
        conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        migrations::run(&conn).await?;
        Ok(Self { db, conn, replica })
    }

    /// Pull remote changes into the replica; a no-op for local databases.
    pub async fn pull(&self) -> Result<()> {
        if self.replica {
            self.db.sync().await?;
            tracing::debug!("Replica pulled from remote");
        }
        Ok(())
    }

    pub const fn is_replica(&self) -> bool {
        self.replica
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn is_stale_replica_error(error: &Error) -> bool {
    let message = error.to_string().to_ascii_lowercase();
    STALE_REPLICA_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Move the replica file and its `-suffixed` companions into a timestamped
/// directory next to it; returns that directory.
fn set_aside_replica(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("replica path {} has no file name", path.display())))?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let companion_prefix = format!("{file_name}-");
    let mut replica_files = Vec::new();
    for entry in std::fs::read_dir(parent)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file()
            && (name == file_name || name.starts_with(&companion_prefix))
        {
            replica_files.push((entry.path(), name));
        }
    }

    let backup = parent.join(format!("{file_name}.stale-{}", unix_millis_now()));
    std::fs::create_dir_all(&backup)?;
    for (source, name) in replica_files {
        std::fs::rename(source, backup.join(name))?;
    }
    Ok(backup)
}
