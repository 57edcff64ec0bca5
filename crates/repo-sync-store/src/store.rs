use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use repo_sync::{
    BaseFileListItem, ContentCache, ContentSnapshot, EntryFile, FileKind, FileMeta, HandleStore,
    SyncError,
};
use tracing::debug;

use crate::schema;

/// A SQLite-backed cache of synced content and local directory handles.
pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open a store backed by a file on disk.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: rusqlite::Connection) -> Result<Self, StoreError> {
        schema::migrations()
            .to_latest(&mut conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Read the stored snapshot for `database`, if one was ever saved.
    pub fn load_snapshot(&self, database: &str) -> Result<Option<ContentSnapshot>, StoreError> {
        let conn = self.lock()?;

        let hash: Option<Option<String>> = match conn.query_row(
            "SELECT last_commit_hash FROM snapshots WHERE database_name = ?1",
            [database],
            |row| row.get(0),
        ) {
            Ok(hash) => Some(hash),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        let Some(last_commit_hash) = hash else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT path, kind, sha, size, text, last_modified
             FROM files
             WHERE database_name = ?1
             ORDER BY position",
        )?;
        let rows = stmt.query_map([database], |row| {
            Ok(FileRow {
                path: row.get(0)?,
                kind: row.get(1)?,
                sha: row.get(2)?,
                size: row.get(3)?,
                text: row.get(4)?,
                last_modified: row.get(5)?,
            })
        })?;

        let mut snapshot = ContentSnapshot {
            last_commit_hash,
            ..ContentSnapshot::default()
        };
        for row in rows {
            let row = row?;
            let item = BaseFileListItem::new(row.path, row.sha, row.size.max(0) as u64);
            match FileKind::parse(&row.kind) {
                Some(FileKind::Entry) => snapshot.entries.push(EntryFile {
                    path: item.path,
                    name: item.name,
                    sha: item.sha,
                    size: item.size,
                    text: row.text.unwrap_or_default(),
                    meta: FileMeta {
                        last_modified: row.last_modified.as_deref().and_then(parse_timestamp),
                    },
                }),
                Some(FileKind::Asset) => snapshot.assets.push(item),
                None => {
                    return Err(StoreError::Database(format!(
                        "unknown file kind {:?}",
                        row.kind
                    )));
                }
            }
        }

        Ok(Some(snapshot))
    }

    /// Replace everything stored for `database` with `snapshot`.
    pub fn save_snapshot(
        &self,
        database: &str,
        snapshot: &ContentSnapshot,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM files WHERE database_name = ?1", [database])?;
        tx.execute(
            "INSERT OR REPLACE INTO snapshots (database_name, last_commit_hash, synced_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                database,
                snapshot.last_commit_hash,
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT OR REPLACE INTO files
                    (database_name, path, position, kind, sha, size, text, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut position = 0i64;
            for entry in &snapshot.entries {
                insert.execute(rusqlite::params![
                    database,
                    entry.path,
                    position,
                    FileKind::Entry.as_str(),
                    entry.sha,
                    entry.size as i64,
                    entry.text,
                    entry
                        .meta
                        .last_modified
                        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ])?;
                position += 1;
            }
            for asset in &snapshot.assets {
                insert.execute(rusqlite::params![
                    database,
                    asset.path,
                    position,
                    FileKind::Asset.as_str(),
                    asset.sha,
                    asset.size as i64,
                    Option::<String>::None,
                    Option::<String>::None,
                ])?;
                position += 1;
            }
        }

        tx.commit()?;
        debug!(
            database,
            entries = snapshot.entries.len(),
            assets = snapshot.assets.len(),
            "saved snapshot"
        );
        Ok(())
    }

    /// When `database` was last saved, if ever.
    pub fn synced_at(&self, database: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.lock()?;
        match conn.query_row(
            "SELECT synced_at FROM snapshots WHERE database_name = ?1",
            [database],
            |row| row.get::<_, String>(0),
        ) {
            Ok(text) => Ok(parse_timestamp(&text)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the cached snapshot for `database`.
    pub fn clear(&self, database: &str) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM files WHERE database_name = ?1", [database])?;
        tx.execute("DELETE FROM snapshots WHERE database_name = ?1", [database])?;
        tx.commit()?;
        Ok(())
    }

    pub fn handle(&self, key: &str) -> Result<Option<PathBuf>, StoreError> {
        let conn = self.lock()?;
        match conn.query_row(
            "SELECT path FROM directory_handles WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(path) => Ok(Some(PathBuf::from(path))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_handle(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO directory_handles (key, path) VALUES (?1, ?2)",
            rusqlite::params![key, path.to_string_lossy().into_owned()],
        )?;
        Ok(())
    }

    pub fn remove_handle(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM directory_handles WHERE key = ?1", [key])?;
        Ok(())
    }
}

struct FileRow {
    path: String,
    kind: String,
    sha: String,
    size: i64,
    text: Option<String>,
    last_modified: Option<String>,
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait::async_trait]
impl ContentCache for SqliteStore {
    async fn load(&self, database: &str) -> Result<Option<ContentSnapshot>, SyncError> {
        Ok(self.load_snapshot(database)?)
    }

    async fn save(&self, database: &str, snapshot: &ContentSnapshot) -> Result<(), SyncError> {
        Ok(self.save_snapshot(database, snapshot)?)
    }
}

#[async_trait::async_trait]
impl HandleStore for SqliteStore {
    async fn load_handle(&self, key: &str) -> Result<Option<PathBuf>, SyncError> {
        Ok(self.handle(key)?)
    }

    async fn save_handle(&self, key: &str, path: &Path) -> Result<(), SyncError> {
        Ok(self.set_handle(key, path)?)
    }

    async fn forget_handle(&self, key: &str) -> Result<(), SyncError> {
        Ok(self.remove_handle(key)?)
    }
}

/// Errors specific to store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Storage(e.to_string())
    }
}
