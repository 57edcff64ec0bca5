use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SyncError;
use crate::file::{BaseFileListItem, EntryFile};

/// Everything a sync produced, persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSnapshot {
    /// Tip commit the snapshot was taken at. `None` for backends without
    /// commit history.
    pub last_commit_hash: Option<String>,
    pub entries: Vec<EntryFile>,
    pub assets: Vec<BaseFileListItem>,
}

/// Persistent cache of synced repository content, keyed by database name.
#[async_trait::async_trait]
pub trait ContentCache: Send + Sync {
    async fn load(&self, database: &str) -> Result<Option<ContentSnapshot>, SyncError>;

    /// Replace the stored snapshot for `database`.
    async fn save(&self, database: &str, snapshot: &ContentSnapshot) -> Result<(), SyncError>;
}

/// Keyed store for local directory handles.
#[async_trait::async_trait]
pub trait HandleStore: Send + Sync {
    async fn load_handle(&self, key: &str) -> Result<Option<PathBuf>, SyncError>;

    async fn save_handle(&self, key: &str, path: &Path) -> Result<(), SyncError>;

    async fn forget_handle(&self, key: &str) -> Result<(), SyncError>;
}

#[async_trait::async_trait]
impl<T: ContentCache + ?Sized> ContentCache for Arc<T> {
    async fn load(&self, database: &str) -> Result<Option<ContentSnapshot>, SyncError> {
        (**self).load(database).await
    }

    async fn save(&self, database: &str, snapshot: &ContentSnapshot) -> Result<(), SyncError> {
        (**self).save(database, snapshot).await
    }
}

#[async_trait::async_trait]
impl<T: HandleStore + ?Sized> HandleStore for Arc<T> {
    async fn load_handle(&self, key: &str) -> Result<Option<PathBuf>, SyncError> {
        (**self).load_handle(key).await
    }

    async fn save_handle(&self, key: &str, path: &Path) -> Result<(), SyncError> {
        (**self).save_handle(key, path).await
    }

    async fn forget_handle(&self, key: &str) -> Result<(), SyncError> {
        (**self).forget_handle(key).await
    }
}
