use std::sync::Arc;

use crate::change::{CommitOptions, CommitResults, FileChange};
use crate::error::SyncError;
use crate::file::{BaseFileListItem, FileListItem, RepositoryContentsMap};
use crate::progress::ProgressCallback;
use crate::repository::{LastCommit, RepositoryContext};

/// A repository backend.
///
/// One implementation exists per hosting service. The implementation is
/// chosen once at startup and injected wherever repository access is
/// needed.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable label identifying this backend.
    fn label(&self) -> &str;

    fn repository(&self) -> &RepositoryContext;

    /// Verify the remote service speaks an API this backend understands.
    async fn check_compatibility(&self) -> Result<(), SyncError> {
        Ok(())
    }

    /// Verify the signed-in user may read and write the repository.
    async fn check_access(&self) -> Result<(), SyncError>;

    /// Look up the repository's default branch. Backends that resolve it
    /// remember the answer for the rest of the session.
    async fn fetch_default_branch_name(&self) -> Result<String, SyncError>;

    /// Tip commit of the working branch.
    async fn fetch_last_commit(&self) -> Result<LastCommit, SyncError>;

    /// Every blob in the repository at `last_hash`, or at the branch tip
    /// when no hash is given.
    async fn fetch_file_list(
        &self,
        last_hash: Option<&str>,
    ) -> Result<Vec<BaseFileListItem>, SyncError>;

    /// Text contents for the non-asset `items`, keyed by path.
    async fn fetch_file_contents(
        &self,
        items: &[FileListItem],
        progress: &ProgressCallback<'_>,
    ) -> Result<RepositoryContentsMap, SyncError>;

    /// Raw bytes of one asset.
    async fn fetch_blob(&self, asset: &BaseFileListItem) -> Result<Vec<u8>, SyncError>;

    /// Apply `changes` as one atomic commit.
    async fn commit_changes(
        &self,
        changes: &[FileChange],
        options: &CommitOptions,
    ) -> Result<CommitResults, SyncError>;
}

#[async_trait::async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn repository(&self) -> &RepositoryContext {
        (**self).repository()
    }

    async fn check_compatibility(&self) -> Result<(), SyncError> {
        (**self).check_compatibility().await
    }

    async fn check_access(&self) -> Result<(), SyncError> {
        (**self).check_access().await
    }

    async fn fetch_default_branch_name(&self) -> Result<String, SyncError> {
        (**self).fetch_default_branch_name().await
    }

    async fn fetch_last_commit(&self) -> Result<LastCommit, SyncError> {
        (**self).fetch_last_commit().await
    }

    async fn fetch_file_list(
        &self,
        last_hash: Option<&str>,
    ) -> Result<Vec<BaseFileListItem>, SyncError> {
        (**self).fetch_file_list(last_hash).await
    }

    async fn fetch_file_contents(
        &self,
        items: &[FileListItem],
        progress: &ProgressCallback<'_>,
    ) -> Result<RepositoryContentsMap, SyncError> {
        (**self).fetch_file_contents(items, progress).await
    }

    async fn fetch_blob(&self, asset: &BaseFileListItem) -> Result<Vec<u8>, SyncError> {
        (**self).fetch_blob(asset).await
    }

    async fn commit_changes(
        &self,
        changes: &[FileChange],
        options: &CommitOptions,
    ) -> Result<CommitResults, SyncError> {
        (**self).commit_changes(changes, options).await
    }
}
