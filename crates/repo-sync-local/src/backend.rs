use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use repo_sync::{
    Backend, BaseFileListItem, CommitOptions, CommitResults, EnglishStrings, FileChange,
    FileListItem, FileMeta, HandleStore, LastCommit, ProgressCallback, RepositoryContentsMap,
    RepositoryContext, RepositoryFile, SyncError, Translator, percent_complete,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::commit;
use crate::fs::{self, blob_sha, resolve};

/// Asks the user to choose a directory. Returns [`SyncError::Aborted`] when
/// the user dismisses the prompt.
#[async_trait::async_trait]
pub trait DirectoryPicker: Send + Sync {
    async fn pick(&self) -> Result<PathBuf, SyncError>;
}

#[async_trait::async_trait]
impl<T: DirectoryPicker + ?Sized> DirectoryPicker for Arc<T> {
    async fn pick(&self) -> Result<PathBuf, SyncError> {
        (**self).pick().await
    }
}

/// Repository backend over a directory on the local filesystem.
///
/// The chosen directory is remembered in a [`HandleStore`] so later sessions
/// can restore it without prompting. A stored directory that no longer
/// resolves, or cannot be written, is treated as denied and the user is asked
/// again.
pub struct LocalBackend {
    repository: RepositoryContext,
    handles: Arc<dyn HandleStore>,
    picker: Arc<dyn DirectoryPicker>,
    translator: Arc<dyn Translator>,
    root: RwLock<Option<PathBuf>>,
}

impl LocalBackend {
    pub fn new(
        repository: RepositoryContext,
        handles: Arc<dyn HandleStore>,
        picker: Arc<dyn DirectoryPicker>,
    ) -> Self {
        Self {
            repository,
            handles,
            picker,
            translator: Arc::new(EnglishStrings),
            root: RwLock::new(None),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    fn handle_key(&self) -> String {
        self.repository
            .database_name
            .clone()
            .unwrap_or_else(|| self.repository.full_name())
    }

    /// Restore a previously chosen directory without prompting.
    pub async fn init(&self) -> Result<Option<PathBuf>, SyncError> {
        self.get_root_dir(false).await
    }

    /// Restore the directory, prompting for one if needed.
    pub async fn sign_in(&self) -> Result<PathBuf, SyncError> {
        self.get_root_dir(true).await?.ok_or(SyncError::Aborted)
    }

    /// Forget the chosen directory.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        *self.root.write().await = None;
        self.handles.forget_handle(&self.handle_key()).await
    }

    /// Resolve the working directory.
    ///
    /// Tries the directory already in use, then the stored one. When neither
    /// is usable the picker is shown if `show_picker` is set; otherwise
    /// `None` is returned.
    pub async fn get_root_dir(&self, show_picker: bool) -> Result<Option<PathBuf>, SyncError> {
        let current = self.root.read().await.clone();
        if let Some(root) = current {
            if is_usable(&root).await {
                return Ok(Some(root));
            }
            debug!(root = %root.display(), "directory no longer usable");
        }

        let key = self.handle_key();
        if let Some(stored) = self.handles.load_handle(&key).await? {
            if is_usable(&stored).await {
                *self.root.write().await = Some(stored.clone());
                return Ok(Some(stored));
            }
            debug!(root = %stored.display(), "stored directory no longer usable");
        }

        if !show_picker {
            return Ok(None);
        }

        let picked = self.picker.pick().await?;
        if !is_usable(&picked).await {
            return Err(self.unavailable());
        }

        self.handles.save_handle(&key, &picked).await?;
        *self.root.write().await = Some(picked.clone());
        info!(root = %picked.display(), "selected local directory");
        Ok(Some(picked))
    }

    async fn root(&self) -> Result<PathBuf, SyncError> {
        self.get_root_dir(false)
            .await?
            .ok_or_else(|| self.unavailable())
    }

    fn unavailable(&self) -> SyncError {
        SyncError::described(
            "Access to the local directory is required.",
            self.translator.translate(
                "directory_unavailable",
                &[("repo", self.repository.full_name().as_str())],
            ),
        )
    }
}

/// A directory is usable when its entries can be listed and it is writable.
async fn is_usable(path: &Path) -> bool {
    let Ok(mut entries) = tokio::fs::read_dir(path).await else {
        return false;
    };
    if entries.next_entry().await.is_err() {
        return false;
    }
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
        Err(_) => false,
    }
}

#[async_trait::async_trait]
impl Backend for LocalBackend {
    fn label(&self) -> &str {
        &self.repository.repo
    }

    fn repository(&self) -> &RepositoryContext {
        &self.repository
    }

    async fn check_access(&self) -> Result<(), SyncError> {
        self.root().await.map(|_| ())
    }

    async fn fetch_default_branch_name(&self) -> Result<String, SyncError> {
        Err(SyncError::Unsupported(
            "local directories have no branches".into(),
        ))
    }

    async fn fetch_last_commit(&self) -> Result<LastCommit, SyncError> {
        Err(SyncError::Unsupported(
            "local directories have no commit history".into(),
        ))
    }

    async fn fetch_file_list(
        &self,
        _last_hash: Option<&str>,
    ) -> Result<Vec<BaseFileListItem>, SyncError> {
        let root = self.root().await?;
        let files = fs::list_files(&root).await?;
        debug!(root = %root.display(), files = files.len(), "listed local files");
        Ok(files)
    }

    async fn fetch_file_contents(
        &self,
        items: &[FileListItem],
        progress: &ProgressCallback<'_>,
    ) -> Result<RepositoryContentsMap, SyncError> {
        let entries: Vec<&FileListItem> = items.iter().filter(|i| !i.is_asset()).collect();
        let mut contents = RepositoryContentsMap::with_capacity(entries.len());
        if entries.is_empty() {
            return Ok(contents);
        }

        let root = self.root().await?;
        progress(Some(0));

        for (index, item) in entries.iter().enumerate() {
            let path = resolve(&root, item.path())?;
            let bytes = tokio::fs::read(&path).await?;
            let last_modified = tokio::fs::metadata(&path)
                .await?
                .modified()
                .ok()
                .map(DateTime::<Utc>::from);

            let text = String::from_utf8(bytes.clone()).unwrap_or_else(|_| {
                warn!(path = item.path(), "file is not valid UTF-8");
                String::new()
            });

            contents.insert(
                item.path().to_owned(),
                RepositoryFile {
                    sha: blob_sha(&bytes),
                    size: bytes.len() as u64,
                    text,
                    meta: FileMeta { last_modified },
                    fetched: true,
                },
            );
            progress(Some(percent_complete(index + 1, entries.len())));
        }

        progress(None);
        Ok(contents)
    }

    async fn fetch_blob(&self, asset: &BaseFileListItem) -> Result<Vec<u8>, SyncError> {
        let root = self.root().await?;
        let path = resolve(&root, &asset.path)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::NotFound(asset.path.clone())
            } else {
                e.into()
            }
        })
    }

    async fn commit_changes(
        &self,
        changes: &[FileChange],
        _options: &CommitOptions,
    ) -> Result<CommitResults, SyncError> {
        let root = self.root().await?;

        // Nothing is written until the whole change-set has been checked.
        let staged = commit::stage(&root, changes).await?;
        let results = commit::apply(staged).await?;

        info!(root = %root.display(), files = results.files.len(), "applied changes");
        Ok(results)
    }
}
