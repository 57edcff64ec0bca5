use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use crate::{
    Backend, BaseFileListItem, CommitOptions, CommitResults, CommittedFile, ContentCache,
    ContentSnapshot, EntryFile, FileChange, FileListItem, FileMeta, HandleStore, LastCommit,
    ProgressCallback, RepositoryContentsMap, RepositoryContext, RepositoryFile, Service,
    SyncError, SyncSink, percent_complete,
};

/// In-memory backend for testing. Serves a fixed set of files, records
/// which operations were called, and can be told to fail at one step.
pub struct ScriptedBackend {
    repository: RepositoryContext,
    files: Mutex<Vec<(BaseFileListItem, String)>>,
    last_commit: Mutex<String>,
    fail_at: Option<&'static str>,
    calls: Mutex<Vec<&'static str>>,
    content_requests: Mutex<Vec<Vec<String>>>,
    missing: Mutex<HashSet<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            repository: RepositoryContext {
                service: Service::Gitea,
                owner: "acme".into(),
                repo: "site".into(),
                branch: Some("main".into()),
                base_url: "http://localhost".into(),
                database_name: None,
            },
            files: Mutex::new(Vec::new()),
            last_commit: Mutex::new("commit-1".into()),
            fail_at: None,
            calls: Mutex::new(Vec::new()),
            content_requests: Mutex::new(Vec::new()),
            missing: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_file(self, path: &str, sha: &str, text: &str) -> Self {
        self.files.lock().unwrap().push((
            BaseFileListItem::new(path, sha, text.len() as u64),
            text.to_owned(),
        ));
        self
    }

    pub fn failing_at(mut self, step: &'static str) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn without_branch(mut self) -> Self {
        self.repository.branch = None;
        self
    }

    pub fn with_database(mut self, name: &str) -> Self {
        self.repository.database_name = Some(name.to_owned());
        self
    }

    pub fn set_last_commit(&self, hash: &str) {
        *self.last_commit.lock().unwrap() = hash.to_owned();
    }

    pub fn replace_file(&self, path: &str, sha: &str, text: &str) {
        let mut files = self.files.lock().unwrap();
        files.retain(|(item, _)| item.path != path);
        files.push((
            BaseFileListItem::new(path, sha, text.len() as u64),
            text.to_owned(),
        ));
    }

    /// Serve `path` as if the server returned no content for it.
    pub fn set_content_missing(&self, path: &str, missing: bool) {
        let mut paths = self.missing.lock().unwrap();
        if missing {
            paths.insert(path.to_owned());
        } else {
            paths.remove(path);
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Paths passed to the most recent content fetch.
    pub fn last_content_request(&self) -> Vec<String> {
        self.content_requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    fn step(&self, name: &'static str) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(name);
        if self.fail_at == Some(name) {
            return Err(SyncError::described(
                format!("{name} failed"),
                "scripted failure",
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    fn label(&self) -> &str {
        "scripted"
    }

    fn repository(&self) -> &RepositoryContext {
        &self.repository
    }

    async fn check_compatibility(&self) -> Result<(), SyncError> {
        self.step("check_compatibility")
    }

    async fn check_access(&self) -> Result<(), SyncError> {
        self.step("check_access")
    }

    async fn fetch_default_branch_name(&self) -> Result<String, SyncError> {
        self.step("fetch_default_branch_name")?;
        Ok("main".into())
    }

    async fn fetch_last_commit(&self) -> Result<LastCommit, SyncError> {
        self.step("fetch_last_commit")?;
        Ok(LastCommit {
            hash: self.last_commit.lock().unwrap().clone(),
            message: "scripted commit".into(),
        })
    }

    async fn fetch_file_list(
        &self,
        _last_hash: Option<&str>,
    ) -> Result<Vec<BaseFileListItem>, SyncError> {
        self.step("fetch_file_list")?;
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(item, _)| item.clone())
            .collect())
    }

    async fn fetch_file_contents(
        &self,
        items: &[FileListItem],
        progress: &ProgressCallback<'_>,
    ) -> Result<RepositoryContentsMap, SyncError> {
        self.step("fetch_file_contents")?;

        let wanted: Vec<&FileListItem> = items.iter().filter(|i| !i.is_asset()).collect();
        self.content_requests
            .lock()
            .unwrap()
            .push(wanted.iter().map(|i| i.path().to_owned()).collect());

        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        progress(Some(0));
        let files = self.files.lock().unwrap();
        let missing = self.missing.lock().unwrap();
        let mut map = HashMap::new();
        for (index, item) in wanted.iter().enumerate() {
            let text = files
                .iter()
                .find(|(f, _)| f.path == item.path())
                .filter(|_| !missing.contains(item.path()))
                .map(|(_, text)| text.clone());
            map.insert(
                item.path().to_owned(),
                RepositoryFile {
                    sha: item.base.sha.clone(),
                    size: item.base.size,
                    fetched: text.is_some(),
                    text: text.unwrap_or_default(),
                    meta: FileMeta::default(),
                },
            );
            progress(Some(percent_complete(index + 1, wanted.len())));
        }
        progress(None);

        Ok(map)
    }

    async fn fetch_blob(&self, asset: &BaseFileListItem) -> Result<Vec<u8>, SyncError> {
        self.step("fetch_blob")?;
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(f, _)| f.path == asset.path)
            .map(|(_, text)| text.clone().into_bytes())
            .ok_or_else(|| SyncError::NotFound(asset.path.clone()))
    }

    async fn commit_changes(
        &self,
        changes: &[FileChange],
        _options: &CommitOptions,
    ) -> Result<CommitResults, SyncError> {
        self.step("commit_changes")?;
        Ok(CommitResults {
            sha: "scripted-commit".into(),
            date: Utc::now(),
            files: changes
                .iter()
                .map(|c| (c.path.clone(), CommittedFile::default()))
                .collect(),
        })
    }
}

/// Content cache backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryCache {
    snapshots: Mutex<HashMap<String, ContentSnapshot>>,
}

#[async_trait::async_trait]
impl ContentCache for MemoryCache {
    async fn load(&self, database: &str) -> Result<Option<ContentSnapshot>, SyncError> {
        Ok(self.snapshots.lock().unwrap().get(database).cloned())
    }

    async fn save(&self, database: &str, snapshot: &ContentSnapshot) -> Result<(), SyncError> {
        self.snapshots
            .lock()
            .unwrap()
            .insert(database.to_owned(), snapshot.clone());
        Ok(())
    }
}

/// Handle store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryHandleStore {
    handles: Mutex<HashMap<String, PathBuf>>,
}

#[async_trait::async_trait]
impl HandleStore for MemoryHandleStore {
    async fn load_handle(&self, key: &str) -> Result<Option<PathBuf>, SyncError> {
        Ok(self.handles.lock().unwrap().get(key).cloned())
    }

    async fn save_handle(&self, key: &str, path: &Path) -> Result<(), SyncError> {
        self.handles
            .lock()
            .unwrap()
            .insert(key.to_owned(), path.to_path_buf());
        Ok(())
    }

    async fn forget_handle(&self, key: &str) -> Result<(), SyncError> {
        self.handles.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Sink that keeps whatever it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub entries: Vec<EntryFile>,
    pub assets: Vec<BaseFileListItem>,
}

impl SyncSink for RecordingSink {
    fn set_entries(&mut self, entries: Vec<EntryFile>) {
        self.entries = entries;
    }

    fn set_assets(&mut self, assets: Vec<BaseFileListItem>) {
        self.assets = assets;
    }
}
