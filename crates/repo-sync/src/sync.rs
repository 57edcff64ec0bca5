use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::cache::{ContentCache, ContentSnapshot};
use crate::error::SyncError;
use crate::file::{BaseFileListItem, EntryFile, FileKind, FileListItem};
use crate::progress::ProgressCallback;
use crate::scope::FileScope;

/// Where a [`Synchronizer`] is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    VersionChecked,
    AccessChecked,
    FilesFetched,
    Failed,
}

/// Receives the result of a successful sync. Owned by the caller.
pub trait SyncSink: Send {
    fn set_entries(&mut self, entries: Vec<EntryFile>);
    fn set_assets(&mut self, assets: Vec<BaseFileListItem>);
}

/// Runs the full read path against a backend: compatibility check, access
/// check, then the shared fetch-and-parse routine.
///
/// Steps run strictly in order. A failing step moves the synchronizer to
/// [`SyncState::Failed`] and the error is returned as-is; nothing is
/// retried. Concurrent syncs must be serialized by the caller.
pub struct Synchronizer {
    backend: Arc<dyn Backend>,
    scope: FileScope,
    cache: Option<Arc<dyn ContentCache>>,
    progress: Arc<ProgressCallback<'static>>,
    state: SyncState,
}

impl Synchronizer {
    pub fn new(backend: Arc<dyn Backend>, scope: FileScope) -> Self {
        Self {
            backend,
            scope,
            cache: None,
            progress: Arc::new(|_: Option<u8>| {}),
            state: SyncState::Init,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ContentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressCallback<'static>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Fetch every entry and asset and hand them to `sink`.
    pub async fn fetch_files(&mut self, sink: &mut dyn SyncSink) -> Result<(), SyncError> {
        self.state = SyncState::Init;

        match self.run(sink).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    backend = self.backend.label(),
                    after = ?self.state,
                    error = %e,
                    "sync failed"
                );
                self.state = SyncState::Failed;
                Err(e)
            }
        }
    }

    async fn run(&mut self, sink: &mut dyn SyncSink) -> Result<(), SyncError> {
        self.backend.check_compatibility().await?;
        self.advance(SyncState::VersionChecked);

        self.backend.check_access().await?;
        self.advance(SyncState::AccessChecked);

        let snapshot = fetch_and_parse_files(
            self.backend.as_ref(),
            &self.scope,
            self.cache.as_deref(),
            self.progress.as_ref(),
        )
        .await?;

        sink.set_entries(snapshot.entries);
        sink.set_assets(snapshot.assets);
        self.advance(SyncState::FilesFetched);

        Ok(())
    }

    fn advance(&mut self, state: SyncState) {
        debug!(backend = self.backend.label(), ?state, "sync step complete");
        self.state = state;
    }
}

/// Shared read routine used by every backend.
///
/// Resolves the default branch when none is configured, reads the tip
/// commit, and returns the cached snapshot untouched when the tip has not
/// moved. Otherwise lists the repository, classifies files through
/// `scope`, and fetches text only for entries whose sha is not already
/// cached. The new snapshot is written back to the cache, minus entries
/// whose content did not arrive.
pub async fn fetch_and_parse_files(
    backend: &dyn Backend,
    scope: &FileScope,
    cache: Option<&dyn ContentCache>,
    progress: &ProgressCallback<'_>,
) -> Result<ContentSnapshot, SyncError> {
    let repository = backend.repository();
    let has_history = repository.service.has_commit_history();

    if has_history && repository.branch.is_none() {
        let branch = backend.fetch_default_branch_name().await?;
        debug!(%branch, "using default branch");
    }

    let last_hash = if has_history {
        Some(backend.fetch_last_commit().await?.hash)
    } else {
        None
    };

    let database = repository.database_name.as_deref();
    let cached = match (cache, database) {
        (Some(cache), Some(database)) => cache.load(database).await?,
        _ => None,
    };

    if let Some(hash) = &last_hash
        && let Some(snapshot) = cached
            .as_ref()
            .filter(|s| s.last_commit_hash.as_ref() == Some(hash))
    {
        info!(
            commit = %hash,
            entries = snapshot.entries.len(),
            assets = snapshot.assets.len(),
            "cache is up to date"
        );
        return Ok(snapshot.clone());
    }

    let items: Vec<FileListItem> = backend
        .fetch_file_list(last_hash.as_deref())
        .await?
        .into_iter()
        .filter_map(|base| {
            scope
                .classify(&base.path)
                .map(|kind| FileListItem { base, kind })
        })
        .collect();

    let mut reusable: HashMap<String, EntryFile> = cached
        .map(|s| {
            s.entries
                .into_iter()
                .map(|entry| (entry.path.clone(), entry))
                .collect()
        })
        .unwrap_or_default();

    let stale: Vec<FileListItem> = items
        .iter()
        .filter(|item| !item.is_asset())
        .filter(|item| {
            !reusable
                .get(item.path())
                .is_some_and(|entry| entry.sha == item.base.sha)
        })
        .cloned()
        .collect();

    debug!(
        files = items.len(),
        fetching = stale.len(),
        "resolved file list"
    );

    let mut contents = backend.fetch_file_contents(&stale, progress).await?;

    let mut entries = Vec::new();
    let mut assets = Vec::new();
    let mut missing = HashSet::new();

    for item in items {
        match item.kind {
            FileKind::Asset => assets.push(item.base),
            FileKind::Entry => {
                if let Some(file) = contents.remove(item.path()) {
                    if !file.fetched {
                        missing.insert(item.base.path.clone());
                    }
                    entries.push(EntryFile::from_parts(&item.base, file));
                } else if let Some(entry) = reusable.remove(item.path()) {
                    entries.push(entry);
                } else {
                    warn!(path = item.path(), "no content returned for entry");
                }
            }
        }
    }

    let snapshot = ContentSnapshot {
        last_commit_hash: last_hash,
        entries,
        assets,
    };

    if let (Some(cache), Some(database)) = (cache, database) {
        if missing.is_empty() {
            cache.save(database, &snapshot).await?;
        } else {
            // Without a commit hash the next sync lists again and refetches
            // the entries left out here.
            warn!(
                missing = missing.len(),
                "some entries had no content; caching the rest"
            );
            let partial = ContentSnapshot {
                last_commit_hash: None,
                entries: snapshot
                    .entries
                    .iter()
                    .filter(|entry| !missing.contains(&entry.path))
                    .cloned()
                    .collect(),
                assets: snapshot.assets.clone(),
            };
            cache.save(database, &partial).await?;
        }
    }

    info!(
        entries = snapshot.entries.len(),
        assets = snapshot.assets.len(),
        "fetched repository files"
    );

    Ok(snapshot)
}
