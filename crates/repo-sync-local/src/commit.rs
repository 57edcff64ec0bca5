use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use repo_sync::{
    ChangeAction, CommitResults, CommittedFile, FileChange, SyncError, validate_changes,
};
use tracing::warn;

use crate::fs::{blob_sha, resolve};

/// A change whose paths are resolved and whose preconditions hold.
#[derive(Debug)]
pub struct Staged<'a> {
    change: &'a FileChange,
    target: PathBuf,
    source: PathBuf,
    /// Bytes at `source` when the change-set was staged.
    original: Option<Vec<u8>>,
}

fn invalid(change: &FileChange, reason: &'static str) -> SyncError {
    SyncError::InvalidChange {
        path: change.path.clone(),
        reason,
    }
}

async fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, SyncError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Every existing ancestor of `target` below `root` must be a directory,
/// and `target` itself must not be one.
async fn check_parents(root: &Path, target: &Path, change: &FileChange) -> Result<(), SyncError> {
    let Ok(relative) = target.strip_prefix(root) else {
        return Err(SyncError::InvalidPath(change.path.clone()));
    };

    let mut dir = root.to_path_buf();
    let mut parts = relative.components().peekable();
    while let Some(part) = parts.next() {
        dir.push(part);
        let meta = match tokio::fs::symlink_metadata(&dir).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let is_target = parts.peek().is_none();
        if is_target && meta.is_dir() {
            return Err(invalid(change, "path is a directory"));
        }
        if !is_target && !meta.is_dir() {
            return Err(invalid(change, "a parent of the path is a file"));
        }
    }
    Ok(())
}

/// Check the whole change-set against the tree without touching it.
///
/// Fails on the first change that could not be applied: a malformed change,
/// an escaping path, a sha that no longer matches, a create or move onto an
/// existing file, a target below an existing file, or two changes whose
/// targets overlap.
pub async fn stage<'a>(
    root: &Path,
    changes: &'a [FileChange],
) -> Result<Vec<Staged<'a>>, SyncError> {
    validate_changes(changes)?;

    let mut staged = Vec::with_capacity(changes.len());
    let mut targets: HashSet<PathBuf> = HashSet::with_capacity(changes.len());

    for change in changes {
        let target = resolve(root, &change.path)?;
        let source = resolve(root, change.source_path())?;

        if !targets.insert(target.clone()) {
            return Err(invalid(change, "path is changed more than once"));
        }
        if change.action != ChangeAction::Delete {
            check_parents(root, &target, change).await?;
        }

        let original = match change.action {
            ChangeAction::Create => {
                if tokio::fs::try_exists(&target).await? {
                    return Err(SyncError::Conflict {
                        path: change.path.clone(),
                    });
                }
                None
            }
            ChangeAction::Update | ChangeAction::Delete | ChangeAction::Move => {
                let bytes = read_existing(&source).await?;
                let current = bytes.as_deref().map(blob_sha);
                if current.as_deref() != change.previous_sha.as_deref() {
                    return Err(SyncError::Conflict {
                        path: change.source_path().to_owned(),
                    });
                }
                bytes
            }
        };

        if change.action == ChangeAction::Move
            && target != source
            && tokio::fs::try_exists(&target).await?
        {
            return Err(SyncError::Conflict {
                path: change.path.clone(),
            });
        }

        staged.push(Staged {
            change,
            target,
            source,
            original,
        });
    }

    for a in &staged {
        if staged
            .iter()
            .any(|b| b.target != a.target && b.target.starts_with(&a.target))
        {
            return Err(invalid(a.change, "another change targets a path below it"));
        }
    }

    Ok(staged)
}

/// What to put back if the commit fails part way.
#[derive(Debug, Default)]
pub struct Journal {
    files: Vec<(PathBuf, Option<Vec<u8>>)>,
    dirs: Vec<PathBuf>,
}

impl Journal {
    async fn create_parents(&mut self, path: &Path) -> Result<(), SyncError> {
        let mut missing = Vec::new();
        let mut dir = path.parent();
        while let Some(current) = dir {
            if tokio::fs::try_exists(current).await? {
                break;
            }
            missing.push(current.to_path_buf());
            dir = current.parent();
        }

        for dir in missing.into_iter().rev() {
            tokio::fs::create_dir(&dir).await?;
            self.dirs.push(dir);
        }
        Ok(())
    }

    /// Write `content` to `path`, remembering `original` for rollback.
    pub async fn write(
        &mut self,
        path: &Path,
        original: Option<Vec<u8>>,
        content: &[u8],
    ) -> Result<(), SyncError> {
        self.create_parents(path).await?;
        self.files.push((path.to_path_buf(), original));
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Remove `path`, remembering `original` for rollback.
    pub async fn remove(&mut self, path: &Path, original: Vec<u8>) -> Result<(), SyncError> {
        self.files.push((path.to_path_buf(), Some(original)));
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    /// Undo every recorded step, newest first.
    pub async fn roll_back(self) {
        for (path, original) in self.files.into_iter().rev() {
            let result = match original {
                Some(bytes) => tokio::fs::write(&path, bytes).await,
                None => match tokio::fs::remove_file(&path).await {
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "could not restore file");
            }
        }
        for dir in self.dirs.into_iter().rev() {
            if let Err(e) = tokio::fs::remove_dir(&dir).await {
                warn!(path = %dir.display(), error = %e, "could not remove directory");
            }
        }
    }
}

async fn apply_one(journal: &mut Journal, staged: Staged<'_>) -> Result<CommittedFile, SyncError> {
    let change = staged.change;
    match change.action {
        ChangeAction::Create | ChangeAction::Update => {
            let content = change.data_bytes();
            journal.write(&staged.target, staged.original, content).await?;
            Ok(CommittedFile {
                sha: blob_sha(content),
            })
        }
        ChangeAction::Delete => {
            let original = staged.original.unwrap_or_default();
            journal.remove(&staged.target, original).await?;
            Ok(CommittedFile::default())
        }
        ChangeAction::Move => {
            let original = staged.original.unwrap_or_default();
            let content = match &change.data {
                Some(data) => data.as_bytes().to_vec(),
                None => original.clone(),
            };
            if staged.target == staged.source {
                journal.write(&staged.target, Some(original), &content).await?;
            } else {
                journal.write(&staged.target, None, &content).await?;
                journal.remove(&staged.source, original).await?;
            }
            Ok(CommittedFile {
                sha: blob_sha(&content),
            })
        }
    }
}

/// Apply a staged change-set. On failure every write made so far is undone
/// before the error is returned.
pub async fn apply(staged: Vec<Staged<'_>>) -> Result<CommitResults, SyncError> {
    let mut journal = Journal::default();
    let mut files = HashMap::with_capacity(staged.len());

    for item in staged {
        let path = item.change.path.clone();
        match apply_one(&mut journal, item).await {
            Ok(committed) => {
                files.insert(path, committed);
            }
            Err(e) => {
                warn!(%path, error = %e, "commit failed, rolling back");
                journal.roll_back().await;
                return Err(e);
            }
        }
    }

    Ok(CommitResults {
        sha: String::new(),
        date: Utc::now(),
        files,
    })
}
