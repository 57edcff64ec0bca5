use std::path::{Component, Path, PathBuf};

use repo_sync::{BaseFileListItem, SyncError};
use sha1::{Digest, Sha1};
use tracing::debug;

/// Directory names never descended into while listing.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Git blob object id of `content`, so local shas line up with remote ones.
pub fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Join a repository-relative path onto `root`, refusing anything that
/// could escape it.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, SyncError> {
    if relative.is_empty() {
        return Err(SyncError::InvalidPath(relative.to_owned()));
    }

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            _ => return Err(SyncError::InvalidPath(relative.to_owned())),
        }
    }
    Ok(resolved)
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect();
    Some(parts?.join("/"))
}

/// Every regular file below `root`, sorted by path.
pub async fn list_files(root: &Path) -> Result<Vec<BaseFileListItem>, SyncError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                let name = entry.file_name();
                if !is_skipped_dir(&name.to_string_lossy()) {
                    pending.push(path);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let Some(relative) = relative_path(root, &path) else {
                debug!(path = %path.display(), "skipping non-UTF-8 path");
                continue;
            };
            let content = tokio::fs::read(&path).await?;
            files.push(BaseFileListItem::new(
                relative,
                blob_sha(&content),
                content.len() as u64,
            ));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
