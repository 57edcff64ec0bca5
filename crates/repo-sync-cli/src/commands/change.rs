use std::path::Path;

use anyhow::{Context, Result, bail};
use repo_sync::{Backend, ChangeData, CommitOptions, CommitResults, CommitType, FileChange};

/// Current sha of `path`, or `None` if the file does not exist.
async fn current_sha(backend: &dyn Backend, path: &str) -> Result<Option<String>> {
    let files = backend.fetch_file_list(None).await?;
    Ok(files.into_iter().find(|f| f.path == path).map(|f| f.sha))
}

async fn expect_sha(backend: &dyn Backend, path: &str, sha: Option<String>) -> Result<String> {
    if let Some(sha) = sha {
        return Ok(sha);
    }
    match current_sha(backend, path).await? {
        Some(sha) => Ok(sha),
        None => bail!("File not found: {path}"),
    }
}

fn options(commit_type: CommitType, message: Option<String>) -> CommitOptions {
    CommitOptions {
        commit_type,
        summary: message,
    }
}

fn report(results: &CommitResults) {
    if results.sha.is_empty() {
        println!("Applied {} change(s).", results.files.len());
    } else {
        println!("Committed {} at {}.", results.sha, results.date.to_rfc3339());
    }
}

pub async fn put(
    backend: &dyn Backend,
    path: &str,
    source: &Path,
    sha: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let bytes = std::fs::read(source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let data = match String::from_utf8(bytes) {
        Ok(text) => ChangeData::Text(text),
        Err(e) => ChangeData::Binary(e.into_bytes()),
    };

    let previous = match sha {
        Some(sha) => Some(sha),
        None => current_sha(backend, path).await?,
    };
    let (change, commit_type) = match previous {
        Some(sha) => (FileChange::update(path, sha, data), CommitType::Update),
        None => (FileChange::create(path, data), CommitType::Create),
    };

    let results = backend
        .commit_changes(&[change], &options(commit_type, message))
        .await?;
    report(&results);
    Ok(())
}

pub async fn remove(
    backend: &dyn Backend,
    path: &str,
    sha: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let sha = expect_sha(backend, path, sha).await?;
    let results = backend
        .commit_changes(
            &[FileChange::delete(path, sha)],
            &options(CommitType::Delete, message),
        )
        .await?;
    report(&results);
    Ok(())
}

/// The remote rewrites the moved file from the payload, so the current
/// content always travels with the rename.
pub async fn rename(
    backend: &dyn Backend,
    from: &str,
    to: &str,
    sha: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let files = backend.fetch_file_list(None).await?;
    let Some(item) = files.into_iter().find(|f| f.path == from) else {
        bail!("File not found: {from}");
    };
    let content = backend.fetch_blob(&item).await?;
    let sha = sha.unwrap_or(item.sha);

    let results = backend
        .commit_changes(
            &[FileChange::rename(from, to, sha, Some(ChangeData::Binary(content)))],
            &options(CommitType::Update, message),
        )
        .await?;
    report(&results);
    Ok(())
}
