use repo_sync::{BaseFileListItem, SyncError};
use serde::Deserialize;
use tracing::debug;

use crate::client::GiteaClient;

/// Response from Gitea's Git Trees API.
/// `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1&page={n}`
#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    #[serde(default)]
    pub tree: Option<Vec<TreeEntry>>,
    #[serde(default)]
    pub truncated: bool,
}

/// A single entry in the tree.
#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Walk the recursive tree listing page by page and return every blob.
///
/// A page is requested only while the previous one was truncated and
/// non-empty, so an empty truncated page ends the walk.
pub async fn list_files(
    client: &GiteaClient,
    repo_path: &str,
    reference: &str,
) -> Result<Vec<BaseFileListItem>, SyncError> {
    let reference = urlencoding::encode(reference);
    let mut entries = Vec::new();
    let mut page = 1u32;

    loop {
        let response: TreeResponse = client
            .get_json(&format!(
                "{repo_path}/git/trees/{reference}?recursive=1&page={page}"
            ))
            .await?;

        let tree = match response.tree {
            Some(tree) if !tree.is_empty() => tree,
            _ => break,
        };

        debug!(
            page,
            count = tree.len(),
            truncated = response.truncated,
            "fetched tree page"
        );
        entries.extend(tree);

        if !response.truncated {
            break;
        }
        page += 1;
    }

    Ok(entries
        .into_iter()
        .filter(|entry| entry.entry_type == "blob")
        .map(|entry| BaseFileListItem::new(entry.path, entry.sha, entry.size.unwrap_or(0)))
        .collect())
}
