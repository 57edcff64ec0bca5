use std::collections::HashMap;

use repo_sync::{
    FileListItem, FileMeta, ProgressCallback, RepositoryContentsMap, RepositoryFile, SyncError,
    decode_base64, percent_complete,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::GiteaClient;
use crate::version::ServerFlavor;

/// Page size used when the server does not report one.
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// One element of a bulk content response. Gitea's contents objects and
/// Forgejo's git blobs both fit this shape.
#[derive(Debug, Deserialize)]
pub struct BlobContent {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// `GET /settings/api`
#[derive(Debug, Deserialize)]
pub struct ApiSettings {
    #[serde(default)]
    pub max_response_items: Option<usize>,
}

#[derive(Serialize)]
struct FileContentsRequest<'a> {
    files: &'a [String],
}

/// Number of items the server allows per bulk request.
pub async fn page_size(client: &GiteaClient) -> usize {
    match client.get_json::<ApiSettings>("/settings/api").await {
        Ok(ApiSettings {
            max_response_items: Some(size),
        }) if size > 0 => size,
        Ok(_) => DEFAULT_PAGE_SIZE,
        Err(e) => {
            debug!(error = %e, "page size unavailable, using default");
            DEFAULT_PAGE_SIZE
        }
    }
}

/// Fetch text for every non-asset item in chunks of the server page size.
///
/// Chunks are requested one after another. `progress` sees `Some(0)`
/// first, the rounded-up percentage after each chunk, then `None`.
pub async fn fetch_contents(
    client: &GiteaClient,
    repo_path: &str,
    branch: &str,
    flavor: ServerFlavor,
    items: &[FileListItem],
    progress: &ProgressCallback<'_>,
) -> Result<RepositoryContentsMap, SyncError> {
    let items: Vec<&FileListItem> = items.iter().filter(|item| !item.is_asset()).collect();
    let ids: Vec<String> = items
        .iter()
        .map(|item| match flavor {
            ServerFlavor::Gitea => item.base.path.clone(),
            ServerFlavor::Forgejo => item.base.sha.clone(),
        })
        .collect();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    progress(Some(0));

    let page_size = page_size(client).await;
    let mut results: Vec<Option<BlobContent>> = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(page_size) {
        let page = fetch_chunk(client, repo_path, branch, flavor, chunk).await?;
        debug!(requested = chunk.len(), returned = page.len(), "fetched content chunk");
        // Keep positions aligned with the request even if the server
        // returned a short page.
        results.extend(
            page.into_iter()
                .chain(std::iter::repeat_with(|| None))
                .take(chunk.len()),
        );
        progress(Some(percent_complete(results.len(), ids.len())));
    }

    progress(None);

    Ok(items
        .into_iter()
        .zip(results)
        .map(|(item, content)| {
            let file = match content {
                Some(content) => to_repository_file(item, content),
                None => RepositoryFile {
                    sha: item.base.sha.clone(),
                    size: 0,
                    text: String::new(),
                    meta: FileMeta::default(),
                    fetched: false,
                },
            };
            (item.base.path.clone(), file)
        })
        .collect())
}

async fn fetch_chunk(
    client: &GiteaClient,
    repo_path: &str,
    branch: &str,
    flavor: ServerFlavor,
    ids: &[String],
) -> Result<Vec<Option<BlobContent>>, SyncError> {
    match flavor {
        ServerFlavor::Gitea => {
            let path = format!(
                "{repo_path}/file-contents?ref={}",
                urlencoding::encode(branch)
            );
            client
                .post_json(&path, &FileContentsRequest { files: ids })
                .await
        }
        ServerFlavor::Forgejo => {
            let path = format!("{repo_path}/git/blobs?shas={}", ids.join(","));
            client.get_json(&path).await
        }
    }
}

fn to_repository_file(item: &FileListItem, content: BlobContent) -> RepositoryFile {
    let text = match (content.encoding.as_deref(), content.content.as_deref()) {
        (Some("base64"), Some(encoded)) => match decode_base64(encoded) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(path = item.path(), error = %e, "could not decode file content");
                None
            }
        },
        _ => None,
    };

    RepositoryFile {
        sha: content.sha.unwrap_or_else(|| item.base.sha.clone()),
        size: content.size.unwrap_or(0),
        fetched: text.is_some(),
        text: text.unwrap_or_default(),
        meta: FileMeta::default(),
    }
}
