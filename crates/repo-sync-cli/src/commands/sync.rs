use std::sync::Arc;

use anyhow::Result;
use repo_sync::{Backend, BaseFileListItem, EntryFile, FileScope, SyncSink, Synchronizer};
use repo_sync_store::SqliteStore;

#[derive(Default)]
struct Summary {
    entries: Vec<EntryFile>,
    assets: Vec<BaseFileListItem>,
}

impl SyncSink for Summary {
    fn set_entries(&mut self, entries: Vec<EntryFile>) {
        self.entries = entries;
    }

    fn set_assets(&mut self, assets: Vec<BaseFileListItem>) {
        self.assets = assets;
    }
}

/// Run a full sync and print what was found.
pub async fn run(
    backend: Arc<dyn Backend>,
    scope: &FileScope,
    store: Arc<SqliteStore>,
    refresh: bool,
) -> Result<()> {
    println!("Syncing {}...", backend.repository().full_name());

    if let Some(database) = backend.repository().database_name.as_deref() {
        if refresh {
            store.clear(database)?;
            println!("Cleared cached content.");
        } else if let Some(synced_at) = store.synced_at(database)? {
            println!("Last synced {synced_at}.");
        }
    }

    let progress = |value: Option<u8>| {
        if let Some(percent) = value {
            eprint!("\rFetching contents... {percent:>3}%");
        } else {
            eprintln!();
        }
    };

    let mut synchronizer = Synchronizer::new(backend, scope.clone())
        .with_cache(store)
        .with_progress(Arc::new(progress));
    let mut summary = Summary::default();
    synchronizer.fetch_files(&mut summary).await?;

    for entry in &summary.entries {
        println!("{}  {}", short_sha(&entry.sha), entry.path);
    }
    println!(
        "Synced {} entries and {} assets.",
        summary.entries.len(),
        summary.assets.len()
    );

    Ok(())
}

pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
