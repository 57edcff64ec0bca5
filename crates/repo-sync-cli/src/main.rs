mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_sync::{Backend, Service, SyncError};
use repo_sync_gitea::GiteaBackend;
use repo_sync_local::{DirectoryPicker, LocalBackend};
use repo_sync_store::SqliteStore;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "repo-sync")]
#[command(about = "Sync and edit CMS content stored in a Gitea/Forgejo or local repository")]
struct Cli {
    /// Config file (defaults to ~/.config/repo-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every entry and asset, refreshing the local cache
    Sync {
        /// Drop cached content first so every entry is fetched again
        #[arg(long)]
        refresh: bool,
    },
    /// List the files of the repository
    Files {
        /// List at this commit instead of the branch tip
        #[arg(long)]
        at: Option<String>,
    },
    /// Show the tip commit of the working branch
    LastCommit,
    /// Download a single file
    Blob {
        /// Path within the repository
        path: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Create or update a file from a local file
    Put {
        /// Path within the repository
        path: String,
        /// Local file whose content is committed
        source: PathBuf,
        /// Expected sha of the current file (looked up when omitted)
        #[arg(long)]
        sha: Option<String>,
        /// Commit message
        #[arg(long, short)]
        message: Option<String>,
    },
    /// Delete a file
    Rm {
        path: String,
        #[arg(long)]
        sha: Option<String>,
        #[arg(long, short)]
        message: Option<String>,
    },
    /// Move or rename a file
    Mv {
        from: String,
        to: String,
        #[arg(long)]
        sha: Option<String>,
        #[arg(long, short)]
        message: Option<String>,
    },
}

const DEFAULT_LOG_FILTER: &str =
    "repo_sync=info,repo_sync_gitea=info,repo_sync_local=info,repo_sync_store=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("could not determine cache directory")?;
    let dir = base.join("repo-sync");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create cache directory: {}", dir.display()))?;
    Ok(dir)
}

fn open_store() -> Result<Arc<SqliteStore>> {
    let path = cache_dir()?.join("cache.db");
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open cache at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn gitea_token() -> Option<String> {
    std::env::var("GITEA_TOKEN").ok().filter(|t| !t.is_empty())
}

/// Offers the directory named in the config; there is no interactive prompt.
struct ConfiguredPicker {
    root: Option<PathBuf>,
}

#[async_trait::async_trait]
impl DirectoryPicker for ConfiguredPicker {
    async fn pick(&self) -> Result<PathBuf, SyncError> {
        self.root.clone().ok_or(SyncError::Aborted)
    }
}

async fn build_backend(config: &AppConfig, store: Arc<SqliteStore>) -> Result<Arc<dyn Backend>> {
    let repository = config.repository.clone();

    match repository.service {
        Service::Gitea => {
            let token = gitea_token().context("GITEA_TOKEN is not set")?;
            let backend = GiteaBackend::sign_in(repository, token)
                .await
                .context("sign-in failed")?;
            Ok(Arc::new(backend))
        }
        Service::Local => {
            let picker = ConfiguredPicker {
                root: config.local.root.clone(),
            };
            let backend = LocalBackend::new(repository, store, Arc::new(picker));
            backend
                .sign_in()
                .await
                .context("no usable local directory; set [local] root in the config")?;
            Ok(Arc::new(backend))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    let store = open_store()?;
    let backend = build_backend(&config, Arc::clone(&store)).await?;

    match cli.command {
        Command::Sync { refresh } => {
            commands::sync::run(backend, &config.scope, store, refresh).await
        }
        Command::Files { at } => commands::files::run(backend.as_ref(), at.as_deref()).await,
        Command::LastCommit => commands::last_commit::run(backend.as_ref()).await,
        Command::Blob { path, output } => {
            commands::blob::run(backend.as_ref(), &path, output.as_deref()).await
        }
        Command::Put {
            path,
            source,
            sha,
            message,
        } => commands::change::put(backend.as_ref(), &path, &source, sha, message).await,
        Command::Rm { path, sha, message } => {
            commands::change::remove(backend.as_ref(), &path, sha, message).await
        }
        Command::Mv {
            from,
            to,
            sha,
            message,
        } => commands::change::rename(backend.as_ref(), &from, &to, sha, message).await,
    }
}
