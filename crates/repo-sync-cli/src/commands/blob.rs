use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use repo_sync::Backend;

pub async fn run(backend: &dyn Backend, path: &str, output: Option<&Path>) -> Result<()> {
    let files = backend.fetch_file_list(None).await?;
    let Some(item) = files.iter().find(|f| f.path == path) else {
        bail!("File not found: {path}");
    };

    let bytes = backend.fetch_blob(item).await?;

    match output {
        Some(output) => std::fs::write(output, &bytes)
            .with_context(|| format!("failed to write {}", output.display()))?,
        None => std::io::stdout().write_all(&bytes)?,
    }

    Ok(())
}
