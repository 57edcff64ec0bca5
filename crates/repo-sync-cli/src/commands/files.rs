use anyhow::Result;
use repo_sync::Backend;

use super::sync::short_sha;

pub async fn run(backend: &dyn Backend, at: Option<&str>) -> Result<()> {
    let files = backend.fetch_file_list(at).await?;

    for file in &files {
        println!("{}  {:>9}  {}", short_sha(&file.sha), file.size, file.path);
    }
    eprintln!("{} files", files.len());

    Ok(())
}
