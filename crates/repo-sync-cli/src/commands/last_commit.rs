use anyhow::Result;
use repo_sync::Backend;

pub async fn run(backend: &dyn Backend) -> Result<()> {
    let commit = backend.fetch_last_commit().await?;
    let subject = commit.message.lines().next().unwrap_or_default();
    println!("{} {}", commit.hash, subject);
    Ok(())
}
