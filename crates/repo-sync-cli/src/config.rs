use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use repo_sync::{FileScope, RepositoryContext};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub repository: RepositoryContext,
    #[serde(default)]
    pub scope: FileScope,
    #[serde(default)]
    pub local: LocalConfig,
}

/// Settings for the local-directory backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocalConfig {
    /// Directory offered when no directory has been chosen yet.
    pub root: Option<PathBuf>,
}

/// Config file path: `~/.config/repo-sync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("repo-sync").join("config.toml"))
}

/// Load config from `path`, or from the default location.
///
/// There is no fallback: without a config the tool cannot know which
/// repository to work on.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path().context("could not determine config directory")?,
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("failed to parse config at {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    Ok(toml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use repo_sync::Service;

    use super::*;

    #[test]
    fn parse_gitea_config() {
        let toml_str = r#"
[repository]
service = "gitea"
owner = "acme"
repo = "website"
branch = "main"
base_url = "https://gitea.example.com/api/v1"
database_name = "acme-website"

[scope]
entry_folders = ["content"]
media_folders = ["static/uploads"]
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.repository.service, Service::Gitea);
        assert_eq!(config.repository.full_name(), "acme/website");
        assert_eq!(config.repository.branch.as_deref(), Some("main"));
        assert_eq!(
            config.repository.database_name.as_deref(),
            Some("acme-website")
        );
        assert_eq!(config.scope.entry_folders, vec!["content"]);
        assert!(config.scope.entry_extensions.contains(&"md".to_owned()));
        assert!(config.local.root.is_none());
    }

    #[test]
    fn branch_and_scope_are_optional() {
        let toml_str = r#"
[repository]
service = "gitea"
owner = "acme"
repo = "website"
base_url = "https://gitea.example.com/api/v1"
"#;
        let config = parse_config(toml_str).unwrap();
        assert!(config.repository.branch.is_none());
        assert!(config.repository.database_name.is_none());
        assert!(config.scope.entry_folders.is_empty());
    }

    #[test]
    fn parse_local_config() {
        let toml_str = r#"
[repository]
service = "local"
owner = "jane"
repo = "notes"

[local]
root = "/home/jane/notes"
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.repository.service, Service::Local);
        assert_eq!(config.repository.base_url, "");
        assert_eq!(
            config.local.root.as_deref(),
            Some(Path::new("/home/jane/notes"))
        );
    }

    #[test]
    fn unknown_service_is_rejected() {
        let toml_str = r#"
[repository]
service = "svn"
owner = "acme"
repo = "website"
"#;
        assert!(parse_config(toml_str).is_err());
    }

    #[test]
    fn missing_repository_is_rejected() {
        assert!(parse_config("[scope]\nentry_folders = []\n").is_err());
    }

    #[test]
    fn load_reads_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[repository]\nservice = \"local\"\nowner = \"a\"\nrepo = \"b\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.repository.repo, "b");

        let missing = load_config(Some(&dir.path().join("nope.toml")));
        assert!(missing.is_err());
    }
}
