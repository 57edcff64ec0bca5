use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of backend a repository lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Gitea or Forgejo; the flavor is detected at runtime.
    Gitea,
    /// A directory on the local filesystem.
    Local,
}

impl Service {
    /// Whether the backend has branches and commits to query.
    pub fn has_commit_history(self) -> bool {
        matches!(self, Self::Gitea)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gitea => write!(f, "gitea"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Identifies the repository a session works against.
///
/// Created once at sign-in and never mutated afterwards. A missing branch
/// means "the repository's default branch", which the backend resolves
/// lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContext {
    pub service: Service,
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// API root such as `https://gitea.example.com/api/v1`. Unused for
    /// local directories.
    #[serde(default)]
    pub base_url: String,
    /// Name of the local cache database, when caching is enabled.
    #[serde(default)]
    pub database_name: Option<String>,
}

impl RepositoryContext {
    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Tip commit of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCommit {
    pub hash: String,
    pub message: String,
}

/// The signed-in user, used as commit author and committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub name: String,
    pub email: String,
}
