use std::sync::{Arc, OnceLock};

use chrono::Utc;
use repo_sync::{
    Backend, BaseFileListItem, CommitMessageTemplater, CommitOptions, CommitResults,
    DefaultCommitMessages, EnglishStrings, FileChange, FileListItem, LastCommit,
    ProgressCallback, RepositoryContentsMap, RepositoryContext, SyncError, Translator, User,
    validate_changes,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{GiteaClient, encode_path};
use crate::commit::{self, FilesResponse};
use crate::content;
use crate::tree;
use crate::version::{ServerFlavor, ServerVersion, VersionResponse};

const LAST_COMMIT_FAILED: &str = "Failed to retrieve the last commit hash.";

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    permissions: Option<Permissions>,
}

#[derive(Debug, Deserialize)]
struct Permissions {
    #[serde(default)]
    push: bool,
}

/// `GET /repos/{owner}/{repo}/branches/{branch}`
#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    id: String,
    #[serde(default)]
    message: String,
}

/// `GET /user`
#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        let name = if user.full_name.trim().is_empty() {
            user.login.clone()
        } else {
            user.full_name
        };
        Self {
            login: user.login,
            name,
            email: user.email,
        }
    }
}

/// Repository backend for Gitea and Forgejo.
pub struct GiteaBackend {
    repository: RepositoryContext,
    client: GiteaClient,
    user: User,
    templater: Arc<dyn CommitMessageTemplater>,
    translator: Arc<dyn Translator>,
    flavor: OnceLock<ServerFlavor>,
    default_branch: OnceLock<String>,
}

impl GiteaBackend {
    pub fn new(repository: RepositoryContext, token: Option<String>, user: User) -> Self {
        let client = GiteaClient::new(&repository.base_url, token);
        Self {
            repository,
            client,
            user,
            templater: Arc::new(DefaultCommitMessages),
            translator: Arc::new(EnglishStrings),
            flavor: OnceLock::new(),
            default_branch: OnceLock::new(),
        }
    }

    /// Authenticate with `token` and load the commit identity.
    pub async fn sign_in(repository: RepositoryContext, token: String) -> Result<Self, SyncError> {
        let client = GiteaClient::new(&repository.base_url, Some(token.clone()));
        let user: User = client.get_json::<UserResponse>("/user").await?.into();
        info!(login = %user.login, repo = %repository.full_name(), "signed in");
        Ok(Self::new(repository, Some(token), user))
    }

    pub fn with_templater(mut self, templater: Arc<dyn CommitMessageTemplater>) -> Self {
        self.templater = templater;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Server flavor detected by the compatibility check, Gitea until then.
    pub fn flavor(&self) -> ServerFlavor {
        self.flavor.get().copied().unwrap_or(ServerFlavor::Gitea)
    }

    fn repo_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            urlencoding::encode(&self.repository.owner),
            urlencoding::encode(&self.repository.repo)
        )
    }

    fn repo_label(&self) -> String {
        self.repository.full_name()
    }

    async fn branch(&self) -> Result<String, SyncError> {
        if let Some(branch) = &self.repository.branch {
            return Ok(branch.clone());
        }
        if let Some(branch) = self.default_branch.get() {
            return Ok(branch.clone());
        }
        self.fetch_default_branch_name().await
    }

    async fn fetch_repository(&self) -> Result<RepositoryResponse, SyncError> {
        self.client
            .get_json(&self.repo_path())
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    SyncError::described(
                        "Repository not found.",
                        self.translator.translate(
                            "repository_not_found",
                            &[("repo", self.repo_label().as_str())],
                        ),
                    )
                } else {
                    e
                }
            })
    }

    async fn last_commit(&self) -> Result<LastCommit, SyncError> {
        let branch = self.branch().await.map_err(|e| {
            let detail = match e.cause_detail() {
                Some(detail) => detail.to_owned(),
                None => self.translator.translate(
                    "unexpected_response",
                    &[("detail", e.to_string().as_str())],
                ),
            };
            SyncError::described(LAST_COMMIT_FAILED, detail)
        })?;
        let response: BranchResponse = self
            .client
            .get_json(&format!(
                "{}/branches/{}",
                self.repo_path(),
                urlencoding::encode(&branch)
            ))
            .await
            .map_err(|e| {
                let detail = if e.is_not_found() {
                    self.translator.translate(
                        "branch_not_found",
                        &[("branch", branch.as_str()), ("repo", self.repo_label().as_str())],
                    )
                } else {
                    self.translator.translate(
                        "unexpected_response",
                        &[("detail", e.to_string().as_str())],
                    )
                };
                SyncError::described(LAST_COMMIT_FAILED, detail)
            })?;

        Ok(LastCommit {
            hash: response.commit.id,
            message: response.commit.message,
        })
    }
}

#[async_trait::async_trait]
impl Backend for GiteaBackend {
    fn label(&self) -> &str {
        &self.repository.repo
    }

    fn repository(&self) -> &RepositoryContext {
        &self.repository
    }

    async fn check_compatibility(&self) -> Result<(), SyncError> {
        let response: VersionResponse = self.client.get_json("/version").await.map_err(|e| {
            if e.is_not_found() {
                SyncError::described(
                    "Unsupported server version.",
                    self.translator
                        .translate("version_unavailable", &[("service", "Gitea")]),
                )
            } else {
                e
            }
        })?;

        let version = ServerVersion::parse(&response.version).ok_or_else(|| {
            SyncError::described(
                "Unsupported server version.",
                self.translator
                    .translate("version_unavailable", &[("service", "Gitea")]),
            )
        })?;

        if !version.is_supported() {
            let service = version.flavor.to_string();
            return Err(SyncError::described(
                "Unsupported server version.",
                self.translator.translate(
                    "unsupported_version",
                    &[
                        ("service", service.as_str()),
                        ("version", version.raw.as_str()),
                        ("minimum", version.minimum_label().as_str()),
                    ],
                ),
            ));
        }

        debug!(flavor = %version.flavor, version = %version.raw, "server is compatible");
        let _ = self.flavor.set(version.flavor);
        Ok(())
    }

    async fn check_access(&self) -> Result<(), SyncError> {
        let response = self.fetch_repository().await?;

        if let Some(branch) = response.default_branch {
            let _ = self.default_branch.set(branch);
        }

        if !response.permissions.is_some_and(|p| p.push) {
            return Err(SyncError::described(
                "Write access to the repository is required.",
                self.translator.translate(
                    "no_write_permission",
                    &[("repo", self.repo_label().as_str())],
                ),
            ));
        }

        Ok(())
    }

    async fn fetch_default_branch_name(&self) -> Result<String, SyncError> {
        if let Some(branch) = self.default_branch.get() {
            return Ok(branch.clone());
        }

        let branch = self
            .fetch_repository()
            .await?
            .default_branch
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                SyncError::described(
                    "Failed to retrieve the default branch name.",
                    self.translator.translate(
                        "unexpected_response",
                        &[("detail", "repository has no default branch")],
                    ),
                )
            })?;

        Ok(self.default_branch.get_or_init(|| branch).clone())
    }

    async fn fetch_last_commit(&self) -> Result<LastCommit, SyncError> {
        self.last_commit().await
    }

    async fn fetch_file_list(
        &self,
        last_hash: Option<&str>,
    ) -> Result<Vec<BaseFileListItem>, SyncError> {
        let reference = match last_hash {
            Some(hash) => hash.to_owned(),
            None => self.branch().await?,
        };
        tree::list_files(&self.client, &self.repo_path(), &reference).await
    }

    async fn fetch_file_contents(
        &self,
        items: &[FileListItem],
        progress: &ProgressCallback<'_>,
    ) -> Result<RepositoryContentsMap, SyncError> {
        let branch = self.branch().await?;
        content::fetch_contents(
            &self.client,
            &self.repo_path(),
            &branch,
            self.flavor(),
            items,
            progress,
        )
        .await
    }

    async fn fetch_blob(&self, asset: &BaseFileListItem) -> Result<Vec<u8>, SyncError> {
        let branch = self.branch().await?;
        self.client
            .get_bytes(&format!(
                "{}/media/{}/{}",
                self.repo_path(),
                encode_path(&branch),
                encode_path(&asset.path)
            ))
            .await
    }

    async fn commit_changes(
        &self,
        changes: &[FileChange],
        options: &CommitOptions,
    ) -> Result<CommitResults, SyncError> {
        validate_changes(changes)?;
        let branch = self.branch().await?;
        let payload = commit::build_payload(
            changes,
            options,
            &self.user,
            &branch,
            self.templater.as_ref(),
            Utc::now(),
        );

        let response: FilesResponse = self
            .client
            .post_json(&format!("{}/contents", self.repo_path()), &payload)
            .await?;

        let results = commit::map_response(&payload, response)?;
        info!(commit = %results.sha, files = results.files.len(), "committed changes");
        Ok(results)
    }
}
