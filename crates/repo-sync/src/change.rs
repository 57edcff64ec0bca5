use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::SyncError;

/// What a change does to its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    /// Rename `previous_path` to `path`, optionally with new content.
    Move,
}

/// New content for a created, updated or moved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeData {
    Text(String),
    Binary(Vec<u8>),
}

impl ChangeData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// One operation in a change-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub action: ChangeAction,
    pub path: String,
    pub previous_path: Option<String>,
    pub previous_sha: Option<String>,
    pub data: Option<ChangeData>,
}

impl FileChange {
    pub fn create(path: impl Into<String>, data: ChangeData) -> Self {
        Self {
            action: ChangeAction::Create,
            path: path.into(),
            previous_path: None,
            previous_sha: None,
            data: Some(data),
        }
    }

    pub fn update(path: impl Into<String>, previous_sha: impl Into<String>, data: ChangeData) -> Self {
        Self {
            action: ChangeAction::Update,
            path: path.into(),
            previous_path: None,
            previous_sha: Some(previous_sha.into()),
            data: Some(data),
        }
    }

    pub fn delete(path: impl Into<String>, previous_sha: impl Into<String>) -> Self {
        Self {
            action: ChangeAction::Delete,
            path: path.into(),
            previous_path: None,
            previous_sha: Some(previous_sha.into()),
            data: None,
        }
    }

    pub fn rename(
        previous_path: impl Into<String>,
        path: impl Into<String>,
        previous_sha: impl Into<String>,
        data: Option<ChangeData>,
    ) -> Self {
        Self {
            action: ChangeAction::Move,
            path: path.into(),
            previous_path: Some(previous_path.into()),
            previous_sha: Some(previous_sha.into()),
            data,
        }
    }

    /// Content bytes, empty when the change carries none.
    pub fn data_bytes(&self) -> &[u8] {
        self.data.as_ref().map(ChangeData::as_bytes).unwrap_or_default()
    }

    /// Path the change reads from: `previous_path` for moves, `path`
    /// otherwise.
    pub fn source_path(&self) -> &str {
        match self.action {
            ChangeAction::Move => self.previous_path.as_deref().unwrap_or(&self.path),
            _ => &self.path,
        }
    }

    /// Check the fields every action requires.
    ///
    /// Update, delete and move must name the sha they replace, and a move
    /// must name the path it leaves.
    pub fn validate(&self) -> Result<(), SyncError> {
        let invalid = |reason: &'static str| -> Result<(), SyncError> {
            Err(SyncError::InvalidChange {
                path: self.path.clone(),
                reason,
            })
        };
        if self.path.is_empty() {
            return invalid("path is empty");
        }
        match self.action {
            ChangeAction::Create => Ok(()),
            ChangeAction::Update | ChangeAction::Delete if self.previous_sha.is_none() => {
                invalid("previous sha is required")
            }
            ChangeAction::Update | ChangeAction::Delete => Ok(()),
            ChangeAction::Move => match (&self.previous_path, &self.previous_sha) {
                (None, _) => invalid("previous path is required"),
                (_, None) => invalid("previous sha is required"),
                (Some(_), Some(_)) => Ok(()),
            },
        }
    }
}

/// Validate every change of a change-set before anything is sent.
pub fn validate_changes(changes: &[FileChange]) -> Result<(), SyncError> {
    changes.iter().try_for_each(FileChange::validate)
}

/// Why a commit is being made; selects the commit message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    Create,
    Update,
    Delete,
    UploadMedia,
    DeleteMedia,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOptions {
    pub commit_type: CommitType,
    /// Custom message that replaces the template when non-empty.
    pub summary: Option<String>,
}

impl CommitOptions {
    pub fn new(commit_type: CommitType) -> Self {
        Self {
            commit_type,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommittedFile {
    /// Blob sha after the commit, empty for deleted files.
    pub sha: String,
}

/// Outcome of a commit, keyed by the requested paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResults {
    pub sha: String,
    pub date: DateTime<Utc>,
    pub files: HashMap<String, CommittedFile>,
}
