use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// One tracked blob as reported by a file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFileListItem {
    pub path: String,
    /// Content-addressed blob identity, also the concurrency token for
    /// update/delete/move.
    pub sha: String,
    pub size: u64,
    /// Final path segment.
    pub name: String,
}

impl BaseFileListItem {
    pub fn new(path: impl Into<String>, sha: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let name = file_name(&path).to_owned();
        Self {
            path,
            sha: sha.into(),
            size,
            name,
        }
    }
}

/// Returns the final segment of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a file holds editable content or a binary asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Entry,
    Asset,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Asset => "asset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(Self::Entry),
            "asset" => Some(Self::Asset),
            _ => None,
        }
    }
}

/// A listed file after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListItem {
    pub base: BaseFileListItem,
    pub kind: FileKind,
}

impl FileListItem {
    pub fn entry(base: BaseFileListItem) -> Self {
        Self {
            base,
            kind: FileKind::Entry,
        }
    }

    pub fn asset(base: BaseFileListItem) -> Self {
        Self {
            base,
            kind: FileKind::Asset,
        }
    }

    pub fn path(&self) -> &str {
        &self.base.path
    }

    pub fn is_asset(&self) -> bool {
        self.kind == FileKind::Asset
    }
}

/// Extra per-file information some backends can provide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMeta {
    pub last_modified: Option<DateTime<Utc>>,
}

/// Retrieved content of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFile {
    pub sha: String,
    pub size: u64,
    /// Decoded text, or empty when the content was missing or not base64.
    pub text: String,
    pub meta: FileMeta,
    /// False when the server gave no usable content for this file.
    pub fetched: bool,
}

/// Retrieved file contents keyed by path.
pub type RepositoryContentsMap = HashMap<String, RepositoryFile>;

/// An entry file with its text, as handed to the caller after a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFile {
    pub path: String,
    pub name: String,
    pub sha: String,
    pub size: u64,
    pub text: String,
    pub meta: FileMeta,
}

impl EntryFile {
    pub fn from_parts(item: &BaseFileListItem, file: RepositoryFile) -> Self {
        Self {
            path: item.path.clone(),
            name: item.name.clone(),
            sha: file.sha,
            size: file.size,
            text: file.text,
            meta: file.meta,
        }
    }
}
