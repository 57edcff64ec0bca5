use serde::{Deserialize, Serialize};

use crate::file::FileKind;

/// Decides which repository files are entries, which are assets, and
/// which are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileScope {
    /// Folders holding entries. Empty means the whole repository.
    #[serde(default)]
    pub entry_folders: Vec<String>,
    /// Folders holding assets. Take precedence over entry folders.
    #[serde(default)]
    pub media_folders: Vec<String>,
    #[serde(default = "default_entry_extensions")]
    pub entry_extensions: Vec<String>,
}

fn default_entry_extensions() -> Vec<String> {
    ["md", "markdown", "json", "yaml", "yml", "toml"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for FileScope {
    fn default() -> Self {
        Self {
            entry_folders: Vec::new(),
            media_folders: Vec::new(),
            entry_extensions: default_entry_extensions(),
        }
    }
}

fn in_folder(path: &str, folder: &str) -> bool {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return true;
    }
    path == folder
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl FileScope {
    pub fn classify(&self, path: &str) -> Option<FileKind> {
        if self.media_folders.iter().any(|f| in_folder(path, f)) {
            return Some(FileKind::Asset);
        }

        let in_entry_folder =
            self.entry_folders.is_empty() || self.entry_folders.iter().any(|f| in_folder(path, f));
        if !in_entry_folder {
            return None;
        }

        let extension = path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())?;

        self.entry_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&extension))
            .then_some(FileKind::Entry)
    }
}
