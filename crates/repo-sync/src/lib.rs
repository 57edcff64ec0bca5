pub mod backend;
pub mod cache;
pub mod change;
pub mod codec;
pub mod error;
pub mod file;
pub mod i18n;
pub mod message;
pub mod progress;
pub mod repository;
pub mod scope;
pub mod sync;

pub use backend::Backend;
pub use cache::{ContentCache, ContentSnapshot, HandleStore};
pub use change::{
    ChangeAction, ChangeData, CommitOptions, CommitResults, CommitType, CommittedFile, FileChange,
    validate_changes,
};
pub use codec::{decode_base64, decode_base64_bytes, encode_base64};
pub use error::{ErrorCause, SyncError};
pub use file::{
    BaseFileListItem, EntryFile, FileKind, FileListItem, FileMeta, RepositoryContentsMap,
    RepositoryFile,
};
pub use i18n::{EnglishStrings, Translator};
pub use message::{CommitMessageTemplater, DefaultCommitMessages};
pub use progress::{ProgressCallback, percent_complete};
pub use repository::{LastCommit, RepositoryContext, Service, User};
pub use scope::FileScope;
pub use sync::{SyncSink, SyncState, Synchronizer, fetch_and_parse_files};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
