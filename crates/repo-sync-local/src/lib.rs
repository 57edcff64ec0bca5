//! Local-filesystem repository backend.
//!
//! Lists, reads and writes a directory chosen by the user. There is no
//! commit history: file shas are git blob ids computed from disk and every
//! commit is applied directly to the working tree.

mod backend;
mod commit;
mod fs;

pub use backend::{DirectoryPicker, LocalBackend};
pub use fs::blob_sha;
