pub mod blob;
pub mod change;
pub mod files;
pub mod last_commit;
pub mod sync;
