pub mod backend;
pub mod client;
pub mod commit;
pub mod content;
pub mod tree;
pub mod version;

pub use backend::GiteaBackend;
pub use client::GiteaClient;
pub use version::{ServerFlavor, ServerVersion};
