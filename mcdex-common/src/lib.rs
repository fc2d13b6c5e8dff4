// mcdex-common/src/lib.rs
pub mod cache;
pub mod config;
pub mod dependency;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use cache::Cache;
pub use config::Config;
pub use error::{McdexError, Result};
pub use model::{DownloadDescriptor, Manifest, ModReference, ModSpec};
