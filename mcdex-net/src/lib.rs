// mcdex-net/src/lib.rs
pub mod download;
pub mod http;
pub mod repository;
pub mod validation;

pub use download::DownloadEngine;
pub use http::{build_http_client, fetch_with_retry, FetchedFile, RetryPolicy};
pub use mcdex_common::{
    cache::Cache,
    error::{McdexError, Result},
    Config,
};
pub use repository::{HttpRepository, ModRepository, ProjectInfo, ProjectSummary, RemoteFile};
pub use validation::{validate_url, verify_checksum, verify_content_type};
