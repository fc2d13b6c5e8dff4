// mcdex-common/src/model/mod.rs
pub mod descriptor;
pub mod manifest;
pub mod mod_ref;
pub mod pack;

pub use descriptor::{CacheKey, DownloadDescriptor};
pub use manifest::{AddOutcome, Manifest, MergeSummary, MANIFEST_FILENAME};
pub use mod_ref::{validate_file_name, ModReference, ModSpec, ReferenceKey, SourceKind};
pub use pack::{FailureReason, PackState};
