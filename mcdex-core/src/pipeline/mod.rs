// mcdex-core/src/pipeline/mod.rs
pub mod engine;
pub mod worker;

pub use engine::run_install_jobs;
pub use worker::{InstallJob, JobOutcome};
