// mcdex-core/src/pipeline/worker.rs
use std::path::PathBuf;

use mcdex_aio::fs::copy_file_atomic;
use mcdex_common::error::Result;
use mcdex_common::pipeline::PipelineEvent;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

/// Copy one cached artifact into a pack's mod directory.
#[derive(Debug, Clone)]
pub struct InstallJob {
    /// Position of the reference in the manifest.
    pub index: usize,
    pub name: String,
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub index: usize,
    pub name: String,
    pub result: Result<u64>,
}

#[instrument(skip_all, fields(job = %job.name))]
pub(super) fn execute_install_job(
    job: &InstallJob,
    event_tx: Option<&broadcast::Sender<PipelineEvent>>,
) -> Result<u64> {
    debug!(
        "[{}] Installing {} -> {}",
        job.name,
        job.source.display(),
        job.target.display()
    );
    let bytes = copy_file_atomic(&job.source, &job.target)?;
    if let Some(tx) = event_tx {
        let file_name = job
            .target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let _ = tx.send(PipelineEvent::ModInstalled {
            name: job.name.clone(),
            file_name,
        });
    }
    Ok(bytes)
}
