// mcdex-core/src/pipeline/engine.rs
use crossbeam_channel::unbounded;
use mcdex_common::pipeline::PipelineEvent;
use threadpool::ThreadPool;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::worker::{self, InstallJob, JobOutcome};

/// Runs install jobs on a bounded thread pool. Jobs are submitted in the
/// order given (dependencies first); outcomes are returned sorted by
/// manifest index regardless of completion order.
#[instrument(skip_all, name = "install_worker_pool", fields(jobs = jobs.len()))]
pub fn run_install_jobs(
    jobs: Vec<InstallJob>,
    num_workers: usize,
    event_tx: Option<broadcast::Sender<PipelineEvent>>,
) -> Vec<JobOutcome> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let num_workers = num_workers.clamp(1, jobs.len());
    let pool = ThreadPool::new(num_workers);
    let (result_tx, result_rx) = unbounded::<JobOutcome>();
    debug!("Install worker pool started with {} workers.", num_workers);

    let total = jobs.len();
    for job in jobs {
        let result_tx = result_tx.clone();
        let event_tx = event_tx.clone();
        pool.execute(move || {
            let result = worker::execute_install_job(&job, event_tx.as_ref());
            debug!("[{}] Worker finished, ok: {}", job.name, result.is_ok());
            let _ = result_tx.send(JobOutcome {
                index: job.index,
                name: job.name,
                result,
            });
        });
    }
    drop(result_tx);
    pool.join();

    let mut outcomes: Vec<JobOutcome> = result_rx.iter().collect();
    if outcomes.len() != total {
        debug!(
            "{} of {} install jobs reported no outcome",
            total - outcomes.len(),
            total
        );
    }
    outcomes.sort_by_key(|o| o.index);
    outcomes
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn pool_copies_every_job_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        let mut jobs = Vec::new();
        for i in 0..5 {
            let source = cache.join(format!("{i}.jar"));
            fs::write(&source, format!("jar {i}")).unwrap();
            jobs.push(InstallJob {
                index: 4 - i,
                name: format!("mod{i}"),
                source,
                target: dir.path().join("mods").join(format!("{i}.jar")),
            });
        }
        jobs.push(InstallJob {
            index: 9,
            name: "missing".into(),
            source: cache.join("missing.jar"),
            target: dir.path().join("mods/missing.jar"),
        });

        let outcomes = run_install_jobs(jobs, 3, None);
        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 9]);
        assert!(outcomes[..5].iter().all(|o| o.result.is_ok()));
        assert!(outcomes[5].result.is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("mods/2.jar")).unwrap(),
            "jar 2"
        );
    }
}
