// mcdex-core/src/install.rs
// Reconciles a pack's mods directory with its manifest and applies
// override files.

use std::path::Path;

use mcdex_aio::checksum::sha256_file_sync;
use mcdex_aio::fs::{copy_tree, remove_file_if_exists};
use mcdex_common::dependency::install_order;
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::{Manifest, ModReference};
use mcdex_common::pipeline::PipelineEvent;
use mcdex_net::DownloadEngine;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::pipeline::{run_install_jobs, InstallJob};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub unchanged: usize,
    pub removed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    /// `PartialInstall` when anything failed.
    pub fn into_result(self) -> Result<InstallReport> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(McdexError::PartialInstall {
                succeeded: self.installed,
                failed: self.failed,
            })
        }
    }
}

pub struct Installer {
    engine: DownloadEngine,
    workers: usize,
    events: Option<broadcast::Sender<PipelineEvent>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnDisk {
    Missing,
    /// Checksum matched.
    Verified,
    /// Present under the resolved name, but there is no checksum to compare.
    Unverified,
}

fn on_disk(reference: &ModReference, mods_dir: &Path) -> OnDisk {
    let Some(filename) = &reference.filename else {
        return OnDisk::Missing;
    };
    let path = mods_dir.join(filename);
    if !path.is_file() {
        return OnDisk::Missing;
    }
    match &reference.sha256 {
        None => OnDisk::Unverified,
        Some(expected) => match sha256_file_sync(&path) {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => OnDisk::Verified,
            Ok(_) => OnDisk::Missing,
            Err(e) => {
                warn!("Could not hash {}: {}", path.display(), e);
                OnDisk::Missing
            }
        },
    }
}

impl Installer {
    pub fn new(engine: DownloadEngine, workers: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
            events: None,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Deletes installer-placed files that no reference wants any more.
    /// Files never recorded in `installedFiles` are left alone.
    fn remove_stale(&self, manifest: &mut Manifest, mods_dir: &Path) -> Result<Vec<String>> {
        let wanted: std::collections::BTreeSet<&str> = manifest
            .files
            .iter()
            .filter_map(|r| r.filename.as_deref())
            .collect();
        let stale: Vec<String> = manifest
            .installed_files
            .iter()
            .filter(|f| !wanted.contains(f.as_str()))
            .cloned()
            .collect();
        for file_name in &stale {
            remove_file_if_exists(&mods_dir.join(file_name))?;
            manifest.installed_files.remove(file_name);
            self.emit(PipelineEvent::ModRemoved {
                file_name: file_name.clone(),
            });
        }
        Ok(stale)
    }

    /// Brings `mods_dir` in line with the manifest. The manifest is updated
    /// in memory only for references that actually made it to disk; the
    /// caller persists it.
    #[instrument(skip_all, fields(pack = %manifest.name))]
    pub async fn install(
        &self,
        manifest: &mut Manifest,
        mods_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<InstallReport> {
        manifest.check_paths()?;
        mcdex_aio::fs::create_dir_all(mods_dir)?;
        let mut report = InstallReport {
            removed: self.remove_stale(manifest, mods_dir)?,
            ..InstallReport::default()
        };

        let mut todo = Vec::new();
        for index in install_order(&manifest.files) {
            let reference = &mut manifest.files[index];
            if !reference.is_resolved() {
                report
                    .failed
                    .push((reference.display_name(), "reference is not resolved".into()));
                reference.installed = false;
                continue;
            }
            let state = on_disk(reference, mods_dir);
            if state != OnDisk::Missing {
                report.unchanged += 1;
                if !reference.installed {
                    debug!("{} already present, marking installed", reference.display_name());
                    reference.installed = true;
                }
                // An unverified file may belong to the user; it never becomes removable.
                if state == OnDisk::Verified {
                    if let Some(filename) = &reference.filename {
                        manifest.installed_files.insert(filename.clone());
                    }
                }
                continue;
            }
            reference.installed = false;
            todo.push(index);
        }

        if todo.is_empty() {
            debug!("Nothing to install");
            return Ok(report);
        }
        if cancel.is_cancelled() {
            return Err(McdexError::Cancelled);
        }

        let descriptors = todo
            .iter()
            .filter_map(|&i| manifest.files[i].descriptor().map(|d| (i, d)))
            .collect::<Vec<_>>();
        let fetched = self
            .engine
            .fetch_all(
                descriptors.iter().map(|(_, d)| d.clone()).collect(),
                self.workers,
            )
            .await;

        let mut jobs = Vec::new();
        for ((index, descriptor), (_, result)) in descriptors.into_iter().zip(fetched) {
            match result {
                Ok(source) => jobs.push(InstallJob {
                    index,
                    name: descriptor.label.clone(),
                    source,
                    target: mods_dir.join(&descriptor.file_name),
                }),
                Err(McdexError::Cancelled) => return Err(McdexError::Cancelled),
                Err(e) => report.failed.push((descriptor.label.clone(), e.to_string())),
            }
        }

        let workers = self.workers;
        let events = self.events.clone();
        let outcomes =
            tokio::task::spawn_blocking(move || run_install_jobs(jobs, workers, events))
                .await
                .map_err(|e| McdexError::Generic(format!("Install workers panicked: {e}")))?;

        for outcome in outcomes {
            let reference = &mut manifest.files[outcome.index];
            match outcome.result {
                Ok(_) => {
                    reference.installed = true;
                    if let Some(filename) = &reference.filename {
                        manifest.installed_files.insert(filename.clone());
                    }
                    report.installed.push(outcome.name);
                }
                Err(e) => report.failed.push((outcome.name, e.to_string())),
            }
        }
        Ok(report)
    }

    /// Copies `overrides_dir` over the pack root, replacing whatever is there,
    /// and records the paths in the manifest.
    pub fn apply_overrides(
        &self,
        manifest: &mut Manifest,
        overrides_dir: &Path,
        pack_root: &Path,
    ) -> Result<usize> {
        let written = copy_tree(overrides_dir, pack_root)?;
        let count = written.len();
        manifest.override_files.extend(written);
        if count > 0 {
            self.emit(PipelineEvent::OverridesApplied { count });
        }
        debug!("Applied {} override files", count);
        Ok(count)
    }
}
