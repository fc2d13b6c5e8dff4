// mcdex-common/src/pipeline.rs
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::McdexError;

/// The step of a pack command that was running when something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Create,
    LoadManifest,
    FetchPack,
    Resolve,
    Download,
    Install,
    Overrides,
    Persist,
    LauncherProfile,
    Server,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Create => "create",
            PipelineStage::LoadManifest => "load-manifest",
            PipelineStage::FetchPack => "fetch-pack",
            PipelineStage::Resolve => "resolve",
            PipelineStage::Download => "download",
            PipelineStage::Install => "install",
            PipelineStage::Overrides => "overrides",
            PipelineStage::Persist => "persist",
            PipelineStage::LauncherProfile => "launcher-profile",
            PipelineStage::Server => "server",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    ResolutionStarted {
        pack: String,
        reference_count: usize,
    },
    ReferenceResolved {
        name: String,
        project_id: Option<u64>,
        file_id: Option<u64>,
        dependency: bool,
    },
    ResolutionFinished {
        pack: String,
        reference_count: usize,
    },
    DownloadStarted {
        name: String,
        url: String,
    },
    DownloadCached {
        name: String,
        path: PathBuf,
    },
    DownloadFinished {
        name: String,
        path: PathBuf,
        size_bytes: u64,
    },
    DownloadFailed {
        name: String,
        url: String,
        error: String,
    },
    ModInstalled {
        name: String,
        file_name: String,
    },
    ModRemoved {
        file_name: String,
    },
    OverridesApplied {
        count: usize,
    },
    InstallFinished {
        pack: String,
        installed: usize,
        unchanged: usize,
        failed: usize,
    },
    StageFailed {
        pack: String,
        stage: PipelineStage,
        error: String,
    },
    LogInfo {
        message: String,
    },
    LogWarn {
        message: String,
    },
}

impl PipelineEvent {
    pub fn download_failed(name: String, url: String, error: &McdexError) -> Self {
        PipelineEvent::DownloadFailed {
            name,
            url,
            error: error.to_string(),
        }
    }

    pub fn stage_failed(pack: String, stage: PipelineStage, error: &McdexError) -> Self {
        PipelineEvent::StageFailed {
            pack,
            stage,
            error: error.to_string(),
        }
    }
}
