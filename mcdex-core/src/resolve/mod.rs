// mcdex-core/src/resolve/mod.rs
// Turns mod specs and manifest entries into fully resolved references, then
// pulls in the dependencies those files declare.

pub mod select;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::mod_ref::file_name_from_url;
use mcdex_common::model::{
    validate_file_name, Manifest, ModReference, ModSpec, ReferenceKey, SourceKind,
};
use mcdex_common::pipeline::PipelineEvent;
use mcdex_net::{ModRepository, ProjectInfo, ProjectSummary, RemoteFile};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub use select::{Pin, Target};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// References that needed a repository lookup this run.
    pub resolved: usize,
    /// Dependency references appended to the manifest.
    pub dependencies_added: usize,
    /// Entries folded into an earlier entry for the same project.
    pub merged: usize,
}

pub struct ModResolver {
    repository: Arc<dyn ModRepository>,
    concurrency: usize,
    events: Option<broadcast::Sender<PipelineEvent>>,
}

pub fn target_of(manifest: &Manifest) -> Target {
    Target {
        platform: manifest.platform_version().to_string(),
        loader: manifest.loader_version().map(str::to_string),
    }
}

/// Fills a reference from the chosen repository file.
fn apply_file(reference: &mut ModReference, project: &ProjectInfo, file: &RemoteFile) -> Result<()> {
    validate_file_name(&file.file_name)?;
    reference.source = SourceKind::Repository;
    reference.project_id = Some(project.id);
    reference.file_id = Some(file.file_id);
    if reference.name.is_empty() || reference.slug.as_deref() == Some(reference.name.as_str()) {
        reference.name = if project.name.is_empty() {
            project.slug.clone()
        } else {
            project.name.clone()
        };
    }
    if !project.slug.is_empty() {
        reference.slug = Some(project.slug.clone());
    }
    reference.url = Some(file.download_url.clone());
    reference.filename = Some(file.file_name.clone());
    reference.sha256 = file.sha256.clone();
    reference.size = file.size;
    reference.dependencies = Some(file.dependencies.clone());
    Ok(())
}

fn url_stem(url: &str) -> Option<String> {
    let file_name = file_name_from_url(url)?;
    let stem = Path::new(&file_name).file_stem()?.to_string_lossy().to_string();
    (!stem.is_empty()).then_some(stem)
}

impl ModResolver {
    pub fn new(repository: Arc<dyn ModRepository>, concurrency: usize) -> Self {
        Self {
            repository,
            concurrency: concurrency.max(1),
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

    fn emit_resolved(&self, reference: &ModReference) {
        self.emit(PipelineEvent::ReferenceResolved {
            name: reference.display_name(),
            project_id: reference.project_id,
            file_id: reference.file_id,
            dependency: reference.dependency,
        });
    }

    async fn find_project(&self, slug: &str) -> Result<ProjectSummary> {
        let mut hits = self.repository.search(slug).await?;
        let exact: Vec<usize> = hits
            .iter()
            .enumerate()
            .filter(|(_, p)| p.slug.eq_ignore_ascii_case(slug))
            .map(|(i, _)| i)
            .collect();
        match (exact.as_slice(), hits.len()) {
            ([only], _) => Ok(hits.swap_remove(*only)),
            ([], 0) => Err(McdexError::NotFound(format!("no project matches '{slug}'"))),
            ([], 1) => {
                let only = hits.remove(0);
                debug!("Using closest match '{}' for '{}'", only.slug, slug);
                Ok(only)
            }
            _ => Err(McdexError::AmbiguousReference {
                query: slug.to_string(),
                candidates: hits
                    .iter()
                    .map(|p| format!("{} ({})", p.slug, p.id))
                    .collect(),
            }),
        }
    }

    async fn lookup(
        &self,
        project_id: u64,
        pin: Option<Pin>,
        target: &Target,
        reference: &mut ModReference,
    ) -> Result<()> {
        let project = self.repository.project(project_id).await?;
        let file = select::select_file(&project, pin.as_ref(), target)?;
        apply_file(reference, &project, file)
    }

    /// Resolves one user request into a reference ready to add to a manifest.
    /// Explicit URLs never touch the repository.
    #[instrument(skip(self, spec, target), fields(spec = %spec))]
    pub async fn resolve_spec(&self, spec: &ModSpec, target: &Target) -> Result<ModReference> {
        let reference = match spec {
            ModSpec::Url { url, name } => {
                let name = name
                    .clone()
                    .or_else(|| url_stem(url))
                    .ok_or_else(|| McdexError::InvalidReference(url.clone()))?;
                let reference = ModReference::explicit(url.clone(), name);
                match reference.filename.as_deref() {
                    Some(filename) => validate_file_name(filename)?,
                    None => {
                        return Err(McdexError::InvalidReference(format!(
                            "{url}: no file name in URL"
                        )))
                    }
                }
                reference
            }
            ModSpec::ProjectId {
                project_id,
                file_id,
            } => {
                let mut reference = ModReference::repository(*project_id, *file_id);
                self.lookup(*project_id, file_id.map(Pin::FileId), target, &mut reference)
                    .await?;
                reference
            }
            ModSpec::Slug { slug, version } => {
                let summary = self.find_project(slug).await?;
                let mut reference = ModReference::by_slug(summary.slug.clone());
                self.lookup(summary.id, version.clone().map(Pin::Version), target, &mut reference)
                    .await?;
                reference
            }
        };
        self.emit_resolved(&reference);
        Ok(reference)
    }

    /// Completes a manifest entry that lacks artifact details. Already
    /// resolved entries return without any lookup.
    async fn complete(&self, mut reference: ModReference, target: &Target) -> Result<ModReference> {
        if reference.is_resolved() {
            return Ok(reference);
        }
        match reference.source {
            SourceKind::Explicit => {
                let url = reference
                    .url
                    .clone()
                    .ok_or_else(|| McdexError::InvalidReference(reference.display_name()))?;
                let filename = file_name_from_url(&url)
                    .ok_or_else(|| McdexError::InvalidReference(url.clone()))?;
                validate_file_name(&filename)?;
                reference.filename = Some(filename);
                reference.dependencies.get_or_insert_with(Vec::new);
                if reference.name.is_empty() {
                    reference.name = url_stem(&url).unwrap_or_default();
                }
            }
            SourceKind::Repository => {
                let project_id = match reference.project_id {
                    Some(id) => id,
                    None => {
                        let slug = reference
                            .slug
                            .clone()
                            .ok_or_else(|| McdexError::InvalidReference(reference.display_name()))?;
                        self.find_project(&slug).await?.id
                    }
                };
                let pin = reference.file_id.map(Pin::FileId);
                self.lookup(project_id, pin, target, &mut reference).await?;
            }
        }
        self.emit_resolved(&reference);
        Ok(reference)
    }

    /// Resolves every entry of the manifest and expands declared dependencies,
    /// level by level, until nothing new appears.
    ///
    /// On error the manifest is left exactly as it was passed in.
    #[instrument(skip_all, fields(pack = %manifest.name))]
    pub async fn resolve_manifest(
        &self,
        manifest: &mut Manifest,
        cancel: &CancellationToken,
    ) -> Result<ResolveReport> {
        let target = target_of(manifest);
        let mut working = manifest.clone();
        let mut report = ResolveReport::default();
        self.emit(PipelineEvent::ResolutionStarted {
            pack: working.name.clone(),
            reference_count: working.files.len(),
        });

        let pending = working.files.iter().filter(|r| !r.is_resolved()).count();
        if pending > 0 {
            debug!("{} references need resolution", pending);
            let files = std::mem::take(&mut working.files);
            working.files = self.complete_all(files, &target, cancel).await?;
            report.resolved = pending;
        }
        report.merged = fold_duplicate_projects(&mut working);

        loop {
            if cancel.is_cancelled() {
                return Err(McdexError::Cancelled);
            }
            let missing = missing_dependencies(&working);
            if missing.is_empty() {
                break;
            }
            debug!("Expanding {} dependencies: {:?}", missing.len(), missing);
            let deps = missing
                .into_iter()
                .map(|project_id| ModReference::repository(project_id, None).as_dependency())
                .collect();
            let resolved = self.complete_all(deps, &target, cancel).await?;
            report.dependencies_added += resolved.len();
            working.add_references(resolved)?;
        }

        self.emit(PipelineEvent::ResolutionFinished {
            pack: working.name.clone(),
            reference_count: working.files.len(),
        });
        *manifest = working;
        Ok(report)
    }

    /// Completes references concurrently; output order matches input order.
    async fn complete_all(
        &self,
        references: Vec<ModReference>,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<Vec<ModReference>> {
        let work = stream::iter(references)
            .map(|reference| async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(McdexError::Cancelled),
                    r = self.complete(reference, target) => r,
                }
            })
            .buffered(self.concurrency);
        work.try_collect().await
    }
}

/// Dependency project ids declared by resolved entries but absent from the
/// manifest, in discovery order.
fn missing_dependencies(manifest: &Manifest) -> Vec<u64> {
    let present: HashSet<u64> = manifest.files.iter().filter_map(|r| r.project_id).collect();
    let mut seen = BTreeSet::new();
    let mut missing = Vec::new();
    for reference in &manifest.files {
        for dep in reference.dependencies.iter().flatten() {
            if !present.contains(dep) && seen.insert(*dep) {
                missing.push(*dep);
            }
        }
    }
    missing
}

/// After resolution two entries (say a slug and an id) can land on the same
/// project. The first one keeps its position and takes the newer file; an
/// explicit request on either side keeps it explicit.
fn fold_duplicate_projects(manifest: &mut Manifest) -> usize {
    let mut kept: Vec<ModReference> = Vec::with_capacity(manifest.files.len());
    let mut merged = 0;
    for reference in std::mem::take(&mut manifest.files) {
        let key = reference.key();
        let existing = match key {
            ReferenceKey::Project(_) => kept.iter_mut().find(|r| r.key() == key),
            _ => None,
        };
        let Some(existing) = existing else {
            kept.push(reference);
            continue;
        };
        merged += 1;
        let explicit = !existing.dependency || !reference.dependency;
        if reference.file_id > existing.file_id {
            if existing.file_id.is_some() {
                warn!(
                    "{} listed twice; keeping newer file {:?}",
                    reference.display_name(),
                    reference.file_id
                );
            }
            let installed = existing.installed && existing.filename == reference.filename;
            *existing = reference;
            existing.installed = installed;
        }
        existing.dependency = !explicit;
    }
    manifest.files = kept;
    merged
}
