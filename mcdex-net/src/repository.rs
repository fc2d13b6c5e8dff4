// mcdex-net/src/repository.rs
// Contract with the external mod repository service, plus its HTTP client.

use async_trait::async_trait;
use mcdex_common::config::Config;
use mcdex_common::error::{McdexError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::http::build_http_client;
use crate::validation::validate_url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub file_id: u64,
    pub file_name: String,
    #[serde(default)]
    pub display_version: String,
    pub download_url: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    /// Game versions this file declares support for, e.g. `["1.16.5"]`.
    #[serde(default)]
    pub game_versions: Vec<String>,
    /// Semver requirement on the loader version, e.g. `">=36.1.0, <37"`.
    #[serde(default)]
    pub loader_versions: Option<String>,
    /// Project ids this file requires.
    #[serde(default)]
    pub dependencies: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// Lookup service for mod projects. Failures surface as errors, never as
/// partial responses.
#[async_trait]
pub trait ModRepository: Send + Sync {
    async fn search(&self, slug: &str) -> Result<Vec<ProjectSummary>>;
    async fn project(&self, project_id: u64) -> Result<ProjectInfo>;
}

pub struct HttpRepository {
    client: Client,
    base: Url,
}

impl HttpRepository {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base(&config.repository_url)
    }

    pub fn with_base(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim_end_matches('/');
        let base = validate_url(&format!("{trimmed}/"))?;
        Ok(Self {
            client: build_http_client()?,
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| McdexError::Validation(format!("Bad repository path '{path}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("Repository request: {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            McdexError::RepositoryUnavailable(format!("request to {url} failed: {e}"))
        })?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(McdexError::NotFound(format!("{url}")));
        }
        if !status.is_success() {
            return Err(McdexError::RepositoryUnavailable(format!(
                "{url} responded {status}"
            )));
        }
        response.json::<T>().await.map_err(|e| {
            McdexError::RepositoryUnavailable(format!("malformed response from {url}: {e}"))
        })
    }
}

#[async_trait]
impl ModRepository for HttpRepository {
    #[instrument(skip(self))]
    async fn search(&self, slug: &str) -> Result<Vec<ProjectSummary>> {
        let mut url = self.endpoint("projects/search")?;
        url.query_pairs_mut().append_pair("slug", slug);
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn project(&self, project_id: u64) -> Result<ProjectInfo> {
        let url = self.endpoint(&format!("projects/{project_id}"))?;
        self.get_json(url).await.map_err(|e| match e {
            McdexError::NotFound(_) => McdexError::NotFound(format!("project {project_id}")),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path() {
        let repo = HttpRepository::with_base("https://api.example.com/v1").unwrap();
        assert_eq!(
            repo.endpoint("projects/42").unwrap().as_str(),
            "https://api.example.com/v1/projects/42"
        );
    }

    #[test]
    fn remote_file_defaults() {
        let file: RemoteFile = serde_json::from_str(
            r#"{"fileId": 7, "fileName": "a.jar", "downloadUrl": "https://cdn/a.jar"}"#,
        )
        .unwrap();
        assert!(file.dependencies.is_empty());
        assert!(file.game_versions.is_empty());
        assert_eq!(file.loader_versions, None);
    }
}
