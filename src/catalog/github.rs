//! Catalog backed by a GitHub-style git tree API.

use super::{CatalogEntry, EntryKind, RemoteCatalog};
use crate::constants::{DEFAULT_REQUEST_TIMEOUT, USER_AGENT};
use crate::core::{Result, UpdateError};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Default base for raw file content.
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
/// Default base for zipball downloads.
pub const DEFAULT_ARCHIVE_BASE: &str = "https://codeload.github.com";

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sha: String,
}

/// Lists a repository through `GET /repos/{owner}/{repo}/git/trees/{ref}?recursive=1`.
///
/// The three bases are configurable so the catalog can point at GitHub
/// Enterprise or a compatible mirror.
#[derive(Debug, Clone)]
pub struct GitHubCatalog {
    client: Client,
    owner: String,
    repo: String,
    api_base: String,
    raw_base: String,
    archive_base: String,
}

impl GitHubCatalog {
    /// Catalog for `owner/repo` on github.com.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        Self::with_bases(owner, repo, DEFAULT_API_BASE, DEFAULT_RAW_BASE, DEFAULT_ARCHIVE_BASE, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Catalog with explicit API, raw-content and archive bases.
    pub fn with_bases(
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
        raw_base: impl Into<String>,
        archive_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).timeout(timeout).build().map_err(|e| {
            UpdateError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            raw_base: raw_base.into().trim_end_matches('/').to_string(),
            archive_base: archive_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn tree_url(&self, git_ref: &str) -> String {
        format!("{}/repos/{}/{}/git/trees/{}?recursive=1", self.api_base, self.owner, self.repo, git_ref)
    }

    /// Appends path segments to `base`, percent-encoding each one.
    fn encoded_url<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> Option<String> {
        let mut url = Url::parse(base).ok()?;
        {
            let mut path = url.path_segments_mut().ok()?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Some(url.to_string())
    }
}

impl RemoteCatalog for GitHubCatalog {
    async fn get_tree(&self, git_ref: &str) -> Result<Vec<CatalogEntry>> {
        let url = self.tree_url(git_ref);
        debug!("Listing catalog: {}", url);

        let catalog_error = |reason: String| UpdateError::Catalog {
            git_ref: git_ref.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| catalog_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(catalog_error(format!("HTTP {status} from {url}")));
        }

        let body: TreeResponse = response.json().await.map_err(|e| catalog_error(format!("invalid tree response: {e}")))?;

        // A partial listing would mark every unlisted local file as removed.
        if body.truncated {
            warn!("Catalog listing for {} was truncated by the server", git_ref);
            return Err(catalog_error(format!(
                "the server truncated the listing after {} entries; refusing to update from a partial catalog",
                body.tree.len()
            )));
        }

        let entries: Vec<CatalogEntry> = body
            .tree
            .into_iter()
            .filter_map(|item| {
                let kind = match item.kind.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    // submodule commits
                    _ => return None,
                };
                Some(CatalogEntry {
                    path: item.path,
                    kind,
                    hash: item.sha,
                })
            })
            .collect();

        debug!("Catalog returned {} entries for {}", entries.len(), git_ref);
        Ok(entries)
    }

    fn raw_url(&self, git_ref: &str, path: &str) -> String {
        let segments = [self.owner.as_str(), self.repo.as_str()]
            .into_iter()
            .chain(git_ref.split('/'))
            .chain(path.split('/'));
        Self::encoded_url(&self.raw_base, segments)
            .unwrap_or_else(|| format!("{}/{}/{}/{}/{}", self.raw_base, self.owner, self.repo, git_ref, path))
    }

    fn archive_url(&self, git_ref: &str) -> Option<String> {
        let segments = [self.owner.as_str(), self.repo.as_str(), "zip"].into_iter().chain(git_ref.split('/'));
        Self::encoded_url(&self.archive_base, segments)
    }
}
