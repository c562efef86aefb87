//! Where the runtime client fetches artifacts from.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use url::Url;

use siteindex_shared::{Result, SiteIndexError};

/// Default timeout in seconds for artifact requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for artifact requests.
const USER_AGENT: &str = concat!("siteindex/", env!("CARGO_PKG_VERSION"));

/// A store of built artifacts addressed by `/`-separated relative paths.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch the bytes at `path`. `Ok(None)` when nothing is there.
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

/// Join path segments with `/`, dropping empty ones and collapsing repeats.
///
/// `join_path(&["/search/", "", "idx.json"])` is `"/search/idx.json"`.
pub fn join_path(parts: &[&str]) -> String {
    static SLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new("/+").expect("valid regex"));

    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    SLASHES.replace_all(&joined, "/").into_owned()
}

// ---------------------------------------------------------------------------
// HttpSource
// ---------------------------------------------------------------------------

/// Artifacts served over HTTP, relative to a base URL.
///
/// Any non-success status counts as absent; transport failures are
/// [`SiteIndexError::Network`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SiteIndexError::Network(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(client, base)
    }

    pub fn with_client(client: Client, base: &str) -> Result<Self> {
        let mut base = Url::parse(base)
            .map_err(|e| SiteIndexError::config(format!("invalid base URL {base:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl ArtifactSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| SiteIndexError::validation(format!("invalid artifact path {path:?}: {e}")))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SiteIndexError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, %status, "artifact not available");
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SiteIndexError::Network(format!("{url}: failed to read body: {e}")))?;

        debug!(%url, size = body.len(), "fetched artifact");
        Ok(Some(body.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// DirSource
// ---------------------------------------------------------------------------

/// Artifacts read from a local directory (e.g. a build's output).
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactSource for DirSource {
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let relative = Path::new(path.trim_start_matches('/'));
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(SiteIndexError::validation(format!(
                "artifact path escapes the source directory: {path}"
            )));
        }

        let file = self.root.join(relative);
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %file.display(), "artifact not available");
                Ok(None)
            }
            Err(e) => Err(SiteIndexError::io(&file, e)),
        }
    }
}
