use crate::{LocalArtifact, Location, ResolvedLocator, Transport};
use reqwest::Url;
use std::path::PathBuf;
use std::sync::Arc;
use wormcore::ProxyError;

const FALLBACK_FILENAME: &str = "subgraph";

/// Downloads resolved sub-graphs into the shared artifact directory.
///
/// Paths derive from the locator's filename only, so two references that
/// resolve to the same filename overwrite each other.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    artifact_dir: PathBuf,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Deterministic local path for a remote locator
    pub fn artifact_path(&self, url: &Url) -> PathBuf {
        self.artifact_dir.join(artifact_filename(url))
    }

    pub async fn fetch(&self, locator: &ResolvedLocator) -> Result<LocalArtifact, ProxyError> {
        let path = match locator.location() {
            Location::Local(path) => path.clone(),
            Location::Remote(url) => self.download(url).await?,
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ProxyError::ArtifactMissing(path));
        }

        Ok(LocalArtifact {
            path,
            locator: locator.clone(),
        })
    }

    async fn download(&self, url: &Url) -> Result<PathBuf, ProxyError> {
        let bytes = self
            .transport
            .get(url)
            .await
            .map_err(|e| ProxyError::NetworkError(e.to_string()))?;

        tokio::fs::create_dir_all(&self.artifact_dir).await?;
        let path = self.artifact_path(url);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!("Fetched {} ({} bytes) to {}", url, bytes.len(), path.display());
        Ok(path)
    }
}

fn artifact_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|s| *s != "." && *s != "..")
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}
