use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wormcore::ProxyError;

/// Settings for resolution, fetching and the artifact store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Location of the indirection document holding the URL template
    pub index_url: Option<String>,
    /// Extension candidates, probed in order
    pub extensions: Vec<String>,
    pub name_placeholder: String,
    pub extension_placeholder: String,
    /// Shared directory fetched artifacts are written to
    pub artifact_dir: PathBuf,
    pub request_timeout_secs: Option<u64>,
    /// `host:port` used to decide whether the network is up at all
    pub connectivity_probe: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            index_url: None,
            extensions: vec!["ghcluster".to_string(), "ghx".to_string(), "gh".to_string()],
            name_placeholder: "{name}".to_string(),
            extension_placeholder: "GHEXTENSION".to_string(),
            artifact_dir: std::env::temp_dir().join("hairworm"),
            request_timeout_secs: Some(30),
            connectivity_probe: None,
        }
    }
}

impl ProxyConfig {
    /// Load from a JSON file; missing fields fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProxyError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| {
            ProxyError::Io(format!("invalid config {}: {}", path.as_ref().display(), e))
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = Some(url.into());
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}
