use crate::{GraphReference, Location, ProxyConfig, ReferenceKind, ResolvedLocator, Transport};
use reqwest::Url;
use std::sync::Arc;
use wormcore::ProxyError;

/// Turns a user-supplied name or URL into a single reachable locator
pub struct Resolver {
    transport: Arc<dyn Transport>,
    config: Arc<ProxyConfig>,
}

impl Resolver {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<ProxyConfig>) -> Self {
        Self { transport, config }
    }

    pub async fn resolve(&self, reference: &GraphReference) -> Result<ResolvedLocator, ProxyError> {
        if reference.is_empty() {
            return Err(ProxyError::ResourceNotFound {
                reference: String::new(),
                tried: Vec::new(),
            });
        }

        match reference.kind() {
            ReferenceKind::LocalPath(path) => {
                let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                if !exists {
                    return Err(ProxyError::NotReachable(path.display().to_string()));
                }
                tracing::debug!("Resolved {} to local file", reference);
                Ok(ResolvedLocator::new(reference.clone(), Location::Local(path)))
            }
            ReferenceKind::Url(url) => {
                self.ensure_online().await?;
                match self.transport.probe(&url).await {
                    Ok(true) => {
                        tracing::info!("Resolved {} (absolute URL)", url);
                        Ok(ResolvedLocator::new(reference.clone(), Location::Remote(url)))
                    }
                    Ok(false) => Err(ProxyError::NotReachable(url.to_string())),
                    Err(e) => {
                        tracing::debug!("Probe of {} failed: {}", url, e);
                        Err(ProxyError::NotReachable(url.to_string()))
                    }
                }
            }
            ReferenceKind::Name(name) => {
                self.ensure_online().await?;
                self.resolve_name(reference, &name).await
            }
        }
    }

    async fn ensure_online(&self) -> Result<(), ProxyError> {
        if self.transport.is_online().await {
            Ok(())
        } else {
            Err(ProxyError::NetworkUnavailable)
        }
    }

    async fn resolve_name(
        &self,
        reference: &GraphReference,
        name: &str,
    ) -> Result<ResolvedLocator, ProxyError> {
        let template = self.fetch_template().await?;
        let candidates = expand_template(&template, name, &self.config);

        let mut tried = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let url = match Url::parse(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping unparsable candidate {}: {}", candidate, e);
                    tried.push(candidate);
                    continue;
                }
            };
            match self.transport.probe(&url).await {
                Ok(true) => {
                    tracing::info!("Resolved '{}' to {}", name, url);
                    return Ok(ResolvedLocator::new(reference.clone(), Location::Remote(url)));
                }
                Ok(false) => tracing::debug!("Candidate {} not found", url),
                Err(e) => tracing::debug!("Candidate {} probe failed: {}", url, e),
            }
            tried.push(candidate);
        }

        Err(ProxyError::ResourceNotFound {
            reference: name.to_string(),
            tried,
        })
    }

    async fn fetch_template(&self) -> Result<String, ProxyError> {
        let index = self.config.index_url.as_deref().ok_or_else(|| {
            ProxyError::ResolutionServiceUnavailable("no index URL configured".to_string())
        })?;
        let index_url = Url::parse(index).map_err(|e| {
            ProxyError::ResolutionServiceUnavailable(format!("invalid index URL {}: {}", index, e))
        })?;

        let body = self.transport.get(&index_url).await.map_err(|e| {
            ProxyError::ResolutionServiceUnavailable(format!("{}: {}", index_url, e))
        })?;

        parse_template(&body).ok_or_else(|| {
            ProxyError::ResolutionServiceUnavailable(format!(
                "{} does not contain a URL template",
                index_url
            ))
        })
    }
}

/// Extract the URL template from an indirection document.
///
/// Accepts a JSON object with a `template` field, otherwise the first
/// non-empty line that is not a `#` comment.
pub fn parse_template(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(&text) {
        return map
            .get("template")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Candidate URLs for `name`, one per configured extension, in priority order
pub fn expand_template(template: &str, name: &str, config: &ProxyConfig) -> Vec<String> {
    let with_name = template.replace(&config.name_placeholder, name);
    let with_placeholder = if with_name.contains(&config.extension_placeholder) {
        with_name
    } else {
        format!("{}.{}", with_name, config.extension_placeholder)
    };
    config
        .extensions
        .iter()
        .map(|ext| with_placeholder.replace(&config.extension_placeholder, ext))
        .collect()
}
