use crate::LocalArtifact;
use std::sync::Arc;
use wormcore::{EmbeddingContext, GraphEngine, ProxyError, SlotDescriptor};

/// A sub-graph instance living inside its private embedding context
pub struct EmbeddedGraph {
    context: Box<dyn EmbeddingContext>,
    name: String,
}

impl EmbeddedGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authoritative input schema, read from the live instance
    pub fn input_slots(&self) -> &[SlotDescriptor] {
        self.context.graph().map(|g| g.input_slots()).unwrap_or(&[])
    }

    pub fn output_slots(&self) -> &[SlotDescriptor] {
        self.context.graph().map(|g| g.output_slots()).unwrap_or(&[])
    }

    pub fn context_mut(&mut self) -> &mut dyn EmbeddingContext {
        self.context.as_mut()
    }

    /// Disable, detach, dispose. Disabling first means detaching can never
    /// kick off a solve against a half-removed graph.
    pub fn teardown(mut self) {
        self.context.set_enabled(false);
        if let Some(graph) = self.context.detach() {
            tracing::debug!("Detached sub-graph '{}'", graph.name());
        }
        self.context.dispose();
        tracing::info!("Disposed embedding context for '{}'", self.name);
    }
}

/// Parses fetched artifacts with the injected graph engine
pub struct Loader {
    engine: Arc<dyn GraphEngine>,
}

impl Loader {
    pub fn new(engine: Arc<dyn GraphEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn GraphEngine> {
        &self.engine
    }

    pub async fn load(&self, artifact: &LocalArtifact) -> Result<EmbeddedGraph, ProxyError> {
        let bytes = match tokio::fs::read(&artifact.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProxyError::ArtifactMissing(artifact.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let graph = self
            .engine
            .load_graph(&bytes)
            .map_err(|e| ProxyError::MalformedGraph(e.to_string()))?;
        let name = graph.name().to_string();

        let mut context = self.engine.create_context();
        context.set_enabled(true);
        if let Err(e) = context.attach(graph) {
            context.dispose();
            return Err(ProxyError::GraphEngineFault(e.to_string()));
        }

        tracing::info!(
            "Loaded '{}' from {} into a {} context",
            name,
            artifact.path.display(),
            self.engine.name()
        );
        Ok(EmbeddedGraph { context, name })
    }
}
