use crate::context::DagContext;
use crate::definition::SubGraphDefinition;
use crate::graph::DagGraph;
use crate::registry::OperatorRegistry;
use std::sync::Arc;
use wormcore::{EmbeddingContext, EngineError, GraphEngine, SubGraph};

/// Graph engine that runs JSON sub-graph definitions
pub struct DagEngine {
    registry: Arc<OperatorRegistry>,
    config: EngineConfig,
}

impl DagEngine {
    /// Engine with the built-in operators and default settings
    pub fn new() -> Self {
        Self::with_registry(Arc::new(OperatorRegistry::with_builtins()), EngineConfig::default())
    }

    pub fn with_registry(registry: Arc<OperatorRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<OperatorRegistry> {
        &self.registry
    }

    /// Parse and compile without wrapping in a trait object
    pub fn compile(&self, bytes: &[u8]) -> Result<DagGraph, EngineError> {
        let definition = SubGraphDefinition::from_slice(bytes)?;
        DagGraph::compile(definition, &self.registry, &self.config)
    }
}

impl Default for DagEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEngine for DagEngine {
    fn name(&self) -> &str {
        "dag"
    }

    fn create_context(&self) -> Box<dyn EmbeddingContext> {
        Box::new(DagContext::new())
    }

    fn load_graph(&self, bytes: &[u8]) -> Result<Box<dyn SubGraph>, EngineError> {
        let graph = self.compile(bytes)?;
        tracing::info!(
            "Loaded sub-graph '{}' ({} inputs, {} outputs)",
            graph.name(),
            graph.input_slots().len(),
            graph.output_slots().len()
        );
        Ok(Box::new(graph))
    }
}

/// Configuration for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_operators: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_operators: 10_000,
        }
    }
}
