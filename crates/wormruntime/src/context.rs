use wormcore::{BranchPath, DataTree, EmbeddingContext, EngineError, SubGraph, Value};

/// Private container that lets one sub-graph run outside any host document
pub struct DagContext {
    graph: Option<Box<dyn SubGraph>>,
    enabled: bool,
    disposed: bool,
    solves: u64,
}

impl DagContext {
    pub fn new() -> Self {
        Self {
            graph: None,
            enabled: true,
            disposed: false,
            solves: 0,
        }
    }

    /// Number of completed recomputes
    pub fn solves(&self) -> u64 {
        self.solves
    }

    fn live(&self) -> Result<(), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        Ok(())
    }

    fn graph_mut(&mut self) -> Result<&mut Box<dyn SubGraph>, EngineError> {
        self.live()?;
        self.graph.as_mut().ok_or(EngineError::NoGraph)
    }
}

impl Default for DagContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingContext for DagContext {
    fn attach(&mut self, graph: Box<dyn SubGraph>) -> Result<(), EngineError> {
        self.live()?;
        if let Some(previous) = self.graph.replace(graph) {
            tracing::warn!("Replacing attached sub-graph '{}'", previous.name());
        }
        Ok(())
    }

    fn detach(&mut self) -> Option<Box<dyn SubGraph>> {
        self.graph.take()
    }

    fn graph(&self) -> Option<&dyn SubGraph> {
        if self.disposed {
            return None;
        }
        self.graph.as_deref()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled && !self.disposed
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn set_input_data(
        &mut self,
        slot: usize,
        branch: &BranchPath,
        values: Vec<Value>,
    ) -> Result<(), EngineError> {
        self.graph_mut()?.set_input_data(slot, branch, values)
    }

    fn clear_inputs(&mut self) -> Result<(), EngineError> {
        self.graph_mut()?.clear_inputs();
        Ok(())
    }

    fn mark_stale_and_recompute(&mut self) -> Result<(), EngineError> {
        self.live()?;
        if !self.enabled {
            return Err(EngineError::Disabled);
        }
        self.graph_mut()?.recompute()?;
        self.solves += 1;
        Ok(())
    }

    fn output_data(&self, slot: usize) -> Result<&DataTree, EngineError> {
        self.live()?;
        self.graph
            .as_ref()
            .ok_or(EngineError::NoGraph)?
            .output_data(slot)
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.enabled = false;
        if let Some(graph) = self.graph.take() {
            tracing::debug!("Disposing context holding '{}'", graph.name());
        }
        self.disposed = true;
    }
}
