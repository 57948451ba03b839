//! Seam to the embedded graph execution engine.
//!
//! The proxy never names a concrete engine; it receives an
//! `Arc<dyn GraphEngine>` and drives sub-graphs only through these traits,
//! so tests can substitute their own implementation.

use crate::{BranchPath, DataTree, EngineError, SlotDescriptor, Value};

/// Factory for embedding contexts and sub-graph instances
pub trait GraphEngine: Send + Sync {
    /// Engine name for logs and status text
    fn name(&self) -> &str;

    /// Create an empty, enabled embedding context
    fn create_context(&self) -> Box<dyn EmbeddingContext>;

    /// Parse a sub-graph definition
    fn load_graph(&self, bytes: &[u8]) -> Result<Box<dyn SubGraph>, EngineError>;
}

/// A loaded computation graph with a declared slot schema
pub trait SubGraph: Send {
    fn name(&self) -> &str;

    fn input_slots(&self) -> &[SlotDescriptor];

    fn output_slots(&self) -> &[SlotDescriptor];

    /// Replace the data on one branch of an input slot
    fn set_input_data(
        &mut self,
        slot: usize,
        branch: &BranchPath,
        values: Vec<Value>,
    ) -> Result<(), EngineError>;

    /// Drop every stored input so the next solve starts clean
    fn clear_inputs(&mut self);

    /// Discard volatile data and solve again
    fn recompute(&mut self) -> Result<(), EngineError>;

    /// Volatile view of the last solve; overwritten by the next recompute
    fn output_data(&self, slot: usize) -> Result<&DataTree, EngineError>;
}

/// Minimal container a sub-graph must live in to be runnable.
///
/// Teardown order is disable, detach, dispose: a disabled context refuses to
/// recompute, so detaching afterwards can never trigger a solve.
pub trait EmbeddingContext: Send {
    fn attach(&mut self, graph: Box<dyn SubGraph>) -> Result<(), EngineError>;

    fn detach(&mut self) -> Option<Box<dyn SubGraph>>;

    fn graph(&self) -> Option<&dyn SubGraph>;

    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    fn is_disposed(&self) -> bool;

    fn set_input_data(
        &mut self,
        slot: usize,
        branch: &BranchPath,
        values: Vec<Value>,
    ) -> Result<(), EngineError>;

    fn clear_inputs(&mut self) -> Result<(), EngineError>;

    fn mark_stale_and_recompute(&mut self) -> Result<(), EngineError>;

    fn output_data(&self, slot: usize) -> Result<&DataTree, EngineError>;

    /// Release everything; every later call fails with `EngineError::Disposed`
    fn dispose(&mut self);
}
