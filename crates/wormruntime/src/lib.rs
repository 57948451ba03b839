//! Built-in graph engine
//!
//! Loads JSON sub-graph definitions, wires them into a DAG of operators and
//! evaluates them on demand inside embedding contexts.

mod context;
mod definition;
mod engine;
mod graph;
mod operators;
mod registry;

pub use context::DagContext;
pub use definition::{ConnectionSpec, Endpoint, OperatorSpec, SubGraphDefinition};
pub use engine::{DagEngine, EngineConfig};
pub use graph::DagGraph;
pub use operators::register_all;
pub use registry::{Operator, OperatorFactory, OperatorMetadata, OperatorRegistry, PortValues};
