//! Core abstractions for the sub-graph proxy
//!
//! This crate provides the fundamental types and traits shared by the
//! graph engine and the proxy node. It performs no network access.

mod engine;
mod error;
pub mod events;
mod host;
mod schema;
mod slot;
mod state;
mod tree;
mod value;

pub use engine::{EmbeddingContext, GraphEngine, SubGraph};
pub use error::{EngineError, ProxyError, TransportError};
pub use events::{EventBus, EventHost, HostEvent};
pub use host::{DiagnosticLevel, HostRuntime};
pub use schema::{
    invent_unique_nickname, Param, ParamKind, ParameterSide, ProxySchema, SchemaOp, SlotCounts,
};
pub use slot::{Access, SlotDescriptor};
pub use state::{LoadStep, LoadedState};
pub use tree::{BranchPath, DataTree};
pub use value::Value;

/// Result type for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;
