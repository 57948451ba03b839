use crate::LoadStep;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Not reachable: {0}")]
    NotReachable(String),

    #[error("Resolution service unavailable: {0}")]
    ResolutionServiceUnavailable(String),

    #[error("Resource not found: '{reference}' (tried {} candidates)", .tried.len())]
    ResourceNotFound {
        reference: String,
        tried: Vec<String>,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Artifact missing: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Malformed graph: {0}")]
    MalformedGraph(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error(
        "Schema out of sync: expected {expected_inputs} inputs / {expected_outputs} outputs, \
         found {actual_inputs} / {actual_outputs}"
    )]
    SchemaOutOfSync {
        expected_inputs: usize,
        expected_outputs: usize,
        actual_inputs: usize,
        actual_outputs: usize,
    },

    #[error("Graph engine fault: {0}")]
    GraphEngineFault(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Reload already in progress")]
    ReloadInProgress,

    #[error("Node has been removed")]
    Disposed,

    #[error("Reload failed during {step}: {source}")]
    Reload {
        step: LoadStep,
        #[source]
        source: Box<ProxyError>,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl ProxyError {
    pub fn during(step: LoadStep, source: ProxyError) -> Self {
        Self::Reload {
            step,
            source: Box::new(source),
        }
    }

    /// The underlying cause with any step wrapper removed
    pub fn root(&self) -> &ProxyError {
        match self {
            Self::Reload { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<EngineError> for ProxyError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Parse(msg)
            | EngineError::UnknownOperator(msg)
            | EngineError::InvalidConnection(msg) => Self::MalformedGraph(msg),
            EngineError::CyclicDependency => Self::MalformedGraph(e.to_string()),
            other => Self::GraphEngineFault(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Definition parse error: {0}")]
    Parse(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Cyclic dependency detected")]
    CyclicDependency,

    #[error("{side} slot {index} out of range ({count} slots)")]
    SlotOutOfRange {
        side: &'static str,
        index: usize,
        count: usize,
    },

    #[error("Operator '{node}' failed: {message}")]
    Operator { node: String, message: String },

    #[error("No sub-graph attached to context")]
    NoGraph,

    #[error("Context is disabled")]
    Disabled,

    #[error("Context has been disposed")]
    Disposed,
}

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body: {0}")]
    Body(String),
}
