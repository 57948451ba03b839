use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wormcore::{EngineError, SlotDescriptor};

/// Serialized sub-graph as authored and published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubGraphDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Vec<SlotDescriptor>,
    #[serde(default)]
    pub outputs: Vec<SlotDescriptor>,
    #[serde(default)]
    pub nodes: Vec<OperatorSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

impl SubGraphDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EngineError> {
        serde_json::from_slice(bytes).map_err(|e| EngineError::Parse(e.to_string()))
    }

    pub fn with_input(mut self, slot: SlotDescriptor) -> Self {
        self.inputs.push(slot);
        self
    }

    pub fn with_output(mut self, slot: SlotDescriptor) -> Self {
        self.outputs.push(slot);
        self
    }

    pub fn with_node(mut self, node: OperatorSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn connect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.connections.push(ConnectionSpec {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec_pretty(self).map_err(|e| EngineError::Parse(e.to_string()))
    }
}

/// Operator instance inside a sub-graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub id: String,
    pub op: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl OperatorSpec {
    pub fn new(id: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            op: op.into(),
            config: HashMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Wire between two endpoints, e.g. `input:A` -> `add.a`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub from: String,
    pub to: String,
}

/// Parsed form of a connection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    GraphInput(String),
    GraphOutput(String),
    Port { node: String, port: String },
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        if let Some(slot) = raw.strip_prefix("input:") {
            return Ok(Endpoint::GraphInput(slot.to_string()));
        }
        if let Some(slot) = raw.strip_prefix("output:") {
            return Ok(Endpoint::GraphOutput(slot.to_string()));
        }
        match raw.rsplit_once('.') {
            Some((node, port)) if !node.is_empty() && !port.is_empty() => Ok(Endpoint::Port {
                node: node.to_string(),
                port: port.to_string(),
            }),
            _ => Err(EngineError::InvalidConnection(format!(
                "malformed endpoint '{}'",
                raw
            ))),
        }
    }
}
