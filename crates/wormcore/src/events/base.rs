use crate::{DiagnosticLevel, HostRuntime, ProxySchema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events a proxy node publishes towards its host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    ParametersChanged {
        node_id: Uuid,
        inputs: Vec<String>,
        outputs: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    Diagnostic {
        node_id: Uuid,
        level: DiagnosticLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl HostEvent {
    pub fn node_id(&self) -> Uuid {
        match self {
            HostEvent::ParametersChanged { node_id, .. } | HostEvent::Diagnostic { node_id, .. } => {
                *node_id
            }
        }
    }
}

/// Host runtime adapter that publishes onto an [`EventBus`]
#[derive(Clone)]
pub struct EventHost {
    node_id: Uuid,
    sender: broadcast::Sender<HostEvent>,
}

impl EventHost {
    pub fn new(node_id: Uuid, sender: broadcast::Sender<HostEvent>) -> Self {
        Self { node_id, sender }
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    fn emit(&self, event: HostEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl HostRuntime for EventHost {
    fn notify_parameters_changed(&self, schema: &ProxySchema) {
        tracing::debug!(
            node = %self.node_id,
            inputs = schema.inputs().len(),
            outputs = schema.outputs().len(),
            "parameters changed"
        );
        self.emit(HostEvent::ParametersChanged {
            node_id: self.node_id,
            inputs: schema.inputs().iter().map(|p| p.nickname.clone()).collect(),
            outputs: schema.outputs().iter().map(|p| p.nickname.clone()).collect(),
            timestamp: Utc::now(),
        });
    }

    fn report_diagnostic(&self, level: DiagnosticLevel, message: &str) {
        match level {
            DiagnosticLevel::Error => tracing::error!(node = %self.node_id, "{}", message),
            DiagnosticLevel::Warning => tracing::warn!(node = %self.node_id, "{}", message),
            DiagnosticLevel::Info => tracing::info!(node = %self.node_id, "{}", message),
        }
        self.emit(HostEvent::Diagnostic {
            node_id: self.node_id,
            level,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Broadcast bus shared by every proxy node of one host graph
pub struct EventBus {
    sender: broadcast::Sender<HostEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }

    pub fn create_host(&self, node_id: Uuid) -> EventHost {
        EventHost::new(node_id, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
