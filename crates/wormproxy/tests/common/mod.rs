#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use wormcore::{DiagnosticLevel, HostRuntime, ProxySchema, TransportError};
use wormproxy::{Transport, Url};

/// Route proxy logs through the test writer; `RUST_LOG` overrides the level
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// In-memory network: a URL is reachable iff it has a body
pub struct FakeTransport {
    online: AtomicBool,
    resources: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    pub entered: Arc<Notify>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            resources: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
            entered: Arc::new(Notify::new()),
        }
    }

    /// Every `get` waits for a permit on `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn with(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&self, url: &str, body: impl Into<Vec<u8>>) {
        let key = Url::parse(url).expect("test url").to_string();
        self.resources.lock().insert(key, body.into());
    }

    pub fn remove(&self, url: &str) {
        let key = Url::parse(url).expect("test url").to_string();
        self.resources.lock().remove(&key);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn gets(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("GET ")).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn probe(&self, url: &Url) -> Result<bool, TransportError> {
        self.calls.lock().push(format!("HEAD {}", url));
        Ok(self.resources.lock().contains_key(url.as_str()))
    }

    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        self.calls.lock().push(format!("GET {}", url));
        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.acquire().await.expect("gate open").forget();
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("offline".to_string()));
        }
        self.resources
            .lock()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Host runtime that records everything the proxy tells it
#[derive(Default)]
pub struct RecordingHost {
    pub diagnostics: Mutex<Vec<(DiagnosticLevel, String)>>,
    pub changes: AtomicUsize,
    pub last_schema: Mutex<Option<ProxySchema>>,
}

impl RecordingHost {
    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|(level, _)| *level == DiagnosticLevel::Error)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.lock().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl HostRuntime for RecordingHost {
    fn notify_parameters_changed(&self, schema: &ProxySchema) {
        self.changes.fetch_add(1, Ordering::SeqCst);
        *self.last_schema.lock() = Some(schema.clone());
    }

    fn report_diagnostic(&self, level: DiagnosticLevel, message: &str) {
        self.diagnostics.lock().push((level, message.to_string()));
    }
}

/// Two single inputs summed into one output
pub fn sum_graph() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "name": "sum",
        "inputs": [
            {"name": "A", "nickname": "a"},
            {"name": "B", "nickname": "b"}
        ],
        "outputs": [{"name": "Sum", "nickname": "S"}],
        "nodes": [{"id": "add", "op": "math.add"}],
        "connections": [
            {"from": "input:A", "to": "add.a"},
            {"from": "input:B", "to": "add.b"},
            {"from": "add.result", "to": "output:Sum"}
        ]
    }))
    .expect("serialize")
}

/// Same shape as `sum_graph` with different slot names
pub fn product_graph() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "name": "product",
        "inputs": [
            {"name": "X", "nickname": "x"},
            {"name": "Y", "nickname": "y", "optional": true}
        ],
        "outputs": [{"name": "Product", "nickname": "P"}],
        "nodes": [{"id": "mul", "op": "math.multiply"}],
        "connections": [
            {"from": "input:X", "to": "mul.a"},
            {"from": "input:Y", "to": "mul.b"},
            {"from": "mul.result", "to": "output:Product"}
        ]
    }))
    .expect("serialize")
}

/// One list input, two outputs
pub fn stats_graph() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "name": "stats",
        "inputs": [{"name": "Values", "nickname": "V", "access": "list"}],
        "outputs": [
            {"name": "Total", "nickname": "T"},
            {"name": "Count", "nickname": "N"}
        ],
        "nodes": [
            {"id": "sum", "op": "list.sum"},
            {"id": "len", "op": "list.length"}
        ],
        "connections": [
            {"from": "input:Values", "to": "sum.values"},
            {"from": "input:Values", "to": "len.list"},
            {"from": "sum.sum", "to": "output:Total"},
            {"from": "len.length", "to": "output:Count"}
        ]
    }))
    .expect("serialize")
}
