// crates/wormproxy/tests/proxy_test.rs

mod common;

use common::{product_graph, stats_graph, sum_graph, FakeTransport, RecordingHost};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use wormcore::{
    BranchPath, DataTree, DiagnosticLevel, EmbeddingContext, EngineError, GraphEngine,
    LoadedState, ParameterSide, ProxyError, SubGraph, Value,
};
use wormproxy::{ProxyConfig, ProxyNode, ReloadOutcome};
use wormruntime::{DagContext, DagEngine};

const INDEX: &str = "https://index.test/hairworm.txt";
const TEMPLATE: &str = "https://graphs.test/{name}.GHEXTENSION";

struct Harness {
    node: Arc<ProxyNode>,
    transport: Arc<FakeTransport>,
    host: Arc<RecordingHost>,
    dir: TempDir,
}

fn publish(transport: FakeTransport) -> FakeTransport {
    transport
        .with(INDEX, TEMPLATE)
        .with("https://graphs.test/sum.ghx", sum_graph())
        .with("https://graphs.test/product.ghcluster", product_graph())
        .with("https://graphs.test/stats.ghx", stats_graph())
}

fn harness_with(transport: FakeTransport, engine: Arc<dyn GraphEngine>) -> Harness {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(publish(transport));
    let host = Arc::new(RecordingHost::default());
    let config = ProxyConfig::default()
        .with_index_url(INDEX)
        .with_artifact_dir(dir.path().join("artifacts"))
        .with_extensions(["ghcluster", "ghx"]);
    let node = Arc::new(ProxyNode::new(engine, transport.clone(), config, host.clone()));
    Harness {
        node,
        transport,
        host,
        dir,
    }
}

fn harness() -> Harness {
    harness_with(FakeTransport::new(), Arc::new(DagEngine::new()))
}

fn text(s: &str) -> DataTree {
    DataTree::item(Value::Text(s.to_string()))
}

fn nicknames(node_schema: &[wormcore::Param]) -> Vec<&str> {
    node_schema.iter().map(|p| p.nickname.as_str()).collect()
}

#[tokio::test]
async fn test_reload_mirrors_schema_and_computes() {
    let h = harness();

    let outcome = h.node.reload_reference("sum").await;
    assert!(outcome.is_ready(), "got {:?}", outcome);

    let schema = h.node.schema().await;
    assert_eq!(nicknames(schema.inputs()), vec!["C", "a", "b"]);
    assert_eq!(nicknames(schema.outputs()), vec!["D", "S"]);
    assert_eq!(h.host.changes(), 1);
    assert!(h.node.state().await.is_ready());
    assert!(h.dir.path().join("artifacts").join("sum.ghx").exists());

    let outputs = h
        .node
        .compute(&[text("sum"), DataTree::item(3i64), DataTree::item(4i64)])
        .unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[1].first(), Some(&Value::Integer(7)));
    let status = outputs[0].first().and_then(Value::as_str).unwrap();
    assert!(status.contains("state: ready"), "{}", status);
    assert!(status.contains("reference: sum"), "{}", status);
}

#[tokio::test]
async fn test_single_access_takes_first_item_of_flattened_tree() {
    let h = harness();
    h.node.reload_reference("sum").await;

    let mut a = DataTree::new();
    a.set_branch(BranchPath::new(vec![0, 1]), vec![Value::Integer(10), Value::Integer(99)]);
    a.set_branch(BranchPath::new(vec![0, 2]), vec![Value::Integer(50)]);

    let outputs = h
        .node
        .compute(&[text("sum"), a, DataTree::item(1.5)])
        .unwrap();

    assert_eq!(outputs[1].branch_count(), 1);
    assert_eq!(outputs[1].branch(&BranchPath::root()), Some(&[Value::Number(11.5)][..]));
}

#[tokio::test]
async fn test_list_access_flattens_every_branch() {
    let h = harness();
    assert!(h.node.reload_reference("stats").await.is_ready());

    let mut values = DataTree::new();
    values.set_branch(BranchPath::new(vec![0]), vec![Value::Integer(1), Value::Integer(2)]);
    values.set_branch(BranchPath::new(vec![1]), vec![Value::Integer(3)]);

    let outputs = h.node.compute(&[text("stats"), values]).unwrap();

    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[1].first(), Some(&Value::Integer(6)));
    assert_eq!(outputs[2].first(), Some(&Value::Integer(3)));
}

#[tokio::test]
async fn test_outputs_are_snapshots() {
    let h = harness();
    h.node.reload_reference("sum").await;

    let first = h
        .node
        .compute(&[text("sum"), DataTree::item(3i64), DataTree::item(4i64)])
        .unwrap();
    let second = h
        .node
        .compute(&[text("sum"), DataTree::item(10i64), DataTree::item(1i64)])
        .unwrap();

    assert_eq!(first[1].first(), Some(&Value::Integer(7)));
    assert_eq!(second[1].first(), Some(&Value::Integer(11)));
    assert_eq!(h.node.last_outputs().await[1], second[1]);
}

#[tokio::test]
async fn test_reloading_same_reference_keeps_parameter_identity() {
    let h = harness();
    h.node.reload_reference("sum").await;
    let before = h.node.schema().await;

    assert!(h.node.reload_reference("sum").await.is_ready());
    let after = h.node.schema().await;

    assert_eq!(before, after);
    assert_eq!(h.host.changes(), 2);
}

#[tokio::test]
async fn test_switching_graphs_rebuilds_mirrored_parameters() {
    let h = harness();
    h.node.reload_reference("sum").await;
    let fixed = h.node.schema().await.inputs()[0].id;

    assert!(h.node.reload_reference("product").await.is_ready());
    let schema = h.node.schema().await;

    assert_eq!(schema.inputs()[0].id, fixed);
    assert_eq!(nicknames(schema.inputs()), vec!["C", "x", "y"]);
    assert_eq!(nicknames(schema.outputs()), vec!["D", "P"]);
    assert!(schema.inputs()[2].optional);

    // Optional input left empty still solves
    let outputs = h
        .node
        .compute(&[text("product"), DataTree::item(2i64), DataTree::new()])
        .unwrap();
    assert!(outputs[1].is_empty());

    let err = h
        .node
        .compute(&[text("product"), DataTree::new(), DataTree::item(2i64)])
        .unwrap_err();
    assert!(matches!(err, ProxyError::MissingInput(ref name) if name == "X"));
    assert!(h
        .host
        .diagnostics
        .lock()
        .iter()
        .any(|(level, m)| *level == DiagnosticLevel::Warning && m.contains("X")));
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_schema() {
    let h = harness();
    h.node.reload_reference("sum").await;
    let before = h.node.schema().await;
    let changes = h.host.changes();

    let outcome = h.node.reload_reference("missing").await;

    let ReloadOutcome::Failed(err) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(matches!(err.root(), ProxyError::ResourceNotFound { .. }));
    assert_eq!(h.node.schema().await, before);
    assert_eq!(h.host.changes(), changes);
    assert!(matches!(h.node.state().await, LoadedState::Failed(_)));
    assert!(!h.host.errors().is_empty());

    let err = h
        .node
        .compute(&[text("sum"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap_err();
    assert!(matches!(err, ProxyError::SchemaMismatch(_)));
}

#[tokio::test]
async fn test_malformed_artifact_reports_load_step() {
    let h = harness();
    h.transport.insert("https://graphs.test/broken.ghx", "not a graph");

    let outcome = h.node.reload_reference("broken").await;

    let ReloadOutcome::Failed(err) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(matches!(err.root(), ProxyError::MalformedGraph(_)));
    assert!(err.to_string().contains("load"), "{}", err);
}

#[tokio::test]
async fn test_engine_fault_keeps_last_outputs() {
    let h = harness();
    h.node.reload_reference("sum").await;
    let good = h
        .node
        .compute(&[text("sum"), DataTree::item(3i64), DataTree::item(4i64)])
        .unwrap();

    let err = h
        .node
        .compute(&[text("sum"), text("three"), DataTree::item(4i64)])
        .unwrap_err();

    assert!(matches!(err, ProxyError::GraphEngineFault(_)), "got {:?}", err);
    assert_eq!(h.node.last_outputs().await[1], good[1]);
    assert!(h.node.state().await.is_ready());
}

#[tokio::test]
async fn test_manual_parameter_edit_is_healed_by_reload() {
    let h = harness();
    h.node.reload_reference("sum").await;

    assert!(h.node.insert_parameter(ParameterSide::Input, 0).is_err());
    assert!(h.node.remove_parameter(ParameterSide::Output, 0).is_err());
    h.node.insert_parameter(ParameterSide::Input, 3).unwrap();

    let schema = h.node.schema().await;
    assert_eq!(schema.inputs().len(), 4);
    assert!(schema.inputs()[3].optional);

    let err = h
        .node
        .compute(&[
            text("sum"),
            DataTree::item(1i64),
            DataTree::item(2i64),
            DataTree::new(),
        ])
        .unwrap_err();
    assert!(
        matches!(err, ProxyError::SchemaOutOfSync { expected_inputs: 2, actual_inputs: 3, .. }),
        "got {:?}",
        err
    );
    assert_eq!(h.node.state().await, LoadedState::SchemaMismatch);

    assert!(h.node.reload_reference("sum").await.is_ready());
    assert_eq!(h.node.schema().await.inputs().len(), 3);
    let outputs = h
        .node
        .compute(&[text("sum"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap();
    assert_eq!(outputs[1].first(), Some(&Value::Integer(3)));
}

#[tokio::test]
async fn test_reference_edit_only_warns() {
    let h = harness();
    h.node.reload_reference("sum").await;
    let gets = h.transport.gets();

    let outputs = h
        .node
        .compute(&[text("product"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap();

    assert_eq!(outputs[1].first(), Some(&Value::Integer(3)));
    assert_eq!(h.transport.gets(), gets);
    assert_eq!(h.node.requested_reference().unwrap().as_str(), "product");
    assert!(h.host.messages().iter().any(|m| m.contains("press reload")));

    assert!(h.node.reload().await.is_ready());
    assert_eq!(nicknames(h.node.schema().await.outputs()), vec!["D", "P"]);
}

#[tokio::test]
async fn test_reload_without_reference_fails() {
    let h = harness();

    let outcome = h.node.reload().await;

    assert!(matches!(outcome, ReloadOutcome::Failed(_)));
    assert_eq!(h.node.state().await, LoadedState::Unloaded);
    assert!(!h.host.errors().is_empty());
}

#[tokio::test]
async fn test_local_path_reference() {
    let h = harness();
    let path = h.dir.path().join("local.ghx");
    std::fs::write(&path, sum_graph()).unwrap();

    assert!(h
        .node
        .reload_reference(path.to_str().unwrap())
        .await
        .is_ready());
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_reloads_collapse_to_last() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness_with(FakeTransport::gated(gate.clone()), Arc::new(DagEngine::new()));

    let node = h.node.clone();
    let first = tokio::spawn(async move { node.reload_reference("sum").await });
    h.transport.entered.notified().await;

    assert!(matches!(
        h.node.reload_reference("stats").await,
        ReloadOutcome::Queued
    ));
    assert!(matches!(
        h.node.reload_reference("product").await,
        ReloadOutcome::Queued
    ));
    let err = h
        .node
        .compute(&[text("sum"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap_err();
    assert!(matches!(err, ProxyError::ReloadInProgress));

    gate.add_permits(100);
    let outcome = first.await.unwrap();

    assert!(outcome.is_ready(), "got {:?}", outcome);
    assert_eq!(nicknames(h.node.schema().await.outputs()), vec!["D", "P"]);
    // "sum" then the collapsed "product"; "stats" never loaded
    assert_eq!(h.host.changes(), 2);
    assert!(!h
        .transport
        .calls()
        .iter()
        .any(|c| c.contains("stats")));
}

#[tokio::test]
async fn test_cancelled_reload_leaves_node_reloadable() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness_with(FakeTransport::gated(gate.clone()), Arc::new(DagEngine::new()));

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), h.node.reload_reference("sum")).await;
    assert!(cancelled.is_err());

    let state = h.node.state().await;
    assert!(
        matches!(state, LoadedState::Failed(ref reason) if reason.contains("cancelled")),
        "got {:?}",
        state
    );
    let err = h
        .node
        .compute(&[text("sum"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap_err();
    assert!(matches!(err, ProxyError::SchemaMismatch(_)), "got {:?}", err);

    gate.add_permits(100);
    let outcome = h.node.reload_reference("sum").await;
    assert!(outcome.is_ready(), "got {:?}", outcome);

    let outputs = h
        .node
        .compute(&[text("sum"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap();
    assert_eq!(outputs[1].first(), Some(&Value::Integer(3)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_readers_never_skip_a_solve() {
    let h = harness();
    assert!(h.node.reload_reference("sum").await.is_ready());

    let reader = h.node.clone();
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let stop_reader = stop.clone();
    let readers = tokio::spawn(async move {
        while !stop_reader.load(std::sync::atomic::Ordering::SeqCst) {
            let _ = reader.state().await;
            let _ = reader.last_outputs().await;
            tokio::task::yield_now().await;
        }
    });

    for i in 0..500i64 {
        let outputs = h
            .node
            .compute(&[text("sum"), DataTree::item(i), DataTree::item(1i64)])
            .unwrap();
        assert_eq!(outputs[1].first(), Some(&Value::Integer(i + 1)));
    }

    stop.store(true, std::sync::atomic::Ordering::SeqCst);
    readers.await.unwrap();
    assert!(!h.host.messages().iter().any(|m| m.contains("Reload in progress")));
}

#[tokio::test]
async fn test_removed_node_is_disposed() {
    let h = harness();
    h.node.reload_reference("sum").await;

    h.node.on_removed().await;

    assert_eq!(h.node.state().await, LoadedState::Disposed);
    let err = h
        .node
        .compute(&[text("sum"), DataTree::item(1i64), DataTree::item(2i64)])
        .unwrap_err();
    assert!(matches!(err, ProxyError::Disposed));
    assert!(matches!(
        h.node.reload_reference("sum").await,
        ReloadOutcome::Failed(ProxyError::Disposed)
    ));
}

/// Engine wrapper that records context lifecycle calls
struct TrackingEngine {
    inner: DagEngine,
    log: Arc<Mutex<Vec<&'static str>>>,
}

struct TrackingContext {
    inner: DagContext,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl GraphEngine for TrackingEngine {
    fn name(&self) -> &str {
        "tracking"
    }

    fn create_context(&self) -> Box<dyn EmbeddingContext> {
        Box::new(TrackingContext {
            inner: DagContext::new(),
            log: self.log.clone(),
        })
    }

    fn load_graph(&self, bytes: &[u8]) -> Result<Box<dyn SubGraph>, EngineError> {
        self.inner.load_graph(bytes)
    }
}

impl EmbeddingContext for TrackingContext {
    fn attach(&mut self, graph: Box<dyn SubGraph>) -> Result<(), EngineError> {
        self.log.lock().push("attach");
        self.inner.attach(graph)
    }

    fn detach(&mut self) -> Option<Box<dyn SubGraph>> {
        self.log.lock().push("detach");
        self.inner.detach()
    }

    fn graph(&self) -> Option<&dyn SubGraph> {
        self.inner.graph()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.log.lock().push(if enabled { "enable" } else { "disable" });
        self.inner.set_enabled(enabled)
    }

    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn set_input_data(
        &mut self,
        slot: usize,
        branch: &BranchPath,
        values: Vec<Value>,
    ) -> Result<(), EngineError> {
        self.inner.set_input_data(slot, branch, values)
    }

    fn clear_inputs(&mut self) -> Result<(), EngineError> {
        self.inner.clear_inputs()
    }

    fn mark_stale_and_recompute(&mut self) -> Result<(), EngineError> {
        self.inner.mark_stale_and_recompute()
    }

    fn output_data(&self, slot: usize) -> Result<&DataTree, EngineError> {
        self.inner.output_data(slot)
    }

    fn dispose(&mut self) {
        self.log.lock().push("dispose");
        self.inner.dispose()
    }
}

#[tokio::test]
async fn test_teardown_order_on_reload_and_removal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(TrackingEngine {
        inner: DagEngine::new(),
        log: log.clone(),
    });
    let h = harness_with(FakeTransport::new(), engine);

    h.node.reload_reference("sum").await;
    assert_eq!(*log.lock(), vec!["enable", "attach"]);

    h.node.reload_reference("product").await;
    h.node.on_removed().await;

    assert_eq!(
        *log.lock(),
        vec![
            "enable", "attach", "disable", "detach", "dispose", "enable", "attach", "disable",
            "detach", "dispose",
        ]
    );
}
