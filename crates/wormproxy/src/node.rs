use crate::{GraphReference, Lifecycle, ProxyConfig, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use wormcore::{
    DataTree, DiagnosticLevel, GraphEngine, HostRuntime, LoadedState, Param, ParameterSide,
    ProxyError, ProxySchema, Value,
};

/// How a reload request ended
#[derive(Debug, Clone)]
pub enum ReloadOutcome {
    /// The (last collapsed) reference loaded and the node is ready
    Ready,
    /// The pipeline failed; the node keeps its previous schema
    Failed(ProxyError),
    /// Another reload is in flight and will pick this request up when done
    Queued,
}

impl ReloadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReloadOutcome::Ready)
    }
}

#[derive(Default)]
struct ReloadGate {
    busy: bool,
    pending: Option<GraphReference>,
}

/// Releases the reload gate if a reload future is dropped before it finishes
struct GateRelease<'a> {
    gate: &'a Mutex<ReloadGate>,
    core: &'a tokio::sync::Mutex<NodeCore>,
    armed: bool,
}

impl GateRelease<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut gate = self.gate.lock();
            gate.busy = false;
            if let Some(pending) = gate.pending.take() {
                tracing::debug!("Dropped queued reload of {}", pending);
            }
        }
        if let Ok(mut core) = self.core.try_lock() {
            core.lifecycle.abandon_pipeline();
            core.refresh_status();
        }
        tracing::warn!("Reload cancelled before it finished");
    }
}

struct NodeCore {
    lifecycle: Lifecycle,
    last_outputs: Vec<DataTree>,
    /// Reference text last seen on the fixed input, for change notices
    seen_reference: Option<GraphReference>,
}

impl NodeCore {
    fn reset_outputs(&mut self) {
        let count = self.lifecycle.schema().outputs().len();
        self.last_outputs = vec![DataTree::new(); count];
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        let status = self.lifecycle.status();
        match self.last_outputs.first_mut() {
            Some(slot) => *slot = DataTree::item(Value::Text(status)),
            None => self.last_outputs.push(DataTree::item(Value::Text(status))),
        }
    }
}

/// Host-graph node that embeds and mirrors a runtime-loaded sub-graph.
///
/// `compute` never touches the network; only `reload` does, and reloads are
/// serialized: a request arriving while one is in flight is queued, and all
/// queued requests collapse into a single follow-up reload.
pub struct ProxyNode {
    host: Arc<dyn HostRuntime>,
    gate: Mutex<ReloadGate>,
    requested: Mutex<Option<GraphReference>>,
    core: tokio::sync::Mutex<NodeCore>,
}

impl ProxyNode {
    pub fn new(
        engine: Arc<dyn GraphEngine>,
        transport: Arc<dyn Transport>,
        config: ProxyConfig,
        host: Arc<dyn HostRuntime>,
    ) -> Self {
        let schema = ProxySchema::new(Self::register_inputs(), Self::register_outputs());
        let lifecycle = Lifecycle::new(engine, transport, Arc::new(config), host.clone(), schema);
        let mut core = NodeCore {
            lifecycle,
            last_outputs: Vec::new(),
            seen_reference: None,
        };
        core.reset_outputs();
        Self {
            host,
            gate: Mutex::new(ReloadGate::default()),
            requested: Mutex::new(None),
            core: tokio::sync::Mutex::new(core),
        }
    }

    /// Fixed input prefix: the sub-graph name or URL
    pub fn register_inputs() -> Vec<Param> {
        vec![Param::text(
            "Cluster",
            "C",
            "Name or URL of the sub-graph to embed",
        )]
    }

    /// Fixed output prefix: loader status text
    pub fn register_outputs() -> Vec<Param> {
        vec![Param::text("Debug", "D", "Loader status")]
    }

    pub async fn schema(&self) -> ProxySchema {
        self.core.lock().await.lifecycle.schema().clone()
    }

    pub async fn state(&self) -> LoadedState {
        self.core.lock().await.lifecycle.state().clone()
    }

    pub async fn status(&self) -> String {
        self.core.lock().await.lifecycle.status()
    }

    /// Outputs published by the last successful compute
    pub async fn last_outputs(&self) -> Vec<DataTree> {
        self.core.lock().await.last_outputs.clone()
    }

    /// Reference the next `reload()` will use
    pub fn requested_reference(&self) -> Option<GraphReference> {
        self.requested.lock().clone()
    }

    pub fn set_reference(&self, reference: impl Into<GraphReference>) {
        *self.requested.lock() = Some(reference.into());
    }

    /// One host solve. `inputs` covers every input parameter, fixed prefix
    /// included; the result covers every output parameter.
    ///
    /// On error a diagnostic has been reported and the previously published
    /// outputs stay in place (see [`ProxyNode::last_outputs`]).
    pub fn compute(&self, inputs: &[DataTree]) -> Result<Vec<DataTree>, ProxyError> {
        let mut core = match self.lock_core() {
            Ok(core) => core,
            Err(e) => {
                self.host.report_diagnostic(
                    DiagnosticLevel::Warning,
                    "Reload in progress; solve skipped",
                );
                return Err(e);
            }
        };

        if *core.lifecycle.state() == LoadedState::Disposed {
            return Err(ProxyError::Disposed);
        }

        self.track_reference(&mut core, inputs);

        match core.lifecycle.execute(inputs) {
            Ok(mirrored) => {
                let mut outputs = Vec::with_capacity(mirrored.len() + 1);
                outputs.push(DataTree::item(Value::Text(core.lifecycle.status())));
                outputs.extend(mirrored);
                core.last_outputs = outputs.clone();
                Ok(outputs)
            }
            Err(e) => {
                let level = match e {
                    ProxyError::MissingInput(_) => DiagnosticLevel::Warning,
                    _ => DiagnosticLevel::Error,
                };
                self.host.report_diagnostic(level, &e.to_string());
                core.refresh_status();
                Err(e)
            }
        }
    }

    /// Lock the node core without waiting on a reload.
    ///
    /// Only a reload holds the core across an await; every other holder
    /// releases it without yielding, so contention outside a reload is
    /// waited out.
    fn lock_core(&self) -> Result<tokio::sync::MutexGuard<'_, NodeCore>, ProxyError> {
        loop {
            if let Ok(core) = self.core.try_lock() {
                return Ok(core);
            }
            if self.gate.lock().busy {
                return Err(ProxyError::ReloadInProgress);
            }
            std::thread::yield_now();
        }
    }

    /// Record edits of the reference input; a reload is never implied
    fn track_reference(&self, core: &mut NodeCore, inputs: &[DataTree]) {
        let Some(text) = inputs.first().and_then(|t| t.first()).and_then(|v| v.as_str()) else {
            return;
        };
        let reference = GraphReference::new(text);
        if core.seen_reference.as_ref() == Some(&reference) {
            return;
        }
        core.seen_reference = Some(reference.clone());
        *self.requested.lock() = Some(reference.clone());

        if core.lifecycle.loaded_reference() != Some(&reference) {
            self.host.report_diagnostic(
                DiagnosticLevel::Warning,
                &format!("Reference changed to '{}'; press reload to apply", reference),
            );
        }
    }

    /// Reload the most recently requested reference
    pub async fn reload(&self) -> ReloadOutcome {
        let Some(reference) = self.requested_reference() else {
            let error = ProxyError::ResourceNotFound {
                reference: String::new(),
                tried: Vec::new(),
            };
            self.host
                .report_diagnostic(DiagnosticLevel::Error, "No sub-graph reference set");
            return ReloadOutcome::Failed(error);
        };
        self.reload_reference(reference).await
    }

    pub async fn reload_reference(&self, reference: impl Into<GraphReference>) -> ReloadOutcome {
        let mut reference = reference.into();
        *self.requested.lock() = Some(reference.clone());

        {
            let mut gate = self.gate.lock();
            if gate.busy {
                tracing::debug!("Reload of {} queued behind in-flight reload", reference);
                gate.pending = Some(reference);
                return ReloadOutcome::Queued;
            }
            gate.busy = true;
        }
        let mut release = GateRelease {
            gate: &self.gate,
            core: &self.core,
            armed: true,
        };

        loop {
            let result = {
                let mut core = self.core.lock().await;
                let result = core.lifecycle.reload(&reference).await;
                core.reset_outputs();
                result
            };

            let next = {
                let mut gate = self.gate.lock();
                let next = gate.pending.take();
                if next.is_none() {
                    gate.busy = false;
                    release.disarm();
                }
                next
            };

            match next {
                Some(next) => {
                    tracing::debug!("Collapsed queued reloads into {}", next);
                    reference = next;
                }
                None => {
                    return match result {
                        Ok(()) => ReloadOutcome::Ready,
                        Err(e) => ReloadOutcome::Failed(e),
                    }
                }
            }
        }
    }

    /// The node left the host graph; disposes the embedded context for good
    pub async fn on_removed(&self) {
        let mut core = self.core.lock().await;
        core.lifecycle.teardown();
        core.refresh_status();
        tracing::info!("Proxy node removed");
    }

    /// User-driven parameter insertion inside the mirrored region
    pub fn insert_parameter(&self, side: ParameterSide, index: usize) -> Result<(), ProxyError> {
        let mut core = self.lock_core()?;
        core.lifecycle.insert_parameter(side, index)
    }

    pub fn remove_parameter(&self, side: ParameterSide, index: usize) -> Result<(), ProxyError> {
        let mut core = self.lock_core()?;
        core.lifecycle.remove_parameter(side, index)
    }
}
