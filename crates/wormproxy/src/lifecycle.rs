use crate::{
    bridge, sync, EmbeddedGraph, Fetcher, GraphReference, LocalArtifact, Loader, ProxyConfig,
    ResolvedLocator, Resolver, Transport,
};
use std::fmt::Write as _;
use std::sync::Arc;
use wormcore::{
    DataTree, DiagnosticLevel, GraphEngine, HostRuntime, LoadStep, LoadedState, Param,
    ParameterSide, ProxyError, ProxySchema, SlotCounts,
};

/// Everything that exists only while a sub-graph is loaded
struct Loaded {
    graph: EmbeddedGraph,
    locator: ResolvedLocator,
    artifact: LocalArtifact,
    counts: SlotCounts,
}

/// Owns the embedding context and drives the reload pipeline.
///
/// Exactly one embedded graph is live at a time. A reload always tears the
/// previous one down before resolving, and a failed reload leaves the schema
/// exactly as it was.
pub struct Lifecycle {
    resolver: Resolver,
    fetcher: Fetcher,
    loader: Loader,
    host: Arc<dyn HostRuntime>,
    state: LoadedState,
    schema: ProxySchema,
    loaded: Option<Loaded>,
    reconciled: Option<GraphReference>,
    last_locator: Option<ResolvedLocator>,
}

impl Lifecycle {
    pub fn new(
        engine: Arc<dyn GraphEngine>,
        transport: Arc<dyn Transport>,
        config: Arc<ProxyConfig>,
        host: Arc<dyn HostRuntime>,
        schema: ProxySchema,
    ) -> Self {
        Self {
            resolver: Resolver::new(transport.clone(), config.clone()),
            fetcher: Fetcher::new(transport, config.artifact_dir.clone()),
            loader: Loader::new(engine),
            host,
            state: LoadedState::Unloaded,
            schema,
            loaded: None,
            reconciled: None,
            last_locator: None,
        }
    }

    pub fn state(&self) -> &LoadedState {
        &self.state
    }

    pub fn schema(&self) -> &ProxySchema {
        &self.schema
    }

    /// Reference of the last successful reconciliation
    pub fn loaded_reference(&self) -> Option<&GraphReference> {
        self.reconciled.as_ref()
    }

    pub fn embedded(&self) -> Option<&EmbeddedGraph> {
        self.loaded.as_ref().map(|l| &l.graph)
    }

    fn set_state(&mut self, state: LoadedState) {
        tracing::debug!("state: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Tear down, then resolve, fetch, load and reconcile `reference`
    pub async fn reload(&mut self, reference: &GraphReference) -> Result<(), ProxyError> {
        if self.state == LoadedState::Disposed {
            return Err(ProxyError::Disposed);
        }
        self.abandon_pipeline();
        self.release();

        match self.run_pipeline(reference).await {
            Ok(()) => {
                self.set_state(LoadedState::Ready);
                let message = match &self.loaded {
                    Some(loaded) => format!(
                        "Loaded '{}' from {} ({} inputs, {} outputs)",
                        loaded.graph.name(),
                        loaded.locator,
                        loaded.counts.inputs,
                        loaded.counts.outputs
                    ),
                    None => format!("Loaded {}", reference),
                };
                self.host.report_diagnostic(DiagnosticLevel::Info, &message);
                Ok(())
            }
            Err(e) => {
                self.set_state(LoadedState::Failed(e.to_string()));
                self.host
                    .report_diagnostic(DiagnosticLevel::Error, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run_pipeline(&mut self, reference: &GraphReference) -> Result<(), ProxyError> {
        self.set_state(LoadedState::Resolving);
        let locator = self
            .resolver
            .resolve(reference)
            .await
            .map_err(|e| ProxyError::during(LoadStep::Resolve, e))?;
        self.last_locator = Some(locator.clone());

        self.set_state(LoadedState::Fetching);
        let artifact = self
            .fetcher
            .fetch(&locator)
            .await
            .map_err(|e| ProxyError::during(LoadStep::Fetch, e))?;

        self.set_state(LoadedState::Loading);
        let graph = self
            .loader
            .load(&artifact)
            .await
            .map_err(|e| ProxyError::during(LoadStep::Load, e))?;

        self.set_state(LoadedState::SchemaMismatch);
        let same_reference = self.reconciled.as_ref() == Some(reference);
        let reconciliation = match sync::reconcile(
            &self.schema,
            graph.input_slots(),
            graph.output_slots(),
            same_reference,
        ) {
            Ok(reconciliation) => reconciliation,
            Err(e) => {
                graph.teardown();
                return Err(ProxyError::during(LoadStep::Reconcile, e));
            }
        };

        tracing::info!(
            "Reconciled '{}': {} ops ({})",
            graph.name(),
            reconciliation.ops.len(),
            if reconciliation.destructive {
                "rebuilt"
            } else {
                "refreshed"
            }
        );
        self.schema = reconciliation.schema;
        self.host.notify_parameters_changed(&self.schema);
        self.reconciled = Some(reference.clone());

        self.loaded = Some(Loaded {
            counts: self.schema.mirrored_counts(),
            graph,
            locator,
            artifact,
        });
        Ok(())
    }

    /// Settle a pipeline whose reload future was dropped mid-step
    pub fn abandon_pipeline(&mut self) {
        if !self.state.is_loading() {
            return;
        }
        let reason = format!("reload cancelled while {}", self.state);
        self.set_state(LoadedState::Failed(reason.clone()));
        self.host.report_diagnostic(DiagnosticLevel::Warning, &reason);
    }

    /// Dispose the embedded graph, if any, without touching the schema
    fn release(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.graph.teardown();
        }
    }

    /// Final teardown when the node leaves the host graph
    pub fn teardown(&mut self) {
        self.release();
        self.set_state(LoadedState::Disposed);
    }

    /// Run the data bridge; only valid while `Ready`
    pub fn execute(&mut self, host_inputs: &[DataTree]) -> Result<Vec<DataTree>, ProxyError> {
        match &self.state {
            LoadedState::Ready => {}
            LoadedState::Disposed => return Err(ProxyError::Disposed),
            LoadedState::Failed(reason) => {
                return Err(ProxyError::SchemaMismatch(format!(
                    "last reload failed ({}); fix the reference and reload",
                    reason
                )))
            }
            state => {
                return Err(ProxyError::SchemaMismatch(format!(
                    "sub-graph not loaded ({}); press reload",
                    state
                )))
            }
        }

        let Some(loaded) = self.loaded.as_mut() else {
            return Err(ProxyError::SchemaMismatch("no sub-graph loaded".to_string()));
        };
        let result = bridge::execute(&mut loaded.graph, &self.schema, loaded.counts, host_inputs);
        if let Err(ProxyError::SchemaOutOfSync { .. }) = &result {
            self.set_state(LoadedState::SchemaMismatch);
        }
        result
    }

    /// Manual parameter insertion on the mirrored side
    pub fn insert_parameter(&mut self, side: ParameterSide, index: usize) -> Result<(), ProxyError> {
        if self.state == LoadedState::Disposed {
            return Err(ProxyError::Disposed);
        }
        let param: Param = self.schema.create_parameter(side);
        self.schema.insert(side, index, param)?;
        self.host.notify_parameters_changed(&self.schema);
        Ok(())
    }

    pub fn remove_parameter(&mut self, side: ParameterSide, index: usize) -> Result<(), ProxyError> {
        if self.state == LoadedState::Disposed {
            return Err(ProxyError::Disposed);
        }
        self.schema.remove(side, index)?;
        self.host.notify_parameters_changed(&self.schema);
        Ok(())
    }

    /// Text for the debug output
    pub fn status(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "state: {}", self.state);
        if let Some(reference) = &self.reconciled {
            let _ = writeln!(out, "reference: {}", reference);
        }
        if let Some(locator) = &self.last_locator {
            let _ = writeln!(out, "locator: {}", locator);
        }
        if let Some(loaded) = &self.loaded {
            let _ = writeln!(out, "artifact: {}", loaded.artifact.path.display());
            let _ = writeln!(out, "graph: {} ({})", loaded.graph.name(), self.loader.engine().name());
        }
        let names = |side| {
            self.schema
                .mirrored(side)
                .iter()
                .map(|p| p.nickname.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(out, "inputs: [{}]", names(ParameterSide::Input));
        let _ = write!(out, "outputs: [{}]", names(ParameterSide::Output));
        out
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.release();
    }
}
