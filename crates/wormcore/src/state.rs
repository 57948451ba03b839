use std::fmt;

/// Load progress of the embedded sub-graph
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedState {
    Unloaded,
    Resolving,
    Fetching,
    Loading,
    SchemaMismatch,
    Ready,
    Failed(String),
    /// The node left the host graph; terminal
    Disposed,
}

impl LoadedState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadedState::Ready)
    }

    /// Whether a reload pipeline step is running
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LoadedState::Resolving | LoadedState::Fetching | LoadedState::Loading
        )
    }
}

impl Default for LoadedState {
    fn default() -> Self {
        LoadedState::Unloaded
    }
}

impl fmt::Display for LoadedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadedState::Unloaded => write!(f, "unloaded"),
            LoadedState::Resolving => write!(f, "resolving"),
            LoadedState::Fetching => write!(f, "fetching"),
            LoadedState::Loading => write!(f, "loading"),
            LoadedState::SchemaMismatch => write!(f, "schema mismatch"),
            LoadedState::Ready => write!(f, "ready"),
            LoadedState::Failed(reason) => write!(f, "failed: {}", reason),
            LoadedState::Disposed => write!(f, "disposed"),
        }
    }
}

/// Pipeline step a reload failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    Resolve,
    Fetch,
    Load,
    Reconcile,
}

impl fmt::Display for LoadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStep::Resolve => "resolve",
            LoadStep::Fetch => "fetch",
            LoadStep::Load => "load",
            LoadStep::Reconcile => "reconcile",
        };
        f.write_str(name)
    }
}
