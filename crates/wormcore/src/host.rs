use crate::ProxySchema;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => f.write_str("error"),
            DiagnosticLevel::Warning => f.write_str("warning"),
            DiagnosticLevel::Info => f.write_str("info"),
        }
    }
}

/// Outbound calls from the proxy node into the host dataflow runtime
pub trait HostRuntime: Send + Sync {
    /// The parameter list changed; refresh wiring and re-validate connections
    fn notify_parameters_changed(&self, schema: &ProxySchema);

    /// Attach a user-visible message to the node
    fn report_diagnostic(&self, level: DiagnosticLevel, message: &str);
}
