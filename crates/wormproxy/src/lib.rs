//! Sub-graph proxy node
//!
//! A [`ProxyNode`] stands in for an independently authored sub-graph fetched
//! at runtime. Reloading walks resolve -> fetch -> load -> reconcile; every
//! host compute afterwards only runs the data bridge against the loaded
//! instance.

pub mod bridge;
mod config;
mod fetcher;
mod lifecycle;
mod loader;
mod node;
mod reference;
mod resolver;
pub mod sync;
mod transport;

pub use config::ProxyConfig;
pub use fetcher::Fetcher;
pub use lifecycle::Lifecycle;
pub use loader::{EmbeddedGraph, Loader};
pub use node::{ProxyNode, ReloadOutcome};
pub use reference::{GraphReference, LocalArtifact, Location, ReferenceKind, ResolvedLocator};
pub use resolver::{expand_template, parse_template, Resolver};
pub use transport::{HttpTransport, Transport};

pub use reqwest::Url;
