// crates/wormcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wormcore::{DataTree, EventBus, GraphEngine, HostEvent, SubGraph, Value};
use wormproxy::{
    GraphReference, HttpTransport, ProxyConfig, ProxyNode, ReloadOutcome, Resolver, Transport,
};
use wormruntime::DagEngine;

#[derive(Parser)]
#[command(name = "hairworm")]
#[command(about = "Resolve, fetch and run published sub-graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ProxyArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Location of the indirection document
    #[arg(long)]
    index_url: Option<String>,

    /// Directory fetched artifacts are written to
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a name or URL to a reachable locator
    Resolve {
        reference: String,

        #[command(flatten)]
        proxy: ProxyArgs,
    },

    /// Show the slots of a local sub-graph definition
    Inspect {
        file: PathBuf,
    },

    /// Load a sub-graph through the proxy and run one solve
    Run {
        reference: String,

        /// Mirrored input values as a JSON array; nested arrays become lists
        #[arg(short, long)]
        input: Option<String>,

        #[command(flatten)]
        proxy: ProxyArgs,
    },

    /// List available operator types
    Ops,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn load_config(args: &ProxyArgs) -> Result<ProxyConfig> {
    let mut config = match &args.config {
        Some(path) => ProxyConfig::from_file(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(url) = &args.index_url {
        config.index_url = Some(url.clone());
    }
    if let Some(dir) = &args.artifact_dir {
        config.artifact_dir = dir.clone();
    }
    if args.timeout.is_some() {
        config.request_timeout_secs = args.timeout;
    }
    Ok(config)
}

/// One host tree per top-level array element
fn parse_inputs(raw: &str) -> Result<Vec<DataTree>> {
    let json: serde_json::Value = serde_json::from_str(raw).context("input is not valid JSON")?;
    let serde_json::Value::Array(items) = json else {
        anyhow::bail!("input must be a JSON array with one entry per sub-graph input");
    };
    Ok(items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Null => DataTree::new(),
            serde_json::Value::Array(list) => {
                DataTree::list(list.into_iter().map(Value::from_json).collect())
            }
            other => DataTree::item(Value::from_json(other)),
        })
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Resolve { reference, proxy } => resolve(reference, &proxy).await?,
        Commands::Inspect { file } => inspect(file)?,
        Commands::Run {
            reference,
            input,
            proxy,
        } => run(reference, input, &proxy).await?,
        Commands::Ops => list_ops(),
    }

    Ok(())
}

async fn resolve(reference: String, args: &ProxyArgs) -> Result<()> {
    let config = Arc::new(load_config(args)?);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
    let resolver = Resolver::new(transport, config);

    let locator = resolver.resolve(&GraphReference::new(reference)).await?;
    println!("{}", locator);
    Ok(())
}

fn inspect(file: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let graph = DagEngine::new().load_graph(&bytes)?;

    println!("Sub-graph: {}", graph.name());
    println!("Inputs:");
    for slot in graph.input_slots() {
        println!(
            "  {} ({}) {:?}{}",
            slot.name,
            slot.nickname,
            slot.access,
            if slot.optional { " optional" } else { "" }
        );
    }
    println!("Outputs:");
    for slot in graph.output_slots() {
        println!("  {} ({}) {:?}", slot.name, slot.nickname, slot.access);
    }
    Ok(())
}

async fn run(reference: String, input: Option<String>, args: &ProxyArgs) -> Result<()> {
    let config = load_config(args)?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                HostEvent::Diagnostic { level, message, .. } => {
                    println!("[{}] {}", level, message);
                }
                HostEvent::ParametersChanged {
                    inputs, outputs, ..
                } => {
                    println!("parameters: in [{}] out [{}]", inputs.join(", "), outputs.join(", "));
                }
            }
        }
    });

    let node = ProxyNode::new(
        Arc::new(DagEngine::new()),
        transport,
        config,
        Arc::new(bus.create_host(Uuid::new_v4())),
    );

    match node.reload_reference(reference.as_str()).await {
        ReloadOutcome::Ready => {}
        ReloadOutcome::Failed(e) => return Err(e.into()),
        ReloadOutcome::Queued => anyhow::bail!("reload unexpectedly queued"),
    }

    let mut inputs = vec![DataTree::item(Value::Text(reference))];
    if let Some(raw) = input {
        inputs.extend(parse_inputs(&raw)?);
    }
    let expected = node.schema().await.inputs().len();
    if inputs.len() < expected {
        inputs.resize(expected, DataTree::new());
    }

    let outputs = node.compute(&inputs)?;
    let schema = node.schema().await;
    for (param, tree) in schema.outputs().iter().zip(&outputs).skip(1) {
        println!("{} ({}):", param.name, param.nickname);
        for (path, values) in tree.branches() {
            let rendered: Vec<String> = values.iter().map(|v| v.to_json().to_string()).collect();
            println!("  {} [{}]", path, rendered.join(", "));
        }
    }
    if let Some(status) = outputs.first().and_then(DataTree::first) {
        tracing::debug!("{}", status);
    }

    node.on_removed().await;
    drop(node);
    drop(bus);
    let _ = event_task.await;
    Ok(())
}

fn list_ops() {
    let engine = DagEngine::new();
    let registry = engine.registry();

    println!("Available operators:");
    for op_type in registry.list_op_types() {
        match registry.get_metadata(&op_type) {
            Some(meta) if !meta.description.is_empty() => {
                println!("  {:<14} [{}] {}", op_type, meta.category, meta.description)
            }
            _ => println!("  {}", op_type),
        }
    }
}
