use crate::definition::{Endpoint, SubGraphDefinition};
use crate::engine::EngineConfig;
use crate::registry::{Operator, OperatorRegistry, PortValues};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use wormcore::{BranchPath, DataTree, EngineError, SlotDescriptor, SubGraph, Value};

#[derive(Debug, Clone, PartialEq)]
enum Source {
    GraphInput(usize),
    Port { node: usize, port: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    GraphOutput(usize),
    Port { node: usize, port: String },
}

#[derive(Debug, Clone)]
struct Wire {
    source: Source,
    target: Target,
}

struct CompiledNode {
    id: String,
    op: Box<dyn Operator>,
}

/// A compiled sub-graph evaluated as a DAG of operators
pub struct DagGraph {
    name: String,
    inputs: Vec<SlotDescriptor>,
    outputs: Vec<SlotDescriptor>,
    nodes: Vec<CompiledNode>,
    order: Vec<usize>,
    wires: Vec<Wire>,
    input_data: Vec<DataTree>,
    port_data: HashMap<(usize, String), DataTree>,
    output_data: Vec<DataTree>,
}

impl DagGraph {
    pub fn compile(
        definition: SubGraphDefinition,
        registry: &OperatorRegistry,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        if definition.nodes.len() > config.max_operators {
            return Err(EngineError::Parse(format!(
                "{} operators exceeds the limit of {}",
                definition.nodes.len(),
                config.max_operators
            )));
        }
        check_unique("input slot", definition.inputs.iter().map(|s| s.name.as_str()))?;
        check_unique("output slot", definition.outputs.iter().map(|s| s.name.as_str()))?;
        check_unique("node id", definition.nodes.iter().map(|n| n.id.as_str()))?;

        let mut nodes = Vec::with_capacity(definition.nodes.len());
        let mut node_index = HashMap::new();
        for spec in &definition.nodes {
            let config = spec
                .config
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
                .collect();
            let op = registry.create(&spec.op, &config)?;
            node_index.insert(spec.id.clone(), nodes.len());
            nodes.push(CompiledNode {
                id: spec.id.clone(),
                op,
            });
        }

        let mut wires = Vec::with_capacity(definition.connections.len());
        for conn in &definition.connections {
            let source = match Endpoint::parse(&conn.from)? {
                Endpoint::GraphInput(name) => {
                    Source::GraphInput(slot_index(&definition.inputs, &name, "input")?)
                }
                Endpoint::Port { node, port } => {
                    let idx = resolve_port(&nodes, &node_index, &node, &port, false)?;
                    Source::Port { node: idx, port }
                }
                Endpoint::GraphOutput(_) => {
                    return Err(EngineError::InvalidConnection(format!(
                        "'{}' cannot be a connection source",
                        conn.from
                    )))
                }
            };
            let target = match Endpoint::parse(&conn.to)? {
                Endpoint::GraphOutput(name) => {
                    Target::GraphOutput(slot_index(&definition.outputs, &name, "output")?)
                }
                Endpoint::Port { node, port } => {
                    let idx = resolve_port(&nodes, &node_index, &node, &port, true)?;
                    Target::Port { node: idx, port }
                }
                Endpoint::GraphInput(_) => {
                    return Err(EngineError::InvalidConnection(format!(
                        "'{}' cannot be a connection target",
                        conn.to
                    )))
                }
            };
            wires.push(Wire { source, target });
        }

        let order = evaluation_order(nodes.len(), &wires)?;
        let input_count = definition.inputs.len();
        let output_count = definition.outputs.len();

        tracing::debug!(
            "Compiled sub-graph '{}': {} operators, {} wires",
            definition.name,
            nodes.len(),
            wires.len()
        );

        Ok(Self {
            name: definition.name,
            inputs: definition.inputs,
            outputs: definition.outputs,
            nodes,
            order,
            wires,
            input_data: vec![DataTree::new(); input_count],
            port_data: HashMap::new(),
            output_data: vec![DataTree::new(); output_count],
        })
    }

    fn source_data(&self, source: &Source) -> Option<&DataTree> {
        match source {
            Source::GraphInput(idx) => self.input_data.get(*idx),
            Source::Port { node, port } => self.port_data.get(&(*node, port.clone())),
        }
    }

    /// Merge everything wired into each input port of `node`
    fn gather(&self, node: usize) -> HashMap<String, DataTree> {
        let mut gathered: HashMap<String, DataTree> = HashMap::new();
        for wire in &self.wires {
            if let Target::Port { node: n, port } = &wire.target {
                if *n != node {
                    continue;
                }
                let tree = gathered.entry(port.clone()).or_default();
                if let Some(data) = self.source_data(&wire.source) {
                    tree.merge(data);
                }
            }
        }
        gathered
    }
}

impl SubGraph for DagGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_slots(&self) -> &[SlotDescriptor] {
        &self.inputs
    }

    fn output_slots(&self) -> &[SlotDescriptor] {
        &self.outputs
    }

    fn set_input_data(
        &mut self,
        slot: usize,
        branch: &BranchPath,
        values: Vec<Value>,
    ) -> Result<(), EngineError> {
        let count = self.input_data.len();
        let tree = self.input_data.get_mut(slot).ok_or(EngineError::SlotOutOfRange {
            side: "input",
            index: slot,
            count,
        })?;
        tree.set_branch(branch.clone(), values);
        Ok(())
    }

    fn clear_inputs(&mut self) {
        for tree in &mut self.input_data {
            tree.clear();
        }
    }

    fn recompute(&mut self) -> Result<(), EngineError> {
        // Volatile data from the previous solve is gone before anything runs
        self.port_data.clear();
        for tree in &mut self.output_data {
            tree.clear();
        }

        for position in 0..self.order.len() {
            let idx = self.order[position];
            let gathered = self.gather(idx);
            let node = &self.nodes[idx];
            let results = evaluate_node(node, &gathered)?;
            for (port, tree) in results {
                self.port_data.insert((idx, port), tree);
            }
        }

        for w in 0..self.wires.len() {
            if let Target::GraphOutput(slot) = self.wires[w].target {
                let data = self.source_data(&self.wires[w].source).cloned();
                if let Some(data) = data {
                    self.output_data[slot].merge(&data);
                }
            }
        }
        Ok(())
    }

    fn output_data(&self, slot: usize) -> Result<&DataTree, EngineError> {
        self.output_data.get(slot).ok_or(EngineError::SlotOutOfRange {
            side: "output",
            index: slot,
            count: self.output_data.len(),
        })
    }
}

/// Run one operator over the union of branch paths of its inputs.
///
/// A port carrying exactly one branch is broadcast to every path of the
/// multi-branch ports.
fn evaluate_node(
    node: &CompiledNode,
    gathered: &HashMap<String, DataTree>,
) -> Result<HashMap<String, DataTree>, EngineError> {
    let mut paths: BTreeSet<BranchPath> = gathered
        .values()
        .filter(|tree| tree.branch_count() > 1)
        .flat_map(|tree| tree.paths().cloned())
        .collect();
    if paths.is_empty() {
        paths = gathered
            .values()
            .flat_map(|tree| tree.paths().cloned())
            .collect();
    }

    let mut results: HashMap<String, DataTree> = node
        .op
        .output_ports()
        .iter()
        .map(|p| (p.to_string(), DataTree::new()))
        .collect();

    for path in paths {
        let mut branch_inputs = PortValues::new();
        for port in node.op.input_ports() {
            let values = match gathered.get(*port) {
                Some(tree) => match tree.branch(&path) {
                    Some(values) => values.to_vec(),
                    None if tree.branch_count() == 1 => tree.flatten(),
                    None => Vec::new(),
                },
                None => Vec::new(),
            };
            branch_inputs.insert(port.to_string(), values);
        }
        let outputs = node.op.apply(&branch_inputs).map_err(|message| EngineError::Operator {
            node: node.id.clone(),
            message,
        })?;
        for (port, values) in outputs {
            results
                .entry(port)
                .or_default()
                .set_branch(path.clone(), values);
        }
    }
    Ok(results)
}

fn evaluation_order(node_count: usize, wires: &[Wire]) -> Result<Vec<usize>, EngineError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let indices: Vec<NodeIndex> = (0..node_count).map(|i| graph.add_node(i)).collect();
    for wire in wires {
        if let (Source::Port { node: from, .. }, Target::Port { node: to, .. }) =
            (&wire.source, &wire.target)
        {
            graph.add_edge(indices[*from], indices[*to], ());
        }
    }
    let sorted = toposort(&graph, None).map_err(|_| EngineError::CyclicDependency)?;
    Ok(sorted.into_iter().map(|idx| graph[idx]).collect())
}

fn check_unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<(), EngineError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(EngineError::Parse(format!("duplicate {} '{}'", what, name)));
        }
    }
    Ok(())
}

fn slot_index(slots: &[SlotDescriptor], name: &str, side: &str) -> Result<usize, EngineError> {
    slots
        .iter()
        .position(|s| s.name == name)
        .or_else(|| slots.iter().position(|s| s.nickname == name))
        .ok_or_else(|| EngineError::InvalidConnection(format!("unknown {} slot '{}'", side, name)))
}

fn resolve_port(
    nodes: &[CompiledNode],
    node_index: &HashMap<String, usize>,
    node: &str,
    port: &str,
    is_input: bool,
) -> Result<usize, EngineError> {
    let idx = *node_index
        .get(node)
        .ok_or_else(|| EngineError::InvalidConnection(format!("unknown node '{}'", node)))?;
    let op = &nodes[idx].op;
    let ports = if is_input {
        op.input_ports()
    } else {
        op.output_ports()
    };
    if !ports.iter().any(|p| *p == port) {
        return Err(EngineError::InvalidConnection(format!(
            "{} has no {} port '{}'",
            op.op_type(),
            if is_input { "input" } else { "output" },
            port
        )));
    }
    Ok(idx)
}
