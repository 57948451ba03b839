//! Moves data between host parameters and the embedded sub-graph.
//!
//! Host data is flattened onto the single branch `{0}` before it crosses
//! into the sub-graph. Outputs are deep-copied out of the engine because the
//! next recompute overwrites them.

use crate::EmbeddedGraph;
use wormcore::{
    Access, BranchPath, DataTree, ParameterSide, ProxyError, ProxySchema, SlotCounts, Value,
};

/// Push host inputs in, recompute, and snapshot the mirrored outputs.
///
/// `host_inputs` covers the whole input list, fixed prefix included. The
/// returned trees cover the mirrored outputs only.
pub fn execute(
    graph: &mut EmbeddedGraph,
    schema: &ProxySchema,
    captured: SlotCounts,
    host_inputs: &[DataTree],
) -> Result<Vec<DataTree>, ProxyError> {
    check_counts(graph, schema, captured, host_inputs)?;

    let prefix = schema.prefix_len(ParameterSide::Input);
    let context = graph.context_mut();
    context.clear_inputs().map_err(engine_fault)?;

    for (i, param) in schema.mirrored(ParameterSide::Input).iter().enumerate() {
        let values = collect_values(&host_inputs[prefix + i], param.access);
        if values.is_empty() && !param.optional {
            return Err(ProxyError::MissingInput(param.name.clone()));
        }
        context
            .set_input_data(i, &BranchPath::root(), values)
            .map_err(engine_fault)?;
    }

    context.mark_stale_and_recompute().map_err(engine_fault)?;

    (0..captured.outputs)
        .map(|j| context.output_data(j).cloned().map_err(engine_fault))
        .collect()
}

fn engine_fault(e: wormcore::EngineError) -> ProxyError {
    ProxyError::GraphEngineFault(e.to_string())
}

fn check_counts(
    graph: &EmbeddedGraph,
    schema: &ProxySchema,
    captured: SlotCounts,
    host_inputs: &[DataTree],
) -> Result<(), ProxyError> {
    let live = schema.mirrored_counts();
    let supplied = host_inputs
        .len()
        .saturating_sub(schema.prefix_len(ParameterSide::Input));
    let in_sync = live == captured
        && host_inputs.len() == schema.inputs().len()
        && graph.input_slots().len() == captured.inputs
        && graph.output_slots().len() == captured.outputs;

    if in_sync {
        Ok(())
    } else {
        Err(ProxyError::SchemaOutOfSync {
            expected_inputs: captured.inputs,
            expected_outputs: captured.outputs,
            actual_inputs: if live.inputs != captured.inputs {
                live.inputs
            } else {
                supplied
            },
            actual_outputs: live.outputs,
        })
    }
}

/// Flatten every host branch into one ordered list, trimmed to the access mode
fn collect_values(tree: &DataTree, access: Access) -> Vec<Value> {
    let mut values = tree.flatten();
    if access == Access::Single {
        values.truncate(1);
    }
    values
}
