//! Parameter-surface reconciliation.
//!
//! The mirrored suffix of a [`ProxySchema`] is brought in line with a loaded
//! sub-graph in two phases: [`plan`] diffs current against target and emits
//! an ordered list of [`SchemaOp`]s, [`reconcile`] applies them atomically.
//! The fixed prefix is never part of a plan.

use wormcore::{
    invent_unique_nickname, ParameterSide, ProxyError, ProxySchema, SchemaOp, SlotDescriptor,
};

/// Result of one reconciliation
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub schema: ProxySchema,
    pub ops: Vec<SchemaOp>,
    /// Whether mirrored parameters were dropped and re-created
    pub destructive: bool,
}

impl Reconciliation {
    pub fn structural_ops(&self) -> usize {
        self.ops.iter().filter(|op| op.is_structural()).count()
    }
}

/// Diff the mirrored suffix of `current` against the target slot lists.
///
/// When the reference is unchanged and both counts already match, existing
/// parameters are kept and only refreshed. Otherwise every mirrored
/// parameter is removed and re-created. Renames are emitted for every
/// mirrored slot in both cases.
pub fn plan(
    current: &ProxySchema,
    inputs: &[SlotDescriptor],
    outputs: &[SlotDescriptor],
    same_reference: bool,
) -> (Vec<SchemaOp>, bool) {
    let counts = current.mirrored_counts();
    let destructive =
        !same_reference || counts.inputs != inputs.len() || counts.outputs != outputs.len();

    let mut ops = Vec::new();
    for (side, target) in [(ParameterSide::Input, inputs), (ParameterSide::Output, outputs)] {
        let prefix = current.prefix_len(side);
        let slots = normalize_slots(current, side, target);

        if destructive {
            // Back to front so every index stays valid while removing
            for index in (prefix..current.params(side).len()).rev() {
                ops.push(SchemaOp::Remove { side, index });
            }
            for slot in &slots {
                ops.push(SchemaOp::Add {
                    side,
                    access: slot.access,
                });
            }
        }

        for (offset, slot) in slots.into_iter().enumerate() {
            ops.push(SchemaOp::Rename {
                side,
                index: prefix + offset,
                slot,
            });
        }
    }
    (ops, destructive)
}

/// Plan and apply in one step; `current` is left untouched on error
pub fn reconcile(
    current: &ProxySchema,
    inputs: &[SlotDescriptor],
    outputs: &[SlotDescriptor],
    same_reference: bool,
) -> Result<Reconciliation, ProxyError> {
    let (ops, destructive) = plan(current, inputs, outputs, same_reference);
    let schema = current.apply(&ops)?;

    let counts = schema.mirrored_counts();
    if counts.inputs != inputs.len() || counts.outputs != outputs.len() {
        return Err(ProxyError::SchemaMismatch(format!(
            "reconciled to {} inputs / {} outputs, sub-graph declares {} / {}",
            counts.inputs,
            counts.outputs,
            inputs.len(),
            outputs.len()
        )));
    }

    tracing::debug!(
        destructive,
        ops = ops.len(),
        inputs = counts.inputs,
        outputs = counts.outputs,
        "reconciled proxy schema"
    );
    Ok(Reconciliation {
        schema,
        ops,
        destructive,
    })
}

/// Fill empty names and nicknames so every mirrored parameter is addressable.
///
/// Empty nicknames fall back to the name; when both are empty a unique
/// letter is invented, avoiding the fixed prefix and earlier slots.
fn normalize_slots(
    current: &ProxySchema,
    side: ParameterSide,
    slots: &[SlotDescriptor],
) -> Vec<SlotDescriptor> {
    let mut taken: Vec<String> = current
        .prefix(side)
        .iter()
        .map(|p| p.nickname.clone())
        .collect();
    taken.extend(
        slots
            .iter()
            .filter(|s| !s.nickname.is_empty())
            .map(|s| s.nickname.clone()),
    );

    slots
        .iter()
        .map(|slot| {
            let mut slot = slot.clone();
            if slot.nickname.is_empty() {
                slot.nickname = if slot.name.is_empty() {
                    let refs: Vec<&str> = taken.iter().map(String::as_str).collect();
                    invent_unique_nickname(&refs)
                } else {
                    slot.name.clone()
                };
                taken.push(slot.nickname.clone());
            }
            if slot.name.is_empty() {
                slot.name = slot.nickname.clone();
            }
            slot
        })
        .collect()
}
