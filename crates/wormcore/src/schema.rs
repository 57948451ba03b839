use crate::{Access, ProxyError, SlotDescriptor};
use std::fmt;
use uuid::Uuid;

const NICKNAME_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterSide {
    Input,
    Output,
}

impl fmt::Display for ParameterSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterSide::Input => f.write_str("input"),
            ParameterSide::Output => f.write_str("output"),
        }
    }
}

/// Data type a proxy parameter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    /// Untyped; anything the host sends is forwarded as-is
    Generic,
}

/// One parameter on the proxy node.
///
/// `id` is the identity host wiring attaches to. It survives renames and is
/// only replaced when the parameter is dropped and re-created.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: Uuid,
    pub kind: ParamKind,
    pub name: String,
    pub nickname: String,
    pub description: String,
    pub optional: bool,
    pub access: Access,
}

impl Param {
    pub fn text(
        name: impl Into<String>,
        nickname: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ParamKind::Text,
            name: name.into(),
            nickname: nickname.into(),
            description: description.into(),
            optional: false,
            access: Access::Single,
        }
    }

    pub fn generic(access: Access) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ParamKind::Generic,
            name: String::new(),
            nickname: String::new(),
            description: String::new(),
            optional: false,
            access,
        }
    }

    /// Copy the display surface of a sub-graph slot onto this parameter
    pub fn refresh_from(&mut self, slot: &SlotDescriptor) {
        self.name = slot.name.clone();
        self.nickname = slot.nickname.clone();
        self.description = slot.name.clone();
        self.optional = slot.optional;
        self.access = slot.access;
    }
}

/// Mirrored slot counts captured at reconciliation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounts {
    pub inputs: usize,
    pub outputs: usize,
}

/// One step of a schema diff
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOp {
    /// Drop the parameter at an absolute index
    Remove { side: ParameterSide, index: usize },
    /// Append a generic parameter
    Add { side: ParameterSide, access: Access },
    /// Overwrite name, nickname, optionality and access at an absolute index
    Rename {
        side: ParameterSide,
        index: usize,
        slot: SlotDescriptor,
    },
}

impl SchemaOp {
    pub fn side(&self) -> ParameterSide {
        match self {
            SchemaOp::Remove { side, .. }
            | SchemaOp::Add { side, .. }
            | SchemaOp::Rename { side, .. } => *side,
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, SchemaOp::Rename { .. })
    }
}

/// The proxy node's declared parameter list.
///
/// Each side is split into a fixed prefix that is never touched by
/// reconciliation and a mirrored suffix that tracks the loaded sub-graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySchema {
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    input_prefix: usize,
    output_prefix: usize,
}

impl ProxySchema {
    pub fn new(prefix_inputs: Vec<Param>, prefix_outputs: Vec<Param>) -> Self {
        Self {
            input_prefix: prefix_inputs.len(),
            output_prefix: prefix_outputs.len(),
            inputs: prefix_inputs,
            outputs: prefix_outputs,
        }
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Param] {
        &self.outputs
    }

    pub fn params(&self, side: ParameterSide) -> &[Param] {
        match side {
            ParameterSide::Input => &self.inputs,
            ParameterSide::Output => &self.outputs,
        }
    }

    fn params_mut(&mut self, side: ParameterSide) -> &mut Vec<Param> {
        match side {
            ParameterSide::Input => &mut self.inputs,
            ParameterSide::Output => &mut self.outputs,
        }
    }

    pub fn prefix_len(&self, side: ParameterSide) -> usize {
        match side {
            ParameterSide::Input => self.input_prefix,
            ParameterSide::Output => self.output_prefix,
        }
    }

    pub fn prefix(&self, side: ParameterSide) -> &[Param] {
        &self.params(side)[..self.prefix_len(side)]
    }

    pub fn mirrored(&self, side: ParameterSide) -> &[Param] {
        &self.params(side)[self.prefix_len(side)..]
    }

    pub fn mirrored_counts(&self) -> SlotCounts {
        SlotCounts {
            inputs: self.mirrored(ParameterSide::Input).len(),
            outputs: self.mirrored(ParameterSide::Output).len(),
        }
    }

    /// Users may only insert inside the mirrored region
    pub fn can_insert(&self, side: ParameterSide, index: usize) -> bool {
        index >= self.prefix_len(side) && index <= self.params(side).len()
    }

    /// Fixed prefix parameters can never be removed
    pub fn can_remove(&self, side: ParameterSide, index: usize) -> bool {
        index >= self.prefix_len(side) && index < self.params(side).len()
    }

    /// A fresh generic parameter with a nickname unique on `side`
    pub fn create_parameter(&self, side: ParameterSide) -> Param {
        let nickname = self.invent_nickname(side);
        let mut param = Param::generic(Access::Single);
        param.name = nickname.clone();
        param.description = format!("Param{}", self.params(side).len() + 1);
        param.nickname = nickname;
        param.optional = true;
        param
    }

    pub fn insert(
        &mut self,
        side: ParameterSide,
        index: usize,
        param: Param,
    ) -> Result<(), ProxyError> {
        if !self.can_insert(side, index) {
            return Err(ProxyError::SchemaMismatch(format!(
                "cannot insert {} parameter at {}",
                side, index
            )));
        }
        self.params_mut(side).insert(index, param);
        Ok(())
    }

    pub fn remove(&mut self, side: ParameterSide, index: usize) -> Result<Param, ProxyError> {
        if !self.can_remove(side, index) {
            return Err(ProxyError::SchemaMismatch(format!(
                "cannot remove {} parameter {}",
                side, index
            )));
        }
        Ok(self.params_mut(side).remove(index))
    }

    /// Invent a nickname from `A..Z`, then `A1..Z1` and so on
    pub fn invent_nickname(&self, side: ParameterSide) -> String {
        let taken: Vec<&str> = self
            .params(side)
            .iter()
            .map(|p| p.nickname.as_str())
            .collect();
        invent_unique_nickname(&taken)
    }

    /// Apply a diff to a copy of this schema.
    ///
    /// Either every op applies or `self` stays untouched and the failing op is
    /// reported; ops that reach into the fixed prefix are rejected.
    pub fn apply(&self, ops: &[SchemaOp]) -> Result<ProxySchema, ProxyError> {
        let mut next = self.clone();
        for op in ops {
            match op {
                SchemaOp::Remove { side, index } => {
                    next.remove(*side, *index)?;
                }
                SchemaOp::Add { side, access } => {
                    next.params_mut(*side).push(Param::generic(*access));
                }
                SchemaOp::Rename { side, index, slot } => {
                    if *index < next.prefix_len(*side) {
                        return Err(ProxyError::SchemaMismatch(format!(
                            "cannot rename fixed {} parameter {}",
                            side, index
                        )));
                    }
                    let param = next.params_mut(*side).get_mut(*index).ok_or_else(|| {
                        ProxyError::SchemaMismatch(format!(
                            "no {} parameter at {}",
                            side, index
                        ))
                    })?;
                    param.refresh_from(slot);
                }
            }
        }
        Ok(next)
    }
}

pub fn invent_unique_nickname(taken: &[&str]) -> String {
    let mut round = 0usize;
    loop {
        for letter in NICKNAME_ALPHABET.chars() {
            let candidate = if round == 0 {
                letter.to_string()
            } else {
                format!("{}{}", letter, round)
            };
            if !taken.contains(&candidate.as_str()) {
                return candidate;
            }
        }
        round += 1;
    }
}
