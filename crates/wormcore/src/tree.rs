use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address of one branch in a [`DataTree`], rendered as `{0;1;2}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchPath(Vec<u32>);

impl BranchPath {
    pub fn new(indices: impl Into<Vec<u32>>) -> Self {
        Self(indices.into())
    }

    /// The single default branch `{0}`
    pub fn root() -> Self {
        Self(vec![0])
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn child(&self, index: u32) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl Default for BranchPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "}}")
    }
}

/// Per-branch data structure flowing through a slot.
///
/// Branches are kept in path order. Cloning produces a fully independent
/// copy, which is what the data bridge relies on when it snapshots volatile
/// sub-graph outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    branches: BTreeMap<BranchPath, Vec<Value>>,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// One value on the root branch
    pub fn item(value: impl Into<Value>) -> Self {
        Self::list(vec![value.into()])
    }

    /// An ordered list on the root branch
    pub fn list(values: Vec<Value>) -> Self {
        let mut tree = Self::new();
        tree.branches.insert(BranchPath::root(), values);
        tree
    }

    pub fn push(&mut self, path: BranchPath, value: Value) {
        self.branches.entry(path).or_default().push(value);
    }

    pub fn append(&mut self, path: BranchPath, values: impl IntoIterator<Item = Value>) {
        self.branches.entry(path).or_default().extend(values);
    }

    /// Replace a branch wholesale
    pub fn set_branch(&mut self, path: BranchPath, values: Vec<Value>) {
        self.branches.insert(path, values);
    }

    pub fn branch(&self, path: &BranchPath) -> Option<&[Value]> {
        self.branches.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &BranchPath> {
        self.branches.keys()
    }

    pub fn branches(&self) -> impl Iterator<Item = (&BranchPath, &[Value])> {
        self.branches.iter().map(|(p, v)| (p, v.as_slice()))
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Total number of values across all branches
    pub fn len(&self) -> usize {
        self.branches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&Value> {
        self.branches.values().flat_map(|v| v.iter()).next()
    }

    /// All values in path order, branch structure discarded
    pub fn flatten(&self) -> Vec<Value> {
        self.branches.values().flat_map(|v| v.iter().cloned()).collect()
    }

    /// Append every branch of `other` onto the matching branch of `self`
    pub fn merge(&mut self, other: &DataTree) {
        for (path, values) in &other.branches {
            self.append(path.clone(), values.iter().cloned());
        }
    }

    pub fn clear(&mut self) {
        self.branches.clear();
    }
}

impl fmt::Display for DataTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, values) in &self.branches {
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{} [{}]", path, rendered.join(", "))?;
        }
        Ok(())
    }
}

impl From<Value> for DataTree {
    fn from(value: Value) -> Self {
        Self::item(value)
    }
}
