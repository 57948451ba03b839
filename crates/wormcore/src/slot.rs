use serde::{Deserialize, Serialize};

/// How a slot consumes or produces data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// One value per solve
    #[default]
    Single,
    /// An ordered list per solve
    List,
}

/// Input or output connection point declared by a sub-graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub access: Access,
}

impl SlotDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            nickname: name.clone(),
            name,
            optional: false,
            access: Access::Single,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}
