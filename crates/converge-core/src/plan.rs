use serde::{Deserialize, Serialize};

use crate::spec::Attributes;

/// What the engine intends to do to bring one resource to its desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "delta", rename_all = "snake_case")]
pub enum Plan {
    NoOp,
    Create,
    /// Only the keys whose observed value differs, carrying the desired value.
    Update(Attributes),
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Update(_) => "update",
        }
    }
}
