use converge_core::{Attributes, ObservedResource, ResourceKind, ResourceStatus};
use serde::{Deserialize, Serialize};

/// Everything the sandbox knows, persisted as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxState {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub resources: Vec<SandboxResource>,
}

impl SandboxState {
    /// Bump when the state file shape changes.
    pub const VERSION: u32 = 1;

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SandboxResource> {
        self.resources.iter_mut().find(|r| r.id == id)
    }
}

/// A single sandbox resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxResource {
    pub id: String,
    pub kind: ResourceKind,
    pub identity: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub status: ResourceStatus,
    pub created_at: jiff::Timestamp,
    /// Lookups left before a creating/updating resource settles.
    #[serde(default)]
    pub polls_remaining: u32,
    /// Settle into `failed` instead of `available`.
    #[serde(default)]
    pub fail_on_settle: bool,
}

impl SandboxResource {
    /// Count one lookup against an in-flight resource. Returns true if the
    /// status changed.
    pub fn tick(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.polls_remaining = self.polls_remaining.saturating_sub(1);
        if self.polls_remaining > 0 {
            return false;
        }
        self.status = if self.fail_on_settle {
            ResourceStatus::Failed
        } else {
            ResourceStatus::Available
        };
        true
    }

    pub fn observed(&self) -> ObservedResource {
        ObservedResource {
            id: self.id.clone(),
            attributes: self.attributes.clone(),
            status: self.status,
            created_at: Some(self.created_at),
        }
    }
}
