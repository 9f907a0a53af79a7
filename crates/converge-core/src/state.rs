use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spec::Attributes;

/// Provider-reported lifecycle stage of a resource.
///
/// `NotFound → Creating → {Available | Failed}` and
/// `Available → Updating → {Available | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[serde(alias = "pending", alias = "provisioning")]
    Creating,
    #[serde(alias = "modifying")]
    Updating,
    #[serde(alias = "active", alias = "ready")]
    Available,
    #[serde(alias = "error")]
    Failed,
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Available | Self::Failed)
    }

    /// Rank used when several resources match one identity. Higher wins.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Available => 3,
            Self::Updating => 2,
            Self::Creating => 1,
            Self::Failed => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Available => "available",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One resource as the provider currently reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedResource {
    /// Provider-assigned id, e.g. `nat-0a1b2c`
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub status: ResourceStatus,
    /// When the provider created it, if the provider reports that
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<jiff::Timestamp>,
}

/// Result of looking up a spec's identity at the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedState {
    NotFound,
    Found(ObservedResource),
}

impl ObservedState {
    pub fn resource(&self) -> Option<&ObservedResource> {
        match self {
            Self::NotFound => None,
            Self::Found(r) => Some(r),
        }
    }

    pub fn status(&self) -> Option<ResourceStatus> {
        self.resource().map(|r| r.status)
    }
}
