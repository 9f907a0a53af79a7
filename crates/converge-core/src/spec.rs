use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::kind::ResourceKind;

/// Attribute name → value. Ordered so diffs and logs are deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Every resource the engine manages is declared as a `ResourceSpec`.
///
/// The spec is pure data: it names the resource kind, the natural key used
/// to look it up at the provider, and the attributes it should end up with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// e.g. `nat_gateway`
    pub kind: ResourceKind,
    /// Natural lookup key, e.g. a subnet tag or a resource name
    pub identity: String,
    /// Target values; keys not listed here are left alone
    #[serde(default)]
    pub desired: Attributes,
}

impl ResourceSpec {
    /// Build a spec, rejecting an empty identity.
    pub fn new(
        kind: ResourceKind,
        identity: impl Into<String>,
        desired: Attributes,
    ) -> Result<Self, CoreError> {
        let spec = Self {
            kind,
            identity: identity.into(),
            desired,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.identity.trim().is_empty() {
            return Err(CoreError::InvalidSpec(format!(
                "{}: identity must not be empty",
                self.kind
            )));
        }
        Ok(())
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            kind: self.kind,
            identity: self.identity.clone(),
        }
    }
}

/// Composite lookup key: two specs with the same key target the same
/// logical resource.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub identity: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.identity)
    }
}
