use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::kind::ResourceKind;
use crate::spec::{Attributes, ResourceSpec};

/// A declarative, ordered list of resource specs.
///
/// Order matters: entries are applied front to back and torn down back to
/// front, so a resource should be listed after everything it depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub version: u32,
    pub resources: Vec<ResourceSpec>,
}

/// On-disk shape. `kind` stays a string until validation so an unknown kind
/// is reported with its position instead of as a serde error.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    resources: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    kind: String,
    #[serde(default)]
    identity: String,
    #[serde(default)]
    desired: Attributes,
}

impl Manifest {
    /// Bump when the manifest shape changes.
    pub const VERSION: u32 = 1;

    pub fn new(resources: Vec<ResourceSpec>) -> Result<Self, CoreError> {
        let manifest = Self {
            version: Self::VERSION,
            resources,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: RawManifest = serde_json::from_str(json)?;
        if raw.version > Self::VERSION {
            return Err(CoreError::UnsupportedManifestVersion {
                found: raw.version,
                supported: Self::VERSION,
            });
        }

        let mut resources = Vec::with_capacity(raw.resources.len());
        for (index, entry) in raw.resources.into_iter().enumerate() {
            let kind: ResourceKind = entry.kind.parse().map_err(|_| {
                CoreError::InvalidSpec(format!(
                    "resources[{index}]: unknown kind \"{}\"",
                    entry.kind
                ))
            })?;
            let spec = ResourceSpec {
                kind,
                identity: entry.identity,
                desired: entry.desired,
            };
            spec.validate().map_err(|e| match e {
                CoreError::InvalidSpec(msg) => {
                    CoreError::InvalidSpec(format!("resources[{index}]: {msg}"))
                }
                other => other,
            })?;
            resources.push(spec);
        }

        let manifest = Self {
            version: Self::VERSION,
            resources,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Every spec must be valid and no two may share a `(kind, identity)` key.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for spec in &self.resources {
            spec.validate()?;
            if !seen.insert(spec.key()) {
                return Err(CoreError::InvalidSpec(format!(
                    "duplicate resource {}",
                    spec.key()
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}
