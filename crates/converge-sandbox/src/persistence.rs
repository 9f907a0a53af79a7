use std::path::{Path, PathBuf};

use crate::error::SandboxError;
use crate::state::SandboxState;

/// Local JSON state file with atomic writes.
#[derive(Debug, Clone)]
pub struct StatePersistence {
    pub path: PathBuf,
}

impl StatePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write state to a temp file next to the target, then rename over it.
    pub fn flush(&self, state: &SandboxState) -> Result<(), SandboxError> {
        let mut stamped = state.clone();
        stamped.version = SandboxState::VERSION;

        let json = serde_json::to_vec_pretty(&stamped)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), "sandbox state flushed");
        Ok(())
    }

    /// Load state, or start fresh if the file doesn't exist yet.
    pub fn load(&self) -> Result<SandboxState, SandboxError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no sandbox state found, starting fresh");
            return Ok(SandboxState::default());
        }

        let json = std::fs::read(&self.path)?;
        let state: SandboxState = serde_json::from_slice(&json)
            .map_err(|e| SandboxError::Corrupt(format!("{}: {e}", self.path.display())))?;
        if state.version > SandboxState::VERSION {
            return Err(SandboxError::UnsupportedVersion {
                found: state.version,
                supported: SandboxState::VERSION,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            resources = state.resources.len(),
            "sandbox state loaded"
        );
        Ok(state)
    }
}
