use converge_reconciler::ProviderError;
use converge_reconciler::error::format_err_chain;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("state file version {found} is newer than supported ({supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("state file is corrupt: {0}")]
    Corrupt(String),

    // Causes stay in `source()` only; `format_err_chain` appends them.
    #[error("state file serialization failed")]
    Serialization(#[from] serde_json::Error),

    #[error("state file I/O failed")]
    Io(#[from] std::io::Error),
}

impl From<SandboxError> for ProviderError {
    /// The state file is the sandbox's transport; failing to read or write it
    /// means the provider is unreachable.
    fn from(err: SandboxError) -> Self {
        ProviderError::Unavailable(format_err_chain(&err))
    }
}
