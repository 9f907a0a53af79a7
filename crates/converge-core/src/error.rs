use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("manifest version {found} is newer than supported ({supported})")]
    UnsupportedManifestVersion { found: u32, supported: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for errors caused by malformed input rather than the environment.
    pub fn is_invalid_spec(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpec(_) | Self::UnknownKind(_) | Self::UnsupportedManifestVersion { .. }
        )
    }
}

/// Walk the full error chain and join all causes into one string.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
