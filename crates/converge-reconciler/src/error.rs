use converge_core::{Failure, FailureKind};
use thiserror::Error;

pub use converge_core::error::format_err_chain;

/// Error returned across the provider boundary.
///
/// Providers never retry; they classify the failure and hand it back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport or auth failure: the provider could not be reached.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Rate limited. Transient, like `Unavailable`.
    #[error("throttled: {0}")]
    Throttled(String),

    /// The provider understood the request and refused it
    /// (conflict, quota, validation). Carries the provider's reason verbatim.
    #[error("{0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unavailable(_) | Self::Throttled(_) => FailureKind::ProviderUnavailable,
            Self::Rejected(_) => FailureKind::ProviderError,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.failure_kind() == FailureKind::ProviderUnavailable
    }

    /// Prepend the operation and resource to the message.
    pub fn with_context(self, op: &str, target: &str) -> Self {
        match self {
            Self::Unavailable(msg) => Self::Unavailable(format!("{op} {target}: {msg}")),
            Self::Throttled(msg) => Self::Throttled(format!("{op} {target}: {msg}")),
            rejected @ Self::Rejected(_) => rejected,
        }
    }
}

impl From<ProviderError> for Failure {
    fn from(err: ProviderError) -> Self {
        Failure::new(err.failure_kind(), err.to_string())
    }
}
