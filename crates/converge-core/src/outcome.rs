use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Failure taxonomy. Callers branch on the kind to decide retry vs abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed input, caught before any provider call.
    InvalidSpec,
    /// Transport, auth or throttling failure reaching the provider.
    ProviderUnavailable,
    /// The provider rejected the request, or reported the resource failed.
    ProviderError,
    /// The request succeeded but the resource did not settle in time.
    Timeout,
    /// The caller aborted the run.
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSpec => "invalid_spec",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderError => "provider_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A typed failure with the reason as reported (provider reasons verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidSpec, reason)
    }

    pub fn timeout() -> Self {
        Self::new(FailureKind::Timeout, "timeout")
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled")
    }

    pub fn provider_reported_failure() -> Self {
        Self::new(FailureKind::ProviderError, "provider reported failure")
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

impl From<CoreError> for Failure {
    fn from(err: CoreError) -> Self {
        let kind = if err.is_invalid_spec() {
            FailureKind::InvalidSpec
        } else {
            FailureKind::ProviderError
        };
        Self::new(kind, err.to_string())
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum ReconciliationResult {
    Unchanged,
    /// Carries the provider id of the new resource.
    Created(String),
    Updated,
    Failed(Failure),
}

impl ReconciliationResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(f) => Some(f),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure().map(|f| f.kind)
    }
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("unchanged"),
            Self::Created(id) => write!(f, "created {id}"),
            Self::Updated => f.write_str("updated"),
            Self::Failed(failure) => write!(f, "failed ({failure})"),
        }
    }
}
