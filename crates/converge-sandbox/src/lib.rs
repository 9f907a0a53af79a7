//! converge-sandbox
//!
//! File-backed resource provider. Resources live in one JSON state file and
//! settle after a configurable number of polls, which is enough to exercise
//! the reconciler end to end without a cloud account.

pub mod error;
pub mod persistence;
pub mod provider;
pub mod state;

pub use crate::error::SandboxError;
pub use crate::persistence::StatePersistence;
pub use crate::provider::{SandboxOptions, SandboxProvider};
pub use crate::state::{SandboxResource, SandboxState};
