//! converge-core
//!
//! Pure domain types for desired-state reconciliation.
//! Nothing here talks to a provider; every other crate builds on these types.

pub mod error;
pub mod kind;
pub mod manifest;
pub mod outcome;
pub mod plan;
pub mod spec;
pub mod state;

pub use crate::error::CoreError;
pub use crate::kind::ResourceKind;
pub use crate::manifest::Manifest;
pub use crate::outcome::{Failure, FailureKind, ReconciliationResult};
pub use crate::plan::Plan;
pub use crate::spec::{Attributes, ResourceKey, ResourceSpec};
pub use crate::state::{ObservedResource, ObservedState, ResourceStatus};
