//! converge-reconciler
//!
//! Desired-state reconciliation engine. One engine, generic over the
//! provider that owns the real resources.
//!
//! Public API:
//! - `Reconciler::reconcile()`: observe → diff → apply → wait for one spec
//! - `Reconciler::plan()`: observe → diff, no changes
//! - `reconcile_with_retry()`: caller-side retry for transient failures
//! - `apply_all()` / `apply_concurrent()`: reconcile a whole manifest
//! - `teardown()`: delete every manifest resource in reverse order

pub mod apply;
pub mod diff;
pub mod error;
pub mod locks;
pub mod provider;
pub mod reconciler;
pub mod retry;
pub mod select;
pub mod teardown;
pub mod wait;

pub use crate::apply::{
    apply_all, apply_concurrent, ApplyEntry, ApplyOptions, ApplyReport, EntryOutcome,
};
pub use crate::diff::FieldDrift;
pub use crate::error::ProviderError;
pub use crate::locks::{IdentityGuard, IdentityLocks};
pub use crate::provider::{ApplyReceipt, BoxFuture, Created, ResourceProvider};
pub use crate::reconciler::{Observation, PlanReport, ReconcileContext, Reconciler};
pub use crate::retry::{reconcile_with_retry, RetryPolicy};
pub use crate::select::select_match;
pub use crate::teardown::{teardown, TeardownEntry, TeardownOutcome};
pub use crate::wait::{wait_for_stable, WaitPolicy};

pub use tokio_util::sync::CancellationToken;
