use converge_core::{Failure, Manifest, ObservedState, ResourceKey, ResourceSpec};
use serde::{Deserialize, Serialize};

use crate::provider::ResourceProvider;
use crate::reconciler::{ReconcileContext, Reconciler};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TeardownOutcome {
    /// Carries the provider id that was deleted.
    Deleted(String),
    /// Nothing matched the identity.
    Absent,
    Failed(Failure),
    /// Not attempted because an earlier entry failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownEntry {
    pub resource: ResourceKey,
    pub outcome: TeardownOutcome,
}

impl<P: ResourceProvider> Reconciler<P> {
    /// Delete the resource a spec resolves to, if it exists.
    pub async fn delete(&self, spec: &ResourceSpec, ctx: &ReconcileContext) -> TeardownOutcome {
        if let Err(e) = spec.validate() {
            return TeardownOutcome::Failed(e.into());
        }

        let key = spec.key();
        let _guard = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return TeardownOutcome::Failed(Failure::cancelled()),
            guard = self.locks().lock(&key) => guard,
        };

        let observation = match self.observe(spec, ctx).await {
            Ok(observation) => observation,
            Err(failure) => return TeardownOutcome::Failed(failure),
        };
        let ObservedState::Found(resource) = observation.state else {
            tracing::debug!(resource = %key, "nothing to delete");
            return TeardownOutcome::Absent;
        };

        if ctx.cancel.is_cancelled() {
            return TeardownOutcome::Failed(Failure::cancelled());
        }

        tracing::info!(resource = %key, id = %resource.id, "destroying resource");
        match self.provider().delete(&resource.id).await {
            Ok(()) => TeardownOutcome::Deleted(resource.id),
            Err(e) => {
                let failure = Failure::from(e.with_context("delete", &resource.id));
                tracing::warn!(resource = %key, error = %failure, "delete failed");
                TeardownOutcome::Failed(failure)
            }
        }
    }
}

/// Destroy every resource in the manifest.
///
/// Walks entries in reverse (dependents before dependencies) and stops at
/// the first failure, reporting the remaining entries as skipped.
pub async fn teardown<P: ResourceProvider>(
    reconciler: &Reconciler<P>,
    manifest: &Manifest,
    ctx: &ReconcileContext,
) -> Vec<TeardownEntry> {
    let mut entries = Vec::with_capacity(manifest.len());
    let mut halted = false;

    for spec in manifest.resources.iter().rev() {
        let outcome = if halted {
            TeardownOutcome::Skipped
        } else {
            let outcome = reconciler.delete(spec, ctx).await;
            halted = matches!(outcome, TeardownOutcome::Failed(_));
            outcome
        };
        entries.push(TeardownEntry {
            resource: spec.key(),
            outcome,
        });
    }

    entries
}
