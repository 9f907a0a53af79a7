use converge_core::{
    Attributes, Failure, FailureKind, ObservedState, Plan, ReconciliationResult, ResourceKind,
    ResourceSpec, ResourceStatus,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::diff::{self, FieldDrift};
use crate::locks::IdentityLocks;
use crate::provider::ResourceProvider;
use crate::select::select_match;
use crate::wait::{self, WaitPolicy};

/// Per-call state threaded through one reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    /// Checked before every provider call and at every poll.
    pub cancel: CancellationToken,
    /// Overrides the reconciler's wait policy for this call.
    pub wait: Option<WaitPolicy>,
}

impl ReconcileContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = Some(wait);
        self
    }

    fn check_cancelled(&self) -> Result<(), Failure> {
        if self.cancel.is_cancelled() {
            Err(Failure::cancelled())
        } else {
            Ok(())
        }
    }
}

/// Read-only view of what `reconcile` would do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub kind: ResourceKind,
    pub identity: String,
    pub plan: Plan,
    /// Provider id of the selected match, if any
    pub observed_id: Option<String>,
    pub observed_status: Option<ResourceStatus>,
    /// How many resources matched the identity before tie-break
    pub matches: usize,
    pub drift: Vec<FieldDrift>,
}

/// Result of the observe step.
#[derive(Debug, Clone)]
pub struct Observation {
    pub state: ObservedState,
    pub matches: usize,
}

/// Drives observe → diff → apply → wait for one resource at a time.
///
/// Generic over the provider; every resource kind goes through the same
/// path and the provider adapter supplies the kind-specific calls.
pub struct Reconciler<P> {
    provider: P,
    wait: WaitPolicy,
    locks: IdentityLocks,
}

impl<P: ResourceProvider> Reconciler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            wait: WaitPolicy::default(),
            locks: IdentityLocks::new(),
        }
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn wait_policy(&self) -> &WaitPolicy {
        &self.wait
    }

    pub fn locks(&self) -> &IdentityLocks {
        &self.locks
    }

    /// Look the spec's identity up and apply the tie-break.
    pub async fn observe(
        &self,
        spec: &ResourceSpec,
        ctx: &ReconcileContext,
    ) -> Result<Observation, Failure> {
        ctx.check_cancelled()?;
        let candidates = self
            .provider
            .find(spec.kind, &spec.identity)
            .await
            .map_err(|e| Failure::from(e.with_context("find", &spec.identity)))?;
        let matches = candidates.len();
        let state = match select_match(candidates) {
            Some(resource) => ObservedState::Found(resource),
            None => ObservedState::NotFound,
        };
        Ok(Observation { state, matches })
    }

    /// Observe and diff without changing anything.
    pub async fn plan(
        &self,
        spec: &ResourceSpec,
        ctx: &ReconcileContext,
    ) -> Result<PlanReport, Failure> {
        spec.validate()?;
        let observation = self.observe(spec, ctx).await?;
        let plan = diff::plan(spec, &observation.state);
        let resource = observation.state.resource();
        Ok(PlanReport {
            kind: spec.kind,
            identity: spec.identity.clone(),
            observed_id: resource.map(|r| r.id.clone()),
            observed_status: resource.map(|r| r.status),
            matches: observation.matches,
            drift: resource
                .map(|r| diff::drift(&spec.desired, &r.attributes))
                .unwrap_or_default(),
            plan,
        })
    }

    /// Bring one resource to its desired state.
    ///
    /// Never retries; every failure comes back as `Failed` with its kind.
    /// Concurrent calls for the same `(kind, identity)` on this reconciler
    /// are serialized.
    pub async fn reconcile(
        &self,
        spec: &ResourceSpec,
        ctx: &ReconcileContext,
    ) -> ReconciliationResult {
        if let Err(e) = spec.validate() {
            tracing::warn!(kind = %spec.kind, error = %e, "rejecting invalid spec");
            return ReconciliationResult::Failed(e.into());
        }

        let key = spec.key();
        let _guard = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return ReconciliationResult::Failed(Failure::cancelled()),
            guard = self.locks.lock(&key) => guard,
        };

        let result = match self.run(spec, ctx).await {
            Ok(result) => result,
            Err(failure) => ReconciliationResult::Failed(failure),
        };

        match &result {
            ReconciliationResult::Failed(failure) => {
                tracing::warn!(
                    resource = %key,
                    failure_kind = %failure.kind,
                    reason = %failure.reason,
                    "reconciliation failed"
                );
            }
            other => {
                tracing::info!(resource = %key, result = %other, "reconciliation finished");
            }
        }
        result
    }

    async fn run(
        &self,
        spec: &ResourceSpec,
        ctx: &ReconcileContext,
    ) -> Result<ReconciliationResult, Failure> {
        let observation = self.observe(spec, ctx).await?;
        let ObservedState::Found(resource) = &observation.state else {
            return self.create(spec, ctx).await;
        };

        match diff::plan(spec, &observation.state) {
            Plan::NoOp => {
                // Attributes match: no further provider call, whatever the status.
                // `plan()` surfaces the observed status for callers that care.
                tracing::debug!(resource = %spec.key(), status = %resource.status, "in sync");
                Ok(ReconciliationResult::Unchanged)
            }
            Plan::Update(delta) => self.update(spec, &resource.id, &delta, ctx).await,
            Plan::Create => self.create(spec, ctx).await,
        }
    }

    async fn create(
        &self,
        spec: &ResourceSpec,
        ctx: &ReconcileContext,
    ) -> Result<ReconciliationResult, Failure> {
        ctx.check_cancelled()?;
        tracing::info!(kind = %spec.kind, identity = %spec.identity, "creating resource");

        let created = self
            .provider
            .create(spec)
            .await
            .map_err(|e| Failure::from(e.with_context("create", &spec.identity)))?;

        tracing::info!(
            kind = %spec.kind,
            identity = %spec.identity,
            id = %created.id,
            status = %created.status,
            "create accepted"
        );
        self.settle(spec, &created.id, created.status, ctx).await?;
        Ok(ReconciliationResult::Created(created.id))
    }

    async fn update(
        &self,
        spec: &ResourceSpec,
        id: &str,
        delta: &Attributes,
        ctx: &ReconcileContext,
    ) -> Result<ReconciliationResult, Failure> {
        ctx.check_cancelled()?;
        tracing::info!(
            kind = %spec.kind,
            identity = %spec.identity,
            id,
            fields = ?delta.keys().collect::<Vec<_>>(),
            "updating resource"
        );

        let receipt = self
            .provider
            .apply(id, delta)
            .await
            .map_err(|e| Failure::from(e.with_context("apply", id)))?;

        let missing = receipt.missing(delta);
        if !missing.is_empty() {
            return Err(Failure::new(
                FailureKind::ProviderError,
                format!("partial update: provider did not apply {}", missing.join(", ")),
            ));
        }

        self.settle(spec, id, receipt.status, ctx).await?;
        Ok(ReconciliationResult::Updated)
    }

    /// Wait only when the provider reported a non-terminal status.
    async fn settle(
        &self,
        spec: &ResourceSpec,
        id: &str,
        status: ResourceStatus,
        ctx: &ReconcileContext,
    ) -> Result<(), Failure> {
        match status {
            ResourceStatus::Available => Ok(()),
            ResourceStatus::Failed => Err(Failure::provider_reported_failure()),
            ResourceStatus::Creating | ResourceStatus::Updating => {
                let policy = ctx.wait.unwrap_or(self.wait);
                wait::wait_for_stable(
                    &self.provider,
                    spec.kind,
                    &spec.identity,
                    id,
                    &policy,
                    &ctx.cancel,
                )
                .await
                .map(|_| ())
            }
        }
    }
}
