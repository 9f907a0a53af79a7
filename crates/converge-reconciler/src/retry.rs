use std::time::Duration;

use converge_core::{Failure, FailureKind, ReconciliationResult, ResourceSpec};

use crate::provider::ResourceProvider;
use crate::reconciler::{ReconcileContext, Reconciler};

/// Caller-side retry schedule for transient provider failures.
///
/// The reconciler itself never retries; wrap calls with
/// [`reconcile_with_retry`] to get this behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Backoff grows by this factor per retry.
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Run once, never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Only transport, auth and throttling failures are worth another try.
    pub fn is_retryable(kind: FailureKind) -> bool {
        kind == FailureKind::ProviderUnavailable
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Reconcile, re-running the whole cycle after transient provider failures.
///
/// Re-running is safe because reconciliation is idempotent: a create that
/// landed before the failure is observed and not repeated.
pub async fn reconcile_with_retry<P: ResourceProvider>(
    reconciler: &Reconciler<P>,
    spec: &ResourceSpec,
    ctx: &ReconcileContext,
    policy: &RetryPolicy,
) -> ReconciliationResult {
    let mut retry = 0;
    loop {
        let result = reconciler.reconcile(spec, ctx).await;
        let retryable = result
            .failure_kind()
            .is_some_and(RetryPolicy::is_retryable);
        if !retryable || retry >= policy.max_retries {
            return result;
        }

        let delay = policy.backoff(retry);
        retry += 1;
        tracing::warn!(
            resource = %spec.key(),
            retry,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            "transient provider failure, retrying"
        );

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return ReconciliationResult::Failed(Failure::cancelled()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
