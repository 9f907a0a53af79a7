use std::time::Duration;

use converge_core::{Failure, ObservedResource, ResourceKind, ResourceStatus};
use tokio_util::sync::CancellationToken;

use crate::provider::ResourceProvider;

/// How long to wait for an asynchronously provisioned resource to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Sleep before each poll.
    pub interval: Duration,
    /// Polls issued before giving up.
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent waiting, excluding provider latency.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Poll `find` until the resource with `id` reaches a terminal status.
///
/// Each iteration sleeps `interval` then polls once. A resource not yet
/// listed counts as still settling. `Failed` ends the wait immediately.
/// After `max_attempts` polls without a terminal status the wait fails with
/// a timeout and no further poll is issued.
pub async fn wait_for_stable<P: ResourceProvider + ?Sized>(
    provider: &P,
    kind: ResourceKind,
    identity: &str,
    id: &str,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<ObservedResource, Failure> {
    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Failure::cancelled()),
            _ = tokio::time::sleep(policy.interval) => {}
        }

        let matches = provider
            .find(kind, identity)
            .await
            .map_err(|e| Failure::from(e.with_context("find", identity)))?;

        match matches.into_iter().find(|r| r.id == id) {
            Some(resource) if resource.status == ResourceStatus::Available => {
                tracing::debug!(attempt, id, "resource settled");
                return Ok(resource);
            }
            Some(resource) if resource.status == ResourceStatus::Failed => {
                tracing::warn!(attempt, id, "provider reported failure while waiting");
                return Err(Failure::provider_reported_failure());
            }
            Some(resource) => {
                tracing::debug!(attempt, id, status = %resource.status, "waiting for resource");
            }
            None => {
                tracing::debug!(attempt, id, "resource not yet visible");
            }
        }
    }

    tracing::warn!(
        id,
        attempts = policy.max_attempts,
        "resource did not settle in time"
    );
    Err(Failure::timeout())
}
