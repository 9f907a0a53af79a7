use converge_core::{Manifest, ReconciliationResult, ResourceKey, ResourceSpec};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::provider::ResourceProvider;
use crate::reconciler::{ReconcileContext, Reconciler};
use crate::retry::{self, RetryPolicy};

#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Stop starting new entries after the first failure.
    pub fail_fast: bool,
    /// Entries reconciled at once by [`apply_concurrent`].
    pub max_parallel: usize,
    pub retry: RetryPolicy,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            fail_fast: true,
            max_parallel: 4,
            retry: RetryPolicy::none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum EntryOutcome {
    Reconciled(ReconciliationResult),
    /// Not attempted because an earlier entry failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyEntry {
    pub resource: ResourceKey,
    pub outcome: EntryOutcome,
}

impl ApplyEntry {
    pub fn result(&self) -> Option<&ReconciliationResult> {
        match &self.outcome {
            EntryOutcome::Reconciled(result) => Some(result),
            EntryOutcome::Skipped => None,
        }
    }
}

/// Per-entry results, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub entries: Vec<ApplyEntry>,
}

impl ApplyReport {
    pub fn failed(&self) -> usize {
        self.count(|r| r.is_failed())
    }

    pub fn created(&self) -> usize {
        self.count(|r| matches!(r, ReconciliationResult::Created(_)))
    }

    pub fn updated(&self) -> usize {
        self.count(|r| matches!(r, ReconciliationResult::Updated))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|r| matches!(r, ReconciliationResult::Unchanged))
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == EntryOutcome::Skipped)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    fn count(&self, pred: impl Fn(&ReconciliationResult) -> bool) -> usize {
        self.entries
            .iter()
            .filter_map(ApplyEntry::result)
            .filter(|r| pred(r))
            .count()
    }
}

/// Reconcile every entry in manifest order, one at a time.
///
/// Dependencies are satisfied by position: an entry runs only after every
/// entry before it has settled.
pub async fn apply_all<P: ResourceProvider>(
    reconciler: &Reconciler<P>,
    manifest: &Manifest,
    ctx: &ReconcileContext,
    options: &ApplyOptions,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut halted = false;

    for spec in &manifest.resources {
        let outcome = if halted {
            EntryOutcome::Skipped
        } else {
            let result = reconcile_one(reconciler, spec, ctx, options).await;
            if result.is_failed() && options.fail_fast {
                tracing::warn!(resource = %spec.key(), "halting apply after failure");
                halted = true;
            }
            EntryOutcome::Reconciled(result)
        };
        report.entries.push(ApplyEntry {
            resource: spec.key(),
            outcome,
        });
    }

    report
}

/// Reconcile independent entries concurrently, at most `max_parallel` at once.
///
/// Same-identity work is serialized by the reconciler's identity locks.
/// With `fail_fast`, entries not yet started when a failure lands are
/// skipped and in-flight ones observe cancellation. Results come back in
/// manifest order.
pub async fn apply_concurrent<P: ResourceProvider>(
    reconciler: &Reconciler<P>,
    manifest: &Manifest,
    ctx: &ReconcileContext,
    options: &ApplyOptions,
) -> ApplyReport {
    let halt = ctx.cancel.child_token();
    let run_ctx = ReconcileContext {
        cancel: halt.clone(),
        wait: ctx.wait,
    };

    let mut results: Vec<(usize, ApplyEntry)> = stream::iter(manifest.resources.iter().enumerate())
        .map(|(index, spec)| {
            let halt = &halt;
            let run_ctx = &run_ctx;
            async move {
                let outcome = if halt.is_cancelled() && !ctx.cancel.is_cancelled() {
                    EntryOutcome::Skipped
                } else {
                    let result = reconcile_one(reconciler, spec, run_ctx, options).await;
                    if result.is_failed() && options.fail_fast && !halt.is_cancelled() {
                        tracing::warn!(resource = %spec.key(), "halting apply after failure");
                        halt.cancel();
                    }
                    EntryOutcome::Reconciled(result)
                };
                (
                    index,
                    ApplyEntry {
                        resource: spec.key(),
                        outcome,
                    },
                )
            }
        })
        .buffer_unordered(options.max_parallel.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);
    ApplyReport {
        entries: results.into_iter().map(|(_, entry)| entry).collect(),
    }
}

async fn reconcile_one<P: ResourceProvider>(
    reconciler: &Reconciler<P>,
    spec: &ResourceSpec,
    ctx: &ReconcileContext,
    options: &ApplyOptions,
) -> ReconciliationResult {
    if options.retry.max_retries > 0 {
        retry::reconcile_with_retry(reconciler, spec, ctx, &options.retry).await
    } else {
        reconciler.reconcile(spec, ctx).await
    }
}
