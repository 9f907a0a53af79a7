use std::collections::BTreeMap;
use std::path::PathBuf;

use converge_core::{Attributes, ObservedResource, ResourceKind, ResourceSpec, ResourceStatus};
use converge_reconciler::{ApplyReceipt, BoxFuture, Created, ProviderError, ResourceProvider};
use tokio::sync::Mutex;

use crate::error::SandboxError;
use crate::persistence::StatePersistence;
use crate::state::{SandboxResource, SandboxState};

/// Knobs for how the sandbox behaves.
#[derive(Debug, Clone, Default)]
pub struct SandboxOptions {
    /// Lookups a new or modified resource stays in flight before settling.
    /// Zero settles immediately.
    pub settle_polls: u32,
    /// Kinds whose create requests are refused, with the refusal reason.
    pub reject: BTreeMap<ResourceKind, String>,
    /// Kinds that settle into `failed`.
    pub fail_on_settle: Vec<ResourceKind>,
}

/// File-backed provider.
///
/// State is loaded once on open, held behind an async mutex and flushed
/// after every change.
pub struct SandboxProvider {
    persistence: StatePersistence,
    options: SandboxOptions,
    state: Mutex<SandboxState>,
}

impl SandboxProvider {
    pub fn open(path: impl Into<PathBuf>, options: SandboxOptions) -> Result<Self, SandboxError> {
        let persistence = StatePersistence::new(path);
        let state = persistence.load()?;
        Ok(Self {
            persistence,
            options,
            state: Mutex::new(state),
        })
    }

    pub fn persistence(&self) -> &StatePersistence {
        &self.persistence
    }

    /// Copy of every resource currently in the sandbox.
    pub async fn snapshot(&self) -> Vec<SandboxResource> {
        self.state.lock().await.resources.clone()
    }

    fn mint_id(kind: ResourceKind) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", kind.id_prefix(), &suffix[..12])
    }

    /// Flush `next` and only then make it the live state, so a failed write
    /// leaves memory matching what is on disk.
    fn commit(&self, live: &mut SandboxState, next: SandboxState) -> Result<(), SandboxError> {
        self.persistence.flush(&next)?;
        *live = next;
        Ok(())
    }

    /// Status and poll budget for a resource that just changed.
    fn in_flight(&self, pending: ResourceStatus, settled: ResourceStatus) -> (ResourceStatus, u32) {
        if self.options.settle_polls == 0 {
            (settled, 0)
        } else {
            (pending, self.options.settle_polls)
        }
    }
}

impl ResourceProvider for SandboxProvider {
    fn find<'a>(
        &'a self,
        kind: ResourceKind,
        identity: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObservedResource>, ProviderError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            let mut changed = false;
            let mut found = Vec::new();
            for resource in next
                .resources
                .iter_mut()
                .filter(|r| r.kind == kind && r.identity == identity)
            {
                if resource.tick() {
                    tracing::debug!(id = %resource.id, status = %resource.status, "sandbox resource settled");
                    changed = true;
                }
                found.push(resource.observed());
            }
            if changed {
                self.commit(&mut state, next)?;
            }
            Ok(found)
        })
    }

    fn create<'a>(&'a self, spec: &'a ResourceSpec) -> BoxFuture<'a, Result<Created, ProviderError>> {
        Box::pin(async move {
            if let Some(reason) = self.options.reject.get(&spec.kind) {
                return Err(ProviderError::Rejected(reason.clone()));
            }

            let fail_on_settle = self.options.fail_on_settle.contains(&spec.kind);
            let settled = if fail_on_settle {
                ResourceStatus::Failed
            } else {
                ResourceStatus::Available
            };
            let (status, polls_remaining) = self.in_flight(ResourceStatus::Creating, settled);

            let resource = SandboxResource {
                id: Self::mint_id(spec.kind),
                kind: spec.kind,
                identity: spec.identity.clone(),
                attributes: spec.desired.clone(),
                status,
                created_at: jiff::Timestamp::now(),
                polls_remaining,
                fail_on_settle,
            };
            let created = Created {
                id: resource.id.clone(),
                status: resource.status,
            };

            let mut state = self.state.lock().await;
            let mut next = state.clone();
            next.resources.push(resource);
            self.commit(&mut state, next)?;

            tracing::info!(kind = %spec.kind, identity = %spec.identity, id = %created.id, "sandbox resource created");
            Ok(created)
        })
    }

    fn apply<'a>(
        &'a self,
        id: &'a str,
        delta: &'a Attributes,
    ) -> BoxFuture<'a, Result<ApplyReceipt, ProviderError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            let resource = next
                .get_mut(id)
                .ok_or_else(|| ProviderError::Rejected(format!("resource {id} does not exist")))?;
            if resource.status == ResourceStatus::Creating {
                return Err(ProviderError::Rejected(format!(
                    "resource {id} is still being created"
                )));
            }

            let settled = if resource.fail_on_settle {
                ResourceStatus::Failed
            } else {
                ResourceStatus::Available
            };
            let (status, polls_remaining) = self.in_flight(ResourceStatus::Updating, settled);
            resource
                .attributes
                .extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
            resource.status = status;
            resource.polls_remaining = polls_remaining;
            self.commit(&mut state, next)?;

            tracing::info!(id, fields = delta.len(), "sandbox resource modified");
            Ok(ApplyReceipt::atomic(status))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            next.resources.retain(|r| r.id != id);
            if next.resources.len() == state.resources.len() {
                return Err(ProviderError::Rejected(format!("resource {id} does not exist")));
            }
            self.commit(&mut state, next)?;

            tracing::info!(id, "sandbox resource deleted");
            Ok(())
        })
    }
}
