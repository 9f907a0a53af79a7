//! Scripted provider shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use converge_core::{Attributes, ObservedResource, ResourceKind, ResourceSpec, ResourceStatus};
use converge_reconciler::{ApplyReceipt, BoxFuture, Created, ProviderError, ResourceProvider};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find(ResourceKind, String),
    Create(String),
    Apply(String, Attributes),
    Delete(String),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Call::Find(..))
    }
}

type FindResult = Result<Vec<ObservedResource>, ProviderError>;

#[derive(Default)]
struct Script {
    finds: VecDeque<FindResult>,
    /// Returned once `finds` runs dry.
    find_forever: Option<FindResult>,
    create: Option<Result<Created, ProviderError>>,
    apply: Option<Result<ApplyReceipt, ProviderError>>,
    delete: Option<Result<(), ProviderError>>,
    calls: Vec<Call>,
}

/// Provider whose answers are queued up front and whose calls are recorded.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<Script>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_find(self, result: FindResult) -> Self {
        self.script.lock().unwrap().finds.push_back(result);
        self
    }

    pub fn then_found(self, resources: Vec<ObservedResource>) -> Self {
        self.then_find(Ok(resources))
    }

    pub fn then_not_found(self) -> Self {
        self.then_find(Ok(vec![]))
    }

    pub fn find_forever(self, result: FindResult) -> Self {
        self.script.lock().unwrap().find_forever = Some(result);
        self
    }

    pub fn on_create(self, result: Result<Created, ProviderError>) -> Self {
        self.script.lock().unwrap().create = Some(result);
        self
    }

    pub fn on_apply(self, result: Result<ApplyReceipt, ProviderError>) -> Self {
        self.script.lock().unwrap().apply = Some(result);
        self
    }

    pub fn on_delete(self, result: Result<(), ProviderError>) -> Self {
        self.script.lock().unwrap().delete = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn find_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Find(..)))
            .count()
    }

    pub fn mutating_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutating()).count()
    }
}

impl ResourceProvider for ScriptedProvider {
    fn find<'a>(
        &'a self,
        kind: ResourceKind,
        identity: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObservedResource>, ProviderError>> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Find(kind, identity.to_string()));
            match script.finds.pop_front() {
                Some(result) => result,
                None => script
                    .find_forever
                    .clone()
                    .unwrap_or_else(|| panic!("unscripted find for {identity}")),
            }
        })
    }

    fn create<'a>(&'a self, spec: &'a ResourceSpec) -> BoxFuture<'a, Result<Created, ProviderError>> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Create(spec.identity.clone()));
            script.create.clone().expect("unscripted create")
        })
    }

    fn apply<'a>(
        &'a self,
        id: &'a str,
        delta: &'a Attributes,
    ) -> BoxFuture<'a, Result<ApplyReceipt, ProviderError>> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Apply(id.to_string(), delta.clone()));
            script.apply.clone().expect("unscripted apply")
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Delete(id.to_string()));
            script.delete.clone().expect("unscripted delete")
        })
    }
}

pub fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn resource(id: &str, status: ResourceStatus, attributes: Value) -> ObservedResource {
    ObservedResource {
        id: id.to_string(),
        attributes: attrs(attributes),
        status,
        created_at: None,
    }
}

pub fn spec(kind: ResourceKind, identity: &str, desired: Value) -> ResourceSpec {
    ResourceSpec::new(kind, identity, attrs(desired)).expect("valid spec")
}

#[derive(Default)]
struct Store {
    resources: Vec<(ResourceKind, String, ObservedResource)>,
    reject_create: Vec<String>,
    order: Vec<Call>,
    next_id: u32,
    in_flight: usize,
    max_in_flight: usize,
}

/// Provider backed by an in-memory list. Creates settle immediately.
#[derive(Default)]
pub struct MemoryProvider {
    store: Mutex<Store>,
    latency: std::time::Duration,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each create sleeps this long, so concurrent runs overlap.
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn reject_create(self, identity: &str) -> Self {
        self.store.lock().unwrap().reject_create.push(identity.to_string());
        self
    }

    pub fn seed(self, kind: ResourceKind, identity: &str, resource: ObservedResource) -> Self {
        self.store
            .lock()
            .unwrap()
            .resources
            .push((kind, identity.to_string(), resource));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.store.lock().unwrap().order.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.store.lock().unwrap().max_in_flight
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().resources.len()
    }
}

impl ResourceProvider for MemoryProvider {
    fn find<'a>(
        &'a self,
        kind: ResourceKind,
        identity: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObservedResource>, ProviderError>> {
        Box::pin(async move {
            let mut store = self.store.lock().unwrap();
            store.order.push(Call::Find(kind, identity.to_string()));
            Ok(store
                .resources
                .iter()
                .filter(|(k, i, _)| *k == kind && i == identity)
                .map(|(_, _, r)| r.clone())
                .collect())
        })
    }

    fn create<'a>(&'a self, spec: &'a ResourceSpec) -> BoxFuture<'a, Result<Created, ProviderError>> {
        Box::pin(async move {
            {
                let mut store = self.store.lock().unwrap();
                store.order.push(Call::Create(spec.identity.clone()));
                store.in_flight += 1;
                store.max_in_flight = store.max_in_flight.max(store.in_flight);
            }
            tokio::time::sleep(self.latency).await;

            let mut store = self.store.lock().unwrap();
            store.in_flight -= 1;
            if store.reject_create.contains(&spec.identity) {
                return Err(ProviderError::Rejected(format!("cannot create {}", spec.identity)));
            }
            store.next_id += 1;
            let id = format!("{}-{}", spec.kind.id_prefix(), store.next_id);
            store.resources.push((
                spec.kind,
                spec.identity.clone(),
                ObservedResource {
                    id: id.clone(),
                    attributes: spec.desired.clone(),
                    status: ResourceStatus::Available,
                    created_at: None,
                },
            ));
            Ok(Created {
                id,
                status: ResourceStatus::Available,
            })
        })
    }

    fn apply<'a>(
        &'a self,
        id: &'a str,
        delta: &'a Attributes,
    ) -> BoxFuture<'a, Result<ApplyReceipt, ProviderError>> {
        Box::pin(async move {
            let mut store = self.store.lock().unwrap();
            store.order.push(Call::Apply(id.to_string(), delta.clone()));
            let (_, _, resource) = store
                .resources
                .iter_mut()
                .find(|(_, _, r)| r.id == id)
                .ok_or_else(|| ProviderError::Rejected(format!("{id} not found")))?;
            resource
                .attributes
                .extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(ApplyReceipt::atomic(ResourceStatus::Available))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let mut store = self.store.lock().unwrap();
            store.order.push(Call::Delete(id.to_string()));
            store.resources.retain(|(_, _, r)| r.id != id);
            Ok(())
        })
    }
}
