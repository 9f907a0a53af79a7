mod common;

use std::time::Duration;

use common::{attrs, resource, spec, Call, ScriptedProvider};
use converge_core::{
    Failure, FailureKind, Plan, ReconciliationResult, ResourceKind, ResourceSpec, ResourceStatus,
};
use converge_reconciler::{ApplyReceipt, Created, ProviderError, ReconcileContext, Reconciler, WaitPolicy};
use serde_json::json;

fn reconciler(provider: ScriptedProvider, max_attempts: u32) -> Reconciler<ScriptedProvider> {
    Reconciler::new(provider).with_wait_policy(WaitPolicy::new(Duration::from_secs(5), max_attempts))
}

#[tokio::test(start_paused = true)]
async fn nat_gateway_is_created_after_three_polls() {
    let pending = || resource("nat-123", ResourceStatus::Creating, json!({"subnetId": "subnet-2"}));
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Ok(Created {
            id: "nat-123".into(),
            status: ResourceStatus::Creating,
        }))
        .then_found(vec![pending()])
        .then_found(vec![pending()])
        .then_found(vec![resource(
            "nat-123",
            ResourceStatus::Available,
            json!({"subnetId": "subnet-2"}),
        )]);
    let reconciler = reconciler(provider, 10);
    let nat = spec(ResourceKind::NatGateway, "subnet-2", json!({"subnetId": "subnet-2"}));

    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Created("nat-123".into()));
    // One observe plus three polls after creation.
    assert_eq!(reconciler.provider().find_calls(), 4);
    assert_eq!(reconciler.provider().mutating_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn matching_resource_is_left_alone() {
    let provider = ScriptedProvider::new().then_found(vec![resource(
        "lt-1",
        ResourceStatus::Available,
        json!({"imageId": "ami-1", "instanceType": "t3.micro", "extra": true}),
    )]);
    let reconciler = reconciler(provider, 10);
    let template = spec(
        ResourceKind::LaunchTemplate,
        "web",
        json!({"imageId": "ami-1", "instanceType": "t3.micro"}),
    );

    let result = reconciler.reconcile(&template, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Unchanged);
    assert_eq!(reconciler.provider().mutating_calls(), 0);
    assert_eq!(reconciler.provider().find_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_run_after_create_is_unchanged() {
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Ok(Created {
            id: "tg-1".into(),
            status: ResourceStatus::Available,
        }))
        .then_found(vec![resource("tg-1", ResourceStatus::Available, json!({"port": 80}))]);
    let reconciler = reconciler(provider, 10);
    let group = spec(ResourceKind::TargetGroup, "web-tg", json!({"port": 80}));
    let ctx = ReconcileContext::new();

    assert_eq!(
        reconciler.reconcile(&group, &ctx).await,
        ReconciliationResult::Created("tg-1".into())
    );
    assert_eq!(reconciler.reconcile(&group, &ctx).await, ReconciliationResult::Unchanged);
    assert_eq!(reconciler.provider().mutating_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn create_that_is_immediately_available_skips_polling() {
    let provider = ScriptedProvider::new().then_not_found().on_create(Ok(Created {
        id: "sg-1".into(),
        status: ResourceStatus::Available,
    }));
    let reconciler = reconciler(provider, 10);
    let group = spec(ResourceKind::SecurityGroup, "web-sg", json!({}));

    let result = reconciler.reconcile(&group, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Created("sg-1".into()));
    assert_eq!(reconciler.provider().find_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn converges_when_available_on_last_allowed_poll() {
    let max_attempts = 5;
    let mut provider = ScriptedProvider::new().then_not_found().on_create(Ok(Created {
        id: "nat-9".into(),
        status: ResourceStatus::Creating,
    }));
    for _ in 0..max_attempts - 1 {
        provider = provider.then_found(vec![resource("nat-9", ResourceStatus::Creating, json!({}))]);
    }
    provider = provider.then_found(vec![resource("nat-9", ResourceStatus::Available, json!({}))]);
    let reconciler = reconciler(provider, max_attempts);
    let nat = spec(ResourceKind::NatGateway, "subnet-9", json!({}));

    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Created("nat-9".into()));
    assert_eq!(reconciler.provider().find_calls(), 1 + max_attempts as usize);
}

#[tokio::test(start_paused = true)]
async fn stuck_resource_times_out_after_max_attempts_polls() {
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Ok(Created {
            id: "nat-1".into(),
            status: ResourceStatus::Creating,
        }))
        .find_forever(Ok(vec![resource("nat-1", ResourceStatus::Creating, json!({}))]));
    let reconciler = reconciler(provider, 4);
    let nat = spec(ResourceKind::NatGateway, "subnet-1", json!({}));

    let started = tokio::time::Instant::now();
    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Failed(Failure::timeout()));
    assert_eq!(reconciler.provider().find_calls(), 1 + 4);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(20), "{waited:?}");
    assert!(waited < Duration::from_secs(25), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn rejected_create_does_not_poll() {
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Err(ProviderError::Rejected("NatGatewayLimitExceeded".into())));
    let reconciler = reconciler(provider, 10);
    let nat = spec(ResourceKind::NatGateway, "subnet-3", json!({}));

    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;

    assert_eq!(
        result,
        ReconciliationResult::Failed(Failure::new(
            FailureKind::ProviderError,
            "NatGatewayLimitExceeded"
        ))
    );
    assert_eq!(reconciler.provider().find_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_status_while_waiting_stops_immediately() {
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Ok(Created {
            id: "nat-5".into(),
            status: ResourceStatus::Creating,
        }))
        .then_found(vec![resource("nat-5", ResourceStatus::Creating, json!({}))])
        .then_found(vec![resource("nat-5", ResourceStatus::Failed, json!({}))]);
    let reconciler = reconciler(provider, 10);
    let nat = spec(ResourceKind::NatGateway, "subnet-5", json!({}));

    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Failed(Failure::provider_reported_failure()));
    assert_eq!(reconciler.provider().find_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn resource_not_yet_visible_keeps_waiting() {
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Ok(Created {
            id: "alb-1".into(),
            status: ResourceStatus::Creating,
        }))
        .then_not_found()
        .then_found(vec![resource("alb-1", ResourceStatus::Available, json!({}))]);
    let reconciler = reconciler(provider, 10);
    let alb = spec(ResourceKind::LoadBalancer, "web-alb", json!({}));

    let result = reconciler.reconcile(&alb, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Created("alb-1".into()));
}

#[tokio::test(start_paused = true)]
async fn update_sends_only_mismatched_keys() {
    let provider = ScriptedProvider::new()
        .then_found(vec![resource(
            "asg-1",
            ResourceStatus::Available,
            json!({"minSize": 1, "maxSize": 9}),
        )])
        .on_apply(Ok(ApplyReceipt::atomic(ResourceStatus::Available)));
    let reconciler = reconciler(provider, 10);
    let group = spec(
        ResourceKind::AutoScalingGroup,
        "web-asg",
        json!({"minSize": 1, "maxSize": 2}),
    );

    let result = reconciler.reconcile(&group, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Updated);
    assert_eq!(
        reconciler.provider().calls()[1],
        Call::Apply("asg-1".into(), attrs(json!({"maxSize": 2})))
    );
}

#[tokio::test(start_paused = true)]
async fn update_waits_for_modifying_resource() {
    let provider = ScriptedProvider::new()
        .then_found(vec![resource("rtb-1", ResourceStatus::Available, json!({"gateway": "igw-1"}))])
        .on_apply(Ok(ApplyReceipt::atomic(ResourceStatus::Updating)))
        .then_found(vec![resource("rtb-1", ResourceStatus::Updating, json!({"gateway": "nat-1"}))])
        .then_found(vec![resource("rtb-1", ResourceStatus::Available, json!({"gateway": "nat-1"}))]);
    let reconciler = reconciler(provider, 10);
    let route = spec(ResourceKind::RouteTable, "private", json!({"gateway": "nat-1"}));

    let result = reconciler.reconcile(&route, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Updated);
    assert_eq!(reconciler.provider().find_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn partial_update_is_reported_as_failure() {
    let provider = ScriptedProvider::new()
        .then_found(vec![resource(
            "asg-2",
            ResourceStatus::Available,
            json!({"minSize": 0, "maxSize": 0}),
        )])
        .on_apply(Ok(ApplyReceipt::partial(
            ResourceStatus::Available,
            ["minSize".to_string()],
        )));
    let reconciler = reconciler(provider, 10);
    let group = spec(
        ResourceKind::AutoScalingGroup,
        "api-asg",
        json!({"minSize": 1, "maxSize": 3}),
    );

    let result = reconciler.reconcile(&group, &ReconcileContext::new()).await;

    let failure = result.failure().expect("partial update must fail");
    assert_eq!(failure.kind, FailureKind::ProviderError);
    assert!(failure.reason.contains("maxSize"), "{}", failure.reason);
    assert!(!failure.reason.contains("minSize"), "{}", failure.reason);
}

#[tokio::test(start_paused = true)]
async fn unreachable_provider_fails_without_mutation() {
    let provider = ScriptedProvider::new()
        .then_find(Err(ProviderError::Unavailable("connection refused".into())));
    let reconciler = reconciler(provider, 10);
    let vpc = spec(ResourceKind::Vpc, "main", json!({"cidr": "10.0.0.0/16"}));

    let result = reconciler.reconcile(&vpc, &ReconcileContext::new()).await;

    assert_eq!(result.failure_kind(), Some(FailureKind::ProviderUnavailable));
    assert_eq!(reconciler.provider().mutating_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_spec_never_reaches_provider() {
    let reconciler = reconciler(ScriptedProvider::new(), 10);
    let bad = ResourceSpec {
        kind: ResourceKind::Subnet,
        identity: "   ".into(),
        desired: Default::default(),
    };

    let result = reconciler.reconcile(&bad, &ReconcileContext::new()).await;

    assert_eq!(result.failure_kind(), Some(FailureKind::InvalidSpec));
    assert!(reconciler.provider().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_sync_pending_resource_is_unchanged_without_polling() {
    let provider = ScriptedProvider::new().then_found(vec![resource(
        "nat-7",
        ResourceStatus::Creating,
        json!({"subnetId": "s-7"}),
    )]);
    let reconciler = reconciler(provider, 10);
    let nat = spec(ResourceKind::NatGateway, "s-7", json!({"subnetId": "s-7"}));

    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;

    assert_eq!(result, ReconciliationResult::Unchanged);
    assert_eq!(reconciler.provider().calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn in_sync_failed_resource_is_unchanged_and_status_shows_in_plan() {
    let failed = resource("nat-8", ResourceStatus::Failed, json!({"subnetId": "s-8"}));
    let provider = ScriptedProvider::new()
        .then_found(vec![failed.clone()])
        .then_found(vec![failed]);
    let reconciler = reconciler(provider, 10);
    let nat = spec(ResourceKind::NatGateway, "s-8", json!({"subnetId": "s-8"}));

    let result = reconciler.reconcile(&nat, &ReconcileContext::new()).await;
    assert_eq!(result, ReconciliationResult::Unchanged);
    assert_eq!(reconciler.provider().calls().len(), 1);

    let report = reconciler
        .plan(&nat, &ReconcileContext::new())
        .await
        .unwrap();
    assert_eq!(report.plan, Plan::NoOp);
    assert_eq!(report.observed_status, Some(ResourceStatus::Failed));
}

#[tokio::test(start_paused = true)]
async fn context_wait_policy_overrides_default() {
    let provider = ScriptedProvider::new()
        .then_not_found()
        .on_create(Ok(Created {
            id: "nat-2".into(),
            status: ResourceStatus::Creating,
        }))
        .find_forever(Ok(vec![resource("nat-2", ResourceStatus::Creating, json!({}))]));
    let reconciler = reconciler(provider, 50);
    let nat = spec(ResourceKind::NatGateway, "subnet-2", json!({}));
    let ctx = ReconcileContext::new().with_wait_policy(WaitPolicy::new(Duration::from_secs(1), 2));

    let result = reconciler.reconcile(&nat, &ctx).await;

    assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
    assert_eq!(reconciler.provider().find_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn plan_reports_drift_without_mutation() {
    let provider = ScriptedProvider::new().then_found(vec![resource(
        "asg-3",
        ResourceStatus::Available,
        json!({"minSize": 1, "maxSize": 9}),
    )]);
    let reconciler = reconciler(provider, 10);
    let group = spec(
        ResourceKind::AutoScalingGroup,
        "web-asg",
        json!({"minSize": 1, "maxSize": 2}),
    );

    let report = reconciler
        .plan(&group, &ReconcileContext::new())
        .await
        .expect("plan should succeed");

    assert_eq!(report.observed_id.as_deref(), Some("asg-3"));
    assert_eq!(report.drift.len(), 1);
    assert_eq!(report.drift[0].field, "maxSize");
    assert_eq!(report.drift[0].actual, Some(json!(9)));
    assert_eq!(reconciler.provider().mutating_calls(), 0);
}
