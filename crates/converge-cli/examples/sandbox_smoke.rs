//! Smoke test for a full reconcile cycle against a throwaway sandbox.
//!
//! Creates a NAT gateway that takes a few polls to settle, re-runs to show
//! the second pass is a no-op, then tears everything down.
//!
//! Usage:
//!   CONVERGE_SETTLE_POLLS=3 \
//!   cargo run -p converge-cli --example sandbox_smoke

use std::time::Duration;

use converge_core::{Attributes, Manifest, ResourceKind, ResourceSpec};
use converge_reconciler::{
    apply_all, teardown, ApplyOptions, ReconcileContext, Reconciler, WaitPolicy,
};
use converge_sandbox::{SandboxOptions, SandboxProvider};
use serde_json::json;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settle_polls = std::env::var("CONVERGE_SETTLE_POLLS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);

    let dir = tempfile::tempdir()?;
    let provider = SandboxProvider::open(
        dir.path().join("sandbox.json"),
        SandboxOptions {
            settle_polls,
            ..SandboxOptions::default()
        },
    )?;
    let reconciler = Reconciler::new(provider)
        .with_wait_policy(WaitPolicy::new(Duration::from_millis(200), 20));

    let attrs = |value: serde_json::Value| -> Attributes {
        match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => Attributes::new(),
        }
    };
    let manifest = Manifest::new(vec![
        ResourceSpec::new(ResourceKind::Vpc, "smoke", attrs(json!({"cidr_block": "10.9.0.0/16"})))?,
        ResourceSpec::new(
            ResourceKind::NatGateway,
            "smoke-egress",
            attrs(json!({"subnet_id": "subnet-1", "connectivity_type": "public"})),
        )?,
    ])?;

    let ctx = ReconcileContext::new();
    let options = ApplyOptions::default();

    println!("First apply...");
    let first = apply_all(&reconciler, &manifest, &ctx, &options).await;
    for entry in &first.entries {
        println!("  {}: {:?}", entry.resource, entry.outcome);
    }

    println!("Second apply (expect unchanged)...");
    let second = apply_all(&reconciler, &manifest, &ctx, &options).await;
    for entry in &second.entries {
        println!("  {}: {:?}", entry.resource, entry.outcome);
    }
    if second.unchanged() != manifest.len() {
        eyre::bail!("second apply was not a no-op");
    }

    println!("Teardown...");
    for entry in teardown(&reconciler, &manifest, &ctx).await {
        println!("  {}: {:?}", entry.resource, entry.outcome);
    }

    Ok(())
}
