use std::path::Path;

use converge_core::Manifest;
use converge_reconciler::{
    apply_all, apply_concurrent, teardown, ApplyOptions, ApplyReport, CancellationToken,
    PlanReport, ReconcileContext, Reconciler, TeardownEntry,
};
use converge_sandbox::{SandboxProvider, SandboxResource};

use crate::cli::{ApplyArgs, DestroyArgs};
use crate::config::ConvergeConfig;

/// Token cancelled on the first Ctrl-C.
///
/// In-flight reconciliations stop at their next provider call or poll and
/// report `cancelled`; nothing is rolled back.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}

fn open_reconciler(config: &ConvergeConfig) -> eyre::Result<Reconciler<SandboxProvider>> {
    let provider = SandboxProvider::open(&config.state_path, config.sandbox.options())?;
    Ok(Reconciler::new(provider).with_wait_policy(config.wait.policy()))
}

fn load_manifest(path: &Path) -> eyre::Result<Manifest> {
    let manifest = Manifest::load(path)?;
    tracing::info!(
        path = %path.display(),
        resources = manifest.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

pub async fn plan(
    config: &ConvergeConfig,
    manifest_path: &Path,
    cancel: CancellationToken,
) -> eyre::Result<Vec<PlanReport>> {
    let manifest = load_manifest(manifest_path)?;
    let reconciler = open_reconciler(config)?;
    let ctx = ReconcileContext::new().with_cancel(cancel);

    let mut reports = Vec::with_capacity(manifest.len());
    for spec in &manifest.resources {
        let report = reconciler
            .plan(spec, &ctx)
            .await
            .map_err(|failure| eyre::eyre!("{}: {failure}", spec.key()))?;
        reports.push(report);
    }
    Ok(reports)
}

pub async fn apply(
    config: &ConvergeConfig,
    args: &ApplyArgs,
    cancel: CancellationToken,
) -> eyre::Result<ApplyReport> {
    let manifest = load_manifest(&args.manifest)?;
    let reconciler = open_reconciler(config)?;

    let mut wait = config.wait.clone();
    if let Some(secs) = args.poll_interval_secs {
        wait.poll_interval_secs = secs;
    }
    if let Some(attempts) = args.max_attempts {
        wait.max_attempts = attempts;
    }
    let ctx = ReconcileContext::new()
        .with_cancel(cancel)
        .with_wait_policy(wait.policy());

    let mut retry = config.retry.policy();
    if let Some(retries) = args.retries {
        retry.max_retries = retries;
    }
    let parallel = args.parallel.unwrap_or(1);
    let options = ApplyOptions {
        fail_fast: !args.keep_going,
        max_parallel: parallel,
        retry,
    };

    tracing::info!(
        resources = manifest.len(),
        parallel,
        fail_fast = options.fail_fast,
        max_retries = retry.max_retries,
        "applying manifest"
    );
    let report = if parallel > 1 {
        apply_concurrent(&reconciler, &manifest, &ctx, &options).await
    } else {
        apply_all(&reconciler, &manifest, &ctx, &options).await
    };
    Ok(report)
}

pub async fn destroy(
    config: &ConvergeConfig,
    args: &DestroyArgs,
    cancel: CancellationToken,
) -> eyre::Result<Vec<TeardownEntry>> {
    if !args.yes {
        eyre::bail!("destroy deletes every resource in the manifest; rerun with --yes");
    }
    let manifest = load_manifest(&args.manifest)?;
    let reconciler = open_reconciler(config)?;
    let ctx = ReconcileContext::new().with_cancel(cancel);

    Ok(teardown(&reconciler, &manifest, &ctx).await)
}

pub async fn status(config: &ConvergeConfig) -> eyre::Result<Vec<SandboxResource>> {
    let provider = SandboxProvider::open(&config.state_path, config.sandbox.options())?;
    Ok(provider.snapshot().await)
}
