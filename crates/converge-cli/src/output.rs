use std::fmt::Write as _;

use converge_reconciler::{ApplyReport, EntryOutcome, PlanReport, TeardownEntry, TeardownOutcome};
use converge_sandbox::SandboxResource;
use serde::Serialize;

use crate::cli::OutputFormat;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> eyre::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_plan(reports: &[PlanReport], format: OutputFormat) -> eyre::Result<String> {
    if format == OutputFormat::Json {
        return to_json(reports);
    }

    let mut out = String::new();
    for report in reports {
        let target = format!("{}.{}", report.kind, report.identity);
        match (&report.observed_id, report.observed_status) {
            (Some(id), Some(status)) => {
                writeln!(out, "{:<8} {target} ({id}, {status})", report.plan.label())?;
            }
            _ => writeln!(out, "{:<8} {target}", report.plan.label())?,
        }
        if report.matches > 1 {
            writeln!(out, "         {} resources share this identity", report.matches)?;
        }
        for drift in &report.drift {
            let actual = drift
                .actual
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "(unset)".to_string());
            writeln!(out, "         {}: {actual} -> {}", drift.field, drift.expected)?;
        }
    }

    let changes = reports.iter().filter(|r| r.plan.has_changes()).count();
    writeln!(out, "{changes} of {} resources need changes", reports.len())?;
    Ok(out)
}

pub fn render_apply(report: &ApplyReport, format: OutputFormat) -> eyre::Result<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let mut out = String::new();
    for entry in &report.entries {
        match &entry.outcome {
            EntryOutcome::Reconciled(result) => writeln!(out, "{}: {result}", entry.resource)?,
            EntryOutcome::Skipped => writeln!(out, "{}: skipped", entry.resource)?,
        }
    }
    writeln!(
        out,
        "{} created, {} updated, {} unchanged, {} failed, {} skipped",
        report.created(),
        report.updated(),
        report.unchanged(),
        report.failed(),
        report.skipped()
    )?;
    Ok(out)
}

pub fn render_teardown(entries: &[TeardownEntry], format: OutputFormat) -> eyre::Result<String> {
    if format == OutputFormat::Json {
        return to_json(entries);
    }

    let mut out = String::new();
    for entry in entries {
        let line = match &entry.outcome {
            TeardownOutcome::Deleted(id) => format!("deleted {id}"),
            TeardownOutcome::Absent => "absent".to_string(),
            TeardownOutcome::Failed(failure) => format!("failed ({failure})"),
            TeardownOutcome::Skipped => "skipped".to_string(),
        };
        writeln!(out, "{}: {line}", entry.resource)?;
    }
    Ok(out)
}

pub fn render_status(resources: &[SandboxResource], format: OutputFormat) -> eyre::Result<String> {
    if format == OutputFormat::Json {
        return to_json(resources);
    }

    if resources.is_empty() {
        return Ok("No resources.\n".to_string());
    }

    let mut out = String::new();
    for r in resources {
        writeln!(
            out,
            "{:<24} {:<18} {:<24} {:<10} {}",
            r.id, r.kind, r.identity, r.status, r.created_at
        )?;
    }
    Ok(out)
}
