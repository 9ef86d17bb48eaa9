//! BDD step definitions for the snapshot lifecycle.

use rstest_bdd_macros::{given, then, when};
use snapwarden::policy::parse_timestamp;
use snapwarden::test_support::ProviderCall;
use snapwarden::{AttachmentState, InstanceRecord, RunSummary, SnapshotStatus, TagNames};

use super::test_helpers::{LifecycleContext, run_with_captured_logs};
use crate::fixtures::{managed_snapshot, now};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn summary(lifecycle_context: &LifecycleContext) -> Result<RunSummary, StepError> {
    lifecycle_context
        .summary
        .borrow()
        .clone()
        .ok_or_else(|| StepError::Assertion(String::from("missing run summary")))
}

fn check(condition: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if condition {
        Ok(())
    } else {
        Err(StepError::Assertion(message()))
    }
}

#[given("a running instance \"{instance_id}\" named \"{name}\" with attached volume \"{volume_id}\"")]
fn named_instance(
    mut lifecycle_context: LifecycleContext,
    instance_id: String,
    name: String,
    volume_id: String,
) -> LifecycleContext {
    lifecycle_context.provider = lifecycle_context.provider.with_instance(
        InstanceRecord::new(instance_id)
            .with_tag("Name", name)
            .with_volume(volume_id, AttachmentState::Attached),
    );
    lifecycle_context
}

#[given(
    "a running instance \"{instance_id}\" in auto-scaling group \"{group}\" with attached volume \"{volume_id}\""
)]
fn autoscaling_instance(
    mut lifecycle_context: LifecycleContext,
    instance_id: String,
    group: String,
    volume_id: String,
) -> LifecycleContext {
    lifecycle_context.provider = lifecycle_context.provider.with_instance(
        InstanceRecord::new(instance_id)
            .with_tag("aws:autoscaling:groupName", group)
            .with_volume(volume_id, AttachmentState::Attached),
    );
    lifecycle_context
}

#[given("a managed snapshot \"{snapshot_id}\" expiring at \"{expiration}\"")]
fn expiring_snapshot(
    mut lifecycle_context: LifecycleContext,
    snapshot_id: String,
    expiration: String,
) -> LifecycleContext {
    lifecycle_context.provider = lifecycle_context
        .provider
        .with_snapshot(managed_snapshot(&snapshot_id, &expiration));
    lifecycle_context
}

#[given("a managed snapshot \"{snapshot_id}\" with a blank expiration")]
fn blank_expiration_snapshot(
    mut lifecycle_context: LifecycleContext,
    snapshot_id: String,
) -> LifecycleContext {
    lifecycle_context.provider = lifecycle_context
        .provider
        .with_snapshot(managed_snapshot(&snapshot_id, ""));
    lifecycle_context
}

#[given("dry-run mode is enabled")]
fn dry_run_enabled(lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context.settings.borrow_mut().dry_run = true;
    lifecycle_context
}

#[when("the snapshot run completes")]
fn run_completes(lifecycle_context: LifecycleContext) -> LifecycleContext {
    run_with_captured_logs(&lifecycle_context);
    lifecycle_context
}

#[then("the run summary shows \"{created:u32}\" created and \"{deleted:u32}\" deleted")]
fn summary_counts(
    lifecycle_context: &LifecycleContext,
    created: u32,
    deleted: u32,
) -> Result<(), StepError> {
    let summary = summary(lifecycle_context)?;
    check(
        summary.snapshots_created == created as usize
            && summary.snapshots_deleted == deleted as usize,
        || format!("expected {created} created and {deleted} deleted, got {summary:?}"),
    )
}

#[then("\"{count:u32}\" instance is excluded")]
fn instances_excluded(lifecycle_context: &LifecycleContext, count: u32) -> Result<(), StepError> {
    let summary = summary(lifecycle_context)?;
    check(summary.instances_excluded == count as usize, || {
        format!("expected {count} excluded instances, got {summary:?}")
    })
}

#[then("\"{count:u32}\" invalid expiration is reported")]
fn invalid_expirations(
    lifecycle_context: &LifecycleContext,
    count: u32,
) -> Result<(), StepError> {
    let summary = summary(lifecycle_context)?;
    check(summary.invalid_expirations == count as usize, || {
        format!("expected {count} invalid expirations, got {summary:?}")
    })
}

#[then("a snapshot of \"{volume_id}\" is requested with description \"{description}\"")]
fn snapshot_requested(
    lifecycle_context: &LifecycleContext,
    volume_id: String,
    description: String,
) -> Result<(), StepError> {
    let expected = ProviderCall::CreateSnapshot {
        volume_id,
        description,
    };
    let calls = lifecycle_context.provider.calls();
    check(calls.contains(&expected), || {
        format!("expected {expected:?} among {calls:?}")
    })
}

#[then("every new snapshot expires \"{days:u32}\" days after it completed")]
fn new_snapshots_expire_after(
    lifecycle_context: &LifecycleContext,
    days: u32,
) -> Result<(), StepError> {
    let names = TagNames::default();
    let created: Vec<_> = lifecycle_context
        .provider
        .snapshots()
        .into_iter()
        .filter(|snapshot| snapshot.status == SnapshotStatus::Pending)
        .collect();
    check(!created.is_empty(), || String::from("no snapshot was created"))?;

    for snapshot in created {
        let read = |key: &str| {
            snapshot
                .tags
                .get(key)
                .and_then(|value| parse_timestamp(value).ok())
                .ok_or_else(|| {
                    StepError::Assertion(format!("{} lacks a valid {key} tag", snapshot.snapshot_id))
                })
        };
        let completed = read(&names.completed)?;
        let expires = read(&names.expiration)?;
        check(completed == now(), || {
            format!("{} completed at {completed}", snapshot.snapshot_id)
        })?;
        check((expires - completed).num_seconds() == i64::from(days) * 86_400, || {
            format!("{} expires at {expires}", snapshot.snapshot_id)
        })?;
    }
    Ok(())
}

#[then("every new snapshot is marked for deletion after expiration")]
fn new_snapshots_marked(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let names = TagNames::default();
    for snapshot in lifecycle_context
        .provider
        .snapshots()
        .into_iter()
        .filter(|snapshot| snapshot.status == SnapshotStatus::Pending)
    {
        let marker = snapshot.tags.get(&names.delete_after_expiration);
        check(marker.map(String::as_str) == Some("true"), || {
            format!("{} has marker {marker:?}", snapshot.snapshot_id)
        })?;
    }
    Ok(())
}

#[then("no mutating provider calls are made")]
fn no_mutating_calls(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let calls = lifecycle_context.provider.mutating_calls();
    check(calls.is_empty(), || format!("unexpected mutating calls: {calls:?}"))
}

#[then("snapshot \"{snapshot_id}\" is deleted")]
fn snapshot_deleted(
    lifecycle_context: &LifecycleContext,
    snapshot_id: String,
) -> Result<(), StepError> {
    let deleted = lifecycle_context.provider.deleted_ids();
    check(deleted.contains(&snapshot_id), || {
        format!("expected {snapshot_id} among deleted {deleted:?}")
    })
}

#[then("no snapshot is deleted")]
fn nothing_deleted(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let deleted = lifecycle_context.provider.deleted_ids();
    check(deleted.is_empty(), || format!("unexpected deletions: {deleted:?}"))
}

#[then("a warning names snapshot \"{snapshot_id}\"")]
fn warning_names_snapshot(
    lifecycle_context: &LifecycleContext,
    snapshot_id: String,
) -> Result<(), StepError> {
    let logs = lifecycle_context.logs.contents();
    let warned = logs.lines().any(|line| {
        line.contains("WARN")
            && line.contains(&snapshot_id)
            && line.contains("valid expiration date")
    });
    check(warned, || format!("no warning for {snapshot_id} in:\n{logs}"))
}

#[then("a dry-run notice mentions \"{snapshot_id}\"")]
fn dry_run_notice(
    lifecycle_context: &LifecycleContext,
    snapshot_id: String,
) -> Result<(), StepError> {
    let logs = lifecycle_context.logs.contents();
    let noticed = logs
        .lines()
        .any(|line| line.contains("DRY RUN:") && line.contains(&snapshot_id));
    check(noticed, || format!("no dry-run notice for {snapshot_id} in:\n{logs}"))
}
