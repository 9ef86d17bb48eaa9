//! BDD scenarios for the snapshot lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Snapshot the attached volume of a named instance"
)]
fn scenario_named_instance_is_snapshotted(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Skip instances that belong to an auto-scaling group"
)]
fn scenario_autoscaling_member_is_skipped(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Delete a snapshot that expired yesterday"
)]
fn scenario_expired_snapshot_is_deleted(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Report a snapshot that expired yesterday in dry-run mode"
)]
fn scenario_expired_snapshot_is_reported_in_dry_run(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Keep a snapshot that expires tomorrow"
)]
fn scenario_unexpired_snapshot_is_kept(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Skip an unparsable expiration and keep pruning"
)]
fn scenario_unparsable_expiration_is_skipped(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Dry run issues no mutating calls in either phase"
)]
fn scenario_dry_run_issues_no_mutating_calls(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}
