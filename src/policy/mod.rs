//! Retention and selection policy: which volumes to snapshot, how expiration
//! is encoded, and which snapshots are due for deletion.

mod eligibility;
mod expiration;

pub use eligibility::{
    EligibilityRules, ExclusionReason, InstanceVerdict, NameSource, SnapshotPlan,
    SnapshotRequest, evaluate_instance, plan_snapshots, volume_is_eligible,
};
pub use expiration::{
    MANAGED_MARKER_VALUE, PruneDecision, TIMESTAMP_FORMAT, TRUTHY_VALUES, TimestampError,
    evaluate_snapshot, format_timestamp, is_truthy, managed_snapshot_filters, parse_timestamp,
    retention_tags,
};
