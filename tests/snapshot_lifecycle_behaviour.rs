//! Behavioural scenarios for a full snapshot-then-prune run against an
//! in-memory provider.

#[path = "common/fixtures.rs"]
mod fixtures;

mod snapshot_lifecycle;
