//! Core library for the Snapwarden snapshot tool.
//!
//! The crate snapshots the EBS volumes attached to running instances, tags
//! each snapshot with completion and expiration metadata, and prunes
//! tool-managed snapshots whose expiration has passed. The decision logic
//! lives in [`policy`]; cloud access goes through the [`SnapshotProvider`]
//! trait, implemented for the `aws` CLI by [`AwsCliProvider`].

pub mod aws;
pub mod clock;
pub mod config;
pub mod logging;
pub mod policy;
pub mod provider;
pub mod prune;
pub mod run;
pub mod runner;
pub mod snapshot;
pub mod test_support;

pub use aws::{AwsCliProvider, AwsError, AwsSettings, CallerIdentity};
pub use clock::{Clock, SystemClock};
pub use config::{
    ConfigError, InstanceSelector, RetentionPolicy, RunSettings, SnapwardenConfig, TagNames,
};
pub use provider::{
    AttachmentState, InstanceRecord, SnapshotFilter, SnapshotProvider, SnapshotRecord,
    SnapshotStatus, TagMap, VolumeAttachment,
};
pub use prune::{PruneReport, prune_snapshots};
pub use run::{RunSummary, SnapshotManager};
pub use runner::{CommandOutput, CommandRunner, ProcessCommandRunner, RunnerError};
pub use snapshot::{CreateError, CreationReport, create_snapshots, resolve_description};
