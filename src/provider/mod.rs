//! Provider abstraction consumed by the snapshot and pruning phases.
//!
//! Everything the policy engine needs from the cloud control plane goes
//! through [`SnapshotProvider`]. The production implementation lives in
//! [`crate::aws`]; tests use [`crate::test_support::RecordingProvider`].

mod types;

pub use types::{
    AttachmentState, InstanceRecord, NAME_TAG, SnapshotFilter, SnapshotRecord, SnapshotStatus,
    TagMap, VolumeAttachment,
};

use crate::config::InstanceSelector;

/// Minimal interface implemented by cloud providers.
///
/// Calls are synchronous and issued one at a time; implementations hold a
/// single client handle for the whole run.
pub trait SnapshotProvider {
    /// Provider specific error type.
    type Error: std::error::Error + 'static;

    /// Lists running instances, restricted to the selector's ids when it has
    /// any.
    ///
    /// # Errors
    ///
    /// Returns the provider error when enumeration fails.
    fn list_running_instances(
        &self,
        selector: &InstanceSelector,
    ) -> Result<Vec<InstanceRecord>, Self::Error>;

    /// Returns the tags set on a volume.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the volume cannot be described.
    fn describe_volume_tags(&self, volume_id: &str) -> Result<TagMap, Self::Error>;

    /// Starts a snapshot of `volume_id`. The returned record may carry an
    /// empty id when the provider accepted the call but produced nothing.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the request is rejected.
    fn create_snapshot(
        &self,
        volume_id: &str,
        description: &str,
    ) -> Result<SnapshotRecord, Self::Error>;

    /// Sets `tags` on every resource in `resource_ids` in one call.
    ///
    /// # Errors
    ///
    /// Returns the provider error when tagging fails.
    fn tag_resources(&self, resource_ids: &[String], tags: &TagMap) -> Result<(), Self::Error>;

    /// Lists snapshots matching all `filters`.
    ///
    /// # Errors
    ///
    /// Returns the provider error when enumeration fails.
    fn list_snapshots_by_filter(
        &self,
        filters: &[SnapshotFilter],
    ) -> Result<Vec<SnapshotRecord>, Self::Error>;

    /// Deletes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the provider error when deletion fails.
    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), Self::Error>;
}
