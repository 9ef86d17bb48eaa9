//! Snapshot creation phase.
//!
//! Lists running instances, plans one snapshot per eligible volume, then for
//! each plan entry creates the snapshot and tags it with its completion time,
//! expiration time, and the delete-after-expiration marker. A failure on one
//! volume is logged and the phase moves on to the next.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::RunSettings;
use crate::policy::{SnapshotRequest, format_timestamp, plan_snapshots, retention_tags};
use crate::provider::{NAME_TAG, SnapshotProvider, TagMap};

/// Outcome of the creation phase.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CreationReport {
    /// Ids of snapshots created and tagged. Empty in dry-run mode.
    pub created: Vec<String>,
    /// Snapshots that would have been created in dry-run mode.
    pub planned: usize,
    /// Volumes whose snapshot could not be created or tagged.
    pub failures: usize,
    /// Instances skipped by an exclusion rule.
    pub instances_excluded: usize,
    /// Volumes skipped because they were not attached.
    pub volumes_skipped: usize,
}

/// Why a single volume's snapshot failed.
#[derive(Debug, Error)]
pub enum CreateError<E>
where
    E: std::error::Error + 'static,
{
    /// The provider rejected the create call.
    #[error("failed to create snapshot of {volume_id}: {source}")]
    Create {
        /// Volume being snapshotted.
        volume_id: String,
        /// Provider error.
        #[source]
        source: E,
    },
    /// The provider accepted the call but returned no snapshot id.
    #[error("snapshot id was empty for volume {volume_id}")]
    MissingSnapshotId {
        /// Volume being snapshotted.
        volume_id: String,
    },
    /// The retention horizon pushes the expiration past the calendar.
    #[error("expiration for snapshot {snapshot_id} is out of range")]
    ExpirationOutOfRange {
        /// Snapshot that could not be tagged.
        snapshot_id: String,
    },
    /// The snapshot exists but could not be tagged.
    #[error("failed to tag snapshot {snapshot_id}: {source}")]
    Tag {
        /// Snapshot that could not be tagged.
        snapshot_id: String,
        /// Provider error.
        #[source]
        source: E,
    },
}

/// Picks the snapshot description: the volume's own `Name` tag when it has a
/// value, otherwise `default`.
#[must_use]
pub fn resolve_description(default: &str, volume_tags: &TagMap) -> String {
    volume_tags
        .get(NAME_TAG)
        .filter(|name| !name.is_empty())
        .map_or_else(|| default.to_owned(), String::clone)
}

/// Runs the creation phase.
///
/// # Errors
///
/// Returns the provider error only when the instance listing itself fails;
/// per-volume failures are logged and counted in the report.
pub fn create_snapshots<P, C>(
    provider: &P,
    settings: &RunSettings,
    clock: &C,
) -> Result<CreationReport, P::Error>
where
    P: SnapshotProvider,
    C: Clock,
{
    let instances = provider.list_running_instances(&settings.selector)?;
    let plan = plan_snapshots(&instances, &settings.rules);
    let mut report = CreationReport {
        instances_excluded: plan.instances_excluded,
        volumes_skipped: plan.volumes_skipped,
        ..CreationReport::default()
    };

    for request in &plan.requests {
        let message = format!(
            "taking snapshot of {} attached to instance id: {} named: {}",
            request.volume_id, request.instance_id, request.description
        );
        if settings.dry_run {
            info!("DRY RUN: would be {message}");
            report.planned += 1;
            continue;
        }
        info!("{message}");

        match create_one(provider, request, settings, clock) {
            Ok(snapshot_id) => report.created.push(snapshot_id),
            Err(err) => {
                error!(volume_id = %request.volume_id, "{err}");
                report.failures += 1;
            }
        }
    }

    Ok(report)
}

fn create_one<P, C>(
    provider: &P,
    request: &SnapshotRequest,
    settings: &RunSettings,
    clock: &C,
) -> Result<String, CreateError<P::Error>>
where
    P: SnapshotProvider,
    C: Clock,
{
    let description = match provider.describe_volume_tags(&request.volume_id) {
        Ok(tags) => resolve_description(&request.description, &tags),
        Err(err) => {
            warn!(
                volume_id = %request.volume_id,
                "could not read volume tags, using instance name: {err}"
            );
            request.description.clone()
        }
    };

    let snapshot = provider
        .create_snapshot(&request.volume_id, &description)
        .map_err(|source| CreateError::Create {
            volume_id: request.volume_id.clone(),
            source,
        })?;
    let snapshot_id = snapshot.snapshot_id.trim().to_owned();
    if snapshot_id.is_empty() {
        return Err(CreateError::MissingSnapshotId {
            volume_id: request.volume_id.clone(),
        });
    }

    let completed = clock.now();
    let expires = settings.retention.expiration_for(completed).ok_or_else(|| {
        CreateError::ExpirationOutOfRange {
            snapshot_id: snapshot_id.clone(),
        }
    })?;
    tag_snapshot(provider, &snapshot_id, completed, expires, settings)?;

    info!(
        %snapshot_id,
        volume_id = %request.volume_id,
        expires = %format_timestamp(expires),
        "snapshot created"
    );
    Ok(snapshot_id)
}

fn tag_snapshot<P: SnapshotProvider>(
    provider: &P,
    snapshot_id: &str,
    completed: DateTime<Utc>,
    expires: DateTime<Utc>,
    settings: &RunSettings,
) -> Result<(), CreateError<P::Error>> {
    let tags = retention_tags(completed, expires, &settings.tags);
    provider
        .tag_resources(&[snapshot_id.to_owned()], &tags)
        .map_err(|source| CreateError::Tag {
            snapshot_id: snapshot_id.to_owned(),
            source,
        })
}
