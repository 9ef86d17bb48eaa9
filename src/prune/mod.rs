//! Expiration-based pruning phase.
//!
//! Lists completed, tool-managed snapshots that carry an expiration tag and
//! deletes those whose expiration lies before the instant captured when the
//! phase started. Unparsable expirations and failed deletions are logged and
//! skipped.

use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::RunSettings;
use crate::policy::{PruneDecision, evaluate_snapshot, format_timestamp, managed_snapshot_filters};
use crate::provider::SnapshotProvider;

/// Outcome of the pruning phase.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PruneReport {
    /// Snapshots returned by the provider filter.
    pub examined: usize,
    /// Ids of deleted snapshots. Empty in dry-run mode.
    pub deleted: Vec<String>,
    /// Expired snapshots that would have been deleted in dry-run mode.
    pub planned: usize,
    /// Snapshots whose expiration is still ahead.
    pub retained: usize,
    /// Snapshots whose expiration tag could not be parsed.
    pub invalid_expirations: usize,
    /// Expired snapshots whose deletion failed.
    pub deletion_failures: usize,
}

/// Runs the pruning phase.
///
/// # Errors
///
/// Returns the provider error only when the snapshot listing itself fails.
pub fn prune_snapshots<P, C>(
    provider: &P,
    settings: &RunSettings,
    clock: &C,
) -> Result<PruneReport, P::Error>
where
    P: SnapshotProvider,
    C: Clock,
{
    let now = clock.now();
    let filters = managed_snapshot_filters(&settings.tags);
    let snapshots = provider.list_snapshots_by_filter(&filters)?;
    let mut report = PruneReport {
        examined: snapshots.len(),
        ..PruneReport::default()
    };

    for snapshot in &snapshots {
        let snapshot_id = snapshot.snapshot_id.as_str();
        let expires_at = match evaluate_snapshot(snapshot, &settings.tags, now) {
            PruneDecision::Expired { expires_at } => expires_at,
            PruneDecision::Retained { .. } | PruneDecision::Unmanaged => {
                report.retained += 1;
                continue;
            }
            PruneDecision::InvalidExpiration(err) => {
                warn!(
                    %snapshot_id,
                    "{err} received for snapshot {snapshot_id}; make sure it contains a valid expiration date"
                );
                report.invalid_expirations += 1;
                continue;
            }
        };

        let message = format!(
            "deleting snapshot {snapshot_id} because it expired on {}",
            format_timestamp(expires_at)
        );
        if settings.dry_run {
            info!("DRY RUN: would be {message}");
            report.planned += 1;
            continue;
        }
        info!("{message}");

        match provider.delete_snapshot(snapshot_id) {
            Ok(()) => report.deleted.push(snapshot_id.to_owned()),
            Err(err) => {
                error!(%snapshot_id, "failed to delete snapshot: {err}");
                report.deletion_failures += 1;
            }
        }
    }

    Ok(report)
}
