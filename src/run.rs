//! Runs the creation phase and then the pruning phase against one provider.
//!
//! The phases share the provider handle and the immutable [`RunSettings`] but
//! nothing else. If one phase cannot even list its inputs, that phase is
//! reported as failed and the other still runs.

use std::fmt;

use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::config::RunSettings;
use crate::provider::SnapshotProvider;
use crate::prune::prune_snapshots;
use crate::snapshot::create_snapshots;

/// Totals for one invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// Whether mutating calls were suppressed.
    pub dry_run: bool,
    /// Snapshots created (or, in dry-run mode, that would have been).
    pub snapshots_created: usize,
    /// Volumes whose snapshot failed.
    pub snapshot_failures: usize,
    /// Instances skipped by an exclusion rule.
    pub instances_excluded: usize,
    /// Volumes skipped because they were not attached.
    pub volumes_skipped: usize,
    /// Snapshots deleted (or, in dry-run mode, that would have been).
    pub snapshots_deleted: usize,
    /// Expired snapshots whose deletion failed.
    pub deletion_failures: usize,
    /// Snapshots skipped because their expiration tag did not parse.
    pub invalid_expirations: usize,
    /// Phases that could not list their inputs.
    pub phase_failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            f.write_str("dry run ")?;
        }
        write!(
            f,
            "complete: snapshots_created={}, snapshot_failures={}, instances_excluded={}, \
             volumes_skipped={}, snapshots_deleted={}, deletion_failures={}, \
             invalid_expirations={}, phase_failures={}",
            self.snapshots_created,
            self.snapshot_failures,
            self.instances_excluded,
            self.volumes_skipped,
            self.snapshots_deleted,
            self.deletion_failures,
            self.invalid_expirations,
            self.phase_failures
        )
    }
}

/// Drives a full snapshot-then-prune pass.
#[derive(Clone, Debug)]
pub struct SnapshotManager<P, C = SystemClock> {
    provider: P,
    settings: RunSettings,
    clock: C,
}

impl<P: SnapshotProvider> SnapshotManager<P> {
    /// Creates a manager using the system clock.
    #[must_use]
    pub const fn new(provider: P, settings: RunSettings) -> Self {
        Self::with_clock(provider, settings, SystemClock)
    }
}

impl<P: SnapshotProvider, C: Clock> SnapshotManager<P, C> {
    /// Creates a manager with an explicit clock.
    #[must_use]
    pub const fn with_clock(provider: P, settings: RunSettings, clock: C) -> Self {
        Self {
            provider,
            settings,
            clock,
        }
    }

    /// Returns the provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the run settings.
    #[must_use]
    pub const fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs both phases in order and returns the combined totals.
    ///
    /// This never fails: listing failures are counted in
    /// [`RunSummary::phase_failures`] and per-item failures in their own
    /// counters.
    pub fn run(&self) -> RunSummary {
        let mut summary = RunSummary {
            dry_run: self.settings.dry_run,
            ..RunSummary::default()
        };
        info!(
            retention_days = self.settings.retention.retention_days,
            dry_run = self.settings.dry_run,
            "starting snapshot run"
        );

        match create_snapshots(&self.provider, &self.settings, &self.clock) {
            Ok(report) => {
                summary.snapshots_created = report.created.len() + report.planned;
                summary.snapshot_failures = report.failures;
                summary.instances_excluded = report.instances_excluded;
                summary.volumes_skipped = report.volumes_skipped;
            }
            Err(err) => {
                error!("snapshot phase aborted, could not list instances: {err}");
                summary.phase_failures += 1;
            }
        }

        match prune_snapshots(&self.provider, &self.settings, &self.clock) {
            Ok(report) => {
                summary.snapshots_deleted = report.deleted.len() + report.planned;
                summary.deletion_failures = report.deletion_failures;
                summary.invalid_expirations = report.invalid_expirations;
            }
            Err(err) => {
                error!("prune phase aborted, could not list snapshots: {err}");
                summary.phase_failures += 1;
            }
        }

        summary
    }
}
