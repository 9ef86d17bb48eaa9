//! Command-line interface definitions for the `snapwarden` binary.
//!
//! This module centralises the clap parser structure so both the main binary
//! and the build script can reuse it when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `snapwarden` binary.
#[derive(Debug, Parser)]
#[command(
    name = "snapwarden",
    version,
    about = "Snapshot the EBS volumes of running instances and prune expired snapshots",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Credential profile from the shared AWS configuration files.
    #[arg(long, value_name = "NAME")]
    pub(crate) profile: String,
    /// Region to operate in. Defaults to `default_region` from configuration.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Days to keep new snapshots before they become eligible for pruning.
    #[arg(long, value_name = "DAYS")]
    pub(crate) retention_days: Option<u32>,
    /// Comma-separated instance ids to snapshot. Defaults to every running
    /// instance.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub(crate) instance_ids: Vec<String>,
    /// Report snapshots and deletions without performing them.
    #[arg(long, overrides_with = "no_dry_run")]
    dry_run: bool,
    /// Perform snapshots and deletions (the default).
    #[arg(long, overrides_with = "dry_run")]
    no_dry_run: bool,
}

impl Cli {
    /// Returns the effective dry-run flag; the last of `--dry-run` and
    /// `--no-dry-run` wins.
    pub(crate) const fn dry_run(&self) -> bool {
        self.dry_run && !self.no_dry_run
    }
}
