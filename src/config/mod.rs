//! Configuration loading via `ortho-config`, plus the immutable run settings
//! handed to each phase.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::aws::{AwsSettings, DEFAULT_AWS_BIN};
use crate::policy::EligibilityRules;

/// Region used when neither the CLI nor configuration names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Retention horizon used when neither the CLI nor configuration sets one.
pub const DEFAULT_RETENTION_DAYS: u32 = 3;

/// Seconds in one retention day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Tool settings merged from defaults, `snapwarden.toml`, and `SNAPWARDEN_*`
/// environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SNAPWARDEN",
    discovery(
        app_name = "snapwarden",
        env_var = "SNAPWARDEN_CONFIG_PATH",
        config_file_name = "snapwarden.toml",
        dotfile_name = ".snapwarden.toml",
        project_file_name = "snapwarden.toml"
    )
)]
pub struct SnapwardenConfig {
    /// Path to the `aws` executable.
    #[ortho_config(default = DEFAULT_AWS_BIN.to_owned())]
    pub aws_bin: String,
    /// Region used when `--region` is not given.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub default_region: String,
    /// Retention horizon used when `--retention-days` is not given.
    #[ortho_config(default = DEFAULT_RETENTION_DAYS)]
    pub default_retention_days: u32,
    /// Substring of the `Name` tag marking build/CI instances that are never
    /// snapshotted. An empty value disables the rule.
    #[ortho_config(default = "bamboo".to_owned())]
    pub build_fleet_marker: String,
    /// Tag key whose presence marks an instance as managed by an auto-scaling
    /// group.
    #[ortho_config(default = "aws:autoscaling:groupName".to_owned())]
    pub autoscaling_tag_key: String,
    /// Tag recording when the snapshot was taken.
    #[ortho_config(default = "ff:snapshot:complete".to_owned())]
    pub completed_tag: String,
    /// Tag recording when the snapshot may be pruned.
    #[ortho_config(default = "ff:snapshot:expiration".to_owned())]
    pub expiration_tag: String,
    /// Tag opting a snapshot into automated pruning.
    #[ortho_config(default = "ff:snapshot:delete_after_expiration".to_owned())]
    pub delete_after_expiration_tag: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl SnapwardenConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to snapwarden.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("snapwarden")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.aws_bin,
            &FieldMetadata::new("AWS CLI binary", "SNAPWARDEN_AWS_BIN", "aws_bin"),
        )?;
        Self::require_field(
            &self.default_region,
            &FieldMetadata::new(
                "default region",
                "SNAPWARDEN_DEFAULT_REGION",
                "default_region",
            ),
        )?;
        Self::require_field(
            &self.autoscaling_tag_key,
            &FieldMetadata::new(
                "auto-scaling tag key",
                "SNAPWARDEN_AUTOSCALING_TAG_KEY",
                "autoscaling_tag_key",
            ),
        )?;
        Self::require_field(
            &self.completed_tag,
            &FieldMetadata::new(
                "completion tag name",
                "SNAPWARDEN_COMPLETED_TAG",
                "completed_tag",
            ),
        )?;
        Self::require_field(
            &self.expiration_tag,
            &FieldMetadata::new(
                "expiration tag name",
                "SNAPWARDEN_EXPIRATION_TAG",
                "expiration_tag",
            ),
        )?;
        Self::require_field(
            &self.delete_after_expiration_tag,
            &FieldMetadata::new(
                "delete-after-expiration tag name",
                "SNAPWARDEN_DELETE_AFTER_EXPIRATION_TAG",
                "delete_after_expiration_tag",
            ),
        )?;
        Ok(())
    }

    /// Resolves provider connection settings, preferring an explicit region.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn aws_settings(
        &self,
        profile: &str,
        region: Option<&str>,
    ) -> Result<AwsSettings, ConfigError> {
        self.validate()?;
        let chosen_region = region
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.default_region.as_str());
        Ok(AwsSettings::new(&self.aws_bin, profile, chosen_region))
    }

    /// Builds the settings shared by both phases of a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn run_settings(
        &self,
        retention_days: Option<u32>,
        instance_ids: &[String],
        dry_run: bool,
    ) -> Result<RunSettings, ConfigError> {
        self.validate()?;
        Ok(RunSettings {
            retention: RetentionPolicy::new(retention_days.unwrap_or(self.default_retention_days)),
            selector: InstanceSelector::from_ids(instance_ids),
            dry_run,
            tags: TagNames {
                completed: self.completed_tag.trim().to_owned(),
                expiration: self.expiration_tag.trim().to_owned(),
                delete_after_expiration: self.delete_after_expiration_tag.trim().to_owned(),
            },
            rules: EligibilityRules {
                autoscaling_tag_key: self.autoscaling_tag_key.trim().to_owned(),
                build_fleet_marker: self.build_fleet_marker.trim().to_owned(),
            },
        })
    }

    /// Returns the built-in defaults without consulting files or the
    /// environment.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            aws_bin: String::from(DEFAULT_AWS_BIN),
            default_region: String::from(DEFAULT_REGION),
            default_retention_days: DEFAULT_RETENTION_DAYS,
            build_fleet_marker: String::from("bamboo"),
            autoscaling_tag_key: String::from("aws:autoscaling:groupName"),
            completed_tag: String::from("ff:snapshot:complete"),
            expiration_tag: String::from("ff:snapshot:expiration"),
            delete_after_expiration_tag: String::from("ff:snapshot:delete_after_expiration"),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

/// How long created snapshots are kept.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetentionPolicy {
    /// Days between snapshot creation and expiration.
    pub retention_days: u32,
}

impl RetentionPolicy {
    /// Creates a policy keeping snapshots for `retention_days` days.
    #[must_use]
    pub const fn new(retention_days: u32) -> Self {
        Self { retention_days }
    }

    /// Returns `created + retention_days * 86400s`, or `None` when the result
    /// falls outside the representable calendar.
    #[must_use]
    pub fn expiration_for(&self, created: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let seconds = i64::from(self.retention_days).checked_mul(SECONDS_PER_DAY)?;
        created.checked_add_signed(TimeDelta::try_seconds(seconds)?)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

/// Which running instances are considered for snapshotting.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceSelector {
    /// Explicit instance ids. Empty means every running instance.
    pub instance_ids: BTreeSet<String>,
}

impl InstanceSelector {
    /// Selects every running instance.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            instance_ids: BTreeSet::new(),
        }
    }

    /// Selects exactly the given ids, ignoring blanks and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        let instance_ids = ids
            .iter()
            .map(|id| id.as_ref().trim())
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect();
        Self { instance_ids }
    }

    /// Returns `true` when no explicit ids were given.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.instance_ids.is_empty()
    }
}

/// Names of the tags this tool writes and reads on snapshots.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagNames {
    /// Completion timestamp tag.
    pub completed: String,
    /// Expiration timestamp tag.
    pub expiration: String,
    /// Delete-after-expiration marker tag.
    pub delete_after_expiration: String,
}

impl Default for TagNames {
    fn default() -> Self {
        let config = SnapwardenConfig::builtin();
        Self {
            completed: config.completed_tag,
            expiration: config.expiration_tag,
            delete_after_expiration: config.delete_after_expiration_tag,
        }
    }
}

/// Immutable settings shared by both phases of a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSettings {
    /// Retention horizon for new snapshots.
    pub retention: RetentionPolicy,
    /// Instances to consider.
    pub selector: InstanceSelector,
    /// Report mutating actions instead of performing them.
    pub dry_run: bool,
    /// Snapshot tag names.
    pub tags: TagNames,
    /// Instance exclusion rules.
    pub rules: EligibilityRules,
}
