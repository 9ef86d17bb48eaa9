//! [`SnapshotProvider`] backed by the `aws` command-line interface.
//!
//! Every call shells out to `aws <service> <operation> --profile <p>
//! --region <r> --output json` through a [`CommandRunner`] and parses the JSON
//! it prints. Profile resolution, request signing, and pagination are left to
//! the CLI.

use std::ffi::OsString;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::InstanceSelector;
use crate::provider::{
    InstanceRecord, SnapshotFilter, SnapshotProvider, SnapshotRecord, TagMap,
};
use crate::runner::{CommandOutput, CommandRunner, ProcessCommandRunner};

mod error;
mod types;

pub use error::AwsError;

use types::{
    AwsFilter, AwsTag, CallerIdentityOutput, DescribeInstancesOutput, DescribeSnapshotsOutput,
    DescribeVolumesOutput, Ec2Instance, Ec2Snapshot, tag_map,
};

/// Default AWS CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

/// Connection settings for the AWS CLI.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AwsSettings {
    /// Path to the `aws` CLI binary.
    pub aws_bin: String,
    /// Named profile from the shared credentials files.
    pub profile: String,
    /// Target region.
    pub region: String,
}

impl AwsSettings {
    /// Creates settings, trimming whitespace.
    #[must_use]
    pub fn new(
        aws_bin: impl Into<String>,
        profile: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            aws_bin: aws_bin.into().trim().to_owned(),
            profile: profile.into().trim().to_owned(),
            region: region.into().trim().to_owned(),
        }
    }

    /// Ensures every field is present.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::InvalidConfig`] naming the first blank field.
    pub fn validate(&self) -> Result<(), AwsError> {
        for (field, value) in [
            ("aws_bin", &self.aws_bin),
            ("profile", &self.profile),
            ("region", &self.region),
        ] {
            if value.is_empty() {
                return Err(AwsError::InvalidConfig {
                    field: field.to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Identity the profile's credentials resolve to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallerIdentity {
    /// Account number.
    pub account: String,
    /// ARN of the calling principal.
    pub arn: String,
}

/// Snapshot provider that drives the `aws` CLI.
#[derive(Clone, Debug)]
pub struct AwsCliProvider<R: CommandRunner> {
    settings: AwsSettings,
    runner: R,
}

impl AwsCliProvider<ProcessCommandRunner> {
    /// Connects using the real process runner with the CLI pager disabled.
    ///
    /// # Errors
    ///
    /// See [`AwsCliProvider::connect`].
    pub fn connect_with_process_runner(
        settings: AwsSettings,
    ) -> Result<(Self, CallerIdentity), AwsError> {
        Self::connect(settings, ProcessCommandRunner::new().with_env("AWS_PAGER", ""))
    }
}

impl<R: CommandRunner> AwsCliProvider<R> {
    /// Creates a provider after validating its settings. No command is run.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::InvalidConfig`] when a setting is blank.
    pub fn new(settings: AwsSettings, runner: R) -> Result<Self, AwsError> {
        settings.validate()?;
        Ok(Self { settings, runner })
    }

    /// Creates a provider and verifies that its profile resolves to working
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::InvalidConfig`] for blank settings and
    /// [`AwsError::Credentials`] when the identity lookup fails.
    pub fn connect(settings: AwsSettings, runner: R) -> Result<(Self, CallerIdentity), AwsError> {
        let provider = Self::new(settings, runner)?;
        let identity = provider.load_credentials()?;
        Ok((provider, identity))
    }

    /// Returns the settings in use.
    #[must_use]
    pub const fn settings(&self) -> &AwsSettings {
        &self.settings
    }

    /// Resolves the profile's credentials via `sts get-caller-identity`.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::Credentials`] wrapping whatever went wrong.
    pub fn load_credentials(&self) -> Result<CallerIdentity, AwsError> {
        let args = self.base_args("sts", "get-caller-identity");
        let output: CallerIdentityOutput = self
            .run_json(&args, "get-caller-identity")
            .map_err(|err| AwsError::Credentials {
                profile: self.settings.profile.clone(),
                message: err.to_string(),
            })?;
        debug!(account = %output.account, arn = %output.arn, "resolved AWS identity");
        Ok(CallerIdentity {
            account: output.account,
            arn: output.arn,
        })
    }

    fn base_args(&self, service: &str, operation: &str) -> Vec<OsString> {
        vec![
            OsString::from(service),
            OsString::from(operation),
            OsString::from("--profile"),
            OsString::from(&self.settings.profile),
            OsString::from("--region"),
            OsString::from(&self.settings.region),
            OsString::from("--output"),
            OsString::from("json"),
        ]
    }

    fn run_aws(&self, args: &[OsString], operation: &str) -> Result<CommandOutput, AwsError> {
        let output = self.runner.run(&self.settings.aws_bin, args)?;
        if output.is_success() {
            return Ok(output);
        }

        Err(AwsError::CommandFailure {
            program: self.settings.aws_bin.clone(),
            operation: operation.to_owned(),
            status: output.code,
            status_text: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }

    fn run_json<T>(&self, args: &[OsString], operation: &str) -> Result<T, AwsError>
    where
        T: DeserializeOwned,
    {
        let output = self.run_aws(args, operation)?;
        serde_json::from_str::<T>(&output.stdout).map_err(|err| AwsError::Parse {
            operation: operation.to_owned(),
            message: err.to_string(),
        })
    }
}

fn encode_json<T: Serialize>(value: &T, operation: &str) -> Result<OsString, AwsError> {
    serde_json::to_string(value)
        .map(OsString::from)
        .map_err(|err| AwsError::Encode {
            operation: operation.to_owned(),
            message: err.to_string(),
        })
}

fn aws_filter(filter: &SnapshotFilter) -> AwsFilter {
    match filter {
        SnapshotFilter::Status(status) => AwsFilter {
            name: String::from("status"),
            values: vec![status.as_str().to_owned()],
        },
        SnapshotFilter::TagValue { key, values } => AwsFilter {
            name: format!("tag:{key}"),
            values: values.clone(),
        },
        SnapshotFilter::TagKey(key) => AwsFilter {
            name: String::from("tag-key"),
            values: vec![key.clone()],
        },
    }
}

impl<R: CommandRunner> SnapshotProvider for AwsCliProvider<R> {
    type Error = AwsError;

    fn list_running_instances(
        &self,
        selector: &InstanceSelector,
    ) -> Result<Vec<InstanceRecord>, AwsError> {
        let operation = "describe-instances";
        let mut args = self.base_args("ec2", operation);
        let running = [AwsFilter {
            name: String::from("instance-state-name"),
            values: vec![String::from("running")],
        }];
        args.push(OsString::from("--filters"));
        args.push(encode_json(&running, operation)?);
        if !selector.is_all() {
            args.push(OsString::from("--instance-ids"));
            args.extend(selector.instance_ids.iter().map(OsString::from));
        }

        let output: DescribeInstancesOutput = self.run_json(&args, operation)?;
        Ok(output
            .reservations
            .into_iter()
            .flat_map(|reservation| reservation.instances)
            .map(Ec2Instance::into_record)
            .collect())
    }

    fn describe_volume_tags(&self, volume_id: &str) -> Result<TagMap, AwsError> {
        let operation = "describe-volumes";
        let mut args = self.base_args("ec2", operation);
        args.push(OsString::from("--volume-ids"));
        args.push(OsString::from(volume_id));

        let output: DescribeVolumesOutput = self.run_json(&args, operation)?;
        Ok(output
            .volumes
            .into_iter()
            .next()
            .map(|volume| tag_map(volume.tags))
            .unwrap_or_default())
    }

    fn create_snapshot(
        &self,
        volume_id: &str,
        description: &str,
    ) -> Result<SnapshotRecord, AwsError> {
        let operation = "create-snapshot";
        let mut args = self.base_args("ec2", operation);
        args.push(OsString::from("--volume-id"));
        args.push(OsString::from(volume_id));
        if !description.is_empty() {
            args.push(OsString::from("--description"));
            args.push(OsString::from(description));
        }

        let output: Ec2Snapshot = self.run_json(&args, operation)?;
        Ok(output.into_record())
    }

    fn tag_resources(&self, resource_ids: &[String], tags: &TagMap) -> Result<(), AwsError> {
        let operation = "create-tags";
        let payload = tags
            .iter()
            .map(|(key, value)| AwsTag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect::<Vec<_>>();
        let mut args = self.base_args("ec2", operation);
        args.push(OsString::from("--resources"));
        args.extend(resource_ids.iter().map(OsString::from));
        args.push(OsString::from("--tags"));
        args.push(encode_json(&payload, operation)?);

        self.run_aws(&args, operation).map(|_| ())
    }

    fn list_snapshots_by_filter(
        &self,
        filters: &[SnapshotFilter],
    ) -> Result<Vec<SnapshotRecord>, AwsError> {
        let operation = "describe-snapshots";
        let payload = filters.iter().map(aws_filter).collect::<Vec<_>>();
        let mut args = self.base_args("ec2", operation);
        args.push(OsString::from("--owner-ids"));
        args.push(OsString::from("self"));
        args.push(OsString::from("--filters"));
        args.push(encode_json(&payload, operation)?);

        let output: DescribeSnapshotsOutput = self.run_json(&args, operation)?;
        Ok(output
            .snapshots
            .into_iter()
            .map(Ec2Snapshot::into_record)
            .collect())
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), AwsError> {
        let operation = "delete-snapshot";
        let mut args = self.base_args("ec2", operation);
        args.push(OsString::from("--snapshot-id"));
        args.push(OsString::from(snapshot_id));

        self.run_aws(&args, operation).map(|_| ())
    }
}
