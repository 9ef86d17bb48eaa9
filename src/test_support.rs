//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ffi::OsString;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use thiserror::Error;

use crate::clock::Clock;
use crate::config::InstanceSelector;
use crate::provider::{
    InstanceRecord, SnapshotFilter, SnapshotProvider, SnapshotRecord, SnapshotStatus, TagMap,
};
use crate::runner::{CommandOutput, CommandRunner, RunnerError};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the argument following `flag`, if any.
    #[must_use]
    pub fn arg_after(&self, flag: &str) -> Option<String> {
        self.args
            .iter()
            .position(|arg| arg.to_string_lossy() == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(|arg| arg.to_string_lossy().into_owned())
    }

    /// Returns `true` when any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|arg| arg.to_string_lossy() == needle)
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a successful exit status printing `stdout`.
    pub fn push_json(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RunnerError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Clock frozen at a single instant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A call received by [`RecordingProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// `list_running_instances` with the selector's ids.
    ListRunningInstances(Vec<String>),
    /// `describe_volume_tags`.
    DescribeVolumeTags(String),
    /// `create_snapshot`.
    CreateSnapshot {
        /// Volume snapshotted.
        volume_id: String,
        /// Description passed to the provider.
        description: String,
    },
    /// `tag_resources`.
    TagResources {
        /// Resources tagged.
        resource_ids: Vec<String>,
        /// Tags applied.
        tags: TagMap,
    },
    /// `list_snapshots_by_filter`.
    ListSnapshots(Vec<SnapshotFilter>),
    /// `delete_snapshot`.
    DeleteSnapshot(String),
}

impl ProviderCall {
    /// Returns `true` for calls that change provider state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::CreateSnapshot { .. } | Self::TagResources { .. } | Self::DeleteSnapshot(_)
        )
    }
}

/// Error returned by [`RecordingProvider`] when a failure is scripted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("simulated provider failure: {0}")]
pub struct FakeProviderError(pub String);

#[derive(Debug, Default)]
struct ProviderState {
    instances: Vec<InstanceRecord>,
    volume_tags: BTreeMap<String, TagMap>,
    snapshots: Vec<SnapshotRecord>,
    calls: Vec<ProviderCall>,
    next_snapshot: usize,
    fail_list_instances: bool,
    fail_list_snapshots: bool,
    fail_tagging: bool,
    fail_describe_volume: BTreeSet<String>,
    fail_create: BTreeSet<String>,
    empty_id_for: BTreeSet<String>,
    fail_delete: BTreeSet<String>,
}

/// In-memory [`SnapshotProvider`] that records every call.
///
/// Listings honour the same filters the real provider applies server-side:
/// only running instances (restricted to the selector) and only snapshots
/// matching every filter.
#[derive(Clone, Debug, Default)]
pub struct RecordingProvider {
    state: Rc<RefCell<ProviderState>>,
}

impl RecordingProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance to the inventory.
    #[must_use]
    pub fn with_instance(self, instance: InstanceRecord) -> Self {
        self.state.borrow_mut().instances.push(instance);
        self
    }

    /// Sets the tags returned for a volume.
    #[must_use]
    pub fn with_volume_tags(self, volume_id: &str, tags: &[(&str, &str)]) -> Self {
        let map = tags
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        self.state
            .borrow_mut()
            .volume_tags
            .insert(volume_id.to_owned(), map);
        self
    }

    /// Adds an existing snapshot.
    #[must_use]
    pub fn with_snapshot(self, snapshot: SnapshotRecord) -> Self {
        self.state.borrow_mut().snapshots.push(snapshot);
        self
    }

    /// Makes instance listing fail.
    pub fn fail_list_instances(&self) {
        self.state.borrow_mut().fail_list_instances = true;
    }

    /// Makes snapshot listing fail.
    pub fn fail_list_snapshots(&self) {
        self.state.borrow_mut().fail_list_snapshots = true;
    }

    /// Makes every tagging call fail.
    pub fn fail_tagging(&self) {
        self.state.borrow_mut().fail_tagging = true;
    }

    /// Makes describing `volume_id` fail.
    pub fn fail_describe_volume(&self, volume_id: &str) {
        self.state
            .borrow_mut()
            .fail_describe_volume
            .insert(volume_id.to_owned());
    }

    /// Makes snapshot creation for `volume_id` fail.
    pub fn fail_create(&self, volume_id: &str) {
        self.state
            .borrow_mut()
            .fail_create
            .insert(volume_id.to_owned());
    }

    /// Makes snapshot creation for `volume_id` return an empty id.
    pub fn return_empty_id_for(&self, volume_id: &str) {
        self.state
            .borrow_mut()
            .empty_id_for
            .insert(volume_id.to_owned());
    }

    /// Makes deleting `snapshot_id` fail.
    pub fn fail_delete(&self, snapshot_id: &str) {
        self.state
            .borrow_mut()
            .fail_delete
            .insert(snapshot_id.to_owned());
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.borrow().calls.clone()
    }

    /// Returns the calls that would have changed provider state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(ProviderCall::is_mutating)
            .collect()
    }

    /// Returns the snapshots currently held.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotRecord> {
        self.state.borrow().snapshots.clone()
    }

    /// Returns the ids of deleted snapshots, in call order.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::DeleteSnapshot(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn matches_filter(snapshot: &SnapshotRecord, filter: &SnapshotFilter) -> bool {
    match filter {
        SnapshotFilter::Status(status) => snapshot.status == *status,
        SnapshotFilter::TagValue { key, values } => snapshot
            .tags
            .get(key)
            .is_some_and(|value| values.contains(value)),
        SnapshotFilter::TagKey(key) => snapshot.tags.contains_key(key),
    }
}

impl SnapshotProvider for RecordingProvider {
    type Error = FakeProviderError;

    fn list_running_instances(
        &self,
        selector: &InstanceSelector,
    ) -> Result<Vec<InstanceRecord>, FakeProviderError> {
        self.record(ProviderCall::ListRunningInstances(
            selector.instance_ids.iter().cloned().collect(),
        ));
        let state = self.state.borrow();
        if state.fail_list_instances {
            return Err(FakeProviderError(String::from("describe-instances")));
        }
        Ok(state
            .instances
            .iter()
            .filter(|instance| instance.running)
            .filter(|instance| selector.is_all() || selector.instance_ids.contains(&instance.id))
            .cloned()
            .collect())
    }

    fn describe_volume_tags(&self, volume_id: &str) -> Result<TagMap, FakeProviderError> {
        self.record(ProviderCall::DescribeVolumeTags(volume_id.to_owned()));
        let state = self.state.borrow();
        if state.fail_describe_volume.contains(volume_id) {
            return Err(FakeProviderError(format!("describe-volumes {volume_id}")));
        }
        Ok(state.volume_tags.get(volume_id).cloned().unwrap_or_default())
    }

    fn create_snapshot(
        &self,
        volume_id: &str,
        description: &str,
    ) -> Result<SnapshotRecord, FakeProviderError> {
        self.record(ProviderCall::CreateSnapshot {
            volume_id: volume_id.to_owned(),
            description: description.to_owned(),
        });
        let mut state = self.state.borrow_mut();
        if state.fail_create.contains(volume_id) {
            return Err(FakeProviderError(format!("create-snapshot {volume_id}")));
        }
        if state.empty_id_for.contains(volume_id) {
            return Ok(SnapshotRecord::new("", SnapshotStatus::Pending));
        }
        state.next_snapshot += 1;
        let snapshot = SnapshotRecord::new(
            format!("snap-{:04}", state.next_snapshot),
            SnapshotStatus::Pending,
        );
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    fn tag_resources(
        &self,
        resource_ids: &[String],
        tags: &TagMap,
    ) -> Result<(), FakeProviderError> {
        self.record(ProviderCall::TagResources {
            resource_ids: resource_ids.to_vec(),
            tags: tags.clone(),
        });
        let mut state = self.state.borrow_mut();
        if state.fail_tagging {
            return Err(FakeProviderError(String::from("create-tags")));
        }
        for snapshot in state
            .snapshots
            .iter_mut()
            .filter(|snapshot| resource_ids.contains(&snapshot.snapshot_id))
        {
            snapshot
                .tags
                .extend(tags.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        Ok(())
    }

    fn list_snapshots_by_filter(
        &self,
        filters: &[SnapshotFilter],
    ) -> Result<Vec<SnapshotRecord>, FakeProviderError> {
        self.record(ProviderCall::ListSnapshots(filters.to_vec()));
        let state = self.state.borrow();
        if state.fail_list_snapshots {
            return Err(FakeProviderError(String::from("describe-snapshots")));
        }
        Ok(state
            .snapshots
            .iter()
            .filter(|snapshot| filters.iter().all(|filter| matches_filter(snapshot, filter)))
            .cloned()
            .collect())
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), FakeProviderError> {
        self.record(ProviderCall::DeleteSnapshot(snapshot_id.to_owned()));
        let mut state = self.state.borrow_mut();
        if state.fail_delete.contains(snapshot_id) {
            return Err(FakeProviderError(format!("delete-snapshot {snapshot_id}")));
        }
        state
            .snapshots
            .retain(|snapshot| snapshot.snapshot_id != snapshot_id);
        Ok(())
    }
}

fn json_tags(tags: &[(&str, &str)]) -> Value {
    Value::Array(
        tags.iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

/// Instance fixture for [`json_instances`]: id, tags, and
/// `(volume_id, attachment status)` pairs.
pub type InstanceFixture<'a> = (&'a str, &'a [(&'a str, &'a str)], &'a [(&'a str, &'a str)]);

/// Produces a payload matching `aws ec2 describe-instances --output json`,
/// with all instances in a single reservation.
#[must_use]
pub fn json_instances(instances: &[InstanceFixture<'_>]) -> String {
    let items = instances
        .iter()
        .map(|(id, tags, volumes)| {
            let mappings = volumes
                .iter()
                .enumerate()
                .map(|(index, (volume_id, status))| {
                    json!({
                        "DeviceName": format!("/dev/sdf{index}"),
                        "Ebs": {
                            "VolumeId": volume_id,
                            "Status": status,
                            "DeleteOnTermination": true
                        }
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "InstanceId": id,
                "State": { "Code": 16, "Name": "running" },
                "Tags": json_tags(tags),
                "BlockDeviceMappings": mappings
            })
        })
        .collect::<Vec<_>>();
    json!({ "Reservations": [{ "ReservationId": "r-0001", "Instances": items }] }).to_string()
}

/// Produces a payload matching `aws ec2 describe-volumes --output json` for
/// one volume.
#[must_use]
pub fn json_volume(volume_id: &str, tags: &[(&str, &str)]) -> String {
    json!({ "Volumes": [{ "VolumeId": volume_id, "State": "in-use", "Tags": json_tags(tags) }] })
        .to_string()
}

/// Produces a payload matching `aws ec2 create-snapshot --output json`.
#[must_use]
pub fn json_created_snapshot(snapshot_id: &str, volume_id: &str) -> String {
    json!({
        "SnapshotId": snapshot_id,
        "VolumeId": volume_id,
        "State": "pending",
        "Tags": []
    })
    .to_string()
}

/// Produces a payload matching `aws ec2 describe-snapshots --output json`.
#[must_use]
pub fn json_snapshots(snapshots: &[(&str, &str, &[(&str, &str)])]) -> String {
    let items = snapshots
        .iter()
        .map(|(id, state, tags)| {
            json!({ "SnapshotId": id, "State": state, "Tags": json_tags(tags) })
        })
        .collect::<Vec<_>>();
    json!({ "Snapshots": items }).to_string()
}

/// Produces a payload matching `aws sts get-caller-identity --output json`.
#[must_use]
pub fn json_caller_identity(account: &str) -> String {
    json!({
        "UserId": "AIDAEXAMPLE",
        "Account": account,
        "Arn": format!("arn:aws:iam::{account}:user/snapwarden")
    })
    .to_string()
}
