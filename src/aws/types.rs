//! Shapes of the `aws` CLI's JSON output and input payloads.

use serde::{Deserialize, Serialize};

use crate::provider::{
    AttachmentState, InstanceRecord, SnapshotRecord, SnapshotStatus, TagMap, VolumeAttachment,
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AwsTag {
    pub(super) key: String,
    #[serde(default)]
    pub(super) value: String,
}

pub(super) fn tag_map(tags: Vec<AwsTag>) -> TagMap {
    tags.into_iter().map(|tag| (tag.key, tag.value)).collect()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct CallerIdentityOutput {
    pub(super) account: String,
    pub(super) arn: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeInstancesOutput {
    #[serde(default)]
    pub(super) reservations: Vec<Reservation>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Reservation {
    #[serde(default)]
    pub(super) instances: Vec<Ec2Instance>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Instance {
    pub(super) instance_id: String,
    pub(super) state: Option<InstanceState>,
    #[serde(default)]
    pub(super) tags: Vec<AwsTag>,
    #[serde(default)]
    pub(super) block_device_mappings: Vec<BlockDeviceMapping>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct InstanceState {
    pub(super) name: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct BlockDeviceMapping {
    pub(super) ebs: Option<EbsAttachment>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct EbsAttachment {
    pub(super) volume_id: String,
    pub(super) status: String,
}

impl Ec2Instance {
    pub(super) fn into_record(self) -> InstanceRecord {
        let running = self
            .state
            .as_ref()
            .is_some_and(|state| state.name == "running");
        let volumes = self
            .block_device_mappings
            .into_iter()
            .filter_map(|mapping| mapping.ebs)
            .map(|ebs| VolumeAttachment {
                attachment_state: AttachmentState::from_provider(&ebs.status),
                volume_id: ebs.volume_id,
            })
            .collect();
        InstanceRecord {
            id: self.instance_id,
            tags: tag_map(self.tags),
            running,
            volumes,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeVolumesOutput {
    #[serde(default)]
    pub(super) volumes: Vec<Ec2Volume>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Volume {
    #[serde(default)]
    pub(super) tags: Vec<AwsTag>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeSnapshotsOutput {
    #[serde(default)]
    pub(super) snapshots: Vec<Ec2Snapshot>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Snapshot {
    #[serde(default)]
    pub(super) snapshot_id: String,
    #[serde(default)]
    pub(super) state: String,
    #[serde(default)]
    pub(super) tags: Vec<AwsTag>,
}

impl Ec2Snapshot {
    pub(super) fn into_record(self) -> SnapshotRecord {
        SnapshotRecord {
            snapshot_id: self.snapshot_id,
            status: SnapshotStatus::from_provider(&self.state),
            tags: tag_map(self.tags),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AwsFilter {
    pub(super) name: String,
    pub(super) values: Vec<String>,
}
