//! Instance and volume eligibility rules.
//!
//! Each rule is a pure predicate so it can be tested on its own;
//! [`plan_snapshots`] composes them and does the advisory logging.

use std::fmt;

use tracing::{info, warn};

use crate::config::SnapwardenConfig;
use crate::provider::{AttachmentState, InstanceRecord, NAME_TAG, VolumeAttachment};

/// Instance exclusion rules.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EligibilityRules {
    /// Tag key marking auto-scaling group members.
    pub autoscaling_tag_key: String,
    /// `Name` tag substring marking build/CI instances. Empty disables the
    /// rule.
    pub build_fleet_marker: String,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        let config = SnapwardenConfig::builtin();
        Self {
            autoscaling_tag_key: config.autoscaling_tag_key,
            build_fleet_marker: config.build_fleet_marker,
        }
    }
}

/// Why an instance is skipped entirely.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExclusionReason {
    /// The instance belongs to an auto-scaling group.
    AutoScaling {
        /// Value of the auto-scaling tag.
        group: String,
    },
    /// The instance's name marks it as part of the build fleet.
    BuildFleet {
        /// Value of the `Name` tag.
        name: String,
    },
    /// The provider reported the instance as not running.
    NotRunning,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoScaling { group } => write!(f, "member of auto-scaling group {group}"),
            Self::BuildFleet { name } => write!(f, "build fleet instance named {name}"),
            Self::NotRunning => f.write_str("not running"),
        }
    }
}

/// Where an included instance's display name came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameSource {
    /// The `Name` tag had a value.
    Tag,
    /// The `Name` tag was present but blank; the instance id is used.
    EmptyTag,
    /// There was no `Name` tag; the instance id is used.
    MissingTag,
}

/// Outcome of the instance-level rules.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstanceVerdict {
    /// No snapshot is taken of any of this instance's volumes.
    Excluded(ExclusionReason),
    /// The instance's attached volumes are snapshotted.
    Included {
        /// Name used as the default snapshot description.
        display_name: String,
        /// Origin of `display_name`.
        name_source: NameSource,
    },
}

/// A snapshot to take.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotRequest {
    /// Instance the volume is attached to.
    pub instance_id: String,
    /// Volume to snapshot.
    pub volume_id: String,
    /// Default description, the instance's display name.
    pub description: String,
}

/// Ordered snapshot requests plus what was skipped along the way.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SnapshotPlan {
    /// One request per eligible volume, in instance then block-device order.
    pub requests: Vec<SnapshotRequest>,
    /// Instances skipped by an exclusion rule.
    pub instances_excluded: usize,
    /// Volumes skipped because they were not attached.
    pub volumes_skipped: usize,
}

/// Applies the instance-level rules to a single instance.
#[must_use]
pub fn evaluate_instance(instance: &InstanceRecord, rules: &EligibilityRules) -> InstanceVerdict {
    if !instance.running {
        return InstanceVerdict::Excluded(ExclusionReason::NotRunning);
    }

    if let Some(group) = instance.tags.get(&rules.autoscaling_tag_key) {
        return InstanceVerdict::Excluded(ExclusionReason::AutoScaling {
            group: group.clone(),
        });
    }

    match instance.tags.get(NAME_TAG) {
        Some(name) if name.is_empty() => InstanceVerdict::Included {
            display_name: instance.id.clone(),
            name_source: NameSource::EmptyTag,
        },
        Some(name)
            if !rules.build_fleet_marker.is_empty()
                && name.contains(rules.build_fleet_marker.as_str()) =>
        {
            InstanceVerdict::Excluded(ExclusionReason::BuildFleet { name: name.clone() })
        }
        Some(name) => InstanceVerdict::Included {
            display_name: name.clone(),
            name_source: NameSource::Tag,
        },
        None => InstanceVerdict::Included {
            display_name: instance.id.clone(),
            name_source: NameSource::MissingTag,
        },
    }
}

/// Returns `true` when the volume can be snapshotted.
#[must_use]
pub fn volume_is_eligible(volume: &VolumeAttachment) -> bool {
    volume.attachment_state == AttachmentState::Attached
}

/// Turns the provider's instance listing into snapshot requests.
#[must_use]
pub fn plan_snapshots(instances: &[InstanceRecord], rules: &EligibilityRules) -> SnapshotPlan {
    let mut plan = SnapshotPlan::default();

    for instance in instances {
        let display_name = match evaluate_instance(instance, rules) {
            InstanceVerdict::Excluded(reason) => {
                info!(instance_id = %instance.id, %reason, "skipping instance");
                plan.instances_excluded += 1;
                continue;
            }
            InstanceVerdict::Included {
                display_name,
                name_source,
            } => {
                if name_source != NameSource::Tag {
                    warn!(
                        instance_id = %instance.id,
                        "instance has no Name tag; using the instance id for the snapshot name"
                    );
                }
                display_name
            }
        };

        for volume in &instance.volumes {
            if !volume_is_eligible(volume) {
                info!(
                    volume_id = %volume.volume_id,
                    state = %volume.attachment_state,
                    "skipping volume that is not attached"
                );
                plan.volumes_skipped += 1;
                continue;
            }
            plan.requests.push(SnapshotRequest {
                instance_id: instance.id.clone(),
                volume_id: volume.volume_id.clone(),
                description: display_name.clone(),
            });
        }
    }

    plan
}
