//! Provider-side records read by the policy engine.
//!
//! Tag values stay plain strings here. Parsing booleans and timestamps out of
//! them happens in [`crate::policy`].

use std::collections::BTreeMap;
use std::fmt;

/// Tag name to tag value mapping as stored by the provider.
pub type TagMap = BTreeMap<String, String>;

/// Tag carrying the human-readable name of an instance or volume.
pub const NAME_TAG: &str = "Name";

/// Attachment state of a volume on an instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttachmentState {
    /// Volume is attached and can be snapshotted.
    Attached,
    /// Volume is being attached.
    Attaching,
    /// Volume is being detached.
    Detaching,
    /// Volume is detached.
    Detached,
    /// Any state the provider reports that this tool does not know about.
    Other(String),
}

impl AttachmentState {
    /// Maps the provider's status string onto a known state.
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value {
            "attached" => Self::Attached,
            "attaching" => Self::Attaching,
            "detaching" => Self::Detaching,
            "detached" => Self::Detached,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the provider's spelling of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Attached => "attached",
            Self::Attaching => "attaching",
            Self::Detaching => "detaching",
            Self::Detached => "detached",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for AttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block-storage volume attached to an instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeAttachment {
    /// Provider volume identifier.
    pub volume_id: String,
    /// Current attachment state.
    pub attachment_state: AttachmentState,
}

/// A running instance as reported by the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceRecord {
    /// Provider instance identifier.
    pub id: String,
    /// Tags set on the instance.
    pub tags: TagMap,
    /// Whether the provider reports the instance as running.
    pub running: bool,
    /// Attached volumes in block-device order.
    pub volumes: Vec<VolumeAttachment>,
}

impl InstanceRecord {
    /// Creates a running instance with no tags or volumes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tags: TagMap::new(),
            running: true,
            volumes: Vec::new(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Appends a volume attachment.
    #[must_use]
    pub fn with_volume(mut self, volume_id: impl Into<String>, state: AttachmentState) -> Self {
        self.volumes.push(VolumeAttachment {
            volume_id: volume_id.into(),
            attachment_state: state,
        });
        self
    }
}

/// Lifecycle status of a snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SnapshotStatus {
    /// Snapshot is still being written.
    Pending,
    /// Snapshot is complete and usable.
    Completed,
    /// Snapshot failed on the provider side.
    Error,
    /// Any other status string.
    Other(String),
}

impl SnapshotStatus {
    /// Maps the provider's state string onto a known status.
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "error" => Self::Error,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the provider's spelling of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Other(value) => value,
        }
    }
}

/// A snapshot as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotRecord {
    /// Provider snapshot identifier. Empty when creation failed upstream.
    pub snapshot_id: String,
    /// Lifecycle status.
    pub status: SnapshotStatus,
    /// Tags set on the snapshot.
    pub tags: TagMap,
}

impl SnapshotRecord {
    /// Creates a snapshot record with no tags.
    #[must_use]
    pub fn new(snapshot_id: impl Into<String>, status: SnapshotStatus) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            status,
            tags: TagMap::new(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Server-side filter applied when listing snapshots.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SnapshotFilter {
    /// Matches snapshots in the given status.
    Status(SnapshotStatus),
    /// Matches snapshots whose tag `key` has one of `values`.
    TagValue {
        /// Tag name.
        key: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Matches snapshots carrying tag `key` with any value.
    TagKey(String),
}
