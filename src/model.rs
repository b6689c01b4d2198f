//! Typed records for the instances, attachments and outcomes flowing through
//! the backup pipeline. Raw SDK shapes are converted into these at the
//! provider boundary so everything downstream works with validated data.

/// Key/value annotation on a provider-managed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An EBS attachment as reported by the instance. `volume_id` is `None` when
/// the block device mapping carries no resolvable volume reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeAttachment {
    pub volume_id: Option<String>,
}

/// An EC2 instance as read from the inventory provider.
#[derive(Debug, Clone)]
pub struct Ec2Instance {
    pub id: String,
    pub tags: Vec<Tag>,
    pub attachments: Vec<VolumeAttachment>,
}

impl Ec2Instance {
    /// The human-readable name label, if any.
    ///
    /// Tag keys are not guaranteed unique by the provider; the first `Name`
    /// key in provider-returned order wins.
    pub fn name_label(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == "Name")
            .map(|t| t.value.as_str())
    }
}

/// One page of the paginated instance inventory.
#[derive(Debug, Clone)]
pub struct InstancePage {
    pub instances: Vec<Ec2Instance>,
    pub next_token: Option<String>,
}

/// An instance whose name label matched the configured substring.
#[derive(Debug, Clone)]
pub struct MatchedInstance {
    pub id: String,
    pub display_name: Option<String>,
    pub attachments: Vec<VolumeAttachment>,
}

/// A create-snapshot command scoped to a single volume. Tags are attached
/// atomically at creation time.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub volume_id: String,
    pub description: String,
    pub tags: Vec<Tag>,
}

/// Terminal state of one volume within a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Created { snapshot_id: String },
    Failed { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct VolumeOutcome {
    pub instance_id: String,
    pub volume_id: Option<String>,
    pub status: OutcomeStatus,
}

/// Aggregate result of a backup run.
#[derive(Debug, Default)]
pub struct BackupReport {
    pub snapshots_created: usize,
    pub outcomes: Vec<VolumeOutcome>,
}

impl BackupReport {
    pub fn failures(&self) -> impl Iterator<Item = &VolumeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed { .. }))
    }
}
