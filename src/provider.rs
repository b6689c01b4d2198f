//! Provider capability boundary: one trait covering the two EC2 operations
//! the pipeline consumes, plus the production implementation over the AWS
//! SDK. Components receive it as an `Arc<dyn Ec2Provider>` so tests can
//! substitute a fake.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{ResourceType, TagSpecification};
use aws_sdk_ec2::Client as Ec2Client;
use aws_types::region::Region;
use tracing::warn;

use crate::error::BackupError;
use crate::model::{Ec2Instance, InstancePage, SnapshotRequest, Tag, VolumeAttachment};

#[async_trait]
pub trait Ec2Provider: Send + Sync {
    /// Fetches one page of the instance inventory. Callers must keep passing
    /// the returned `next_token` until it comes back `None`.
    async fn list_instances(
        &self,
        page_token: Option<String>,
    ) -> Result<InstancePage, BackupError>;

    /// Creates a point-in-time snapshot of a single volume with description
    /// and tags attached atomically at creation time. Returns the
    /// provider-assigned snapshot id.
    async fn create_snapshot(&self, request: SnapshotRequest) -> Result<String, BackupError>;
}

/// Loads AWS configuration and builds an EC2 client, preferring an explicit
/// region over the ambient provider chain.
pub async fn load_client(region: Option<String>) -> Ec2Client {
    let region_provider =
        RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();

    let config = aws_config::defaults(BehaviorVersion::v2024_03_28())
        .region(region_provider)
        .load()
        .await;

    Ec2Client::new(&config)
}

pub struct AwsEc2Provider {
    client: Ec2Client,
}

impl AwsEc2Provider {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }

    fn convert_instance(instance: &aws_sdk_ec2::types::Instance) -> Option<Ec2Instance> {
        let Some(id) = instance.instance_id() else {
            warn!("dropping inventory entry without an instance id");
            return None;
        };

        let tags = instance
            .tags()
            .iter()
            .filter_map(|t| match (t.key(), t.value()) {
                (Some(k), Some(v)) => Some(Tag::new(k, v)),
                _ => None,
            })
            .collect();

        let attachments = instance
            .block_device_mappings()
            .iter()
            .map(|mapping| VolumeAttachment {
                volume_id: mapping
                    .ebs()
                    .and_then(|ebs| ebs.volume_id())
                    .map(str::to_string),
            })
            .collect();

        Some(Ec2Instance {
            id: id.to_string(),
            tags,
            attachments,
        })
    }
}

#[async_trait]
impl Ec2Provider for AwsEc2Provider {
    async fn list_instances(
        &self,
        page_token: Option<String>,
    ) -> Result<InstancePage, BackupError> {
        let resp = self
            .client
            .describe_instances()
            .set_next_token(page_token)
            .send()
            .await
            .map_err(|e| BackupError::Inventory(format!("{}", DisplayErrorContext(&e))))?;

        let instances = resp
            .reservations()
            .iter()
            .flat_map(|res| res.instances())
            .filter_map(Self::convert_instance)
            .collect();

        Ok(InstancePage {
            instances,
            next_token: resp.next_token().map(str::to_string),
        })
    }

    async fn create_snapshot(&self, request: SnapshotRequest) -> Result<String, BackupError> {
        let tags = request
            .tags
            .iter()
            .map(|t| {
                aws_sdk_ec2::types::Tag::builder()
                    .key(&t.key)
                    .value(&t.value)
                    .build()
            })
            .collect();

        let tag_spec = TagSpecification::builder()
            .resource_type(ResourceType::Snapshot)
            .set_tags(Some(tags))
            .build();

        let resp = self
            .client
            .create_snapshot()
            .volume_id(&request.volume_id)
            .description(&request.description)
            .tag_specifications(tag_spec)
            .send()
            .await
            .map_err(|e| BackupError::CreateSnapshot {
                volume_id: request.volume_id.clone(),
                reason: format!("{}", DisplayErrorContext(&e)),
            })?;

        resp.snapshot_id()
            .map(str::to_string)
            .ok_or_else(|| BackupError::MissingSnapshotId(request.volume_id))
    }
}
