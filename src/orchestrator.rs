//! Per-volume snapshot orchestration with provenance tagging.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::BackupError;
use crate::model::{
    BackupReport, MatchedInstance, OutcomeStatus, SnapshotRequest, Tag, VolumeOutcome,
};
use crate::provider::Ec2Provider;

/// Value of the `CreatedBy` tag on every snapshot this tool creates.
pub const CREATED_BY: &str = "rustsnap-ebs-backup";

/// Substituted wherever a matched instance carries no name label, so tag
/// values are never empty.
pub const UNKNOWN_NAME: &str = "UnknownName";

/// Bounded retry for the snapshot-issuing operation. The default is a single
/// attempt; retries are opt-in via [`SnapshotOrchestrator::with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

pub struct SnapshotOrchestrator {
    provider: Arc<dyn Ec2Provider>,
    retry: RetryPolicy,
}

impl SnapshotOrchestrator {
    pub fn new(provider: Arc<dyn Ec2Provider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Snapshots every attached volume of every matched instance, in input
    /// order, and reports per-volume outcomes.
    ///
    /// Failure isolation is per volume: a failed or skipped volume never
    /// aborts its siblings or the remaining instances, so this method itself
    /// cannot fail. Discovery already happened; the only job-fatal error
    /// class lives in [`crate::matcher::InstanceMatcher`].
    pub async fn run_backup(&self, instances: &[MatchedInstance]) -> BackupReport {
        let mut report = BackupReport::default();
        let now = Utc::now();

        for instance in instances {
            let display_name = instance.display_name.as_deref().unwrap_or(UNKNOWN_NAME);
            info!(instance_id = %instance.id, name = %display_name, "processing instance");

            for attachment in &instance.attachments {
                let Some(volume_id) = &attachment.volume_id else {
                    warn!(
                        instance_id = %instance.id,
                        "attachment without a volume reference, skipping"
                    );
                    report.outcomes.push(VolumeOutcome {
                        instance_id: instance.id.clone(),
                        volume_id: None,
                        status: OutcomeStatus::Skipped {
                            reason: "no resolvable volume reference".into(),
                        },
                    });
                    continue;
                };

                let request = build_request(&instance.id, display_name, volume_id, &now);

                match self.create_with_retry(request).await {
                    Ok(snapshot_id) => {
                        info!(
                            snapshot_id = %snapshot_id,
                            volume_id = %volume_id,
                            "created snapshot"
                        );
                        report.snapshots_created += 1;
                        report.outcomes.push(VolumeOutcome {
                            instance_id: instance.id.clone(),
                            volume_id: Some(volume_id.clone()),
                            status: OutcomeStatus::Created { snapshot_id },
                        });
                    }
                    Err(e) => {
                        warn!(volume_id = %volume_id, error = %e, "failed to snapshot volume");
                        report.outcomes.push(VolumeOutcome {
                            instance_id: instance.id.clone(),
                            volume_id: Some(volume_id.clone()),
                            status: OutcomeStatus::Failed {
                                reason: e.to_string(),
                            },
                        });
                    }
                }
            }
        }

        info!(
            snapshots_created = report.snapshots_created,
            "backup run finished"
        );
        report
    }

    async fn create_with_retry(&self, request: SnapshotRequest) -> Result<String, BackupError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.create_snapshot(request.clone()).await {
                Ok(snapshot_id) => return Ok(snapshot_id),
                Err(e) if attempt < self.retry.max_attempts => {
                    warn!(
                        volume_id = %request.volume_id,
                        attempt,
                        error = %e,
                        "snapshot attempt failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn build_request(
    instance_id: &str,
    display_name: &str,
    volume_id: &str,
    now: &DateTime<Utc>,
) -> SnapshotRequest {
    let date = now.format("%Y-%m-%d");

    SnapshotRequest {
        volume_id: volume_id.to_string(),
        description: format!(
            "Automated snapshot for instance {instance_id} ({display_name}) \
             volume {volume_id} taken on {date}"
        ),
        tags: vec![
            Tag::new("Name", format!("{display_name}-{volume_id}-backup-{date}")),
            Tag::new("InstanceId", instance_id),
            Tag::new("InstanceName", display_name),
            Tag::new("VolumeId", volume_id),
            Tag::new("CreatedBy", CREATED_BY),
            Tag::new("CreatedOnUTC", now.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ],
    }
}
