use thiserror::Error;

/// Errors raised by the backup pipeline.
///
/// `Inventory` is the only job-fatal class: a failed or truncated instance
/// listing means there is no trustworthy basis for snapshotting, so it
/// propagates to the caller. `CreateSnapshot` is caught at the per-volume
/// boundary and recorded as a failed outcome instead of unwinding.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("instance inventory read failed: {0}")]
    Inventory(String),

    #[error("snapshot creation failed for volume {volume_id}: {reason}")]
    CreateSnapshot { volume_id: String, reason: String },

    #[error("provider returned a snapshot without an id for volume {0}")]
    MissingSnapshotId(String),
}
