pub mod ec2;
pub mod error;
pub mod matcher;
pub mod model;
pub mod orchestrator;
pub mod provider;

pub use error::BackupError;
pub use matcher::InstanceMatcher;
pub use model::{BackupReport, MatchedInstance, OutcomeStatus, VolumeOutcome};
pub use orchestrator::{RetryPolicy, SnapshotOrchestrator};
pub use provider::{AwsEc2Provider, Ec2Provider};
