use std::env;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rustsnap::{
    ec2, provider, AwsEc2Provider, InstanceMatcher, RetryPolicy, SnapshotOrchestrator,
};
use std::sync::Arc;

const MATCH_SUBSTRING_ENV: &str = "MATCH_SUBSTRING";
const DEFAULT_MATCH_SUBSTRING: &str = "khaled";

#[derive(Parser)]
#[command(name = "rustsnap", about = "Tag-driven EBS snapshot backups of EC2 instances")]
struct Cli {
    /// AWS region; falls back to the default provider chain.
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot every volume of every instance whose Name tag contains the
    /// configured substring.
    Backup {
        /// Substring to match; overrides the MATCH_SUBSTRING environment
        /// variable.
        #[arg(long)]
        substring: Option<String>,

        /// Attempts per snapshot request (1 = no retry).
        #[arg(long, default_value_t = 1)]
        retry_attempts: u32,

        /// Seconds to wait between retry attempts.
        #[arg(long, default_value_t = 5)]
        retry_delay_secs: u64,
    },
    /// Print the full instance inventory as JSON.
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let client = provider::load_client(cli.region).await;

    match cli.command.unwrap_or(Commands::Backup {
        substring: None,
        retry_attempts: 1,
        retry_delay_secs: 5,
    }) {
        Commands::Backup {
            substring,
            retry_attempts,
            retry_delay_secs,
        } => {
            let substring = substring
                .or_else(|| env::var(MATCH_SUBSTRING_ENV).ok())
                .unwrap_or_else(|| DEFAULT_MATCH_SUBSTRING.to_string());

            info!(substring = %substring, "starting EBS snapshot job");

            let provider = Arc::new(AwsEc2Provider::new(client));
            let matches = InstanceMatcher::new(provider.clone())
                .find_matching(&substring)
                .await?;

            info!(matched = matches.len(), "instance discovery finished");

            let report = SnapshotOrchestrator::new(provider)
                .with_retry(RetryPolicy {
                    max_attempts: retry_attempts.max(1),
                    delay: Duration::from_secs(retry_delay_secs),
                })
                .run_backup(&matches)
                .await;

            for failure in report.failures() {
                tracing::warn!(
                    instance_id = %failure.instance_id,
                    volume_id = failure.volume_id.as_deref().unwrap_or("-"),
                    "volume was not backed up"
                );
            }

            println!(
                "{}",
                json!({ "snapshots_created": report.snapshots_created })
            );
        }
        Commands::List => {
            let rows = ec2::list_instance_summaries(&client).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
