//! Inventory listing for human inspection: dumps the full paginated instance
//! inventory as JSON rows.

use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::Client as Ec2Client;
use serde_json::{json, Value};

use crate::error::BackupError;

pub async fn list_instance_summaries(client: &Ec2Client) -> Result<Vec<Value>, BackupError> {
    let mut rows = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let resp = client
            .describe_instances()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| BackupError::Inventory(format!("{}", DisplayErrorContext(&e))))?;

        for reservation in resp.reservations() {
            for instance in reservation.instances() {
                let tags: Vec<Value> = instance
                    .tags()
                    .iter()
                    .map(|t| json!({ "Key": t.key(), "Value": t.value() }))
                    .collect();

                rows.push(json!({
                    "InstanceId": instance.instance_id(),
                    "InstanceType": instance.instance_type().map(|t| t.as_str()),
                    "State": instance.state().and_then(|s| s.name()).map(|n| n.as_str()),
                    "LaunchTime": instance.launch_time().map(|t| t.to_string()),
                    "PrivateIpAddress": instance.private_ip_address(),
                    "PublicIpAddress": instance.public_ip_address(),
                    "Tags": tags,
                }));
            }
        }

        next_token = resp.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    Ok(rows)
}
