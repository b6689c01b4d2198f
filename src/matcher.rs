//! Substring-based instance discovery over the paginated EC2 inventory.

use std::sync::Arc;

use tracing::debug;

use crate::error::BackupError;
use crate::model::MatchedInstance;
use crate::provider::Ec2Provider;

pub struct InstanceMatcher {
    provider: Arc<dyn Ec2Provider>,
}

impl InstanceMatcher {
    pub fn new(provider: Arc<dyn Ec2Provider>) -> Self {
        Self { provider }
    }

    /// Returns every instance whose name label contains `substring`,
    /// case-insensitively, in provider enumeration order.
    ///
    /// Filtering happens client-side over the complete inventory: every
    /// continuation token is followed before the result is returned, so a
    /// match on the last page is found just as reliably as one on the first.
    /// Instances without a name label cannot satisfy the predicate and are
    /// excluded. A paging error aborts the whole discovery.
    pub async fn find_matching(
        &self,
        substring: &str,
    ) -> Result<Vec<MatchedInstance>, BackupError> {
        let needle = substring.to_lowercase();
        let mut matches = Vec::new();
        let mut page_token = None;

        loop {
            let page = self.provider.list_instances(page_token).await?;

            for instance in page.instances {
                let Some(name) = instance.name_label().map(str::to_string) else {
                    debug!(instance_id = %instance.id, "no Name tag, excluded from matching");
                    continue;
                };

                if name.to_lowercase().contains(&needle) {
                    matches.push(MatchedInstance {
                        id: instance.id,
                        display_name: Some(name),
                        attachments: instance.attachments,
                    });
                }
            }

            page_token = page.next_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ec2Instance, Tag, VolumeAttachment};
    use crate::provider::testing::FakeEc2;

    fn named_instance(id: &str, name: &str) -> Ec2Instance {
        Ec2Instance {
            id: id.into(),
            tags: vec![Tag::new("Name", name)],
            attachments: vec![VolumeAttachment {
                volume_id: Some(format!("vol-{id}")),
            }],
        }
    }

    #[tokio::test]
    async fn finds_matches_on_every_page() {
        let provider = Arc::new(FakeEc2::with_pages(vec![
            vec![named_instance("i-1", "db-alpha")],
            vec![named_instance("i-2", "cache-node")],
            vec![named_instance("i-3", "db-bravo")],
        ]));

        let matches = InstanceMatcher::new(provider)
            .find_matching("db")
            .await
            .unwrap();

        let ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["i-1", "i-3"]);
    }

    #[tokio::test]
    async fn containment_is_case_insensitive() {
        let provider = Arc::new(FakeEc2::with_pages(vec![vec![
            named_instance("i-1", "Prod-DB-01"),
            named_instance("i-2", "db-primary"),
            named_instance("i-3", "MyDBServer"),
            named_instance("i-4", "Prod-Cache-01"),
        ]]));

        let matches = InstanceMatcher::new(provider)
            .find_matching("db")
            .await
            .unwrap();

        let ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["i-1", "i-2", "i-3"]);
    }

    #[tokio::test]
    async fn unnamed_instance_never_matches() {
        let provider = Arc::new(FakeEc2::with_pages(vec![vec![Ec2Instance {
            id: "i-1".into(),
            tags: vec![Tag::new("Environment", "prod")],
            attachments: vec![],
        }]]));

        let matches = InstanceMatcher::new(provider)
            .find_matching("")
            .await
            .unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_keys_resolve_to_first() {
        let provider = Arc::new(FakeEc2::with_pages(vec![vec![Ec2Instance {
            id: "i-1".into(),
            tags: vec![Tag::new("Name", "web-box"), Tag::new("Name", "db-box")],
            attachments: vec![],
        }]]));

        let matcher = InstanceMatcher::new(provider);

        let matches = matcher.find_matching("web").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].display_name.as_deref(), Some("web-box"));

        assert!(matcher.find_matching("db").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paging_error_propagates() {
        let provider = Arc::new(FakeEc2 {
            fail_inventory: true,
            ..FakeEc2::default()
        });

        let err = InstanceMatcher::new(provider)
            .find_matching("db")
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Inventory(_)));
    }
}
