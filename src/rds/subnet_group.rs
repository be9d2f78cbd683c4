//! DB subnet group for the RDS instance.

use anyhow::{bail, Context, Result};
use aws_sdk_rds::error::ProvideErrorMetadata;
use aws_sdk_rds::types::Tag;

use super::RdsClient;
use crate::error::{is_already_exists, is_not_found};

impl RdsClient {
    /// Create the subnet group that pins the RDS instance to the caller's
    /// subnets (and implicitly its VPC). If a group with matching name and
    /// tags already exists it is adopted.
    pub(crate) async fn create_subnet_group(
        &self,
        tags: &[Tag],
        instance_name: &str,
        subnet_ids: &[String],
    ) -> Result<String> {
        let rds = self.client.rds();

        let subnet_group_name = format!("{instance_name}-subnet-group");
        let description = format!("database subnet group for RDS instance {instance_name}");

        match rds
            .create_db_subnet_group()
            .db_subnet_group_name(&subnet_group_name)
            .db_subnet_group_description(&description)
            .set_subnet_ids(Some(subnet_ids.to_vec()))
            .set_tags(Some(tags.to_vec()))
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .db_subnet_group()
                .and_then(|group| group.db_subnet_group_name())
                .context("no subnet group name in create response")?
                .to_string()),
            Err(e) if is_already_exists(e.code()) => {
                self.adopt_subnet_group(&subnet_group_name, tags).await
            }
            Err(e) => Err(e).with_context(|| {
                format!("failed to create DB subnet group for RDS instance {instance_name}")
            }),
        }
    }

    /// Adopt an existing subnet group whose tags match ours.
    async fn adopt_subnet_group(&self, subnet_group_name: &str, tags: &[Tag]) -> Result<String> {
        let rds = self.client.rds();

        let resp = rds
            .describe_db_subnet_groups()
            .db_subnet_group_name(subnet_group_name)
            .send()
            .await
            .context("failed to describe subnet groups to check for unique tags")?;

        for group in resp.db_subnet_groups() {
            let Some(arn) = group.db_subnet_group_arn() else {
                continue;
            };
            if self.resource_tags_match(arn, tags).await? {
                return Ok(group
                    .db_subnet_group_name()
                    .context("no name on described subnet group")?
                    .to_string());
            }
        }

        bail!("subnet group {subnet_group_name} exists but tags do not match")
    }

    /// Delete the subnet group. A missing group is treated as already
    /// deleted.
    pub(crate) async fn delete_subnet_group(&self, subnet_group_name: &str) -> Result<()> {
        if subnet_group_name.is_empty() {
            return Ok(());
        }

        match self
            .client
            .rds()
            .delete_db_subnet_group()
            .db_subnet_group_name(subnet_group_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to delete subnet group {subnet_group_name}")),
        }
    }

    /// True if every one of our tags is present on the RDS resource.
    pub(crate) async fn resource_tags_match(&self, resource_arn: &str, tags: &[Tag]) -> Result<bool> {
        let resp = self
            .client
            .rds()
            .list_tags_for_resource()
            .resource_name(resource_arn)
            .send()
            .await
            .with_context(|| format!("failed to list tags for resource {resource_arn}"))?;

        let remote = resp.tag_list();
        Ok(tags.iter().all(|tag| {
            remote
                .iter()
                .any(|r| r.key() == tag.key() && r.value() == tag.value())
        }))
    }
}
