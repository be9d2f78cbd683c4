//! The S3 stack recipe walker.

use anyhow::{bail, Result};

use super::config::S3Config;
use super::inventory::S3Inventory;
use super::S3Client;
use crate::tags::{iam_tags, s3_tags};
use crate::util::random_alphanumeric_string;

const POLICY_NAME_SUFFIX_LENGTH: usize = 12;

impl S3Client {
    /// Create all the resources for an S3 bucket stack.
    ///
    /// Resources already recorded in the inventory are not re-created; the
    /// recipe resumes from the first missing step.
    pub async fn create_stack(
        &mut self,
        config: &S3Config,
        inventory: &mut S3Inventory,
    ) -> Result<()> {
        if !inventory.region.is_empty()
            && !config.region.is_empty()
            && inventory.region != config.region
        {
            bail!(
                "config region {} and inventory region {} do not match",
                config.region,
                inventory.region
            );
        }
        let region = if !config.region.is_empty() {
            config.region.clone()
        } else if !inventory.region.is_empty() {
            inventory.region.clone()
        } else {
            self.client.region().unwrap_or_default()
        };
        if !region.is_empty() {
            self.client.set_region(&region);
        }
        inventory.region = region.clone();

        let s3_tags = s3_tags(&config.name, &config.tags)?;
        let iam_tags = iam_tags(&config.name, &config.tags)?;

        // Bucket
        self.client.ensure_active()?;
        if inventory.bucket_name.is_empty() {
            let bucket_name = self.create_bucket(&s3_tags, &config.name, &region).await?;
            inventory.bucket_name = bucket_name.clone();
            self.record(inventory).await?;
            self.send_message(format!("S3 bucket {bucket_name} created"))
                .await;
        } else {
            self.send_message(format!(
                "S3 bucket found in inventory: {}",
                inventory.bucket_name
            ))
            .await;
        }

        // Access Point
        self.client.ensure_active()?;
        if inventory.access_point_name.is_empty() {
            let access_point_name = self
                .create_access_point(
                    &config.name,
                    &inventory.bucket_name,
                    &config.aws_account,
                    &config.vpc_id_read_write_access,
                )
                .await?;
            inventory.access_point_name = access_point_name.clone();
            inventory.aws_account = config.aws_account.clone();
            self.record(inventory).await?;
            self.send_message(format!("S3 bucket access point {access_point_name} created"))
                .await;
        } else {
            self.send_message(format!(
                "S3 bucket access point found in inventory: {}",
                inventory.access_point_name
            ))
            .await;
        }

        // Access Control List
        self.client.ensure_active()?;
        self.create_acl(&inventory.bucket_name, config.public_read_access)
            .await?;

        // IAM Policy
        self.client.ensure_active()?;
        if inventory.policy_arn.is_empty() {
            let name_suffix = random_alphanumeric_string(POLICY_NAME_SUFFIX_LENGTH);
            let policy = self
                .create_policy(
                    &iam_tags,
                    &inventory.bucket_name,
                    &config.workload_read_write_access.service_account_name,
                    &name_suffix,
                )
                .await?;
            inventory.policy_arn = policy.arn.clone();
            self.record(inventory).await?;
            self.send_message(format!("IAM policy {} created", policy.name))
                .await;
        } else {
            self.send_message(format!(
                "IAM policy found in inventory: {}",
                inventory.policy_arn
            ))
            .await;
        }

        // IAM Role
        self.client.ensure_active()?;
        if inventory.role.is_empty() {
            let role = self
                .create_role(
                    &iam_tags,
                    &inventory.policy_arn.clone(),
                    &config.aws_account,
                    &config.workload_read_write_access.oidc_url,
                    &config.workload_read_write_access.service_account_name,
                    &config.workload_read_write_access.service_account_namespace,
                )
                .await?;
            inventory.role = role.clone();
            self.record(inventory).await?;
            self.send_message(format!("IAM role {} created", role.role_name))
                .await;
        } else {
            self.send_message(format!(
                "IAM role found in inventory: {}",
                inventory.role.role_name
            ))
            .await;
        }

        Ok(())
    }

    /// Delete every resource recorded in the inventory: the access point,
    /// then the bucket, then the role (detaching its policies), then the
    /// policy.
    pub async fn delete_stack(&mut self, inventory: &mut S3Inventory) -> Result<()> {
        if !inventory.region.is_empty() {
            let region = inventory.region.clone();
            self.client.set_region(&region);
        }

        // Access Point
        self.client.ensure_active()?;
        self.delete_access_point(&inventory.access_point_name, &inventory.aws_account)
            .await?;
        self.send_message(format!(
            "S3 bucket access point {} deleted",
            inventory.access_point_name
        ))
        .await;
        inventory.access_point_name.clear();
        self.record(inventory).await?;

        // Bucket
        self.client.ensure_active()?;
        self.delete_bucket(&inventory.bucket_name).await?;
        self.send_message(format!("S3 bucket {} deleted", inventory.bucket_name))
            .await;
        inventory.bucket_name.clear();
        self.record(inventory).await?;

        // IAM Role
        self.client.ensure_active()?;
        self.delete_role(&inventory.role.clone()).await?;
        self.send_message(format!("IAM role {} deleted", inventory.role.role_name))
            .await;
        inventory.role = Default::default();
        self.record(inventory).await?;

        // IAM Policy
        self.client.ensure_active()?;
        self.delete_policy(&inventory.policy_arn).await?;
        self.send_message(format!(
            "IAM policy with ARN {} deleted",
            inventory.policy_arn
        ))
        .await;
        inventory.policy_arn.clear();
        self.record(inventory).await?;

        Ok(())
    }
}
