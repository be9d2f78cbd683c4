//! VPC creation and deletion.

use anyhow::{Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{AttributeBooleanValue, ResourceType, Tag};

use super::EksClient;
use crate::ec2::{find_vpc_by_tags, vpc_dns_hostnames_enabled, vpc_dns_support_enabled};
use crate::error::is_not_found;
use crate::tags::{ec2_tag_spec, with_tag};

impl EksClient {
    /// Create the VPC for the cluster, or adopt an existing one with
    /// matching tags.
    ///
    /// DNS support and DNS hostnames are required by EKS; when adopting, any
    /// missing attribute is applied so adoption converges with fresh
    /// creation.
    pub(crate) async fn create_vpc(
        &self,
        tags: &[Tag],
        cidr_block: &str,
        cluster_name: &str,
    ) -> Result<String> {
        let ec2 = self.client.ec2();

        // VPCs have no unique names, so check for an existing VPC with
        // matching tags up front
        if let Some(vpc) = find_vpc_by_tags(&ec2, tags).await? {
            let vpc_id = vpc
                .vpc_id()
                .context("no VPC ID on VPC found by tags")?
                .to_string();

            if !vpc_dns_support_enabled(&ec2, &vpc_id).await? {
                self.enable_dns_support(&vpc_id).await?;
            }
            if !vpc_dns_hostnames_enabled(&ec2, &vpc_id).await? {
                self.enable_dns_hostnames(&vpc_id).await?;
            }

            return Ok(vpc_id);
        }

        let vpc_tags = with_tag(
            &with_tag(tags, "kubernetes.io/cluster/cluster-name", cluster_name),
            &format!("kubernetes.io/cluster/{cluster_name}"),
            "shared",
        );

        let resp = ec2
            .create_vpc()
            .cidr_block(cidr_block)
            .tag_specifications(ec2_tag_spec(ResourceType::Vpc, &vpc_tags))
            .send()
            .await
            .with_context(|| format!("failed to create VPC for cluster {cluster_name}"))?;

        let vpc_id = resp
            .vpc()
            .and_then(|vpc| vpc.vpc_id())
            .context("no VPC ID in create response")?
            .to_string();

        self.enable_dns_support(&vpc_id).await?;
        self.enable_dns_hostnames(&vpc_id).await?;

        Ok(vpc_id)
    }

    /// Delete the VPC. Missing VPCs are treated as already deleted.
    pub(crate) async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        if vpc_id.is_empty() {
            return Ok(());
        }

        match self.client.ec2().delete_vpc().vpc_id(vpc_id).send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete VPC with ID {vpc_id}")),
        }
    }

    async fn enable_dns_support(&self, vpc_id: &str) -> Result<()> {
        self.client
            .ec2()
            .modify_vpc_attribute()
            .vpc_id(vpc_id)
            .enable_dns_support(AttributeBooleanValue::builder().value(true).build())
            .send()
            .await
            .with_context(|| {
                format!("failed to enable DNS support for VPC with ID {vpc_id}")
            })?;
        Ok(())
    }

    async fn enable_dns_hostnames(&self, vpc_id: &str) -> Result<()> {
        self.client
            .ec2()
            .modify_vpc_attribute()
            .vpc_id(vpc_id)
            .enable_dns_hostnames(AttributeBooleanValue::builder().value(true).build())
            .send()
            .await
            .with_context(|| {
                format!("failed to enable DNS hostnames for VPC with ID {vpc_id}")
            })?;
        Ok(())
    }
}
