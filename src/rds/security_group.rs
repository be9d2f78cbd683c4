//! Security group for the RDS instance.

use anyhow::{Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{IpPermission, ResourceType, Tag, UserIdGroupPair};

use super::RdsClient;
use crate::ec2::find_security_group_by_tags;
use crate::error::{is_already_exists, is_not_found};
use crate::tags::ec2_tag_spec;

impl RdsClient {
    /// Create the security group for the RDS instance, with an ingress rule
    /// admitting DB clients from the caller's workload security group on the
    /// database port and an open egress rule.
    ///
    /// If a group with matching name and tags already exists it is adopted.
    pub(crate) async fn create_security_group(
        &self,
        tags: &[Tag],
        instance_name: &str,
        vpc_id: &str,
        port: i32,
        source_security_group_id: &str,
        aws_account: &str,
    ) -> Result<String> {
        let ec2 = self.client.ec2();

        let group_name = format!("{instance_name}-rds-sg");
        let description = format!("security group for RDS instance {instance_name}");

        let group_id = match ec2
            .create_security_group()
            .description(&description)
            .group_name(&group_name)
            .vpc_id(vpc_id)
            .tag_specifications(ec2_tag_spec(ResourceType::SecurityGroup, tags))
            .send()
            .await
        {
            Ok(resp) => resp
                .group_id()
                .context("no group ID in create response")?
                .to_string(),
            Err(e) if is_already_exists(e.code()) => {
                // a group with this name already exists - adopt it if the
                // tags also match
                let existing = find_security_group_by_tags(&ec2, &group_name, tags)
                    .await
                    .with_context(|| {
                        format!(
                            "failed to check for unique tags on security group with name {group_name}"
                        )
                    })?;
                return existing.with_context(|| {
                    format!("security group {group_name} exists but tags do not match")
                });
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to create security group for RDS instance {instance_name}")
                })
            }
        };

        let ingress = IpPermission::builder()
            .from_port(port)
            .to_port(port)
            .ip_protocol("tcp")
            .user_id_group_pairs(
                UserIdGroupPair::builder()
                    .description("allow DB clients from local VPC")
                    .group_id(source_security_group_id)
                    .user_id(aws_account)
                    .vpc_id(vpc_id)
                    .build(),
            )
            .build();
        ec2.authorize_security_group_ingress()
            .group_id(&group_id)
            .ip_permissions(ingress)
            .tag_specifications(ec2_tag_spec(ResourceType::SecurityGroupRule, tags))
            .send()
            .await
            .with_context(|| {
                format!("failed to authorize ingress rule on security group for RDS instance {instance_name}")
            })?;

        let egress = IpPermission::builder()
            .from_port(-1)
            .to_port(-1)
            .ip_protocol("tcp")
            .build();
        ec2.authorize_security_group_egress()
            .group_id(&group_id)
            .ip_permissions(egress)
            .tag_specifications(ec2_tag_spec(ResourceType::SecurityGroupRule, tags))
            .send()
            .await
            .with_context(|| {
                format!("failed to authorize egress rule on security group for RDS instance {instance_name}")
            })?;

        Ok(group_id)
    }

    /// Delete the security group. A missing group is treated as already
    /// deleted.
    pub(crate) async fn delete_security_group(&self, security_group_id: &str) -> Result<()> {
        if security_group_id.is_empty() {
            return Ok(());
        }

        match self
            .client
            .ec2()
            .delete_security_group()
            .group_id(security_group_id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("failed to delete security group with ID {security_group_id}")
            }),
        }
    }
}
