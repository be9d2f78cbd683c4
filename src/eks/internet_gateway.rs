//! Internet gateway creation, attachment and deletion.

use anyhow::{Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{ResourceType, Tag};

use super::EksClient;
use crate::ec2::find_internet_gateway_by_tags;
use crate::error::{is_already_associated, is_not_found};
use crate::tags::ec2_tag_spec;

impl EksClient {
    /// Create the internet gateway for the VPC, or adopt an existing one
    /// with matching tags, and attach it to the VPC. Attaching a gateway
    /// that is already attached to this VPC is treated as success.
    pub(crate) async fn create_internet_gateway(
        &self,
        tags: &[Tag],
        vpc_id: &str,
    ) -> Result<String> {
        let ec2 = self.client.ec2();

        // internet gateways have no unique names, so check for an existing
        // gateway with matching tags up front
        let igw_id = match find_internet_gateway_by_tags(&ec2, tags).await? {
            Some(igw) => igw
                .internet_gateway_id()
                .context("no ID on internet gateway found by tags")?
                .to_string(),
            None => {
                let resp = ec2
                    .create_internet_gateway()
                    .tag_specifications(ec2_tag_spec(ResourceType::InternetGateway, tags))
                    .send()
                    .await
                    .context("failed to create internet gateway")?;
                resp.internet_gateway()
                    .and_then(|igw| igw.internet_gateway_id())
                    .context("no internet gateway ID in create response")?
                    .to_string()
            }
        };

        match ec2
            .attach_internet_gateway()
            .internet_gateway_id(&igw_id)
            .vpc_id(vpc_id)
            .send()
            .await
        {
            Ok(_) => Ok(igw_id),
            Err(e) if is_already_associated(e.code()) => Ok(igw_id),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "failed to attach internet gateway with ID {igw_id} to VPC with ID {vpc_id}"
                )
            }),
        }
    }

    /// Detach and delete the internet gateway. Missing gateways are treated
    /// as already deleted.
    pub(crate) async fn delete_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<()> {
        if internet_gateway_id.is_empty() {
            return Ok(());
        }

        let ec2 = self.client.ec2();

        match ec2
            .detach_internet_gateway()
            .internet_gateway_id(internet_gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
        {
            Ok(_) => {}
            Err(e) if is_not_found(e.code()) => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to detach internet gateway with ID {internet_gateway_id}")
                })
            }
        }

        match ec2
            .delete_internet_gateway()
            .internet_gateway_id(internet_gateway_id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("failed to delete internet gateway with ID {internet_gateway_id}")
            }),
        }
    }
}
