//! Public and private subnet creation and deletion.

use anyhow::{Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{AttributeBooleanValue, ResourceType, Tag};

use super::inventory::AvailabilityZoneInventory;
use super::EksClient;
use crate::ec2::find_subnet_by_tags;
use crate::error::is_not_found;
use crate::tags::{ec2_tag_spec, with_tag};

impl EksClient {
    /// Create the public subnet for each availability zone, or adopt
    /// existing subnets with matching tags and CIDR.
    ///
    /// Public subnets are tagged for external load balancers and configured
    /// to assign public IPs on launch; an adopted subnet missing that
    /// attribute has it applied.
    ///
    /// Returns the updated zone inventory and the subnet IDs. The inventory
    /// is modified on a copy so a mid-loop failure records nothing; the
    /// already-created subnets are re-adopted by tags on the next run.
    pub(crate) async fn create_public_subnets(
        &self,
        tags: &[Tag],
        vpc_id: &str,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<(Vec<AvailabilityZoneInventory>, Vec<String>)> {
        let ec2 = self.client.ec2();
        let subnet_tags = with_tag(tags, "kubernetes.io/role/elb", "1");

        let mut zones = az_inventory.to_vec();
        let mut subnet_ids = Vec::new();

        for az_idx in 0..zones.len() {
            let zone = zones[az_idx].zone.clone();
            for subnet_idx in 0..zones[az_idx].public_subnets.len() {
                let cidr = zones[az_idx].public_subnets[subnet_idx].subnet_cidr.clone();

                // subnets have no unique names, so check for an existing
                // subnet with matching tags up front
                if let Some(existing) = find_subnet_by_tags(&ec2, &subnet_tags, &cidr).await? {
                    let subnet_id = existing
                        .subnet_id()
                        .context("no subnet ID on subnet found by tags")?
                        .to_string();
                    if existing.map_public_ip_on_launch() != Some(true) {
                        self.map_public_ips_for_subnet(&subnet_id).await?;
                    }
                    zones[az_idx].public_subnets[subnet_idx].subnet_id = subnet_id.clone();
                    subnet_ids.push(subnet_id);
                    continue;
                }

                let resp = ec2
                    .create_subnet()
                    .vpc_id(vpc_id)
                    .availability_zone(&zone)
                    .cidr_block(&cidr)
                    .tag_specifications(ec2_tag_spec(ResourceType::Subnet, &subnet_tags))
                    .send()
                    .await
                    .with_context(|| {
                        format!("failed to create public subnet for VPC with ID {vpc_id}")
                    })?;
                let subnet_id = resp
                    .subnet()
                    .and_then(|subnet| subnet.subnet_id())
                    .context("no subnet ID in create response")?
                    .to_string();

                self.map_public_ips_for_subnet(&subnet_id).await?;

                zones[az_idx].public_subnets[subnet_idx].subnet_id = subnet_id.clone();
                subnet_ids.push(subnet_id);
            }
        }

        Ok((zones, subnet_ids))
    }

    /// Create the private subnet for each availability zone, or adopt
    /// existing subnets with matching tags and CIDR. Private subnets are
    /// tagged for internal load balancers.
    pub(crate) async fn create_private_subnets(
        &self,
        tags: &[Tag],
        vpc_id: &str,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<(Vec<AvailabilityZoneInventory>, Vec<String>)> {
        let ec2 = self.client.ec2();
        let subnet_tags = with_tag(tags, "kubernetes.io/role/internal-elb", "1");

        let mut zones = az_inventory.to_vec();
        let mut subnet_ids = Vec::new();

        for az_idx in 0..zones.len() {
            let zone = zones[az_idx].zone.clone();
            for subnet_idx in 0..zones[az_idx].private_subnets.len() {
                let cidr = zones[az_idx].private_subnets[subnet_idx]
                    .subnet_cidr
                    .clone();

                if let Some(existing) = find_subnet_by_tags(&ec2, &subnet_tags, &cidr).await? {
                    let subnet_id = existing
                        .subnet_id()
                        .context("no subnet ID on subnet found by tags")?
                        .to_string();
                    zones[az_idx].private_subnets[subnet_idx].subnet_id = subnet_id.clone();
                    subnet_ids.push(subnet_id);
                    continue;
                }

                let resp = ec2
                    .create_subnet()
                    .vpc_id(vpc_id)
                    .availability_zone(&zone)
                    .cidr_block(&cidr)
                    .tag_specifications(ec2_tag_spec(ResourceType::Subnet, &subnet_tags))
                    .send()
                    .await
                    .with_context(|| {
                        format!("failed to create private subnet for VPC with ID {vpc_id}")
                    })?;
                let subnet_id = resp
                    .subnet()
                    .and_then(|subnet| subnet.subnet_id())
                    .context("no subnet ID in create response")?
                    .to_string();

                zones[az_idx].private_subnets[subnet_idx].subnet_id = subnet_id.clone();
                subnet_ids.push(subnet_id);
            }
        }

        Ok((zones, subnet_ids))
    }

    /// Delete every recorded subnet. Missing subnets are skipped.
    ///
    /// Returns the zone inventory with all subnet IDs cleared plus the IDs
    /// that were deleted.
    pub(crate) async fn delete_subnets(
        &self,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<(Vec<AvailabilityZoneInventory>, Vec<String>)> {
        let mut zones = az_inventory.to_vec();
        let mut subnet_ids = Vec::new();

        for az in &mut zones {
            for subnet in az.public_subnets.iter_mut().chain(az.private_subnets.iter_mut()) {
                if !subnet.subnet_id.is_empty() {
                    subnet_ids.push(std::mem::take(&mut subnet.subnet_id));
                }
            }
        }

        if subnet_ids.is_empty() {
            return Ok((zones, subnet_ids));
        }

        let ec2 = self.client.ec2();
        for subnet_id in &subnet_ids {
            match ec2.delete_subnet().subnet_id(subnet_id).send().await {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to delete subnet with ID {subnet_id}")
                    })
                }
            }
        }

        Ok((zones, subnet_ids))
    }

    /// Configure a subnet so instances launched in it get a public IP.
    async fn map_public_ips_for_subnet(&self, subnet_id: &str) -> Result<()> {
        self.client
            .ec2()
            .modify_subnet_attribute()
            .subnet_id(subnet_id)
            .map_public_ip_on_launch(AttributeBooleanValue::builder().value(true).build())
            .send()
            .await
            .with_context(|| {
                format!("failed to modify subnet attribute for subnet with ID {subnet_id}")
            })?;
        Ok(())
    }
}
