//! Elastic IP allocation and release.

use anyhow::{Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{DomainType, ResourceType, Tag};

use super::inventory::AvailabilityZoneInventory;
use super::EksClient;
use crate::ec2::find_elastic_ip_by_tags;
use crate::error::is_not_found;
use crate::tags::{ec2_tag_spec, with_tag};

impl EksClient {
    /// Allocate one elastic IP per public subnet for the NAT gateways, or
    /// adopt existing allocations with matching tags.
    ///
    /// Elastic IPs carry an auto-incrementing `ElasticIpRef` tag so each
    /// allocation has a distinct identity across re-runs.
    pub(crate) async fn create_elastic_ips(
        &self,
        tags: &[Tag],
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<Vec<String>> {
        let ec2 = self.client.ec2();
        let mut allocation_ids = Vec::new();
        let mut eip_ref = 1;

        for az in az_inventory {
            for _ in &az.public_subnets {
                let eip_tags = with_tag(tags, "ElasticIpRef", &eip_ref.to_string());
                eip_ref += 1;

                // elastic IPs have no unique names, so check for an existing
                // allocation with matching tags up front
                if let Some(eip) = find_elastic_ip_by_tags(&ec2, &eip_tags).await? {
                    allocation_ids.push(
                        eip.allocation_id()
                            .context("no allocation ID on elastic IP found by tags")?
                            .to_string(),
                    );
                    continue;
                }

                let resp = ec2
                    .allocate_address()
                    .domain(DomainType::Vpc)
                    .tag_specifications(ec2_tag_spec(ResourceType::ElasticIp, &eip_tags))
                    .send()
                    .await
                    .context("failed to create elastic IP")?;
                allocation_ids.push(
                    resp.allocation_id()
                        .context("no allocation ID in allocate response")?
                        .to_string(),
                );
            }
        }

        Ok(allocation_ids)
    }

    /// Release every recorded elastic IP. Missing allocations are skipped.
    pub(crate) async fn delete_elastic_ips(&self, allocation_ids: &[String]) -> Result<()> {
        if allocation_ids.is_empty() {
            return Ok(());
        }

        let ec2 = self.client.ec2();
        for allocation_id in allocation_ids {
            match ec2
                .release_address()
                .allocation_id(allocation_id)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to delete elastic IP with ID {allocation_id}")
                    })
                }
            }
        }

        Ok(())
    }
}
