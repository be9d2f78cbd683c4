//! NAT gateway creation, deletion and condition waits.

use anyhow::{bail, Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{Filter, NatGatewayState, ResourceType, Tag};

use super::inventory::AvailabilityZoneInventory;
use super::EksClient;
use crate::ec2::find_nat_gateway_by_tags;
use crate::error::is_not_found;
use crate::tags::ec2_tag_spec;
use crate::wait::{wait_for_condition, WaitConfig};

/// Condition a NAT gateway wait resolves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatGatewayCondition {
    Created,
    Deleted,
}

const NAT_GATEWAY_WAIT: WaitConfig = WaitConfig::new(15, 20);

impl EksClient {
    /// Create a NAT gateway in each availability zone's public subnet,
    /// allocating that zone's elastic IP. Gateways whose tags already match
    /// in the target subnet are left as they are.
    pub(crate) async fn create_nat_gateways(
        &self,
        tags: &[Tag],
        az_inventory: &[AvailabilityZoneInventory],
        elastic_ip_ids: &[String],
    ) -> Result<()> {
        if elastic_ip_ids.len() < az_inventory.len() {
            bail!(
                "have {} elastic IPs for {} availability zones",
                elastic_ip_ids.len(),
                az_inventory.len()
            );
        }

        let ec2 = self.client.ec2();

        for (az, allocation_id) in az_inventory.iter().zip(elastic_ip_ids) {
            for public_subnet in &az.public_subnets {
                // NAT gateways have no unique names, so check for an existing
                // gateway with matching tags in this subnet up front
                let existing =
                    find_nat_gateway_by_tags(&ec2, tags, &public_subnet.subnet_id).await?;
                if existing.is_some() {
                    continue;
                }

                ec2.create_nat_gateway()
                    .subnet_id(&public_subnet.subnet_id)
                    .allocation_id(allocation_id)
                    .tag_specifications(ec2_tag_spec(ResourceType::Natgateway, tags))
                    .send()
                    .await
                    .with_context(|| {
                        format!(
                            "failed to create NAT gateway in subnet with ID {}",
                            public_subnet.subnet_id
                        )
                    })?;
            }
        }

        Ok(())
    }

    /// Delete every recorded NAT gateway. Missing gateways are skipped.
    pub(crate) async fn delete_nat_gateways(
        &self,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<Vec<String>> {
        let nat_gateway_ids: Vec<String> = az_inventory
            .iter()
            .filter(|az| !az.nat_gateway_id.is_empty())
            .map(|az| az.nat_gateway_id.clone())
            .collect();

        if nat_gateway_ids.is_empty() {
            return Ok(nat_gateway_ids);
        }

        let ec2 = self.client.ec2();
        for nat_gateway_id in &nat_gateway_ids {
            match ec2
                .delete_nat_gateway()
                .nat_gateway_id(nat_gateway_id)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to delete NAT gateway with ID {nat_gateway_id}")
                    })
                }
            }
        }

        Ok(nat_gateway_ids)
    }

    /// Wait for the VPC's NAT gateways to reach the given condition.
    ///
    /// Polls every relevant gateway in the VPC's public subnets. Gateways in
    /// `failed` or `deleted` state are filtered out as irrelevant so a retry
    /// after a failure can succeed. Returns the zone inventory with gateway
    /// IDs filled in plus those IDs.
    pub(crate) async fn wait_for_nat_gateways(
        &self,
        vpc_id: &str,
        az_inventory: &[AvailabilityZoneInventory],
        condition: NatGatewayCondition,
    ) -> Result<(Vec<AvailabilityZoneInventory>, Vec<String>)> {
        let zones = wait_for_condition(
            NAT_GATEWAY_WAIT,
            self.client.cancellation(),
            "NAT gateway",
            || async {
                let (states, mut zones) = self.nat_gateway_statuses(vpc_id, az_inventory).await?;

                if states.is_empty() && condition == NatGatewayCondition::Deleted {
                    // no relevant gateways left for this VPC, deletion done
                    for az in &mut zones {
                        az.nat_gateway_id.clear();
                    }
                    return Ok(Some(zones));
                }

                let met = states.iter().all(|state| match condition {
                    NatGatewayCondition::Created => *state == NatGatewayState::Available,
                    NatGatewayCondition::Deleted => *state == NatGatewayState::Deleted,
                });
                Ok(met.then_some(zones))
            },
        )
        .await?;

        let nat_gateway_ids = zones
            .iter()
            .filter(|az| !az.nat_gateway_id.is_empty())
            .map(|az| az.nat_gateway_id.clone())
            .collect();

        Ok((zones, nat_gateway_ids))
    }

    /// Describe the VPC's NAT gateways, returning the state of each
    /// relevant gateway and a zone inventory updated with their IDs.
    async fn nat_gateway_statuses(
        &self,
        vpc_id: &str,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<(Vec<NatGatewayState>, Vec<AvailabilityZoneInventory>)> {
        let resp = self
            .client
            .ec2()
            .describe_nat_gateways()
            .filter(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
            .with_context(|| {
                format!("failed to describe NAT gateways for VPC with ID {vpc_id}")
            })?;

        let mut zones = az_inventory.to_vec();
        let mut states = Vec::new();

        for gateway in resp.nat_gateways() {
            let (Some(subnet_id), Some(gateway_id), Some(state)) =
                (gateway.subnet_id(), gateway.nat_gateway_id(), gateway.state())
            else {
                continue;
            };
            if !state_relevant(state) {
                continue;
            }
            for az in &mut zones {
                if az
                    .public_subnets
                    .iter()
                    .any(|subnet| subnet.subnet_id == subnet_id)
                {
                    az.nat_gateway_id = gateway_id.to_string();
                    states.push(state.clone());
                }
            }
        }

        Ok((states, zones))
    }
}

/// Gateways in `failed` or `deleted` state play no part in creating or
/// deleting a stack; filtering them out lets a retry succeed after AWS
/// abandons a failed gateway.
fn state_relevant(state: &NatGatewayState) -> bool {
    !matches!(state, NatGatewayState::Failed | NatGatewayState::Deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_and_deleted_states_are_irrelevant() {
        assert!(!state_relevant(&NatGatewayState::Failed));
        assert!(!state_relevant(&NatGatewayState::Deleted));
        assert!(state_relevant(&NatGatewayState::Pending));
        assert!(state_relevant(&NatGatewayState::Available));
        assert!(state_relevant(&NatGatewayState::Deleting));
    }
}
