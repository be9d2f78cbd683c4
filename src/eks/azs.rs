//! Availability zone planning.
//!
//! If the config supplies explicit zones and CIDRs they are adopted
//! verbatim. Otherwise the region's zones are enumerated and public/private
//! subnet CIDRs are assigned in pairs from a fixed six-slot pool, capped at
//! three zones.

use anyhow::{bail, Context, Result};
use aws_sdk_ec2::types::Filter;

use super::config::AvailabilityZoneConfig;
use super::inventory::{AvailabilityZoneInventory, SubnetInventory};
use super::EksClient;

const MAX_AZ_COUNT: i32 = 3;
const DEFAULT_AZ_COUNT: i32 = 2;

fn default_cidrs() -> [&'static str; 6] {
    [
        "10.0.0.0/22",
        "10.0.4.0/22",
        "10.0.8.0/22",
        "10.0.12.0/22",
        "10.0.16.0/22",
        "10.0.20.0/22",
    ]
}

impl EksClient {
    /// Plan the availability zones for the stack.
    pub(crate) async fn plan_availability_zones(
        &self,
        region: &str,
        desired_az_count: i32,
        az_config: &[AvailabilityZoneConfig],
    ) -> Result<Vec<AvailabilityZoneInventory>> {
        if region.is_empty() {
            bail!("region is not set in resource config");
        }

        if !az_config.is_empty() {
            return Ok(zones_from_config(az_config));
        }

        let desired = if desired_az_count == 0 {
            DEFAULT_AZ_COUNT
        } else {
            desired_az_count
        };

        let zone_names = self
            .region_zone_names(region)
            .await
            .with_context(|| format!("failed to get availability zones for region {region}"))?;

        Ok(assign_zone_cidrs(&zone_names, desired, &default_cidrs()))
    }

    /// Enumerate the zone names for a region.
    async fn region_zone_names(&self, region: &str) -> Result<Vec<String>> {
        let resp = self
            .client
            .ec2()
            .describe_availability_zones()
            .filters(Filter::builder().name("region-name").values(region).build())
            .send()
            .await
            .context("failed to describe availability zones")?;

        Ok(resp
            .availability_zones()
            .iter()
            .filter_map(|az| az.zone_name().map(str::to_string))
            .collect())
    }
}

/// Adopt zones and CIDRs supplied explicitly in the config.
pub(crate) fn zones_from_config(
    az_config: &[AvailabilityZoneConfig],
) -> Vec<AvailabilityZoneInventory> {
    az_config
        .iter()
        .map(|az| AvailabilityZoneInventory {
            zone: az.zone.clone(),
            public_subnets: vec![SubnetInventory {
                subnet_id: String::new(),
                subnet_cidr: az.public_subnet_cidr.clone(),
            }],
            private_subnets: vec![SubnetInventory {
                subnet_id: String::new(),
                subnet_cidr: az.private_subnet_cidr.clone(),
            }],
            nat_gateway_id: String::new(),
        })
        .collect()
}

/// Assign public/private CIDR pairs to zones from the pool, capping the zone
/// count at [`MAX_AZ_COUNT`].
pub(crate) fn assign_zone_cidrs(
    zone_names: &[String],
    desired: i32,
    cidr_blocks: &[&str],
) -> Vec<AvailabilityZoneInventory> {
    let count = desired.min(MAX_AZ_COUNT).max(0) as usize;

    zone_names
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, zone)| AvailabilityZoneInventory {
            zone: zone.clone(),
            public_subnets: vec![SubnetInventory {
                subnet_id: String::new(),
                subnet_cidr: cidr_blocks[i * 2].to_string(),
            }],
            private_subnets: vec![SubnetInventory {
                subnet_id: String::new(),
                subnet_cidr: cidr_blocks[i * 2 + 1].to_string(),
            }],
            nat_gateway_id: String::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn assigns_cidr_pairs_in_order() {
        let zones = assign_zone_cidrs(
            &zone_names(&["us-east-2a", "us-east-2b", "us-east-2c"]),
            2,
            &default_cidrs(),
        );
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone, "us-east-2a");
        assert_eq!(zones[0].public_subnets[0].subnet_cidr, "10.0.0.0/22");
        assert_eq!(zones[0].private_subnets[0].subnet_cidr, "10.0.4.0/22");
        assert_eq!(zones[1].public_subnets[0].subnet_cidr, "10.0.8.0/22");
        assert_eq!(zones[1].private_subnets[0].subnet_cidr, "10.0.12.0/22");
    }

    #[test]
    fn caps_at_three_zones() {
        let zones = assign_zone_cidrs(
            &zone_names(&["a", "b", "c", "d"]),
            5,
            &default_cidrs(),
        );
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[2].public_subnets[0].subnet_cidr, "10.0.16.0/22");
        assert_eq!(zones[2].private_subnets[0].subnet_cidr, "10.0.20.0/22");
    }

    #[test]
    fn fewer_zones_than_desired_uses_what_exists() {
        let zones = assign_zone_cidrs(&zone_names(&["a"]), 3, &default_cidrs());
        assert_eq!(zones.len(), 1);
    }

    #[test]
    fn explicit_config_adopted_verbatim() {
        let config = vec![AvailabilityZoneConfig {
            zone: "eu-west-1a".to_string(),
            public_subnet_cidr: "172.16.0.0/24".to_string(),
            private_subnet_cidr: "172.16.1.0/24".to_string(),
        }];
        let zones = zones_from_config(&config);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].zone, "eu-west-1a");
        assert_eq!(zones[0].public_subnets[0].subnet_cidr, "172.16.0.0/24");
        assert_eq!(zones[0].private_subnets[0].subnet_cidr, "172.16.1.0/24");
        assert!(zones[0].nat_gateway_id.is_empty());
    }
}
