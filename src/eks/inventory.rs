//! EKS stack inventory.
//!
//! A record of every resource the stack has created, in the shape it is
//! persisted to disk. Fields are monotonic: empty to populated during
//! create, populated to empty during delete. The availability-zone sequence
//! has stable indices so the subnet and NAT-gateway slots for zone *i* stay
//! at index *i* across runs.

use serde::{Deserialize, Serialize};

use crate::inventory::RoleInventory;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EksInventory {
    pub region: String,
    pub availability_zones: Vec<AvailabilityZoneInventory>,
    pub vpc_id: String,
    pub internet_gateway_id: String,
    pub elastic_ip_ids: Vec<String>,
    pub public_route_table_id: String,
    pub private_route_table_ids: Vec<String>,
    pub cluster_role: RoleInventory,
    pub worker_role: RoleInventory,
    pub dns_management_role: RoleInventory,
    pub dns01_challenge_role: RoleInventory,
    pub secrets_manager_role: RoleInventory,
    pub cluster_autoscaling_role: RoleInventory,
    pub storage_management_role: RoleInventory,
    pub policy_arns: Vec<String>,
    pub cluster: ClusterInventory,
    pub node_group_names: Vec<String>,
    pub oidc_provider_arn: String,
    pub security_group_id: String,
}

/// One availability zone in use by the stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityZoneInventory {
    pub zone: String,
    pub public_subnets: Vec<SubnetInventory>,
    pub private_subnets: Vec<SubnetInventory>,
    pub nat_gateway_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubnetInventory {
    pub subnet_id: String,
    pub subnet_cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterInventory {
    pub cluster_name: String,
    pub cluster_arn: String,
    pub oidc_provider_url: String,
}

impl EksInventory {
    /// Recorded public subnet IDs, in zone order.
    pub fn public_subnet_ids(&self) -> Vec<String> {
        self.availability_zones
            .iter()
            .flat_map(|az| &az.public_subnets)
            .filter(|subnet| !subnet.subnet_id.is_empty())
            .map(|subnet| subnet.subnet_id.clone())
            .collect()
    }

    /// Recorded private subnet IDs, in zone order.
    pub fn private_subnet_ids(&self) -> Vec<String> {
        self.availability_zones
            .iter()
            .flat_map(|az| &az.private_subnets)
            .filter(|subnet| !subnet.subnet_id.is_empty())
            .map(|subnet| subnet.subnet_id.clone())
            .collect()
    }

    /// True when every public subnet slot has an ID.
    pub fn all_public_subnets_recorded(&self) -> bool {
        !self.availability_zones.is_empty()
            && self
                .availability_zones
                .iter()
                .flat_map(|az| &az.public_subnets)
                .all(|subnet| !subnet.subnet_id.is_empty())
    }

    /// True when every private subnet slot has an ID.
    pub fn all_private_subnets_recorded(&self) -> bool {
        !self.availability_zones.is_empty()
            && self
                .availability_zones
                .iter()
                .flat_map(|az| &az.private_subnets)
                .all(|subnet| !subnet.subnet_id.is_empty())
    }

    /// Recorded NAT gateway IDs, in zone order.
    pub fn nat_gateway_ids(&self) -> Vec<String> {
        self.availability_zones
            .iter()
            .filter(|az| !az.nat_gateway_id.is_empty())
            .map(|az| az.nat_gateway_id.clone())
            .collect()
    }

    /// True when every zone has a NAT gateway recorded.
    pub fn all_nat_gateways_recorded(&self) -> bool {
        !self.availability_zones.is_empty()
            && self
                .availability_zones
                .iter()
                .all(|az| !az.nat_gateway_id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EksInventory {
        EksInventory {
            region: "us-east-2".to_string(),
            availability_zones: vec![
                AvailabilityZoneInventory {
                    zone: "us-east-2a".to_string(),
                    public_subnets: vec![SubnetInventory {
                        subnet_id: "subnet-pub-a".to_string(),
                        subnet_cidr: "10.0.0.0/22".to_string(),
                    }],
                    private_subnets: vec![SubnetInventory {
                        subnet_id: "subnet-priv-a".to_string(),
                        subnet_cidr: "10.0.4.0/22".to_string(),
                    }],
                    nat_gateway_id: "nat-a".to_string(),
                },
                AvailabilityZoneInventory {
                    zone: "us-east-2b".to_string(),
                    public_subnets: vec![SubnetInventory {
                        subnet_id: "subnet-pub-b".to_string(),
                        subnet_cidr: "10.0.8.0/22".to_string(),
                    }],
                    private_subnets: vec![SubnetInventory {
                        subnet_id: String::new(),
                        subnet_cidr: "10.0.12.0/22".to_string(),
                    }],
                    nat_gateway_id: String::new(),
                },
            ],
            vpc_id: "vpc-123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn round_trip_preserves_inventory() {
        let inventory = sample();
        let json = serde_json::to_string_pretty(&inventory).unwrap();
        let loaded: EksInventory = serde_json::from_str(&json).unwrap();
        assert_eq!(inventory, loaded);
    }

    #[test]
    fn serialises_with_camel_case_keys_and_empty_arrays() {
        let json = serde_json::to_value(EksInventory::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("availabilityZones"));
        assert!(obj.contains_key("internetGatewayId"));
        assert!(obj.contains_key("publicRouteTableId"));
        assert!(obj.contains_key("dns01ChallengeRole"));
        assert!(obj.contains_key("secretsManagerRole"));
        assert_eq!(obj["elasticIpIds"], serde_json::json!([]));
        assert_eq!(obj["nodeGroupNames"], serde_json::json!([]));
    }

    #[test]
    fn subnet_accessors_respect_zone_order_and_gaps() {
        let inventory = sample();
        assert_eq!(inventory.public_subnet_ids(), vec!["subnet-pub-a", "subnet-pub-b"]);
        assert_eq!(inventory.private_subnet_ids(), vec!["subnet-priv-a"]);
        assert!(inventory.all_public_subnets_recorded());
        assert!(!inventory.all_private_subnets_recorded());
        assert!(!inventory.all_nat_gateways_recorded());
        assert_eq!(inventory.nat_gateway_ids(), vec!["nat-a"]);
    }

    #[test]
    fn empty_inventory_reports_nothing_recorded() {
        let inventory = EksInventory::default();
        assert!(!inventory.all_public_subnets_recorded());
        assert!(!inventory.all_nat_gateways_recorded());
        assert!(inventory.public_subnet_ids().is_empty());
    }
}
