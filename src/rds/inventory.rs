//! RDS stack inventory.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RdsInventory {
    pub region: String,
    pub security_group_id: String,
    pub subnet_group_name: String,
    pub rds_instance_id: String,
    pub rds_instance_endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_inventory() {
        let inventory = RdsInventory {
            region: "us-west-2".to_string(),
            security_group_id: "sg-123".to_string(),
            subnet_group_name: "demo-subnet-group".to_string(),
            rds_instance_id: "demo".to_string(),
            rds_instance_endpoint: "demo.abc.us-west-2.rds.amazonaws.com".to_string(),
        };
        let json = serde_json::to_string_pretty(&inventory).unwrap();
        assert_eq!(inventory, serde_json::from_str(&json).unwrap());
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let json = serde_json::to_value(RdsInventory::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("securityGroupId"));
        assert!(obj.contains_key("subnetGroupName"));
        assert!(obj.contains_key("rdsInstanceId"));
        assert!(obj.contains_key("rdsInstanceEndpoint"));
    }
}
