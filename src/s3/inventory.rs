//! S3 stack inventory.

use serde::{Deserialize, Serialize};

use crate::inventory::RoleInventory;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct S3Inventory {
    pub aws_account: String,
    pub region: String,
    pub bucket_name: String,
    pub access_point_name: String,
    pub policy_arn: String,
    pub role: RoleInventory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_inventory() {
        let inventory = S3Inventory {
            aws_account: "111111111111".to_string(),
            region: "us-east-2".to_string(),
            bucket_name: "demo-4f9a".to_string(),
            access_point_name: "demo".to_string(),
            policy_arn: "arn:aws:iam::111111111111:policy/uploader-abc".to_string(),
            role: RoleInventory {
                role_name: "uploader".to_string(),
                role_arn: "arn:aws:iam::111111111111:role/uploader".to_string(),
                role_policy_arns: vec!["arn:aws:iam::111111111111:policy/uploader-abc".to_string()],
            },
        };
        let json = serde_json::to_string_pretty(&inventory).unwrap();
        assert_eq!(inventory, serde_json::from_str(&json).unwrap());
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let json = serde_json::to_value(S3Inventory::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("awsAccount"));
        assert!(obj.contains_key("bucketName"));
        assert!(obj.contains_key("accessPointName"));
        assert!(obj.contains_key("policyArn"));
        assert!(obj.contains_key("role"));
    }
}
