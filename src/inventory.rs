//! Shared inventory types and file persistence.
//!
//! Inventory files are indented JSON with lower-camelCase keys. Writes are
//! atomic (temp file + rename) so a crash mid-write can never leave a
//! truncated inventory behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A created IAM role and the policies attached to it.
///
/// The attached policy ARNs are recorded so deletion can detach before
/// deleting, which IAM requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleInventory {
    pub role_name: String,
    pub role_arn: String,
    pub role_policy_arns: Vec<String>,
}

impl RoleInventory {
    pub fn is_empty(&self) -> bool {
        self.role_name.is_empty()
    }
}

/// Serialise `inventory` as indented JSON and atomically replace `path`.
pub async fn write_inventory<I: Serialize>(path: &Path, inventory: &I) -> Result<()> {
    let json = serde_json::to_vec_pretty(inventory).context("failed to marshal inventory to JSON")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json)
        .await
        .with_context(|| format!("failed to write inventory to {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace inventory file {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_inventory_round_trip() {
        let role = RoleInventory {
            role_name: "cluster-role-demo".to_string(),
            role_arn: "arn:aws:iam::111111111111:role/cluster-role-demo".to_string(),
            role_policy_arns: vec!["arn:aws:iam::aws:policy/AmazonEKSClusterPolicy".to_string()],
        };
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(role, serde_json::from_str(&json).unwrap());
    }

    #[test]
    fn role_inventory_uses_camel_case_keys() {
        let json = serde_json::to_value(RoleInventory::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("roleName"));
        assert!(obj.contains_key("roleArn"));
        assert!(obj.contains_key("rolePolicyArns"));
    }

    #[test]
    fn empty_policy_list_serialises_as_empty_array() {
        let json = serde_json::to_string(&RoleInventory::default()).unwrap();
        assert!(json.contains("\"rolePolicyArns\":[]"));
    }

    #[tokio::test]
    async fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inv.json");

        let first = RoleInventory {
            role_name: "a".to_string(),
            ..Default::default()
        };
        let second = RoleInventory {
            role_name: "b".to_string(),
            ..Default::default()
        };
        write_inventory(&path, &first).await.unwrap();
        write_inventory(&path, &second).await.unwrap();

        let bytes = tokio::fs::read(&path).await.unwrap();
        let loaded: RoleInventory = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(loaded.role_name, "b");
    }
}
