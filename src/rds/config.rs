//! RDS stack configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configurable parameters for an RDS instance stack. Immutable after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RdsConfig {
    pub tags: HashMap<String, String>,
    pub aws_account: String,
    pub region: String,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub name: String,
    pub db_name: String,
    pub class: String,
    pub engine: String,
    pub engine_version: String,
    pub db_port: i32,
    pub storage_gb: i32,
    pub backup_days: i32,
    pub db_user: String,
    pub db_user_password: String,
    pub source_security_group_id: String,
}

/// Load an RDS config from a YAML file.
pub fn load_rds_config(config_file: &Path) -> Result<RdsConfig> {
    let config_yaml = std::fs::read_to_string(config_file)
        .with_context(|| format!("failed to read config file {}", config_file.display()))?;
    serde_yaml::from_str(&config_yaml).context("failed to unmarshal yaml from config file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_keys_parse() {
        let yaml = r#"
name: demo
region: us-west-2
dbName: app
class: db.t3.micro
engine: postgres
engineVersion: "15"
storageGb: 20
backupDays: 7
dbUser: app
dbUserPassword: hunter2
vpcId: vpc-abc
subnetIds:
  - subnet-1
  - subnet-2
dbPort: 5432
sourceSecurityGroupId: sg-src
awsAccount: "111111111111"
"#;
        let config: RdsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.db_name, "app");
        assert_eq!(config.engine_version, "15");
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.storage_gb, 20);
        assert_eq!(config.subnet_ids, vec!["subnet-1", "subnet-2"]);
        assert_eq!(config.source_security_group_id, "sg-src");
        assert_eq!(config.aws_account, "111111111111");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config: RdsConfig = serde_yaml::from_str("name: demo\nfutureKnob: 1\n").unwrap();
        assert_eq!(config.name, "demo");
    }
}
