//! S3 stack configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configurable parameters for an S3 bucket stack. Immutable after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct S3Config {
    pub tags: HashMap<String, String>,
    pub aws_account: String,
    pub region: String,
    pub name: String,
    pub vpc_id_read_write_access: String,
    pub public_read_access: bool,
    pub workload_read_write_access: WorkloadAccess,
}

/// The Kubernetes workload granted read/write access to the bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadAccess {
    pub service_account_name: String,
    pub service_account_namespace: String,
    pub oidc_url: String,
}

/// Load an S3 config from a YAML file.
pub fn load_s3_config(config_file: &Path) -> Result<S3Config> {
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
region: us-east-2
awsAccount: "111111111111"
vpcIdReadWriteAccess: vpc-abc
publicReadAccess: true
workloadReadWriteAccess:
  serviceAccountName: uploader
  serviceAccountNamespace: app
  oidcUrl: https://oidc.eks.us-east-2.amazonaws.com/id/ABC
"#;
        let config: S3Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "demo");
        assert!(config.public_read_access);
        assert_eq!(config.vpc_id_read_write_access, "vpc-abc");
        assert_eq!(config.workload_read_write_access.service_account_name, "uploader");
        assert_eq!(config.workload_read_write_access.service_account_namespace, "app");
    }
}
