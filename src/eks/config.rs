//! EKS stack configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_KUBERNETES_VERSION: &str = "1.31";

/// Configuration options for an EKS cluster stack. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EksConfig {
    pub name: String,
    pub region: String,
    pub aws_account_id: String,
    pub kubernetes_version: String,
    pub cluster_cidr: String,
    pub desired_az_count: i32,
    pub availability_zones: Vec<AvailabilityZoneConfig>,
    pub instance_types: Vec<String>,
    pub initial_nodes: i32,
    pub min_nodes: i32,
    pub max_nodes: i32,
    pub dns_management: bool,
    pub dns01_challenge: bool,
    pub secrets_manager: bool,
    pub cluster_autoscaling: bool,
    pub dns_management_service_account: ServiceAccountConfig,
    pub dns01_challenge_service_account: ServiceAccountConfig,
    pub secrets_manager_service_account: ServiceAccountConfig,
    pub cluster_autoscaling_service_account: ServiceAccountConfig,
    pub storage_management_service_account: ServiceAccountConfig,
    pub key_pair: String,
    pub tags: HashMap<String, String>,
}

impl Default for EksConfig {
    fn default() -> Self {
        Self {
            name: "default-eks-cluster".to_string(),
            region: String::new(),
            aws_account_id: String::new(),
            kubernetes_version: DEFAULT_KUBERNETES_VERSION.to_string(),
            cluster_cidr: "10.0.0.0/16".to_string(),
            desired_az_count: 0,
            availability_zones: Vec::new(),
            instance_types: vec!["t3.micro".to_string()],
            initial_nodes: 0,
            min_nodes: 2,
            max_nodes: 4,
            dns_management: false,
            dns01_challenge: false,
            secrets_manager: false,
            cluster_autoscaling: false,
            dns_management_service_account: ServiceAccountConfig::default(),
            dns01_challenge_service_account: ServiceAccountConfig::default(),
            secrets_manager_service_account: ServiceAccountConfig::default(),
            cluster_autoscaling_service_account: ServiceAccountConfig::default(),
            storage_management_service_account: ServiceAccountConfig::default(),
            key_pair: String::new(),
            tags: HashMap::new(),
        }
    }
}

/// Per-zone networking config. When supplied, the AZ planner adopts these
/// zones and CIDRs verbatim instead of picking defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityZoneConfig {
    pub zone: String,
    pub private_subnet_cidr: String,
    pub public_subnet_cidr: String,
}

/// A Kubernetes service account (namespace + name) paired with a capability
/// flag to set up IAM roles for service accounts (IRSA).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAccountConfig {
    pub name: String,
    pub namespace: String,
}

/// Load an EKS config from a YAML file.
pub fn load_eks_config(config_file: &Path) -> Result<EksConfig> {
    let config_yaml = std::fs::read_to_string(config_file)
        .with_context(|| format!("failed to read config file {}", config_file.display()))?;
    serde_yaml::from_str(&config_yaml).context("failed to unmarshal yaml from config file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_for_missing_keys() {
        let config: EksConfig = serde_yaml::from_str("name: demo\nregion: us-east-2\n").unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.kubernetes_version, "1.31");
        assert_eq!(config.cluster_cidr, "10.0.0.0/16");
        assert_eq!(config.instance_types, vec!["t3.micro".to_string()]);
        assert_eq!(config.min_nodes, 2);
        assert_eq!(config.max_nodes, 4);
    }

    #[test]
    fn camel_case_keys_parse() {
        let yaml = r#"
name: demo
kubernetesVersion: "1.30"
desiredAzCount: 3
dns01Challenge: true
dnsManagementServiceAccount:
  name: external-dns
  namespace: dns
availabilityZones:
  - zone: us-east-2a
    publicSubnetCidr: 10.0.0.0/22
    privateSubnetCidr: 10.0.4.0/22
"#;
        let config: EksConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kubernetes_version, "1.30");
        assert_eq!(config.desired_az_count, 3);
        assert!(config.dns01_challenge);
        assert_eq!(config.dns_management_service_account.name, "external-dns");
        assert_eq!(config.availability_zones.len(), 1);
        assert_eq!(config.availability_zones[0].zone, "us-east-2a");
        assert_eq!(config.availability_zones[0].public_subnet_cidr, "10.0.0.0/22");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config: EksConfig =
            serde_yaml::from_str("name: demo\nsomeFutureKnob: true\n").unwrap();
        assert_eq!(config.name, "demo");
    }
}
