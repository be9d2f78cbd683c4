//! The EKS stack recipe walker.
//!
//! Drives creation and deletion of the full resource stack in dependency
//! order. Every step is reconciled against the inventory first: a populated
//! slot is skipped, an empty slot is filled by creating or adopting the
//! resource, and the new inventory snapshot is flushed to disk before the
//! next step begins. A failed step leaves the inventory describing exactly
//! what exists, so re-running create resumes and delete tears down.

use anyhow::{bail, Result};

use super::cluster::ClusterCondition;
use super::config::EksConfig;
use super::inventory::{ClusterInventory, EksInventory};
use super::nat_gateway::NatGatewayCondition;
use super::node_group::NodeGroupCondition;
use super::EksClient;
use crate::inventory::RoleInventory;
use crate::tags::{ec2_tags, iam_tags, map_tags};

impl EksClient {
    /// Create all the resources for an EKS cluster stack.
    ///
    /// Resources already recorded in the inventory are not re-created; they
    /// are reported as found and the recipe continues from the first
    /// missing step.
    pub async fn create_stack(
        &mut self,
        config: &EksConfig,
        inventory: &mut EksInventory,
    ) -> Result<()> {
        // config and inventory regions must agree; config wins, and if both
        // are empty the provider default region is adopted into both
        if !inventory.region.is_empty()
            && !config.region.is_empty()
            && inventory.region != config.region
        {
            bail!(
                "config region {} and inventory region {} do not match",
                config.region,
                inventory.region
            );
        }
        let region = if !config.region.is_empty() {
            config.region.clone()
        } else if !inventory.region.is_empty() {
            inventory.region.clone()
        } else {
            self.client.region().unwrap_or_default()
        };
        if !region.is_empty() {
            self.client.set_region(&region);
        }
        inventory.region = region.clone();

        let ec2_tags = ec2_tags(&config.name, &config.tags);
        let iam_tags = iam_tags(&config.name, &config.tags)?;
        let map_tags = map_tags(&config.name, &config.tags);

        // Availability Zones
        self.client.ensure_active()?;
        if inventory.availability_zones.is_empty() {
            let zones = self
                .plan_availability_zones(&region, config.desired_az_count, &config.availability_zones)
                .await?;
            inventory.availability_zones = zones;
            self.record(inventory).await?;
            self.send_message("Availability zones set up").await;
        } else {
            self.send_message("Availability zones found in inventory")
                .await;
        }

        // VPC
        self.client.ensure_active()?;
        if inventory.vpc_id.is_empty() {
            let vpc_id = self
                .create_vpc(&ec2_tags, &config.cluster_cidr, &config.name)
                .await?;
            inventory.vpc_id = vpc_id.clone();
            self.record(inventory).await?;
            self.send_message(format!("VPC created: {vpc_id}")).await;
        } else {
            self.send_message(format!("VPC found in inventory: {}", inventory.vpc_id))
                .await;
        }

        // Internet Gateway
        self.client.ensure_active()?;
        if inventory.internet_gateway_id.is_empty() {
            let igw_id = self
                .create_internet_gateway(&ec2_tags, &inventory.vpc_id)
                .await?;
            inventory.internet_gateway_id = igw_id.clone();
            self.record(inventory).await?;
            self.send_message(format!("Internet gateway created: {igw_id}"))
                .await;
        } else {
            self.send_message(format!(
                "Internet gateway found in inventory: {}",
                inventory.internet_gateway_id
            ))
            .await;
        }

        // Public Subnets
        self.client.ensure_active()?;
        if !inventory.all_public_subnets_recorded() {
            let (zones, subnet_ids) = self
                .create_public_subnets(&ec2_tags, &inventory.vpc_id, &inventory.availability_zones)
                .await?;
            inventory.availability_zones = zones;
            self.record(inventory).await?;
            self.send_message(format!("Public subnets created: {subnet_ids:?}"))
                .await;
        } else {
            self.send_message(format!(
                "Public subnets found in inventory: {:?}",
                inventory.public_subnet_ids()
            ))
            .await;
        }

        // Private Subnets
        self.client.ensure_active()?;
        if !inventory.all_private_subnets_recorded() {
            let (zones, subnet_ids) = self
                .create_private_subnets(&ec2_tags, &inventory.vpc_id, &inventory.availability_zones)
                .await?;
            inventory.availability_zones = zones;
            self.record(inventory).await?;
            self.send_message(format!("Private subnets created: {subnet_ids:?}"))
                .await;
        } else {
            self.send_message(format!(
                "Private subnets found in inventory: {:?}",
                inventory.private_subnet_ids()
            ))
            .await;
        }

        // Elastic IPs
        self.client.ensure_active()?;
        if inventory.elastic_ip_ids.is_empty() {
            let elastic_ip_ids = self
                .create_elastic_ips(&ec2_tags, &inventory.availability_zones)
                .await?;
            inventory.elastic_ip_ids = elastic_ip_ids.clone();
            self.record(inventory).await?;
            self.send_message(format!("Elastic IPs created: {elastic_ip_ids:?}"))
                .await;
        } else {
            self.send_message(format!(
                "Elastic IPs found in inventory: {:?}",
                inventory.elastic_ip_ids
            ))
            .await;
        }

        // NAT Gateways
        self.client.ensure_active()?;
        if !inventory.all_nat_gateways_recorded() {
            self.create_nat_gateways(
                &ec2_tags,
                &inventory.availability_zones,
                &inventory.elastic_ip_ids,
            )
            .await?;
            self.send_message("NAT gateways created").await;
            self.send_message("Waiting for NAT gateways to become active")
                .await;
            let (zones, nat_gateway_ids) = self
                .wait_for_nat_gateways(
                    &inventory.vpc_id,
                    &inventory.availability_zones,
                    NatGatewayCondition::Created,
                )
                .await?;
            inventory.availability_zones = zones;
            self.record(inventory).await?;
            self.send_message(format!("NAT gateways ready: {nat_gateway_ids:?}"))
                .await;
        } else {
            self.send_message(format!(
                "NAT gateways found in inventory: {:?}",
                inventory.nat_gateway_ids()
            ))
            .await;
        }

        // Public Route Table
        self.client.ensure_active()?;
        if inventory.public_route_table_id.is_empty() {
            let route_table_id = self
                .create_public_route_table(
                    &ec2_tags,
                    &inventory.vpc_id,
                    &inventory.internet_gateway_id,
                    &inventory.availability_zones,
                )
                .await?;
            inventory.public_route_table_id = route_table_id.clone();
            self.record(inventory).await?;
            self.send_message(format!("Public route table created: {route_table_id}"))
                .await;
        } else {
            self.send_message(format!(
                "Public route table found in inventory: {}",
                inventory.public_route_table_id
            ))
            .await;
        }

        // Private Route Tables
        self.client.ensure_active()?;
        if inventory.private_route_table_ids.is_empty() {
            let route_table_ids = self
                .create_private_route_tables(
                    &ec2_tags,
                    &inventory.vpc_id,
                    &inventory.availability_zones,
                )
                .await?;
            inventory.private_route_table_ids = route_table_ids.clone();
            self.record(inventory).await?;
            self.send_message(format!("Private route tables created: {route_table_ids:?}"))
                .await;
        } else {
            self.send_message(format!(
                "Private route tables found in inventory: {:?}",
                inventory.private_route_table_ids
            ))
            .await;
        }

        // IAM Role for cluster
        self.client.ensure_active()?;
        if inventory.cluster_role.is_empty() {
            let role = self.create_cluster_role(&iam_tags, &config.name).await?;
            inventory.cluster_role = role.clone();
            self.record(inventory).await?;
            self.send_message(format!("IAM role for cluster created: {}", role.role_name))
                .await;
        } else {
            self.send_message(format!(
                "IAM role for cluster found in inventory: {}",
                inventory.cluster_role.role_name
            ))
            .await;
        }

        // IAM Role for worker nodes
        self.client.ensure_active()?;
        if inventory.worker_role.is_empty() {
            let role = self.create_node_role(&iam_tags, &config.name).await?;
            inventory.worker_role = role.clone();
            self.record(inventory).await?;
            self.send_message(format!(
                "IAM role for worker nodes created: {}",
                role.role_name
            ))
            .await;
        } else {
            self.send_message(format!(
                "IAM role for worker nodes found in inventory: {}",
                inventory.worker_role.role_name
            ))
            .await;
        }

        // EKS Cluster
        self.client.ensure_active()?;
        if inventory.cluster.cluster_name.is_empty() {
            let cluster = self
                .create_cluster(
                    &map_tags,
                    &config.name,
                    &config.kubernetes_version,
                    &inventory.cluster_role.role_arn,
                    &inventory.availability_zones,
                )
                .await?;
            inventory.cluster.cluster_name = cluster.cluster_name.clone();
            inventory.cluster.cluster_arn = cluster.cluster_arn.clone();
            self.record(inventory).await?;
            self.send_message(format!("EKS cluster created: {}", cluster.cluster_name))
                .await;
        } else {
            self.send_message(format!(
                "EKS cluster found in inventory: {}",
                inventory.cluster.cluster_name
            ))
            .await;
        }
        if inventory.cluster.oidc_provider_url.is_empty() {
            self.send_message(format!(
                "Waiting for EKS cluster to become active: {}",
                inventory.cluster.cluster_name
            ))
            .await;
            let oidc_issuer = self
                .wait_for_cluster(&inventory.cluster.cluster_name, ClusterCondition::Created)
                .await?;
            inventory.cluster.oidc_provider_url = oidc_issuer;
            self.record(inventory).await?;
            self.send_message(format!(
                "EKS cluster ready: {}",
                inventory.cluster.cluster_name
            ))
            .await;
        } else {
            self.send_message(format!(
                "EKS cluster found in inventory is ready: {}",
                inventory.cluster.cluster_name
            ))
            .await;
        }

        // EKS Cluster Security Group
        self.client.ensure_active()?;
        if inventory.security_group_id.is_empty() {
            let security_group_id = self.get_cluster_security_group(&config.name).await?;
            inventory.security_group_id = security_group_id.clone();
            self.record(inventory).await?;
            self.send_message(format!(
                "EKS cluster security group ID {security_group_id} retrieved"
            ))
            .await;
        } else {
            self.send_message(format!(
                "EKS cluster security group ID {} found in inventory",
                inventory.security_group_id
            ))
            .await;
        }

        // Node Groups
        self.client.ensure_active()?;
        if inventory.node_group_names.is_empty() {
            let node_group_names = self
                .create_node_groups(
                    &map_tags,
                    &inventory.cluster.cluster_name,
                    &config.kubernetes_version,
                    &inventory.worker_role.role_arn,
                    &inventory.availability_zones,
                    &config.instance_types,
                    config.initial_nodes,
                    config.min_nodes,
                    config.max_nodes,
                    &config.key_pair,
                )
                .await?;
            inventory.node_group_names = node_group_names.clone();
            self.record(inventory).await?;
            self.send_message(format!("EKS node groups created: {node_group_names:?}"))
                .await;
            self.send_message(format!(
                "Waiting for EKS node groups to become active: {node_group_names:?}"
            ))
            .await;
            self.wait_for_node_groups(
                &inventory.cluster.cluster_name,
                &node_group_names,
                NodeGroupCondition::Created,
            )
            .await?;
            self.send_message(format!("EKS node groups ready: {node_group_names:?}"))
                .await;
        } else {
            self.send_message(format!(
                "EKS node groups found in inventory: {:?}",
                inventory.node_group_names
            ))
            .await;
        }

        // OIDC Provider
        self.client.ensure_active()?;
        if inventory.oidc_provider_arn.is_empty() {
            let oidc_provider_arn = self
                .create_oidc_provider(&iam_tags, &inventory.cluster.oidc_provider_url)
                .await?;
            inventory.oidc_provider_arn = oidc_provider_arn.clone();
            self.record(inventory).await?;
            self.send_message(format!("OIDC provider created: {oidc_provider_arn}"))
                .await;
        } else {
            self.send_message(format!(
                "OIDC provider found in inventory: {}",
                inventory.oidc_provider_arn
            ))
            .await;
        }

        // IAM Policy and Role for DNS Management
        self.client.ensure_active()?;
        if config.dns_management {
            if inventory.dns_management_role.role_policy_arns.is_empty() {
                let policy = self
                    .create_dns_management_policy(&iam_tags, &config.name)
                    .await?;
                inventory.policy_arns.push(policy.arn.clone());
                inventory.dns_management_role = RoleInventory {
                    role_policy_arns: vec![policy.arn],
                    ..Default::default()
                };
                self.record(inventory).await?;
                self.send_message(format!("IAM policy created: {}", policy.name))
                    .await;
            } else {
                self.send_message(format!(
                    "IAM policy found in inventory: {:?}",
                    inventory.dns_management_role.role_policy_arns
                ))
                .await;
            }

            if inventory.dns_management_role.role_name.is_empty() {
                if inventory.dns_management_role.role_policy_arns.len() != 1 {
                    bail!(
                        "expected 1 policy for DNS management role but found {} in inventory",
                        inventory.dns_management_role.role_policy_arns.len()
                    );
                }
                let role = self
                    .create_dns_management_role(
                        &iam_tags,
                        &inventory.dns_management_role.role_policy_arns[0].clone(),
                        &config.aws_account_id,
                        &inventory.cluster.oidc_provider_url,
                        &config.dns_management_service_account,
                        &config.name,
                    )
                    .await?;
                inventory.dns_management_role.role_name = role.role_name.clone();
                inventory.dns_management_role.role_arn = role.role_arn;
                self.record(inventory).await?;
                self.send_message(format!(
                    "IAM role for DNS management created: {}",
                    role.role_name
                ))
                .await;
            } else {
                self.send_message(format!(
                    "IAM role for DNS management found in inventory: {}",
                    inventory.dns_management_role.role_name
                ))
                .await;
            }
        } else {
            self.send_message("IAM policy for DNS management not requested")
                .await;
            self.send_message("IAM role for DNS management not requested")
                .await;
        }

        // IAM Policy and Role for DNS01 Challenges
        self.client.ensure_active()?;
        if config.dns01_challenge {
            if inventory.dns01_challenge_role.role_policy_arns.is_empty() {
                let policy = self
                    .create_dns01_challenge_policy(&iam_tags, &config.name)
                    .await?;
                inventory.policy_arns.push(policy.arn.clone());
                inventory.dns01_challenge_role = RoleInventory {
                    role_policy_arns: vec![policy.arn],
                    ..Default::default()
                };
                self.record(inventory).await?;
                self.send_message(format!("IAM policy created: {}", policy.name))
                    .await;
            } else {
                self.send_message(format!(
                    "IAM policy found in inventory: {:?}",
                    inventory.dns01_challenge_role.role_policy_arns
                ))
                .await;
            }

            if inventory.dns01_challenge_role.role_name.is_empty() {
                if inventory.dns01_challenge_role.role_policy_arns.len() != 1 {
                    bail!(
                        "expected 1 policy for DNS01 challenge role but found {} in inventory",
                        inventory.dns01_challenge_role.role_policy_arns.len()
                    );
                }
                let role = self
                    .create_dns01_challenge_role(
                        &iam_tags,
                        &inventory.dns01_challenge_role.role_policy_arns[0].clone(),
                        &config.aws_account_id,
                        &inventory.cluster.oidc_provider_url,
                        &config.dns01_challenge_service_account,
                        &config.name,
                    )
                    .await?;
                inventory.dns01_challenge_role.role_name = role.role_name.clone();
                inventory.dns01_challenge_role.role_arn = role.role_arn;
                self.record(inventory).await?;
                self.send_message(format!(
                    "IAM role for DNS01 challenges created: {}",
                    role.role_name
                ))
                .await;
            } else {
                self.send_message(format!(
                    "IAM role for DNS01 challenges found in inventory: {}",
                    inventory.dns01_challenge_role.role_name
                ))
                .await;
            }
        } else {
            self.send_message("IAM policy for DNS01 challenge not requested")
                .await;
            self.send_message("IAM role for DNS01 challenge not requested")
                .await;
        }

        // IAM Policy and Role for Secrets Manager
        self.client.ensure_active()?;
        if config.secrets_manager {
            if inventory.secrets_manager_role.role_policy_arns.is_empty() {
                let policy = self
                    .create_secrets_manager_policy(&iam_tags, &config.name)
                    .await?;
                inventory.policy_arns.push(policy.arn.clone());
                inventory.secrets_manager_role = RoleInventory {
                    role_policy_arns: vec![policy.arn],
                    ..Default::default()
                };
                self.record(inventory).await?;
                self.send_message(format!("IAM policy created: {}", policy.name))
                    .await;
            } else {
                self.send_message(format!(
                    "IAM policy found in inventory: {:?}",
                    inventory.secrets_manager_role.role_policy_arns
                ))
                .await;
            }

            if inventory.secrets_manager_role.role_name.is_empty() {
                if inventory.secrets_manager_role.role_policy_arns.len() != 1 {
                    bail!(
                        "expected 1 policy for secrets manager role but found {} in inventory",
                        inventory.secrets_manager_role.role_policy_arns.len()
                    );
                }
                let role = self
                    .create_secrets_manager_role(
                        &iam_tags,
                        &inventory.secrets_manager_role.role_policy_arns[0].clone(),
                        &config.aws_account_id,
                        &inventory.cluster.oidc_provider_url,
                        &config.secrets_manager_service_account,
                        &config.name,
                    )
                    .await?;
                inventory.secrets_manager_role.role_name = role.role_name.clone();
                inventory.secrets_manager_role.role_arn = role.role_arn;
                self.record(inventory).await?;
                self.send_message(format!(
                    "IAM role for secrets manager created: {}",
                    role.role_name
                ))
                .await;
            } else {
                self.send_message(format!(
                    "IAM role for secrets manager found in inventory: {}",
                    inventory.secrets_manager_role.role_name
                ))
                .await;
            }
        } else {
            self.send_message("IAM policy for secrets manager not requested")
                .await;
            self.send_message("IAM role for secrets manager not requested")
                .await;
        }

        // IAM Policy and Role for Cluster Autoscaling
        self.client.ensure_active()?;
        if config.cluster_autoscaling {
            if inventory.cluster_autoscaling_role.role_policy_arns.is_empty() {
                let policy = self
                    .create_cluster_autoscaling_policy(&iam_tags, &config.name)
                    .await?;
                inventory.policy_arns.push(policy.arn.clone());
                inventory.cluster_autoscaling_role = RoleInventory {
                    role_policy_arns: vec![policy.arn],
                    ..Default::default()
                };
                self.record(inventory).await?;
                self.send_message(format!("IAM policy created: {}", policy.name))
                    .await;
            } else {
                self.send_message(format!(
                    "IAM policy found in inventory: {:?}",
                    inventory.cluster_autoscaling_role.role_policy_arns
                ))
                .await;
            }

            if inventory.cluster_autoscaling_role.role_name.is_empty() {
                if inventory.cluster_autoscaling_role.role_policy_arns.len() != 1 {
                    bail!(
                        "expected 1 policy for cluster autoscaling role but found {} in inventory",
                        inventory.cluster_autoscaling_role.role_policy_arns.len()
                    );
                }
                let role = self
                    .create_cluster_autoscaling_role(
                        &iam_tags,
                        &inventory.cluster_autoscaling_role.role_policy_arns[0].clone(),
                        &config.aws_account_id,
                        &inventory.cluster.oidc_provider_url,
                        &config.cluster_autoscaling_service_account,
                        &config.name,
                    )
                    .await?;
                inventory.cluster_autoscaling_role.role_name = role.role_name.clone();
                inventory.cluster_autoscaling_role.role_arn = role.role_arn;
                self.record(inventory).await?;
                self.send_message(format!(
                    "IAM role for cluster autoscaling created: {}",
                    role.role_name
                ))
                .await;
            } else {
                self.send_message(format!(
                    "IAM role for cluster autoscaling found in inventory: {}",
                    inventory.cluster_autoscaling_role.role_name
                ))
                .await;
            }
        } else {
            self.send_message("IAM policy for cluster autoscaling not requested")
                .await;
            self.send_message("IAM role for cluster autoscaling not requested")
                .await;
        }

        // IAM Role for Storage Management
        self.client.ensure_active()?;
        if inventory.storage_management_role.is_empty() {
            let role = self
                .create_storage_management_role(
                    &iam_tags,
                    &config.aws_account_id,
                    &inventory.cluster.oidc_provider_url,
                    &config.storage_management_service_account,
                    &config.name,
                )
                .await?;
            inventory.storage_management_role = role.clone();
            self.record(inventory).await?;
            self.send_message(format!(
                "IAM role for storage management created: {}",
                role.role_name
            ))
            .await;
        } else {
            self.send_message(format!(
                "IAM role for storage management found in inventory: {}",
                inventory.storage_management_role.role_name
            ))
            .await;
        }

        // EBS CSI Addon
        self.client.ensure_active()?;
        let addon_name = self
            .create_ebs_storage_addon(
                &map_tags,
                &inventory.cluster.cluster_name,
                &inventory.storage_management_role.role_arn,
            )
            .await?;
        self.send_message(format!("EBS storage addon created: {addon_name}"))
            .await;

        self.send_message(format!(
            "EKS cluster creation complete: {}",
            inventory.cluster.cluster_name
        ))
        .await;

        Ok(())
    }

    /// Delete every resource recorded in the inventory, in reverse
    /// dependency order. Each cleared field is flushed before the next
    /// deletion begins.
    pub async fn delete_stack(&mut self, inventory: &mut EksInventory) -> Result<()> {
        if !inventory.region.is_empty() {
            self.client.set_region(&inventory.region.clone());
        }

        // OIDC Provider
        self.client.ensure_active()?;
        self.delete_oidc_provider(&inventory.oidc_provider_arn)
            .await?;
        self.send_message(format!(
            "OIDC provider deleted: {}",
            inventory.oidc_provider_arn
        ))
        .await;
        inventory.oidc_provider_arn.clear();
        self.record(inventory).await?;

        // Node Groups
        self.client.ensure_active()?;
        self.delete_node_groups(&inventory.cluster.cluster_name, &inventory.node_group_names)
            .await?;
        self.send_message(format!(
            "Node groups deletion initiated: {:?}",
            inventory.node_group_names
        ))
        .await;
        self.send_message(format!(
            "Waiting for node groups to be deleted: {:?}",
            inventory.node_group_names
        ))
        .await;
        self.wait_for_node_groups(
            &inventory.cluster.cluster_name,
            &inventory.node_group_names,
            NodeGroupCondition::Deleted,
        )
        .await?;
        self.send_message(format!(
            "Node groups deletion complete: {:?}",
            inventory.node_group_names
        ))
        .await;
        inventory.node_group_names.clear();
        self.record(inventory).await?;

        // EKS Cluster
        self.client.ensure_active()?;
        self.delete_cluster(&inventory.cluster.cluster_name).await?;
        self.send_message(format!(
            "EKS cluster deletion initiated: {}",
            inventory.cluster.cluster_name
        ))
        .await;
        self.send_message(format!(
            "Waiting for EKS cluster to be deleted: {}",
            inventory.cluster.cluster_name
        ))
        .await;
        self.wait_for_cluster(&inventory.cluster.cluster_name, ClusterCondition::Deleted)
            .await?;
        self.send_message(format!(
            "EKS cluster deletion complete: {}",
            inventory.cluster.cluster_name
        ))
        .await;
        inventory.cluster = ClusterInventory::default();
        self.record(inventory).await?;

        // IAM Roles
        self.client.ensure_active()?;
        let roles = [
            inventory.cluster_role.clone(),
            inventory.worker_role.clone(),
            inventory.dns_management_role.clone(),
            inventory.dns01_challenge_role.clone(),
            inventory.secrets_manager_role.clone(),
            inventory.cluster_autoscaling_role.clone(),
            inventory.storage_management_role.clone(),
        ];
        self.delete_roles(&roles).await?;
        let role_names: Vec<&str> = roles
            .iter()
            .filter(|role| !role.is_empty())
            .map(|role| role.role_name.as_str())
            .collect();
        self.send_message(format!("IAM roles deleted: {role_names:?}"))
            .await;
        inventory.cluster_role = RoleInventory::default();
        inventory.worker_role = RoleInventory::default();
        inventory.dns_management_role = RoleInventory::default();
        inventory.dns01_challenge_role = RoleInventory::default();
        inventory.secrets_manager_role = RoleInventory::default();
        inventory.cluster_autoscaling_role = RoleInventory::default();
        inventory.storage_management_role = RoleInventory::default();
        self.record(inventory).await?;

        // IAM Policies
        self.client.ensure_active()?;
        self.delete_policies(&inventory.policy_arns).await?;
        self.send_message(format!("IAM policies deleted: {:?}", inventory.policy_arns))
            .await;
        inventory.policy_arns.clear();
        self.record(inventory).await?;

        // NAT Gateways
        self.client.ensure_active()?;
        let nat_gateway_ids = self
            .delete_nat_gateways(&inventory.availability_zones)
            .await?;
        self.send_message(format!(
            "NAT gateway deletion initiated: {nat_gateway_ids:?}"
        ))
        .await;
        self.send_message("Waiting for NAT gateways to be deleted")
            .await;
        let (zones, nat_gateway_ids) = self
            .wait_for_nat_gateways(
                &inventory.vpc_id,
                &inventory.availability_zones,
                NatGatewayCondition::Deleted,
            )
            .await?;
        self.send_message(format!(
            "NAT gateway deletion complete: {nat_gateway_ids:?}"
        ))
        .await;
        inventory.availability_zones = zones;
        self.record(inventory).await?;

        // Internet Gateway
        self.client.ensure_active()?;
        self.delete_internet_gateway(&inventory.internet_gateway_id, &inventory.vpc_id)
            .await?;
        self.send_message(format!(
            "Internet gateway deleted: {}",
            inventory.internet_gateway_id
        ))
        .await;
        inventory.internet_gateway_id.clear();
        self.record(inventory).await?;

        // Elastic IPs
        self.client.ensure_active()?;
        self.delete_elastic_ips(&inventory.elastic_ip_ids).await?;
        self.send_message(format!(
            "Elastic IPs deleted: {:?}",
            inventory.elastic_ip_ids
        ))
        .await;
        inventory.elastic_ip_ids.clear();
        self.record(inventory).await?;

        // Subnets
        self.client.ensure_active()?;
        let (zones, subnet_ids) = self.delete_subnets(&inventory.availability_zones).await?;
        self.send_message(format!("Subnets deleted: {subnet_ids:?}"))
            .await;
        inventory.availability_zones = zones;
        self.record(inventory).await?;

        // Route Tables
        self.client.ensure_active()?;
        self.delete_route_tables(
            &inventory.private_route_table_ids,
            &inventory.public_route_table_id,
        )
        .await?;
        self.send_message(format!(
            "Route tables deleted: [{:?} {}]",
            inventory.private_route_table_ids, inventory.public_route_table_id
        ))
        .await;
        inventory.private_route_table_ids.clear();
        inventory.public_route_table_id.clear();
        self.record(inventory).await?;

        // VPC
        self.client.ensure_active()?;
        self.delete_vpc(&inventory.vpc_id).await?;
        self.send_message(format!("VPC deleted: {}", inventory.vpc_id))
            .await;
        inventory.vpc_id.clear();
        self.record(inventory).await?;

        Ok(())
    }
}
