//! EKS node group creation, deletion and condition waits.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use aws_sdk_eks::error::ProvideErrorMetadata;
use aws_sdk_eks::types::{
    Nodegroup, NodegroupScalingConfig, NodegroupStatus, RemoteAccessConfig,
};

use super::inventory::AvailabilityZoneInventory;
use super::EksClient;
use crate::error::{is_already_exists, is_not_found, ResourceNotFound};
use crate::wait::{wait_for_condition, WaitConfig};

/// Condition a node group wait resolves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroupCondition {
    Created,
    Deleted,
}

const NODE_GROUP_WAIT: WaitConfig = WaitConfig::new(15, 240);

impl EksClient {
    /// Create the private node group for the cluster, or adopt an existing
    /// one with the same name.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn create_node_groups(
        &self,
        tags: &HashMap<String, String>,
        cluster_name: &str,
        kubernetes_version: &str,
        node_role_arn: &str,
        az_inventory: &[AvailabilityZoneInventory],
        instance_types: &[String],
        initial_nodes: i32,
        min_nodes: i32,
        max_nodes: i32,
        key_pair: &str,
    ) -> Result<Vec<String>> {
        let eks = self.client.eks();

        let private_subnet_ids: Vec<String> = az_inventory
            .iter()
            .flat_map(|az| &az.private_subnets)
            .filter(|subnet| !subnet.subnet_id.is_empty())
            .map(|subnet| subnet.subnet_id.clone())
            .collect();

        let node_group_name = format!("{cluster_name}-private-node-group");

        let mut create = eks
            .create_nodegroup()
            .cluster_name(cluster_name)
            .nodegroup_name(&node_group_name)
            .node_role(node_role_arn)
            .set_subnets(Some(private_subnet_ids))
            .set_instance_types(Some(instance_types.to_vec()))
            .version(kubernetes_version)
            .scaling_config(
                NodegroupScalingConfig::builder()
                    .desired_size(initial_nodes)
                    .min_size(min_nodes)
                    .max_size(max_nodes)
                    .build(),
            )
            .set_tags(Some(tags.clone()));
        if !key_pair.is_empty() {
            create = create.remote_access(
                RemoteAccessConfig::builder().ec2_ssh_key(key_pair).build(),
            );
        }

        match create.send().await {
            Ok(_) => Ok(vec![node_group_name]),
            Err(e) if is_already_exists(e.code()) => {
                // node group already exists - confirm it and adopt the name
                eks.describe_nodegroup()
                    .cluster_name(cluster_name)
                    .nodegroup_name(&node_group_name)
                    .send()
                    .await
                    .with_context(|| {
                        format!(
                            "failed to describe node group {node_group_name} that already exists"
                        )
                    })?;
                Ok(vec![node_group_name])
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to create node group {node_group_name}"))
            }
        }
    }

    /// Delete the cluster's node groups. Missing node groups are treated as
    /// already deleted.
    pub(crate) async fn delete_node_groups(
        &self,
        cluster_name: &str,
        node_group_names: &[String],
    ) -> Result<()> {
        if cluster_name.is_empty() || node_group_names.is_empty() {
            return Ok(());
        }

        let eks = self.client.eks();
        for node_group_name in node_group_names {
            match eks
                .delete_nodegroup()
                .cluster_name(cluster_name)
                .nodegroup_name(node_group_name)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to delete node group {node_group_name}")
                    })
                }
            }
        }

        Ok(())
    }

    /// Wait for the node groups to reach the given condition.
    ///
    /// A node group landing in `CREATE_FAILED` is fatal and surfaces the
    /// provider's reported issues.
    pub(crate) async fn wait_for_node_groups(
        &self,
        cluster_name: &str,
        node_group_names: &[String],
        condition: NodeGroupCondition,
    ) -> Result<()> {
        if node_group_names.is_empty() {
            return Ok(());
        }

        wait_for_condition(
            NODE_GROUP_WAIT,
            self.client.cancellation(),
            "node group",
            || async {
                for node_group_name in node_group_names {
                    let node_group = match self
                        .get_node_group(cluster_name, node_group_name)
                        .await
                    {
                        Ok(node_group) => node_group,
                        Err(e)
                            if e.is::<ResourceNotFound>()
                                && condition == NodeGroupCondition::Deleted =>
                        {
                            continue;
                        }
                        Err(e) => {
                            return Err(e.context(format!(
                                "failed to get node group status while waiting for {node_group_name}"
                            )))
                        }
                    };

                    match node_group.status() {
                        Some(NodegroupStatus::Active)
                            if condition == NodeGroupCondition::Created =>
                        {
                            continue;
                        }
                        Some(NodegroupStatus::CreateFailed) => {
                            bail!(
                                "failed to create node group {node_group_name}, issues with \
                                 node group: {:?}",
                                health_issues(&node_group)
                            );
                        }
                        _ => return Ok(None),
                    }
                }
                Ok(Some(()))
            },
        )
        .await
    }

    /// Describe a node group, returning the not-found sentinel if it does
    /// not exist.
    async fn get_node_group(
        &self,
        cluster_name: &str,
        node_group_name: &str,
    ) -> Result<Nodegroup> {
        match self
            .client
            .eks()
            .describe_nodegroup()
            .cluster_name(cluster_name)
            .nodegroup_name(node_group_name)
            .send()
            .await
        {
            Ok(resp) => resp
                .nodegroup()
                .cloned()
                .context("no node group in describe response"),
            Err(e) if is_not_found(e.code()) => Err(ResourceNotFound.into()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to describe node group {node_group_name}")),
        }
    }
}

/// The provider's reported issues for a node group, for failure messages.
fn health_issues(node_group: &Nodegroup) -> Vec<String> {
    node_group
        .health()
        .map(|health| {
            health
                .issues()
                .iter()
                .filter_map(|issue| issue.message().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
