//! EKS cluster creation, deletion and condition waits.

use std::collections::HashMap;

use anyhow::{Context, Result};
use aws_sdk_eks::error::ProvideErrorMetadata;
use aws_sdk_eks::types::{Cluster, ClusterStatus, VpcConfigRequest};

use super::inventory::{AvailabilityZoneInventory, ClusterInventory};
use super::EksClient;
use crate::error::{is_already_exists, is_not_found, ResourceNotFound};
use crate::wait::{wait_for_condition, WaitConfig};

/// Condition a cluster wait resolves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCondition {
    Created,
    Deleted,
}

const CLUSTER_WAIT: WaitConfig = WaitConfig::new(15, 60);

impl EksClient {
    /// Create the EKS cluster on the stack's private subnets, or adopt an
    /// existing cluster with the same name.
    pub(crate) async fn create_cluster(
        &self,
        tags: &HashMap<String, String>,
        cluster_name: &str,
        kubernetes_version: &str,
        role_arn: &str,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<ClusterInventory> {
        let eks = self.client.eks();

        let subnet_ids: Vec<String> = az_inventory
            .iter()
            .flat_map(|az| &az.private_subnets)
            .filter(|subnet| !subnet.subnet_id.is_empty())
            .map(|subnet| subnet.subnet_id.clone())
            .collect();

        let vpc_config = VpcConfigRequest::builder()
            .endpoint_private_access(true)
            .endpoint_public_access(true)
            .set_subnet_ids(Some(subnet_ids))
            .build();

        let cluster = match eks
            .create_cluster()
            .name(cluster_name)
            .resources_vpc_config(vpc_config)
            .role_arn(role_arn)
            .version(kubernetes_version)
            .set_tags(Some(tags.clone()))
            .send()
            .await
        {
            Ok(resp) => resp.cluster().cloned(),
            Err(e) if is_already_exists(e.code()) => {
                // cluster already exists - describe it to adopt
                let resp = eks
                    .describe_cluster()
                    .name(cluster_name)
                    .send()
                    .await
                    .with_context(|| {
                        format!("failed to describe cluster {cluster_name} that already exists")
                    })?;
                resp.cluster().cloned()
            }
            Err(e) => return Err(e).context("failed to create cluster"),
        };
        let cluster = cluster.context("no cluster in response")?;

        Ok(ClusterInventory {
            cluster_name: cluster
                .name()
                .context("no cluster name in response")?
                .to_string(),
            cluster_arn: cluster
                .arn()
                .context("no cluster ARN in response")?
                .to_string(),
            oidc_provider_url: String::new(),
        })
    }

    /// Delete the cluster. A missing cluster is treated as already deleted.
    pub(crate) async fn delete_cluster(&self, cluster_name: &str) -> Result<()> {
        if cluster_name.is_empty() {
            return Ok(());
        }

        match self
            .client
            .eks()
            .delete_cluster()
            .name(cluster_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e).context("failed to delete cluster"),
        }
    }

    /// Wait for the cluster to reach the given condition.
    ///
    /// When waiting for creation, returns the cluster's OIDC issuer URL
    /// once it is active. When waiting for deletion, returns an empty
    /// string once the cluster is gone.
    pub(crate) async fn wait_for_cluster(
        &self,
        cluster_name: &str,
        condition: ClusterCondition,
    ) -> Result<String> {
        if cluster_name.is_empty() {
            return Ok(String::new());
        }

        wait_for_condition(
            CLUSTER_WAIT,
            self.client.cancellation(),
            "cluster",
            || async {
                let cluster = match self.get_cluster(cluster_name).await {
                    Ok(cluster) => cluster,
                    Err(e)
                        if e.is::<ResourceNotFound>()
                            && condition == ClusterCondition::Deleted =>
                    {
                        return Ok(Some(String::new()));
                    }
                    Err(e) => {
                        return Err(e.context(format!(
                            "failed to get cluster status while waiting for {cluster_name}"
                        )))
                    }
                };

                if condition == ClusterCondition::Created
                    && cluster.status() == Some(&ClusterStatus::Active)
                {
                    let issuer = cluster
                        .identity()
                        .and_then(|identity| identity.oidc())
                        .and_then(|oidc| oidc.issuer())
                        .context("active cluster has no OIDC issuer")?;
                    return Ok(Some(issuer.to_string()));
                }
                Ok(None)
            },
        )
        .await
    }

    /// Describe the cluster, returning the not-found sentinel if it does
    /// not exist.
    async fn get_cluster(&self, cluster_name: &str) -> Result<Cluster> {
        match self
            .client
            .eks()
            .describe_cluster()
            .name(cluster_name)
            .send()
            .await
        {
            Ok(resp) => resp
                .cluster()
                .cloned()
                .context("no cluster in describe response"),
            Err(e) if is_not_found(e.code()) => Err(ResourceNotFound.into()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to describe cluster {cluster_name}"))
            }
        }
    }
}
