//! Lookup of the cluster security group AWS creates during provisioning.

use anyhow::{bail, Context, Result};
use aws_sdk_ec2::types::Filter;

use super::EksClient;

impl EksClient {
    /// Retrieve the security group AWS created for the cluster, identified
    /// by the `aws:eks:cluster-name` tag. Exactly one group must match.
    pub(crate) async fn get_cluster_security_group(&self, cluster_name: &str) -> Result<String> {
        let resp = self
            .client
            .ec2()
            .describe_security_groups()
            .filters(
                Filter::builder()
                    .name("tag:aws:eks:cluster-name")
                    .values(cluster_name)
                    .build(),
            )
            .send()
            .await
            .with_context(|| {
                format!("failed to describe security groups filtered by cluster name {cluster_name}")
            })?;

        match resp.security_groups() {
            [] => bail!("found zero security groups filtered by cluster name {cluster_name}"),
            [group] => Ok(group
                .group_id()
                .context("no group ID on cluster security group")?
                .to_string()),
            _ => bail!("found multiple security groups filtered by cluster name {cluster_name}"),
        }
    }
}
