//! EKS resource stack.
//!
//! Composes the network fabric (VPC, subnets, gateways, route tables), the
//! IAM surface (roles, policies, OIDC provider) and the managed Kubernetes
//! resources (cluster, node group, EBS CSI add-on) into one recipe with a
//! strict dependency order. The recipe walker lives in [`stack`].

mod addon;
mod azs;
mod cluster;
mod config;
mod elastic_ip;
mod internet_gateway;
mod inventory;
mod nat_gateway;
mod node_group;
mod oidc_provider;
mod policy;
mod role;
mod route_table;
mod security_group;
mod stack;
mod subnet;
mod vpc;

pub use cluster::ClusterCondition;
pub use config::{load_eks_config, AvailabilityZoneConfig, EksConfig, ServiceAccountConfig};
pub use inventory::{AvailabilityZoneInventory, ClusterInventory, EksInventory, SubnetInventory};
pub use nat_gateway::NatGatewayCondition;
pub use node_group::NodeGroupCondition;

use crate::client::ResourceClient;
use crate::stream::InventorySink;

/// Client for managing EKS resource stacks.
pub struct EksClient {
    pub(crate) client: ResourceClient,
    inventory_sink: Option<InventorySink<EksInventory>>,
}

impl EksClient {
    pub fn new(client: ResourceClient, inventory_sink: Option<InventorySink<EksInventory>>) -> Self {
        Self {
            client,
            inventory_sink,
        }
    }

    /// Send the latest inventory snapshot to the consumer.
    ///
    /// Resolves only once the snapshot is on disk, so the next recipe step
    /// cannot start before this one is durable.
    pub(crate) async fn record(&self, inventory: &EksInventory) -> anyhow::Result<()> {
        if let Some(sink) = &self.inventory_sink {
            sink.send(inventory.clone()).await?;
        }
        Ok(())
    }

    pub(crate) async fn send_message(&self, message: impl Into<String>) {
        self.client.send_message(message).await;
    }
}
