//! S3 resource stack.
//!
//! A bucket with a globally unique name, a VPC-scoped access point, an
//! access control list (optionally public-read), and an IAM policy/role
//! pair granting a Kubernetes workload read/write access via IRSA.

mod access_point;
mod acl;
mod bucket;
mod config;
mod inventory;
mod policy;
mod role;
mod stack;

pub use config::{load_s3_config, S3Config, WorkloadAccess};
pub use inventory::S3Inventory;

use crate::client::ResourceClient;
use crate::stream::InventorySink;

/// Client for managing S3 resource stacks.
pub struct S3Client {
    pub(crate) client: ResourceClient,
    inventory_sink: Option<InventorySink<S3Inventory>>,
}

impl S3Client {
    pub fn new(client: ResourceClient, inventory_sink: Option<InventorySink<S3Inventory>>) -> Self {
        Self {
            client,
            inventory_sink,
        }
    }

    pub(crate) async fn record(&self, inventory: &S3Inventory) -> anyhow::Result<()> {
        if let Some(sink) = &self.inventory_sink {
            sink.send(inventory.clone()).await?;
        }
        Ok(())
    }

    pub(crate) async fn send_message(&self, message: impl Into<String>) {
        self.client.send_message(message).await;
    }
}
