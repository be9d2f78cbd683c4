//! RDS resource stack.
//!
//! A small recipe: a security group admitting the caller's workload
//! security group on the database port, a DB subnet group pinning the
//! instance to the caller's subnets, and the DB instance itself, waited to
//! `available` with its endpoint recorded.

mod config;
mod instance;
mod inventory;
mod security_group;
mod stack;
mod subnet_group;

pub use config::{load_rds_config, RdsConfig};
pub use instance::RdsCondition;
pub use inventory::RdsInventory;

use crate::client::ResourceClient;
use crate::stream::InventorySink;

/// Client for managing RDS resource stacks.
pub struct RdsClient {
    pub(crate) client: ResourceClient,
    inventory_sink: Option<InventorySink<RdsInventory>>,
}

impl RdsClient {
    pub fn new(client: ResourceClient, inventory_sink: Option<InventorySink<RdsInventory>>) -> Self {
        Self {
            client,
            inventory_sink,
        }
    }

    pub(crate) async fn record(&self, inventory: &RdsInventory) -> anyhow::Result<()> {
        if let Some(sink) = &self.inventory_sink {
            sink.send(inventory.clone()).await?;
        }
        Ok(())
    }

    pub(crate) async fn send_message(&self, message: impl Into<String>) {
        self.client.send_message(message).await;
    }
}
