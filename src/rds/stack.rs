//! The RDS stack recipe walker.

use anyhow::{bail, Result};

use super::config::RdsConfig;
use super::instance::RdsCondition;
use super::inventory::RdsInventory;
use super::RdsClient;
use crate::tags::rds_tags;

impl RdsClient {
    /// Create all the resources for an RDS instance stack.
    ///
    /// Resources already recorded in the inventory are not re-created; the
    /// recipe resumes from the first missing step.
    pub async fn create_stack(
        &mut self,
        config: &RdsConfig,
        inventory: &mut RdsInventory,
    ) -> Result<()> {
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
        inventory.region = region;

        let tags = rds_tags(&config.name, &config.tags);
        let ec2_tags = crate::tags::ec2_tags(&config.name, &config.tags);

        // Security Group
        self.client.ensure_active()?;
        if inventory.security_group_id.is_empty() {
            let security_group_id = self
                .create_security_group(
                    &ec2_tags,
                    &config.name,
                    &config.vpc_id,
                    config.db_port,
                    &config.source_security_group_id,
                    &config.aws_account,
                )
                .await?;
            inventory.security_group_id = security_group_id.clone();
            self.record(inventory).await?;
            self.send_message(format!("security group {security_group_id} created"))
                .await;
        } else {
            self.send_message(format!(
                "security group found in inventory: {}",
                inventory.security_group_id
            ))
            .await;
        }

        // DB Subnet Group
        self.client.ensure_active()?;
        if inventory.subnet_group_name.is_empty() {
            let subnet_group_name = self
                .create_subnet_group(&tags, &config.name, &config.subnet_ids)
                .await?;
            inventory.subnet_group_name = subnet_group_name.clone();
            self.record(inventory).await?;
            self.send_message(format!("subnet group {subnet_group_name} created"))
                .await;
        } else {
            self.send_message(format!(
                "subnet group found in inventory: {}",
                inventory.subnet_group_name
            ))
            .await;
        }

        // DB Instance
        self.client.ensure_active()?;
        if inventory.rds_instance_id.is_empty() {
            let instance_id = self
                .create_rds_instance(
                    &tags,
                    config,
                    &inventory.security_group_id,
                    &inventory.subnet_group_name,
                )
                .await?;
            inventory.rds_instance_id = instance_id.clone();
            self.record(inventory).await?;
            self.send_message(format!("RDS instance {instance_id} created"))
                .await;
        } else {
            self.send_message(format!(
                "RDS instance found in inventory: {}",
                inventory.rds_instance_id
            ))
            .await;
        }
        if inventory.rds_instance_endpoint.is_empty() {
            self.send_message(format!(
                "waiting for RDS instance {} to become available",
                inventory.rds_instance_id
            ))
            .await;
            let endpoint = self
                .wait_for_rds_instance(&inventory.rds_instance_id, RdsCondition::Created)
                .await?;
            inventory.rds_instance_endpoint = endpoint;
            self.record(inventory).await?;
            self.send_message(format!(
                "RDS instance {} is available",
                inventory.rds_instance_id
            ))
            .await;
        } else {
            self.send_message(format!(
                "RDS instance found in inventory is available: {}",
                inventory.rds_instance_id
            ))
            .await;
        }

        Ok(())
    }

    /// Delete every resource recorded in the inventory: the instance first
    /// (waited to absent), then the subnet group, then the security group.
    pub async fn delete_stack(&mut self, inventory: &mut RdsInventory) -> Result<()> {
        if !inventory.region.is_empty() {
            let region = inventory.region.clone();
            self.client.set_region(&region);
        }

        // DB Instance
        self.client.ensure_active()?;
        self.delete_rds_instance(&inventory.rds_instance_id).await?;
        self.send_message(format!(
            "RDS instance {} deletion initiated",
            inventory.rds_instance_id
        ))
        .await;
        self.send_message(format!(
            "waiting for RDS instance {} to be deleted",
            inventory.rds_instance_id
        ))
        .await;
        self.wait_for_rds_instance(&inventory.rds_instance_id, RdsCondition::Deleted)
            .await?;
        self.send_message(format!("RDS instance {} deleted", inventory.rds_instance_id))
            .await;
        inventory.rds_instance_id.clear();
        inventory.rds_instance_endpoint.clear();
        self.record(inventory).await?;

        // DB Subnet Group
        self.client.ensure_active()?;
        self.delete_subnet_group(&inventory.subnet_group_name)
            .await?;
        self.send_message(format!(
            "subnet group {} deleted",
            inventory.subnet_group_name
        ))
        .await;
        inventory.subnet_group_name.clear();
        self.record(inventory).await?;

        // Security Group
        self.client.ensure_active()?;
        self.delete_security_group(&inventory.security_group_id)
            .await?;
        self.send_message(format!(
            "security group {} deleted",
            inventory.security_group_id
        ))
        .await;
        inventory.security_group_id.clear();
        self.record(inventory).await?;

        Ok(())
    }
}
