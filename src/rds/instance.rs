//! RDS DB instance creation, deletion and condition waits.

use anyhow::{bail, Context, Result};
use aws_sdk_rds::error::ProvideErrorMetadata;
use aws_sdk_rds::types::{DbInstance, Tag};

use super::config::RdsConfig;
use super::RdsClient;
use crate::error::{is_already_exists, is_not_found, ResourceNotFound};
use crate::wait::{wait_for_condition, WaitConfig};

/// Condition an RDS instance wait resolves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdsCondition {
    Created,
    Deleted,
}

const RDS_WAIT: WaitConfig = WaitConfig::new(15, 60);

impl RdsClient {
    /// Create the DB instance. If an instance with matching name and tags
    /// already exists it is adopted.
    pub(crate) async fn create_rds_instance(
        &self,
        tags: &[Tag],
        config: &RdsConfig,
        security_group_id: &str,
        subnet_group_name: &str,
    ) -> Result<String> {
        let rds = self.client.rds();
        let instance_name = &config.name;

        match rds
            .create_db_instance()
            .db_instance_identifier(instance_name)
            .db_name(&config.db_name)
            .db_instance_class(&config.class)
            .engine(&config.engine)
            .engine_version(&config.engine_version)
            .allocated_storage(config.storage_gb)
            .backup_retention_period(config.backup_days)
            .copy_tags_to_snapshot(true)
            .master_username(&config.db_user)
            .master_user_password(&config.db_user_password)
            .monitoring_interval(0)
            .multi_az(false)
            .publicly_accessible(false)
            .vpc_security_group_ids(security_group_id)
            .db_subnet_group_name(subnet_group_name)
            .set_tags(Some(tags.to_vec()))
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .db_instance()
                .and_then(DbInstance::db_instance_identifier)
                .context("no instance identifier in create response")?
                .to_string()),
            Err(e) if is_already_exists(e.code()) => {
                self.adopt_rds_instance(instance_name, tags).await
            }
            Err(e) => Err(e)
                .with_context(|| format!("failed to create RDS instance {instance_name}")),
        }
    }

    /// Adopt an existing DB instance whose tags match ours.
    async fn adopt_rds_instance(&self, instance_name: &str, tags: &[Tag]) -> Result<String> {
        let resp = self
            .client
            .rds()
            .describe_db_instances()
            .db_instance_identifier(instance_name)
            .send()
            .await
            .context("failed to describe RDS instances to check for unique tags")?;

        for instance in resp.db_instances() {
            let Some(arn) = instance.db_instance_arn() else {
                continue;
            };
            if self.resource_tags_match(arn, tags).await? {
                return Ok(instance
                    .db_instance_identifier()
                    .context("no identifier on described RDS instance")?
                    .to_string());
            }
        }

        bail!("RDS instance {instance_name} exists but tags do not match")
    }

    /// Delete the DB instance without a final snapshot. A missing instance
    /// is treated as already deleted.
    pub(crate) async fn delete_rds_instance(&self, rds_instance_id: &str) -> Result<()> {
        if rds_instance_id.is_empty() {
            return Ok(());
        }

        match self
            .client
            .rds()
            .delete_db_instance()
            .db_instance_identifier(rds_instance_id)
            .skip_final_snapshot(true)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to delete RDS instance {rds_instance_id}"))
            }
        }
    }

    /// Wait for the DB instance to reach the given condition.
    ///
    /// When waiting for creation, returns the instance's endpoint address
    /// once it is available. When waiting for deletion, returns an empty
    /// string once the instance is gone.
    pub(crate) async fn wait_for_rds_instance(
        &self,
        rds_instance_id: &str,
        condition: RdsCondition,
    ) -> Result<String> {
        if rds_instance_id.is_empty() {
            return Ok(String::new());
        }

        wait_for_condition(
            RDS_WAIT,
            self.client.cancellation(),
            "RDS instance",
            || async {
                let instance = match self.get_rds_instance(rds_instance_id).await {
                    Ok(instance) => instance,
                    Err(e) if e.is::<ResourceNotFound>() && condition == RdsCondition::Deleted => {
                        return Ok(Some(String::new()));
                    }
                    Err(e) => {
                        return Err(e.context(format!(
                            "failed to get RDS instance status with identifier {rds_instance_id}"
                        )))
                    }
                };

                if condition == RdsCondition::Created
                    && instance.db_instance_status() == Some("available")
                {
                    let endpoint = instance
                        .endpoint()
                        .and_then(|endpoint| endpoint.address())
                        .context("available RDS instance has no endpoint")?;
                    return Ok(Some(endpoint.to_string()));
                }
                Ok(None)
            },
        )
        .await
    }

    /// Describe the DB instance, returning the not-found sentinel if it
    /// does not exist.
    async fn get_rds_instance(&self, rds_instance_id: &str) -> Result<DbInstance> {
        let resp = match self
            .client
            .rds()
            .describe_db_instances()
            .db_instance_identifier(rds_instance_id)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if is_not_found(e.code()) => return Err(ResourceNotFound.into()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to describe RDS instance with identifier {rds_instance_id}")
                })
            }
        };

        match resp.db_instances() {
            [] => bail!("failed to find any RDS instances with identifier {rds_instance_id}"),
            [instance] => Ok(instance.clone()),
            _ => bail!("received back more than one RDS instance with identifier {rds_instance_id}"),
        }
    }
}
