//! S3 access point scoped to the workload's VPC.

use anyhow::{Context, Result};
use aws_sdk_s3control::error::ProvideErrorMetadata;
use aws_sdk_s3control::types::VpcConfiguration;

use super::S3Client;
use crate::error::is_not_found;

impl S3Client {
    /// Create a VPC-scoped access point for the bucket.
    pub(crate) async fn create_access_point(
        &self,
        name: &str,
        bucket_name: &str,
        aws_account: &str,
        read_write_vpc_id: &str,
    ) -> Result<String> {
        self.client
            .s3control()
            .create_access_point()
            .account_id(aws_account)
            .name(name)
            .bucket(bucket_name)
            .vpc_configuration(
                VpcConfiguration::builder()
                    .vpc_id(read_write_vpc_id)
                    .build()
                    .context("failed to build access point VPC configuration")?,
            )
            .send()
            .await
            .with_context(|| format!("failed to create S3 access point {name}"))?;

        Ok(name.to_string())
    }

    /// Delete the access point. A missing access point is treated as
    /// already deleted.
    pub(crate) async fn delete_access_point(
        &self,
        access_point_name: &str,
        aws_account: &str,
    ) -> Result<()> {
        if access_point_name.is_empty() {
            return Ok(());
        }

        match self
            .client
            .s3control()
            .delete_access_point()
            .account_id(aws_account)
            .name(access_point_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to delete S3 access point {access_point_name}")),
        }
    }
}
