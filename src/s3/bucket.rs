//! S3 bucket creation and deletion.

use anyhow::{bail, Context, Result};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration, ObjectOwnership,
    Tag, Tagging, VersioningConfiguration,
};
use uuid::Uuid;

use super::S3Client;
use crate::error::is_not_found;

impl S3Client {
    /// Create the bucket with a fresh UUID suffix for global uniqueness,
    /// enable object versioning and apply the stack tags.
    ///
    /// Returns the full bucket name.
    pub(crate) async fn create_bucket(
        &self,
        tags: &[Tag],
        bucket_name: &str,
        region: &str,
    ) -> Result<String> {
        let s3 = self.client.s3();

        let location_constraint = bucket_location_constraint(region)?;

        let unique_bucket_name = format!("{bucket_name}-{}", Uuid::new_v4());
        let mut create = s3
            .create_bucket()
            .bucket(&unique_bucket_name)
            .object_ownership(ObjectOwnership::ObjectWriter);
        // us-east-1 is the default region and must not carry a location
        // constraint in the create payload
        if let Some(constraint) = location_constraint {
            create = create.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }
        create
            .send()
            .await
            .with_context(|| format!("failed to create S3 bucket {unique_bucket_name}"))?;

        s3.put_bucket_versioning()
            .bucket(&unique_bucket_name)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await
            .with_context(|| {
                format!("failed to enable object versioning for bucket {unique_bucket_name}")
            })?;

        s3.put_bucket_tagging()
            .bucket(&unique_bucket_name)
            .tagging(
                Tagging::builder()
                    .set_tag_set(Some(tags.to_vec()))
                    .build()
                    .context("failed to build bucket tagging")?,
            )
            .send()
            .await
            .with_context(|| format!("failed to add tags to bucket {unique_bucket_name}"))?;

        Ok(unique_bucket_name)
    }

    /// Delete the bucket. A missing bucket is treated as already deleted.
    pub(crate) async fn delete_bucket(&self, bucket_name: &str) -> Result<()> {
        if bucket_name.is_empty() {
            return Ok(());
        }

        match self
            .client
            .s3()
            .delete_bucket()
            .bucket(bucket_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to delete S3 bucket {bucket_name}"))
            }
        }
    }
}

/// Resolve the bucket location constraint for a region.
///
/// Returns `None` for `us-east-1` (the default region, which takes no
/// constraint) and an error for regions S3 does not support.
pub(crate) fn bucket_location_constraint(
    region: &str,
) -> Result<Option<BucketLocationConstraint>> {
    if region == "us-east-1" {
        return Ok(None);
    }
    if BucketLocationConstraint::values().contains(&region) {
        return Ok(Some(BucketLocationConstraint::from(region)));
    }
    bail!("supplied region {region} is not a supported region for S3 buckets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_east_1_omits_the_location_constraint() {
        assert_eq!(bucket_location_constraint("us-east-1").unwrap(), None);
    }

    #[test]
    fn supported_region_maps_to_constraint() {
        let constraint = bucket_location_constraint("us-west-2").unwrap().unwrap();
        assert_eq!(constraint.as_str(), "us-west-2");
    }

    #[test]
    fn unsupported_region_is_rejected() {
        let err = bucket_location_constraint("mars-central-1").unwrap_err();
        assert!(err.to_string().contains("not a supported region"));
    }
}
