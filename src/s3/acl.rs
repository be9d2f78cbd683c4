//! Bucket access control: private, or public read.
//!
//! The public-read path first removes the bucket's public-access block and
//! installs a bucket policy granting anonymous `s3:GetObject`. The policy
//! write is retried because the access-block removal takes a short while to
//! propagate; this is the one intentional propagation-retry loop in the
//! system, distinct from the condition waits.

use std::time::Duration;

use anyhow::{Context, Result};
use aws_sdk_s3::types::BucketCannedAcl;
use backon::{ConstantBuilder, Retryable};
use tracing::debug;

use super::S3Client;

const PUT_POLICY_RETRY_DELAY: Duration = Duration::from_secs(2);
const PUT_POLICY_MAX_RETRIES: usize = 20;

fn public_read_policy(bucket_name: &str) -> String {
    format!(
        r#"{{
    "Version": "2012-10-17",
    "Statement": [{{
        "Sid": "PublicReadGetObject",
        "Effect": "Allow",
        "Principal": "*",
        "Action": "s3:GetObject",
        "Resource": "arn:aws:s3:::{bucket_name}/*"
    }}]
}}"#
    )
}

impl S3Client {
    /// Apply the bucket's access control list: `public-read` when public
    /// get access is requested, `private` otherwise.
    pub(crate) async fn create_acl(
        &self,
        bucket_name: &str,
        public_get_access: bool,
    ) -> Result<()> {
        let s3 = self.client.s3();

        let canned_acl = if public_get_access {
            BucketCannedAcl::PublicRead
        } else {
            BucketCannedAcl::Private
        };

        if public_get_access {
            s3.delete_public_access_block()
                .bucket(bucket_name)
                .send()
                .await
                .with_context(|| {
                    format!(
                        "failed to apply configuration to allow public ACLs to bucket {bucket_name}"
                    )
                })?;

            let policy = public_read_policy(bucket_name);
            (|| async {
                s3.put_bucket_policy()
                    .bucket(bucket_name)
                    .policy(&policy)
                    .send()
                    .await?;
                Ok::<_, aws_sdk_s3::error::SdkError<
                    aws_sdk_s3::operation::put_bucket_policy::PutBucketPolicyError,
                >>(())
            })
            .retry(
                ConstantBuilder::default()
                    .with_delay(PUT_POLICY_RETRY_DELAY)
                    .with_max_times(PUT_POLICY_MAX_RETRIES),
            )
            .notify(|e, _| {
                debug!(bucket = %bucket_name, error = %e, "bucket policy not accepted yet, retrying");
            })
            .await
            .with_context(|| format!("failed to apply bucket policy to bucket {bucket_name}"))?;
        }

        s3.put_bucket_acl()
            .bucket(bucket_name)
            .acl(canned_acl)
            .send()
            .await
            .with_context(|| format!("failed to apply bucket ACL to bucket {bucket_name}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_read_policy_targets_bucket_objects() {
        let doc = public_read_policy("demo-bucket");
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["Statement"][0]["Sid"], "PublicReadGetObject");
        assert_eq!(parsed["Statement"][0]["Action"], "s3:GetObject");
        assert_eq!(
            parsed["Statement"][0]["Resource"],
            "arn:aws:s3:::demo-bucket/*"
        );
    }
}
