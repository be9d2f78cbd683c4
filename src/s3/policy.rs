//! IAM policy granting the workload read/write access to the bucket.

use anyhow::{bail, Context, Result};
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_sdk_iam::types::{PolicyScopeType, Tag};

use super::S3Client;
use crate::error::{is_already_exists, is_not_found};

/// A created (or adopted) bucket-access policy.
#[derive(Debug, Clone)]
pub(crate) struct CreatedPolicy {
    pub name: String,
    pub arn: String,
}

fn bucket_read_write_policy(bucket_name: &str) -> String {
    format!(
        r#"{{
    "Version": "2012-10-17",
    "Statement": [
        {{
            "Effect": "Allow",
            "Action": [
                "s3:GetObject",
                "s3:ListBucket"
            ],
            "Resource": [
                "arn:aws:s3:::{bucket_name}/*",
                "arn:aws:s3:::{bucket_name}"
            ]
        }},
        {{
            "Effect": "Allow",
            "Action": [
                "s3:PutObject",
                "s3:PutObjectAcl",
                "s3:DeleteObject"
            ],
            "Resource": "arn:aws:s3:::{bucket_name}/*"
        }}
    ]
}}"#
    )
}

impl S3Client {
    /// Create the policy allowing the workload's service account to read,
    /// create, update and delete objects in the bucket.
    ///
    /// If a policy with the same name already exists, the account's
    /// customer-managed policies are listed and the one with the matching
    /// name is adopted.
    pub(crate) async fn create_policy(
        &self,
        tags: &[Tag],
        bucket_name: &str,
        service_account_name: &str,
        name_suffix: &str,
    ) -> Result<CreatedPolicy> {
        let iam = self.client.iam();

        let policy_name = format!("{service_account_name}-{name_suffix}");
        let document = bucket_read_write_policy(bucket_name);

        match iam
            .create_policy()
            .policy_name(&policy_name)
            .description("Allow read, create, update and delete of objects in specified bucket")
            .policy_document(document)
            .set_tags(Some(tags.to_vec()))
            .send()
            .await
        {
            Ok(resp) => {
                let policy = resp.policy().context("no policy in create response")?;
                Ok(CreatedPolicy {
                    name: policy
                        .policy_name()
                        .context("no policy name in create response")?
                        .to_string(),
                    arn: policy
                        .arn()
                        .context("no policy ARN in create response")?
                        .to_string(),
                })
            }
            Err(e) if is_already_exists(e.code()) => self.adopt_policy(&policy_name).await,
            Err(e) => Err(e).with_context(|| {
                format!("failed to create S3 bucket read write policy {policy_name}")
            }),
        }
    }

    /// Adopt an existing policy with the expected name.
    ///
    /// Bucket policies are not created under a stack path, so the adoption
    /// probe lists the account's customer-managed policies and matches by
    /// name.
    async fn adopt_policy(&self, policy_name: &str) -> Result<CreatedPolicy> {
        let listed = self
            .client
            .iam()
            .list_policies()
            .scope(PolicyScopeType::Local)
            .send()
            .await
            .with_context(|| {
                format!("failed to list policies to find existing {policy_name} policy")
            })?;

        for policy in listed.policies() {
            if policy.policy_name() == Some(policy_name) {
                return Ok(CreatedPolicy {
                    name: policy_name.to_string(),
                    arn: policy
                        .arn()
                        .context("no ARN on listed policy")?
                        .to_string(),
                });
            }
        }

        bail!("failed to find existing policy with name {policy_name}")
    }

    /// Delete the policy by ARN. A missing policy is treated as already
    /// deleted.
    pub(crate) async fn delete_policy(&self, policy_arn: &str) -> Result<()> {
        if policy_arn.is_empty() {
            return Ok(());
        }

        match self
            .client
            .iam()
            .delete_policy()
            .policy_arn(policy_arn)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete policy {policy_arn}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_grants_read_and_write_on_the_bucket() {
        let doc = bucket_read_write_policy("demo-bucket");
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        let read = &parsed["Statement"][0];
        assert_eq!(read["Resource"][1], "arn:aws:s3:::demo-bucket");
        let write = &parsed["Statement"][1];
        assert_eq!(write["Resource"], "arn:aws:s3:::demo-bucket/*");
        assert!(write["Action"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("s3:DeleteObject")));
    }
}
