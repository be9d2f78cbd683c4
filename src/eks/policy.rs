//! IAM policies for optional cluster capabilities.
//!
//! Policies are created under the path `/<stack-name>/` so that listing by
//! path prefix is a reliable existence probe when adopting.

use anyhow::{bail, Context, Result};
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_sdk_iam::types::{PolicyScopeType, Tag};

use super::EksClient;
use crate::error::{is_already_exists, is_not_found};

const DNS_POLICY_NAME: &str = "DNSUpdates";
const DNS01_CHALLENGE_POLICY_NAME: &str = "DNS01Challenge";
const SECRETS_MANAGER_POLICY_NAME: &str = "SecretsManager";
const AUTOSCALING_POLICY_NAME: &str = "ClusterAutoscaler";

pub(crate) const CLUSTER_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy";
pub(crate) const WORKER_NODE_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy";
pub(crate) const CONTAINER_REGISTRY_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly";
pub(crate) const CNI_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKS_CNI_Policy";
pub(crate) const CSI_DRIVER_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonEBSCSIDriverPolicy";

/// A created (or adopted) IAM policy.
#[derive(Debug, Clone)]
pub(crate) struct CreatedPolicy {
    pub name: String,
    pub arn: String,
}

const DNS_MANAGEMENT_POLICY_DOCUMENT: &str = r#"{
"Version": "2012-10-17",
"Statement": [
{
  "Effect": "Allow",
  "Action": [
    "route53:ChangeResourceRecordSets"
  ],
  "Resource": [
    "arn:aws:route53:::hostedzone/*"
  ]
},
{
  "Effect": "Allow",
  "Action": [
    "route53:ListHostedZones",
    "route53:ListResourceRecordSets"
  ],
  "Resource": [
    "*"
  ]
}
]
}"#;

// The cert-manager documentation's DNS01 policy is incomplete; this set of
// actions is what the solver actually needs.
const DNS01_CHALLENGE_POLICY_DOCUMENT: &str = r#"{
"Version": "2012-10-17",
"Statement": [
{
  "Effect": "Allow",
  "Action": [
    "route53:ChangeResourceRecordSets"
  ],
  "Resource": [
    "arn:aws:route53:::hostedzone/*"
  ]
},
{
  "Effect": "Allow",
  "Action": [
    "route53:GetChange",
    "route53:ListHostedZones",
    "route53:ListResourceRecordSets",
    "route53:ListHostedZonesByName"
  ],
  "Resource": [
    "*"
  ]
}
]
}"#;

const SECRETS_MANAGER_POLICY_DOCUMENT: &str = r#"{
"Version": "2012-10-17",
"Statement": [
{
  "Effect": "Allow",
  "Sid": "SecretsManagerPermissions",
  "Action": [
    "secretsmanager:BatchGetSecretValue",
    "secretsmanager:ListSecrets",
    "secretsmanager:CreateSecret",
    "secretsmanager:DeleteSecret",
    "secretsmanager:GetSecretValue"
  ],
  "Resource": [
    "*"
  ]
}
]
}"#;

fn autoscaling_policy_document(cluster_name: &str) -> String {
    format!(
        r#"{{
    "Version": "2012-10-17",
    "Statement": [
        {{
            "Effect": "Allow",
            "Action": [
                "autoscaling:SetDesiredCapacity",
                "autoscaling:TerminateInstanceInAutoScalingGroup"
            ],
            "Resource": "*",
            "Condition": {{
                "StringEquals": {{
                    "aws:ResourceTag/k8s.io/cluster-autoscaler/{cluster_name}": "owned"
                }}
            }}
        }},
        {{
            "Effect": "Allow",
            "Action": [
                "autoscaling:DescribeAutoScalingInstances",
                "autoscaling:DescribeAutoScalingGroups",
                "ec2:DescribeLaunchTemplateVersions",
                "autoscaling:DescribeTags",
                "autoscaling:DescribeLaunchConfigurations",
                "ec2:DescribeInstanceTypes"
            ],
            "Resource": "*"
        }}
    ]
}}"#
    )
}

impl EksClient {
    /// Create the policy that allows cluster services to update Route53
    /// records.
    pub(crate) async fn create_dns_management_policy(
        &self,
        tags: &[Tag],
        cluster_name: &str,
    ) -> Result<CreatedPolicy> {
        self.create_capability_policy(
            &format!("{DNS_POLICY_NAME}-{cluster_name}"),
            cluster_name,
            "Allow cluster services to update Route53 records",
            DNS_MANAGEMENT_POLICY_DOCUMENT,
            tags,
        )
        .await
    }

    /// Create the policy that allows cluster services to complete DNS01
    /// challenges.
    pub(crate) async fn create_dns01_challenge_policy(
        &self,
        tags: &[Tag],
        cluster_name: &str,
    ) -> Result<CreatedPolicy> {
        self.create_capability_policy(
            &format!("{DNS01_CHALLENGE_POLICY_NAME}-{cluster_name}"),
            cluster_name,
            "Allow cluster services to complete DNS01 challenges",
            DNS01_CHALLENGE_POLICY_DOCUMENT,
            tags,
        )
        .await
    }

    /// Create the policy that allows cluster services to manage secrets.
    pub(crate) async fn create_secrets_manager_policy(
        &self,
        tags: &[Tag],
        cluster_name: &str,
    ) -> Result<CreatedPolicy> {
        self.create_capability_policy(
            &format!("{SECRETS_MANAGER_POLICY_NAME}-{cluster_name}"),
            cluster_name,
            "Allow cluster services to manage secrets",
            SECRETS_MANAGER_POLICY_DOCUMENT,
            tags,
        )
        .await
    }

    /// Create the policy that allows the cluster autoscaler to manage node
    /// pool sizes.
    pub(crate) async fn create_cluster_autoscaling_policy(
        &self,
        tags: &[Tag],
        cluster_name: &str,
    ) -> Result<CreatedPolicy> {
        self.create_capability_policy(
            &format!("{AUTOSCALING_POLICY_NAME}-{cluster_name}"),
            cluster_name,
            "Allow cluster autoscaler to manage node pool sizes",
            &autoscaling_policy_document(cluster_name),
            tags,
        )
        .await
    }

    /// Create an IAM policy under the stack's path.
    ///
    /// If the policy already exists, the policies under the path are listed
    /// and the one with the matching name is adopted.
    async fn create_capability_policy(
        &self,
        policy_name: &str,
        cluster_name: &str,
        description: &str,
        document: &str,
        tags: &[Tag],
    ) -> Result<CreatedPolicy> {
        let iam = self.client.iam();
        let policy_path = format!("/{cluster_name}/");

        match iam
            .create_policy()
            .policy_name(policy_name)
            .path(&policy_path)
            .description(description)
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
            Err(e) if is_already_exists(e.code()) => {
                let listed = iam
                    .list_policies()
                    .path_prefix(&policy_path)
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
                bail!("failed to find existing policy with name {policy_name} and path {policy_path}")
            }
            Err(e) => Err(e).with_context(|| format!("failed to create policy {policy_name}")),
        }
    }

    /// Delete policies by ARN. Policies that are already gone are skipped.
    pub(crate) async fn delete_policies(&self, policy_arns: &[String]) -> Result<()> {
        if policy_arns.is_empty() {
            return Ok(());
        }

        let iam = self.client.iam();
        for policy_arn in policy_arns {
            match iam.delete_policy().policy_arn(policy_arn).send().await {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to delete policy {policy_arn}"))
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_policy_documents_are_valid_json() {
        for doc in [
            DNS_MANAGEMENT_POLICY_DOCUMENT,
            DNS01_CHALLENGE_POLICY_DOCUMENT,
            SECRETS_MANAGER_POLICY_DOCUMENT,
        ] {
            serde_json::from_str::<serde_json::Value>(doc).unwrap();
        }
    }

    #[test]
    fn autoscaling_policy_scopes_to_cluster_tag() {
        let doc = autoscaling_policy_document("demo");
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        let condition = &parsed["Statement"][0]["Condition"]["StringEquals"];
        assert_eq!(
            condition["aws:ResourceTag/k8s.io/cluster-autoscaler/demo"],
            "owned"
        );
    }
}
