//! IAM role assumed by the workload's service account via IRSA.

use anyhow::{Context, Result};
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_sdk_iam::types::Tag;

use super::S3Client;
use crate::error::{is_already_exists, is_not_found};
use crate::inventory::RoleInventory;
use crate::util::irsa_trust_policy;

impl S3Client {
    /// Create the role the workload's service account assumes to reach the
    /// bucket, with the bucket-access policy attached and set as its
    /// permissions boundary.
    ///
    /// If a role with the same name already exists, it is adopted: the
    /// bucket-access policy is attached if missing and the existing role is
    /// returned as if freshly created.
    pub(crate) async fn create_role(
        &self,
        tags: &[Tag],
        policy_arn: &str,
        aws_account: &str,
        oidc_url: &str,
        service_account_name: &str,
        service_account_namespace: &str,
    ) -> Result<RoleInventory> {
        let iam = self.client.iam();

        let role_name = service_account_name;
        let trust_policy = irsa_trust_policy(
            aws_account,
            oidc_url,
            service_account_namespace,
            service_account_name,
        );

        let role_arn = match iam
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(trust_policy)
            .permissions_boundary(policy_arn)
            .set_tags(Some(tags.to_vec()))
            .send()
            .await
        {
            Ok(resp) => resp
                .role()
                .map(|role| role.arn().to_string())
                .context("no role in create response")?,
            Err(e) if is_already_exists(e.code()) => {
                return self.adopt_role(role_name, policy_arn).await;
            }
            Err(e) => return Err(e).with_context(|| format!("failed to create role {role_name}")),
        };

        iam.attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| {
                format!("failed to attach role policy {policy_arn} to {role_name}")
            })?;

        Ok(RoleInventory {
            role_name: role_name.to_string(),
            role_arn,
            role_policy_arns: vec![policy_arn.to_string()],
        })
    }

    /// Adopt an existing role, attaching the bucket-access policy if it is
    /// missing.
    async fn adopt_role(&self, role_name: &str, policy_arn: &str) -> Result<RoleInventory> {
        let iam = self.client.iam();

        let attached = iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("failed to list policies for role {role_name}"))?;

        let policy_attached = attached
            .attached_policies()
            .iter()
            .any(|policy| policy.policy_arn() == Some(policy_arn));
        if !policy_attached {
            iam.attach_role_policy()
                .role_name(role_name)
                .policy_arn(policy_arn)
                .send()
                .await
                .with_context(|| {
                    format!("failed to attach role policy {policy_arn} to {role_name}")
                })?;
        }

        let role_arn = iam
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("failed to get existing role with name {role_name}"))?
            .role()
            .map(|role| role.arn().to_string())
            .context("no role in get response")?;

        Ok(RoleInventory {
            role_name: role_name.to_string(),
            role_arn,
            role_policy_arns: vec![policy_arn.to_string()],
        })
    }

    /// Detach the role's policies and delete it. A missing role is treated
    /// as already deleted.
    pub(crate) async fn delete_role(&self, role: &RoleInventory) -> Result<()> {
        if role.role_name.is_empty() {
            return Ok(());
        }

        let iam = self.client.iam();

        for policy_arn in &role.role_policy_arns {
            match iam
                .detach_role_policy()
                .role_name(&role.role_name)
                .policy_arn(policy_arn)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "failed to detach policy {policy_arn} from role {}",
                            role.role_name
                        )
                    })
                }
            }
        }

        match iam.delete_role().role_name(&role.role_name).send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to delete role {}", role.role_name))
            }
        }
    }
}
