//! IAM roles for the cluster, worker nodes and IRSA-bound services.

use anyhow::{bail, Context, Result};
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_sdk_iam::types::Tag;

use super::config::ServiceAccountConfig;
use super::policy::{
    CLUSTER_POLICY_ARN, CNI_POLICY_ARN, CONTAINER_REGISTRY_POLICY_ARN, CSI_DRIVER_POLICY_ARN,
    WORKER_NODE_POLICY_ARN,
};
use super::EksClient;
use crate::error::{is_already_exists, is_not_found};
use crate::inventory::RoleInventory;
use crate::util::irsa_trust_policy;

const CLUSTER_ROLE_PREFIX: &str = "cluster-role";
const WORKER_ROLE_PREFIX: &str = "worker-role";
const DNS_MANAGEMENT_ROLE_PREFIX: &str = "dns-mgmt-role";
const DNS01_CHALLENGE_ROLE_PREFIX: &str = "dns-chlg-role";
const SECRETS_MANAGER_ROLE_PREFIX: &str = "sm-role";
const CLUSTER_AUTOSCALING_ROLE_PREFIX: &str = "ca-role";
const STORAGE_MANAGEMENT_ROLE_PREFIX: &str = "csi-role";

const EKS_ASSUME_ROLE_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
      {
          "Effect": "Allow",
          "Principal": {
              "Service": [
                  "eks.amazonaws.com"
              ]
          },
          "Action": "sts:AssumeRole"
      }
  ]
}"#;

const EC2_ASSUME_ROLE_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
      {
          "Effect": "Allow",
          "Principal": {
              "Service": [
                  "ec2.amazonaws.com"
              ]
          },
          "Action": [
              "sts:AssumeRole"
          ]
      }
  ]
}"#;

/// Managed policies attached to the worker node role.
pub(crate) fn worker_policy_arns() -> Vec<String> {
    vec![
        WORKER_NODE_POLICY_ARN.to_string(),
        CONTAINER_REGISTRY_POLICY_ARN.to_string(),
        CNI_POLICY_ARN.to_string(),
    ]
}

/// IAM rejects role names longer than 64 characters; fail before any call.
pub(crate) fn check_role_name(name: &str) -> Result<()> {
    if name.chars().count() > 64 {
        bail!("role name {name} too long, must be 64 characters or less");
    }
    Ok(())
}

impl EksClient {
    /// Create the role the EKS control plane assumes.
    pub(crate) async fn create_cluster_role(
        &self,
        tags: &[Tag],
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{CLUSTER_ROLE_PREFIX}-{cluster_name}");
        self.create_role_with_policies(
            &role_name,
            EKS_ASSUME_ROLE_POLICY,
            None,
            Some(CLUSTER_POLICY_ARN),
            &[CLUSTER_POLICY_ARN.to_string()],
            tags,
        )
        .await
    }

    /// Create the role the worker nodes assume.
    pub(crate) async fn create_node_role(
        &self,
        tags: &[Tag],
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{WORKER_ROLE_PREFIX}-{cluster_name}");
        self.create_role_with_policies(
            &role_name,
            EC2_ASSUME_ROLE_POLICY,
            None,
            None,
            &worker_policy_arns(),
            tags,
        )
        .await
    }

    /// Create the IRSA role for DNS record management (e.g. external-dns).
    pub(crate) async fn create_dns_management_role(
        &self,
        tags: &[Tag],
        dns_policy_arn: &str,
        aws_account_id: &str,
        oidc_issuer_url: &str,
        service_account: &ServiceAccountConfig,
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{DNS_MANAGEMENT_ROLE_PREFIX}-{cluster_name}");
        let role_path = format!("/{cluster_name}/");
        let trust_policy = irsa_trust_policy(
            aws_account_id,
            oidc_issuer_url,
            &service_account.namespace,
            &service_account.name,
        );
        self.create_role_with_policies(
            &role_name,
            &trust_policy,
            Some(&role_path),
            Some(dns_policy_arn),
            &[dns_policy_arn.to_string()],
            tags,
        )
        .await
    }

    /// Create the IRSA role for DNS01 challenges (e.g. cert-manager).
    pub(crate) async fn create_dns01_challenge_role(
        &self,
        tags: &[Tag],
        dns_policy_arn: &str,
        aws_account_id: &str,
        oidc_issuer_url: &str,
        service_account: &ServiceAccountConfig,
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{DNS01_CHALLENGE_ROLE_PREFIX}-{cluster_name}");
        let trust_policy = irsa_trust_policy(
            aws_account_id,
            oidc_issuer_url,
            &service_account.namespace,
            &service_account.name,
        );
        self.create_role_with_policies(
            &role_name,
            &trust_policy,
            None,
            Some(dns_policy_arn),
            &[dns_policy_arn.to_string()],
            tags,
        )
        .await
    }

    /// Create the IRSA role for secrets management.
    pub(crate) async fn create_secrets_manager_role(
        &self,
        tags: &[Tag],
        secrets_policy_arn: &str,
        aws_account_id: &str,
        oidc_issuer_url: &str,
        service_account: &ServiceAccountConfig,
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{SECRETS_MANAGER_ROLE_PREFIX}-{cluster_name}");
        let trust_policy = irsa_trust_policy(
            aws_account_id,
            oidc_issuer_url,
            &service_account.namespace,
            &service_account.name,
        );
        self.create_role_with_policies(
            &role_name,
            &trust_policy,
            None,
            Some(secrets_policy_arn),
            &[secrets_policy_arn.to_string()],
            tags,
        )
        .await
    }

    /// Create the IRSA role for the cluster autoscaler.
    pub(crate) async fn create_cluster_autoscaling_role(
        &self,
        tags: &[Tag],
        autoscaling_policy_arn: &str,
        aws_account_id: &str,
        oidc_issuer_url: &str,
        service_account: &ServiceAccountConfig,
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{CLUSTER_AUTOSCALING_ROLE_PREFIX}-{cluster_name}");
        let trust_policy = irsa_trust_policy(
            aws_account_id,
            oidc_issuer_url,
            &service_account.namespace,
            &service_account.name,
        );
        self.create_role_with_policies(
            &role_name,
            &trust_policy,
            None,
            Some(autoscaling_policy_arn),
            &[autoscaling_policy_arn.to_string()],
            tags,
        )
        .await
    }

    /// Create the IRSA role for the EBS CSI driver's service account.
    pub(crate) async fn create_storage_management_role(
        &self,
        tags: &[Tag],
        aws_account_id: &str,
        oidc_issuer_url: &str,
        service_account: &ServiceAccountConfig,
        cluster_name: &str,
    ) -> Result<RoleInventory> {
        let role_name = format!("{STORAGE_MANAGEMENT_ROLE_PREFIX}-{cluster_name}");
        let trust_policy = irsa_trust_policy(
            aws_account_id,
            oidc_issuer_url,
            &service_account.namespace,
            &service_account.name,
        );
        self.create_role_with_policies(
            &role_name,
            &trust_policy,
            None,
            Some(CSI_DRIVER_POLICY_ARN),
            &[CSI_DRIVER_POLICY_ARN.to_string()],
            tags,
        )
        .await
    }

    /// Create an IAM role with the given trust policy and attach the listed
    /// policies.
    ///
    /// If a role with the same name already exists, it is adopted: the
    /// attached policies are listed, any expected policy that is missing is
    /// attached, and the existing role is returned as if freshly created.
    async fn create_role_with_policies(
        &self,
        role_name: &str,
        trust_policy: &str,
        path: Option<&str>,
        permissions_boundary: Option<&str>,
        policy_arns: &[String],
        tags: &[Tag],
    ) -> Result<RoleInventory> {
        check_role_name(role_name)?;

        let iam = self.client.iam();

        let mut create = iam
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(trust_policy)
            .set_tags(Some(tags.to_vec()));
        if let Some(path) = path {
            create = create.path(path);
        }
        if let Some(boundary) = permissions_boundary {
            create = create.permissions_boundary(boundary);
        }

        let role_arn = match create.send().await {
            Ok(resp) => resp
                .role()
                .map(|role| role.arn().to_string())
                .context("no role in create response")?,
            Err(e) if is_already_exists(e.code()) => {
                return self.adopt_role(role_name, policy_arns).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create role {role_name}"))
            }
        };

        for policy_arn in policy_arns {
            self.attach_policy_to_role(role_name, policy_arn).await?;
        }

        Ok(RoleInventory {
            role_name: role_name.to_string(),
            role_arn,
            role_policy_arns: policy_arns.to_vec(),
        })
    }

    /// Adopt an existing role, attaching any expected policy it is missing.
    async fn adopt_role(&self, role_name: &str, policy_arns: &[String]) -> Result<RoleInventory> {
        let iam = self.client.iam();

        let attached = iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("failed to list policies for role {role_name}"))?;

        for expected in policy_arns {
            let found = attached
                .attached_policies()
                .iter()
                .any(|policy| policy.policy_arn() == Some(expected.as_str()));
            if !found {
                self.attach_policy_to_role(role_name, expected).await?;
            }
        }

        let role = iam
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
            role_arn: role,
            role_policy_arns: policy_arns.to_vec(),
        })
    }

    /// Delete roles, detaching each recorded policy first. Roles that are
    /// already gone are treated as deleted.
    pub(crate) async fn delete_roles(&self, roles: &[RoleInventory]) -> Result<()> {
        let iam = self.client.iam();

        for role in roles {
            if role.role_name.is_empty() {
                continue;
            }
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
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to delete role {}", role.role_name))
                }
            }
        }

        Ok(())
    }

    async fn attach_policy_to_role(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.client
            .iam()
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("failed to attach policy {policy_arn} to {role_name}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_of_64_scalars_accepted() {
        let name: String = "é".repeat(64);
        assert_eq!(name.chars().count(), 64);
        assert!(check_role_name(&name).is_ok());
    }

    #[test]
    fn role_name_of_65_scalars_rejected() {
        let name: String = "é".repeat(65);
        let err = check_role_name(&name).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn worker_role_gets_three_policies() {
        let arns = worker_policy_arns();
        assert_eq!(arns.len(), 3);
        assert!(arns.contains(&WORKER_NODE_POLICY_ARN.to_string()));
        assert!(arns.contains(&CONTAINER_REGISTRY_POLICY_ARN.to_string()));
        assert!(arns.contains(&CNI_POLICY_ARN.to_string()));
    }

    #[test]
    fn trust_policies_are_valid_json() {
        for doc in [EKS_ASSUME_ROLE_POLICY, EC2_ASSUME_ROLE_POLICY] {
            serde_json::from_str::<serde_json::Value>(doc).unwrap();
        }
    }
}
