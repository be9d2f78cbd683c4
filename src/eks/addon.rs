//! EBS CSI driver add-on.

use std::collections::HashMap;

use anyhow::{Context, Result};
use aws_sdk_eks::error::ProvideErrorMetadata;

use super::EksClient;
use crate::error::is_already_exists;

const EBS_STORAGE_ADDON_NAME: &str = "aws-ebs-csi-driver";

impl EksClient {
    /// Install the EBS CSI driver add-on on the cluster, bound to the
    /// storage management role. An add-on that is already installed is
    /// treated as created.
    pub(crate) async fn create_ebs_storage_addon(
        &self,
        tags: &HashMap<String, String>,
        cluster_name: &str,
        storage_management_role_arn: &str,
    ) -> Result<String> {
        match self
            .client
            .eks()
            .create_addon()
            .addon_name(EBS_STORAGE_ADDON_NAME)
            .cluster_name(cluster_name)
            .service_account_role_arn(storage_management_role_arn)
            .set_tags(Some(tags.clone()))
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .addon()
                .and_then(|addon| addon.addon_name())
                .unwrap_or(EBS_STORAGE_ADDON_NAME)
                .to_string()),
            Err(e) if is_already_exists(e.code()) => Ok(EBS_STORAGE_ADDON_NAME.to_string()),
            Err(e) => Err(e).context("failed to create EBS storage addon"),
        }
    }
}
