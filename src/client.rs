//! Shared resource client.
//!
//! Holds the loaded AWS configuration, the progress-message sender and the
//! cancellation token. Kind-specific clients (EKS, RDS, S3) compose this and
//! add their typed inventory sink. Service clients are constructed per call
//! from the current configuration so a region override made while
//! reconciling config against inventory applies to every subsequent call.

use anyhow::{bail, Result};
use aws_config::{Region, SdkConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Context shared by every resource operation in one stack invocation.
#[derive(Clone)]
pub struct ResourceClient {
    aws_config: SdkConfig,
    messages: Option<mpsc::Sender<String>>,
    cancel: CancellationToken,
}

impl ResourceClient {
    pub fn new(
        aws_config: SdkConfig,
        messages: Option<mpsc::Sender<String>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            aws_config,
            messages,
            cancel,
        }
    }

    /// The currently configured region, if any.
    pub fn region(&self) -> Option<String> {
        self.aws_config.region().map(|r| r.to_string())
    }

    /// Override the region for all subsequent service calls.
    pub fn set_region(&mut self, region: &str) {
        self.aws_config = self
            .aws_config
            .to_builder()
            .region(Region::new(region.to_string()))
            .build();
    }

    /// Send a progress message to the consumer, if one is attached.
    pub async fn send_message(&self, message: impl Into<String>) {
        if let Some(tx) = &self.messages {
            let _ = tx.send(message.into()).await;
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail fast between recipe steps once cancellation has been requested.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            bail!("operation cancelled");
        }
        Ok(())
    }

    pub fn ec2(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(&self.aws_config)
    }

    pub fn eks(&self) -> aws_sdk_eks::Client {
        aws_sdk_eks::Client::new(&self.aws_config)
    }

    pub fn iam(&self) -> aws_sdk_iam::Client {
        aws_sdk_iam::Client::new(&self.aws_config)
    }

    pub fn rds(&self) -> aws_sdk_rds::Client {
        aws_sdk_rds::Client::new(&self.aws_config)
    }

    pub fn s3(&self) -> aws_sdk_s3::Client {
        aws_sdk_s3::Client::new(&self.aws_config)
    }

    pub fn s3control(&self) -> aws_sdk_s3control::Client {
        aws_sdk_s3control::Client::new(&self.aws_config)
    }

    pub fn sts(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(&self.aws_config)
    }
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("region", &self.region())
            .finish_non_exhaustive()
    }
}
