//! Provision and tear down AWS resource stacks for managed services.
//!
//! A *stack* is a named, ordered graph of cloud resources provisioned
//! together: the EKS stack builds the network fabric, IAM surface and
//! cluster; the RDS stack a database with its security group and subnet
//! group; the S3 stack a bucket with workload access. Each stack records
//! everything it creates in an *inventory* flushed to disk after every
//! step, so creation is idempotent and resumable and deletion tears down
//! exactly what exists.

pub mod auth;
pub mod client;
pub mod ec2;
pub mod eks;
pub mod error;
pub mod inventory;
pub mod rds;
pub mod s3;
pub mod stream;
pub mod tags;
pub mod util;
pub mod wait;

pub use client::ResourceClient;

/// Install the process-wide rustls crypto provider.
///
/// Must run once before any TLS connection (the OIDC thumbprint dial).
pub fn init_rustls() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
