//! IAM OIDC identity provider for the cluster.
//!
//! Registering the cluster's OIDC issuer with IAM is what enables IAM roles
//! for Kubernetes service accounts (IRSA). The provider registration needs
//! the SHA-1 thumbprint of the issuer's root certificate, obtained by a TLS
//! handshake with the issuer host.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_sdk_iam::types::Tag;
use sha1::{Digest, Sha1};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

use super::EksClient;
use crate::error::{is_already_exists, is_not_found};

const STS_AUDIENCE: &str = "sts.amazonaws.com";

impl EksClient {
    /// Register the cluster's OIDC issuer as an IAM identity provider, or
    /// adopt an existing registration for the same issuer host.
    pub(crate) async fn create_oidc_provider(
        &self,
        tags: &[Tag],
        provider_url: &str,
    ) -> Result<String> {
        let iam = self.client.iam();

        let parsed = Url::parse(provider_url).context("failed to parse OIDC provider URL")?;
        let hostname = parsed
            .host_str()
            .context("OIDC provider URL has no hostname")?
            .to_string();
        let thumbprint = issuer_thumbprint(&hostname).await?;

        match iam
            .create_open_id_connect_provider()
            .url(provider_url)
            .client_id_list(STS_AUDIENCE)
            .thumbprint_list(thumbprint)
            .set_tags(Some(tags.to_vec()))
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .open_id_connect_provider_arn()
                .context("no OIDC provider ARN in create response")?
                .to_string()),
            Err(e) if is_already_exists(e.code()) => {
                // find the existing provider for this issuer host
                let listed = iam
                    .list_open_id_connect_providers()
                    .send()
                    .await
                    .context("failed to list OIDC providers to find existing provider")?;
                for provider in listed.open_id_connect_provider_list() {
                    if let Some(arn) = provider.arn() {
                        if arn.contains(&hostname) {
                            return Ok(arn.to_string());
                        }
                    }
                }
                bail!("failed to find existing OIDC provider with URL {provider_url}")
            }
            Err(e) => Err(e).context("failed to create IAM identity provider"),
        }
    }

    /// Delete the OIDC identity provider. A missing provider is treated as
    /// already deleted.
    pub(crate) async fn delete_oidc_provider(&self, oidc_provider_arn: &str) -> Result<()> {
        if oidc_provider_arn.is_empty() {
            return Ok(());
        }

        match self
            .client
            .iam()
            .delete_open_id_connect_provider()
            .open_id_connect_provider_arn(oidc_provider_arn)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(e.code()) => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("failed to delete IAM identity provider {oidc_provider_arn}")
            }),
        }
    }
}

/// Obtain the issuer's certificate thumbprint.
///
/// Dials the issuer host on 443, takes the last certificate in the peer
/// chain (the root) and returns the lowercase hex SHA-1 of its DER
/// encoding, which is the format IAM expects.
async fn issuer_thumbprint(hostname: &str) -> Result<String> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tcp = tokio::net::TcpStream::connect((hostname, 443))
        .await
        .context("failed to connect to OIDC provider")?;
    let server_name =
        ServerName::try_from(hostname.to_string()).context("invalid OIDC provider hostname")?;
    let tls = connector
        .connect(server_name, tcp)
        .await
        .context("failed to complete TLS handshake with OIDC provider")?;

    let (_, connection) = tls.get_ref();
    let certificates = connection
        .peer_certificates()
        .context("OIDC provider presented no certificates")?;
    let root = certificates
        .last()
        .context("OIDC provider certificate chain is empty")?;

    Ok(hex::encode(Sha1::digest(root.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbprint_encoding_is_lowercase_hex_sha1() {
        // fixed input so the digest is stable
        let digest = Sha1::digest(b"certificate-der-bytes");
        let encoded = hex::encode(digest);
        assert_eq!(encoded.len(), 40);
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(encoded, encoded.to_lowercase());
    }
}
