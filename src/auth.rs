//! AWS credential and region loading.
//!
//! Produces the `SdkConfig` used by every service client. Supports a shared
//! config profile, an explicit region override, an assumed role with an
//! optional external id, an MFA serial number (which prompts for a token
//! code on stdin) and static access keys.

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;

const ROLE_SESSION_NAME: &str = "stack-builder";

/// Load AWS configuration from the environment or a shared config profile.
pub async fn load_aws_config(
    profile: Option<&str>,
    region: Option<&str>,
    role_arn: Option<&str>,
    external_id: Option<&str>,
    mfa_serial_number: Option<&str>,
) -> Result<SdkConfig> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    let mut config = loader.load().await;

    // an MFA serial triggers an interactive prompt and swaps in temporary
    // session credentials for all subsequent calls
    if let Some(serial) = mfa_serial_number {
        let token_code = prompt_mfa_token()?;
        let session = session_credentials(&config, serial, &token_code).await?;
        config = config
            .to_builder()
            .credentials_provider(SharedCredentialsProvider::new(session))
            .build();
    }

    if let Some(role_arn) = role_arn {
        config = assume_role(&config, role_arn, external_id).await?;
    }

    Ok(config)
}

/// Load AWS configuration from static access keys.
///
/// `session_token` may be empty for long-lived keys.
pub async fn load_aws_config_from_keys(
    access_key_id: &str,
    secret_access_key: &str,
    session_token: Option<&str>,
    region: Option<&str>,
    role_arn: Option<&str>,
    external_id: Option<&str>,
) -> Result<SdkConfig> {
    let credentials = Credentials::from_keys(
        access_key_id,
        secret_access_key,
        session_token.map(str::to_string),
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(credentials);
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    let mut config = loader.load().await;

    if let Some(role_arn) = role_arn {
        config = assume_role(&config, role_arn, external_id).await?;
    }

    Ok(config)
}

/// Swap the config's credentials for an assumed role.
async fn assume_role(
    config: &SdkConfig,
    role_arn: &str,
    external_id: Option<&str>,
) -> Result<SdkConfig> {
    let mut builder = aws_config::sts::AssumeRoleProvider::builder(role_arn)
        .configure(config)
        .session_name(ROLE_SESSION_NAME);
    if let Some(external_id) = external_id {
        builder = builder.external_id(external_id);
    }
    let provider = builder.build().await;

    Ok(config
        .to_builder()
        .credentials_provider(SharedCredentialsProvider::new(provider))
        .build())
}

/// Exchange an MFA token code for temporary session credentials.
async fn session_credentials(
    config: &SdkConfig,
    serial_number: &str,
    token_code: &str,
) -> Result<Credentials> {
    let sts = aws_sdk_sts::Client::new(config);
    let resp = sts
        .get_session_token()
        .serial_number(serial_number)
        .token_code(token_code)
        .send()
        .await
        .context("failed to get session token")?;
    let creds = resp
        .credentials()
        .context("no credentials in session token response")?;

    Ok(Credentials::from_keys(
        creds.access_key_id(),
        creds.secret_access_key(),
        Some(creds.session_token().to_string()),
    ))
}

fn prompt_mfa_token() -> Result<String> {
    use std::io::Write;

    print!("Enter MFA token code: ");
    std::io::stdout().flush().context("failed to flush stdout")?;
    let mut code = String::new();
    std::io::stdin()
        .read_line(&mut code)
        .context("failed to read MFA token code")?;
    Ok(code.trim().to_string())
}
