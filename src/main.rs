//! stack-builder: provision and tear down AWS resource stacks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use stack_builder::client::ResourceClient;
use stack_builder::stream::{
    load_inventory_file, spawn_inventory_writer, spawn_message_printer,
};
use stack_builder::{auth, eks, rds, s3};

#[derive(Parser, Debug)]
#[command(name = "stack-builder")]
#[command(about = "Manage AWS resource stacks")]
#[command(version)]
struct Cli {
    /// The AWS config profile to draw credentials from when provisioning
    /// resources
    #[arg(
        short = 'p',
        long = "aws-config-profile",
        default_value = "default",
        global = true
    )]
    aws_config_profile: String,

    /// AWS region to create resources in - if defined will override region
    /// in config profile
    #[arg(short = 'r', long = "aws-region", global = true)]
    aws_region: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision an AWS resource stack
    Create {
        /// The resource stack kind
        stack: StackKind,
        /// Path to the stack config file
        config_file: PathBuf,
        /// File to write AWS resource inventory to
        #[arg(short = 'i', long = "inventory-file")]
        inventory_file: Option<PathBuf>,
    },
    /// Remove an AWS resource stack
    Delete {
        /// The resource stack kind
        stack: StackKind,
        /// Path to the stack's inventory file
        inventory_file: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StackKind {
    Rds,
    S3,
    Eks,
}

impl StackKind {
    fn as_str(self) -> &'static str {
        match self {
            StackKind::Rds => "rds",
            StackKind::S3 => "s3",
            StackKind::Eks => "eks",
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "Error: {e}");
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  Caused by: {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    stack_builder::init_rustls();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let aws_config = auth::load_aws_config(
        Some(cli.aws_config_profile.as_str()),
        cli.aws_region.as_deref(),
        None,
        None,
        None,
    )
    .await?;

    // cancel in-flight waits and stop before the next step on ctrl-c
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Command::Create {
            stack,
            config_file,
            inventory_file,
        } => {
            println!("creating AWS resource stack...");
            let inventory_file = inventory_file
                .unwrap_or_else(|| PathBuf::from(format!("{}-inventory.json", stack.as_str())));
            create_stack(stack, &config_file, &inventory_file, aws_config, cancel).await?;
            println!("AWS resource stack created");
        }
        Command::Delete {
            stack,
            inventory_file,
        } => {
            println!("deleting AWS resource stack...");
            delete_stack(stack, &inventory_file, aws_config, cancel).await?;
            println!("AWS resources deleted");

            std::fs::remove_file(&inventory_file).with_context(|| {
                format!(
                    "failed to remove inventory file {}",
                    inventory_file.display()
                )
            })?;
            println!("Inventory file '{}' deleted", inventory_file.display());
        }
    }

    Ok(())
}

async fn create_stack(
    stack: StackKind,
    config_file: &Path,
    inventory_file: &Path,
    aws_config: aws_config::SdkConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let (message_tx, message_handle) = spawn_message_printer();
    let resource_client = ResourceClient::new(aws_config, Some(message_tx), cancel);

    let result = match stack {
        StackKind::Rds => {
            let config = rds::load_rds_config(config_file)
                .context("failed to load RDS config file")?;
            let mut inventory = load_or_default::<rds::RdsInventory>(inventory_file).await?;
            let (sink, writer_handle) = spawn_inventory_writer(inventory_file.to_path_buf());
            let mut client = rds::RdsClient::new(resource_client, Some(sink));
            let result = client.create_stack(&config, &mut inventory).await;
            drop(client);
            writer_handle.await.context("inventory writer panicked")?;
            result.context("failed to create RDS resource stack")
        }
        StackKind::S3 => {
            let config =
                s3::load_s3_config(config_file).context("failed to load S3 config file")?;
            let mut inventory = load_or_default::<s3::S3Inventory>(inventory_file).await?;
            let (sink, writer_handle) = spawn_inventory_writer(inventory_file.to_path_buf());
            let mut client = s3::S3Client::new(resource_client, Some(sink));
            let result = client.create_stack(&config, &mut inventory).await;
            drop(client);
            writer_handle.await.context("inventory writer panicked")?;
            result.context("failed to create S3 resource stack")
        }
        StackKind::Eks => {
            let config = eks::load_eks_config(config_file)
                .context("failed to load EKS config file")?;
            let mut inventory = load_or_default::<eks::EksInventory>(inventory_file).await?;
            let (sink, writer_handle) = spawn_inventory_writer(inventory_file.to_path_buf());
            let mut client = eks::EksClient::new(resource_client, Some(sink));
            let result = client.create_stack(&config, &mut inventory).await;
            drop(client);
            writer_handle.await.context("inventory writer panicked")?;
            result.context("failed to create EKS resource stack")
        }
    };

    // the client (and with it the message sender) is gone, so the printer
    // drains and exits
    message_handle.await.context("message printer panicked")?;

    result
}

async fn delete_stack(
    stack: StackKind,
    inventory_file: &Path,
    aws_config: aws_config::SdkConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let (message_tx, message_handle) = spawn_message_printer();
    let resource_client = ResourceClient::new(aws_config, Some(message_tx), cancel);

    let result = match stack {
        StackKind::Rds => {
            let mut inventory: rds::RdsInventory = load_inventory_file(inventory_file)
                .await
                .context("failed to load RDS inventory file")?;
            let (sink, writer_handle) = spawn_inventory_writer(inventory_file.to_path_buf());
            let mut client = rds::RdsClient::new(resource_client, Some(sink));
            let result = client.delete_stack(&mut inventory).await;
            drop(client);
            writer_handle.await.context("inventory writer panicked")?;
            result.context("failed to remove RDS resource stack")
        }
        StackKind::S3 => {
            let mut inventory: s3::S3Inventory = load_inventory_file(inventory_file)
                .await
                .context("failed to load S3 inventory file")?;
            let (sink, writer_handle) = spawn_inventory_writer(inventory_file.to_path_buf());
            let mut client = s3::S3Client::new(resource_client, Some(sink));
            let result = client.delete_stack(&mut inventory).await;
            drop(client);
            writer_handle.await.context("inventory writer panicked")?;
            result.context("failed to remove S3 resource stack")
        }
        StackKind::Eks => {
            let mut inventory: eks::EksInventory = load_inventory_file(inventory_file)
                .await
                .context("failed to load EKS inventory file")?;
            let (sink, writer_handle) = spawn_inventory_writer(inventory_file.to_path_buf());
            let mut client = eks::EksClient::new(resource_client, Some(sink));
            let result = client.delete_stack(&mut inventory).await;
            drop(client);
            writer_handle.await.context("inventory writer panicked")?;
            result.context("failed to remove EKS resource stack")
        }
    };

    message_handle.await.context("message printer panicked")?;

    result
}

/// Load an existing inventory file to resume from, or start empty.
async fn load_or_default<I>(inventory_file: &Path) -> Result<I>
where
    I: serde::de::DeserializeOwned + Default,
{
    if inventory_file.exists() {
        load_inventory_file(inventory_file).await
    } else {
        Ok(I::default())
    }
}
