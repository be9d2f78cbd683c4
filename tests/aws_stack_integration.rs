//! Stack lifecycle integration tests - actually call AWS APIs.
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_stack_integration -- --ignored
//! ```
//!
//! They create and delete real resources and cost real money. The S3 test
//! needs an existing VPC; the RDS test additionally needs two subnets and a
//! source security group in that VPC, supplied via environment variables.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use stack_builder::client::ResourceClient;
use stack_builder::rds::{RdsClient, RdsConfig, RdsInventory};
use stack_builder::s3::{S3Client, S3Config, S3Inventory, WorkloadAccess};
use stack_builder::stream::spawn_inventory_writer;

fn test_region() -> String {
    std::env::var("STACK_BUILDER_TEST_REGION").unwrap_or_else(|_| "us-east-2".to_string())
}

fn require_env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set for this test"))
}

async fn test_client() -> ResourceClient {
    let region = test_region();
    let config = stack_builder::auth::load_aws_config(None, Some(region.as_str()), None, None, None)
        .await
        .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID");
    ResourceClient::new(config, None, CancellationToken::new())
}

#[tokio::test]
#[ignore = "requires AWS credentials and creates billable resources"]
async fn s3_stack_create_is_idempotent_and_deletes_cleanly() {
    stack_builder::init_rustls();

    let dir = tempfile::tempdir().unwrap();
    let inventory_path = dir.path().join("s3-inventory.json");

    let config = S3Config {
        tags: HashMap::from([("purpose".to_string(), "integration-test".to_string())]),
        aws_account: require_env("STACK_BUILDER_TEST_ACCOUNT"),
        region: test_region(),
        name: format!("sb-test-{}", stack_builder::util::random_alphanumeric_string(8)),
        vpc_id_read_write_access: require_env("STACK_BUILDER_TEST_VPC"),
        public_read_access: false,
        workload_read_write_access: WorkloadAccess {
            service_account_name: format!(
                "sb-test-sa-{}",
                stack_builder::util::random_alphanumeric_string(8)
            ),
            service_account_namespace: "default".to_string(),
            oidc_url: require_env("STACK_BUILDER_TEST_OIDC_URL"),
        },
    };

    // first create populates every inventory slot
    let (sink, writer) = spawn_inventory_writer::<S3Inventory>(inventory_path.clone());
    let mut client = S3Client::new(test_client().await, Some(sink));
    let mut inventory = S3Inventory::default();
    client
        .create_stack(&config, &mut inventory)
        .await
        .expect("should create S3 stack");
    drop(client);
    writer.await.unwrap();

    assert!(inventory.bucket_name.starts_with(&config.name));
    assert_eq!(inventory.access_point_name, config.name);
    assert!(!inventory.policy_arn.is_empty());
    assert!(!inventory.role.role_name.is_empty());

    // second create must converge on the same inventory
    let (sink, writer) = spawn_inventory_writer::<S3Inventory>(inventory_path.clone());
    let mut client = S3Client::new(test_client().await, Some(sink));
    let mut second = inventory.clone();
    client
        .create_stack(&config, &mut second)
        .await
        .expect("second create should succeed");
    drop(client);
    writer.await.unwrap();
    assert_eq!(second, inventory, "re-run must not change the inventory");

    // delete clears every slot
    let (sink, writer) = spawn_inventory_writer::<S3Inventory>(inventory_path.clone());
    let mut client = S3Client::new(test_client().await, Some(sink));
    client
        .delete_stack(&mut inventory)
        .await
        .expect("should delete S3 stack");
    drop(client);
    writer.await.unwrap();

    assert!(inventory.bucket_name.is_empty());
    assert!(inventory.access_point_name.is_empty());
    assert!(inventory.policy_arn.is_empty());
    assert!(inventory.role.role_name.is_empty());
}

#[tokio::test]
#[ignore = "requires AWS credentials and creates billable resources"]
async fn rds_stack_create_records_endpoint_and_deletes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let inventory_path = dir.path().join("rds-inventory.json");

    let name = format!("sb-test-{}", stack_builder::util::random_alphanumeric_string(8));
    let config = RdsConfig {
        tags: HashMap::from([("purpose".to_string(), "integration-test".to_string())]),
        aws_account: require_env("STACK_BUILDER_TEST_ACCOUNT"),
        region: test_region(),
        vpc_id: require_env("STACK_BUILDER_TEST_VPC"),
        subnet_ids: vec![
            require_env("STACK_BUILDER_TEST_SUBNET_A"),
            require_env("STACK_BUILDER_TEST_SUBNET_B"),
        ],
        name: name.clone(),
        db_name: "app".to_string(),
        class: "db.t3.micro".to_string(),
        engine: "postgres".to_string(),
        engine_version: "15".to_string(),
        db_port: 5432,
        storage_gb: 20,
        backup_days: 7,
        db_user: "app".to_string(),
        db_user_password: stack_builder::util::random_alphanumeric_string(24),
        source_security_group_id: require_env("STACK_BUILDER_TEST_SOURCE_SG"),
    };

    let (sink, writer) = spawn_inventory_writer::<RdsInventory>(inventory_path.clone());
    let mut client = RdsClient::new(test_client().await, Some(sink));
    let mut inventory = RdsInventory::default();
    client
        .create_stack(&config, &mut inventory)
        .await
        .expect("should create RDS stack");
    drop(client);
    writer.await.unwrap();

    assert_eq!(inventory.region, test_region());
    assert!(!inventory.security_group_id.is_empty());
    assert_eq!(inventory.subnet_group_name, format!("{name}-subnet-group"));
    assert_eq!(inventory.rds_instance_id, name);
    assert!(!inventory.rds_instance_endpoint.is_empty());

    let (sink, writer) = spawn_inventory_writer::<RdsInventory>(inventory_path.clone());
    let mut client = RdsClient::new(test_client().await, Some(sink));
    client
        .delete_stack(&mut inventory)
        .await
        .expect("should delete RDS stack");
    drop(client);
    writer.await.unwrap();

    assert_eq!(inventory, RdsInventory {
        region: test_region(),
        ..Default::default()
    });
}
