//! Inventory persistence behavior across the streaming fabric.

use stack_builder::eks::{
    AvailabilityZoneInventory, ClusterInventory, EksInventory, SubnetInventory,
};
use stack_builder::inventory::RoleInventory;
use stack_builder::stream::{load_inventory_file, spawn_inventory_writer};

fn two_zone_inventory() -> EksInventory {
    EksInventory {
        region: "us-east-2".to_string(),
        availability_zones: vec![
            AvailabilityZoneInventory {
                zone: "us-east-2a".to_string(),
                public_subnets: vec![SubnetInventory {
                    subnet_id: "subnet-pub-a".to_string(),
                    subnet_cidr: "10.0.0.0/22".to_string(),
                }],
                private_subnets: vec![SubnetInventory {
                    subnet_id: "subnet-priv-a".to_string(),
                    subnet_cidr: "10.0.4.0/22".to_string(),
                }],
                nat_gateway_id: "nat-a".to_string(),
            },
            AvailabilityZoneInventory {
                zone: "us-east-2b".to_string(),
                public_subnets: vec![SubnetInventory {
                    subnet_id: "subnet-pub-b".to_string(),
                    subnet_cidr: "10.0.8.0/22".to_string(),
                }],
                private_subnets: vec![SubnetInventory {
                    subnet_id: "subnet-priv-b".to_string(),
                    subnet_cidr: "10.0.12.0/22".to_string(),
                }],
                nat_gateway_id: "nat-b".to_string(),
            },
        ],
        vpc_id: "vpc-123".to_string(),
        internet_gateway_id: "igw-123".to_string(),
        elastic_ip_ids: vec!["eipalloc-1".to_string(), "eipalloc-2".to_string()],
        public_route_table_id: "rtb-pub".to_string(),
        private_route_table_ids: vec!["rtb-priv-1".to_string(), "rtb-priv-2".to_string()],
        cluster_role: RoleInventory {
            role_name: "cluster-role-demo".to_string(),
            role_arn: "arn:aws:iam::111111111111:role/cluster-role-demo".to_string(),
            role_policy_arns: vec!["arn:aws:iam::aws:policy/AmazonEKSClusterPolicy".to_string()],
        },
        cluster: ClusterInventory {
            cluster_name: "demo".to_string(),
            cluster_arn: "arn:aws:eks:us-east-2:111111111111:cluster/demo".to_string(),
            oidc_provider_url: "https://oidc.eks.us-east-2.amazonaws.com/id/ABC".to_string(),
        },
        node_group_names: vec!["demo-private-node-group".to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn snapshot_sequence_leaves_latest_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eks-inventory.json");

    let (sink, handle) = spawn_inventory_writer::<EksInventory>(path.clone());

    // grow the inventory the way the recipe does: one field per snapshot
    let mut inventory = EksInventory {
        region: "us-east-2".to_string(),
        ..Default::default()
    };
    sink.send(inventory.clone()).await.unwrap();

    inventory.vpc_id = "vpc-123".to_string();
    sink.send(inventory.clone()).await.unwrap();

    // the file already reflects the VPC step before the next step starts
    let on_disk: EksInventory = load_inventory_file(&path).await.unwrap();
    assert_eq!(on_disk.vpc_id, "vpc-123");
    assert!(on_disk.internet_gateway_id.is_empty());

    inventory.internet_gateway_id = "igw-123".to_string();
    sink.send(inventory.clone()).await.unwrap();

    drop(sink);
    handle.await.unwrap();

    let final_state: EksInventory = load_inventory_file(&path).await.unwrap();
    assert_eq!(final_state, inventory);
}

#[tokio::test]
async fn full_inventory_survives_a_resume_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eks-inventory.json");

    let inventory = two_zone_inventory();
    let (sink, handle) = spawn_inventory_writer::<EksInventory>(path.clone());
    sink.send(inventory.clone()).await.unwrap();
    drop(sink);
    handle.await.unwrap();

    let resumed: EksInventory = load_inventory_file(&path).await.unwrap();
    assert_eq!(resumed, inventory);

    // the zone slots keep their indices, which the recipe relies on to pair
    // subnets, elastic IPs and NAT gateways
    assert_eq!(resumed.availability_zones[0].zone, "us-east-2a");
    assert_eq!(resumed.availability_zones[1].zone, "us-east-2b");
    assert_eq!(
        resumed.availability_zones[1].public_subnets[0].subnet_id,
        "subnet-pub-b"
    );
}

#[tokio::test]
async fn inventory_file_uses_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eks-inventory.json");

    let (sink, handle) = spawn_inventory_writer::<EksInventory>(path.clone());
    sink.send(two_zone_inventory()).await.unwrap();
    drop(sink);
    handle.await.unwrap();

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(raw.contains("\"availabilityZones\""));
    assert!(raw.contains("\"publicRouteTableId\""));
    assert!(raw.contains("\"natGatewayId\""));
    assert!(raw.contains("\"oidcProviderUrl\""));
    // indented JSON, not a single line
    assert!(raw.lines().count() > 10);
}
