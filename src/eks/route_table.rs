//! Route table creation, association and deletion.
//!
//! A single route table is shared by all public subnets and routes to the
//! internet gateway. Each private subnet gets its own route table because
//! each routes to a different NAT gateway.

use anyhow::{bail, Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{ResourceType, RouteTable, Tag};

use super::inventory::AvailabilityZoneInventory;
use super::EksClient;
use crate::ec2::find_route_tables_by_tags;
use crate::error::{is_already_associated, is_not_found};
use crate::tags::{ec2_tag_spec, with_tag};

const DESTINATION_CIDR: &str = "0.0.0.0/0";

impl EksClient {
    /// Create the shared route table for the public subnets, or adopt an
    /// existing one with matching tags.
    ///
    /// Carries a `PublicRouteTableRef=1` discriminator tag. When adopting,
    /// the route to the internet gateway and the subnet associations are
    /// verified and any missing pieces applied.
    pub(crate) async fn create_public_route_table(
        &self,
        tags: &[Tag],
        vpc_id: &str,
        internet_gateway_id: &str,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<String> {
        let ec2 = self.client.ec2();

        let public_subnet_ids: Vec<String> = az_inventory
            .iter()
            .flat_map(|az| &az.public_subnets)
            .filter(|subnet| !subnet.subnet_id.is_empty())
            .map(|subnet| subnet.subnet_id.clone())
            .collect();

        let rt_tags = with_tag(tags, "PublicRouteTableRef", "1");

        // route tables have no unique names, so check for an existing table
        // with matching tags up front
        let route_tables = find_route_tables_by_tags(&ec2, &rt_tags).await?;
        match route_tables.as_slice() {
            [] => {}
            [route_table] => {
                let route_table_id = route_table
                    .route_table_id()
                    .context("no ID on route table found by tags")?
                    .to_string();

                let igw_route_exists = route_table
                    .routes()
                    .iter()
                    .any(|route| route.gateway_id() == Some(internet_gateway_id));
                if !igw_route_exists {
                    self.create_route_to_internet_gateway(&route_table_id, internet_gateway_id)
                        .await?;
                }

                for subnet_id in &public_subnet_ids {
                    let associated = route_table
                        .associations()
                        .iter()
                        .any(|assoc| assoc.subnet_id() == Some(subnet_id.as_str()));
                    if !associated {
                        self.associate_route_table(&route_table_id, std::slice::from_ref(subnet_id))
                            .await?;
                    }
                }

                return Ok(route_table_id);
            }
            _ => bail!("multiple route tables with matching tags found"),
        }

        let resp = ec2
            .create_route_table()
            .vpc_id(vpc_id)
            .tag_specifications(ec2_tag_spec(ResourceType::RouteTable, &rt_tags))
            .send()
            .await
            .with_context(|| format!("failed to create public route table for VPC ID {vpc_id}"))?;
        let route_table_id = resp
            .route_table()
            .and_then(RouteTable::route_table_id)
            .context("no route table ID in create response")?
            .to_string();

        self.create_route_to_internet_gateway(&route_table_id, internet_gateway_id)
            .await?;
        self.associate_route_table(&route_table_id, &public_subnet_ids)
            .await?;

        Ok(route_table_id)
    }

    /// Create one route table per private subnet, or adopt existing tables
    /// with matching tags.
    ///
    /// Each table carries an auto-incrementing `PrivateRouteTableRef` tag,
    /// is associated with its zone's private subnet and routes to that
    /// zone's NAT gateway. Adoption verifies both and applies what is
    /// missing.
    pub(crate) async fn create_private_route_tables(
        &self,
        tags: &[Tag],
        vpc_id: &str,
        az_inventory: &[AvailabilityZoneInventory],
    ) -> Result<Vec<String>> {
        let ec2 = self.client.ec2();

        let mut route_table_ids = Vec::new();
        let mut rt_ref = 1;

        for az in az_inventory {
            for private_subnet in &az.private_subnets {
                let rt_tags = with_tag(tags, "PrivateRouteTableRef", &rt_ref.to_string());
                rt_ref += 1;

                let route_tables = find_route_tables_by_tags(&ec2, &rt_tags).await?;
                match route_tables.as_slice() {
                    [] => {}
                    [route_table] => {
                        let route_table_id = route_table
                            .route_table_id()
                            .context("no ID on route table found by tags")?
                            .to_string();

                        let associated = route_table
                            .associations()
                            .iter()
                            .any(|assoc| assoc.subnet_id() == Some(private_subnet.subnet_id.as_str()));
                        if !associated {
                            self.associate_route_table(
                                &route_table_id,
                                std::slice::from_ref(&private_subnet.subnet_id),
                            )
                            .await?;
                        }

                        let nat_route_exists = route_table
                            .routes()
                            .iter()
                            .any(|route| route.nat_gateway_id() == Some(az.nat_gateway_id.as_str()));
                        if !nat_route_exists {
                            self.create_route_to_nat_gateway(&route_table_id, &az.nat_gateway_id)
                                .await?;
                        }

                        route_table_ids.push(route_table_id);
                        continue;
                    }
                    _ => bail!("multiple route tables with matching tags found"),
                }

                let resp = ec2
                    .create_route_table()
                    .vpc_id(vpc_id)
                    .tag_specifications(ec2_tag_spec(ResourceType::RouteTable, &rt_tags))
                    .send()
                    .await
                    .with_context(|| {
                        format!("failed to create private route table for VPC ID {vpc_id}")
                    })?;
                let route_table_id = resp
                    .route_table()
                    .and_then(RouteTable::route_table_id)
                    .context("no route table ID in create response")?
                    .to_string();

                self.associate_route_table(
                    &route_table_id,
                    std::slice::from_ref(&private_subnet.subnet_id),
                )
                .await?;
                self.create_route_to_nat_gateway(&route_table_id, &az.nat_gateway_id)
                    .await?;

                route_table_ids.push(route_table_id);
            }
        }

        Ok(route_table_ids)
    }

    /// Delete the public and private route tables. Missing tables are
    /// treated as already deleted.
    pub(crate) async fn delete_route_tables(
        &self,
        private_route_table_ids: &[String],
        public_route_table_id: &str,
    ) -> Result<()> {
        let mut all_ids: Vec<&str> = private_route_table_ids
            .iter()
            .map(String::as_str)
            .collect();
        if !public_route_table_id.is_empty() {
            all_ids.push(public_route_table_id);
        }
        if all_ids.is_empty() {
            return Ok(());
        }

        let ec2 = self.client.ec2();
        for route_table_id in all_ids {
            match ec2
                .delete_route_table()
                .route_table_id(route_table_id)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(e.code()) => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to delete route table with ID {route_table_id}")
                    })
                }
            }
        }

        Ok(())
    }

    async fn create_route_to_internet_gateway(
        &self,
        route_table_id: &str,
        internet_gateway_id: &str,
    ) -> Result<()> {
        self.client
            .ec2()
            .create_route()
            .route_table_id(route_table_id)
            .gateway_id(internet_gateway_id)
            .destination_cidr_block(DESTINATION_CIDR)
            .send()
            .await
            .with_context(|| {
                format!(
                    "failed to create route to internet gateway with ID {internet_gateway_id} \
                     for route table with ID {route_table_id}"
                )
            })?;
        Ok(())
    }

    async fn create_route_to_nat_gateway(
        &self,
        route_table_id: &str,
        nat_gateway_id: &str,
    ) -> Result<()> {
        self.client
            .ec2()
            .create_route()
            .route_table_id(route_table_id)
            .nat_gateway_id(nat_gateway_id)
            .destination_cidr_block(DESTINATION_CIDR)
            .send()
            .await
            .with_context(|| {
                format!(
                    "failed to create route to NAT gateway with ID {nat_gateway_id} \
                     for route table with ID {route_table_id}"
                )
            })?;
        Ok(())
    }

    /// Associate a route table with each of the given subnets. Associations
    /// that already exist are treated as success.
    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_ids: &[String],
    ) -> Result<()> {
        let ec2 = self.client.ec2();
        for subnet_id in subnet_ids {
            match ec2
                .associate_route_table()
                .route_table_id(route_table_id)
                .subnet_id(subnet_id)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_already_associated(e.code()) => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "failed to associate route table with ID {route_table_id} \
                             to subnet with ID {subnet_id}"
                        )
                    })
                }
            }
        }
        Ok(())
    }
}
