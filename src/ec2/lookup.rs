use anyhow::{bail, Context, Result};
use aws_sdk_ec2::types::{
    Address, AttributeBooleanValue, Filter, InternetGateway, NatGateway, NatGatewayState,
    RouteTable, Subnet, Tag, Vpc, VpcAttributeName,
};

/// Build a `tag:<key>=<value>` filter for every tag in the set.
fn tag_filters(tags: &[Tag]) -> Vec<Filter> {
    tags.iter()
        .filter_map(|tag| {
            let (key, value) = (tag.key()?, tag.value()?);
            Some(
                Filter::builder()
                    .name(format!("tag:{key}"))
                    .values(value)
                    .build(),
            )
        })
        .collect()
}

/// Find the VPC matching the tag set, if any.
pub async fn find_vpc_by_tags(client: &aws_sdk_ec2::Client, tags: &[Tag]) -> Result<Option<Vpc>> {
    let resp = client
        .describe_vpcs()
        .set_filters(Some(tag_filters(tags)))
        .send()
        .await
        .context("failed to describe VPCs to check for unique tags")?;

    match resp.vpcs() {
        [] => Ok(None),
        [vpc] => Ok(Some(vpc.clone())),
        _ => bail!("found multiple VPCs with matching tags"),
    }
}

/// Find the internet gateway matching the tag set, if any.
pub async fn find_internet_gateway_by_tags(
    client: &aws_sdk_ec2::Client,
    tags: &[Tag],
) -> Result<Option<InternetGateway>> {
    let resp = client
        .describe_internet_gateways()
        .set_filters(Some(tag_filters(tags)))
        .send()
        .await
        .context("failed to describe internet gateways to check for unique tags")?;

    match resp.internet_gateways() {
        [] => Ok(None),
        [igw] => Ok(Some(igw.clone())),
        _ => bail!("found multiple internet gateways with matching tags"),
    }
}

/// Find the subnet matching the tag set and CIDR block, if any.
pub async fn find_subnet_by_tags(
    client: &aws_sdk_ec2::Client,
    tags: &[Tag],
    cidr_block: &str,
) -> Result<Option<Subnet>> {
    let mut filters = tag_filters(tags);
    filters.push(
        Filter::builder()
            .name("cidr-block")
            .values(cidr_block)
            .build(),
    );

    let resp = client
        .describe_subnets()
        .set_filters(Some(filters))
        .send()
        .await
        .context("failed to describe subnets to check for unique tags")?;

    match resp.subnets() {
        [] => Ok(None),
        [subnet] => Ok(Some(subnet.clone())),
        _ => bail!("found multiple subnets with matching tags and CIDR block {cidr_block}"),
    }
}

/// Find the elastic IP matching the tag set, if any.
pub async fn find_elastic_ip_by_tags(
    client: &aws_sdk_ec2::Client,
    tags: &[Tag],
) -> Result<Option<Address>> {
    let resp = client
        .describe_addresses()
        .set_filters(Some(tag_filters(tags)))
        .send()
        .await
        .context("failed to describe elastic IPs to check for unique tags")?;

    match resp.addresses() {
        [] => Ok(None),
        [address] => Ok(Some(address.clone())),
        _ => bail!("found multiple elastic IPs with matching tags"),
    }
}

/// Find the NAT gateway matching the tag set in a particular subnet, if any.
///
/// Gateways in `failed` or `deleted` state are irrelevant here: a retry
/// after a failed gateway must be able to create a replacement.
pub async fn find_nat_gateway_by_tags(
    client: &aws_sdk_ec2::Client,
    tags: &[Tag],
    subnet_id: &str,
) -> Result<Option<NatGateway>> {
    let mut filters = tag_filters(tags);
    filters.push(Filter::builder().name("subnet-id").values(subnet_id).build());

    let resp = client
        .describe_nat_gateways()
        .set_filter(Some(filters))
        .send()
        .await
        .context("failed to describe NAT gateways to check for unique tags")?;

    let relevant: Vec<&NatGateway> = resp
        .nat_gateways()
        .iter()
        .filter(|gw| {
            matches!(
                gw.state(),
                Some(NatGatewayState::Pending) | Some(NatGatewayState::Available)
            )
        })
        .collect();

    match relevant.as_slice() {
        [] => Ok(None),
        [gateway] => Ok(Some((*gateway).clone())),
        _ => bail!("found multiple NAT gateways with matching tags in subnet {subnet_id}"),
    }
}

/// Find all route tables matching the tag set.
///
/// Callers enforce the at-most-one invariant; discriminator tags
/// (`PublicRouteTableRef`, `PrivateRouteTableRef`) keep the lookup
/// deterministic across re-runs.
pub async fn find_route_tables_by_tags(
    client: &aws_sdk_ec2::Client,
    tags: &[Tag],
) -> Result<Vec<RouteTable>> {
    let resp = client
        .describe_route_tables()
        .set_filters(Some(tag_filters(tags)))
        .send()
        .await
        .context("failed to describe route tables to check for unique tags")?;

    Ok(resp.route_tables().to_vec())
}

/// Find the security group matching the group name and tag set, if any.
pub async fn find_security_group_by_tags(
    client: &aws_sdk_ec2::Client,
    group_name: &str,
    tags: &[Tag],
) -> Result<Option<String>> {
    let mut filters = vec![Filter::builder()
        .name("group-name")
        .values(group_name)
        .build()];
    filters.extend(tag_filters(tags));

    let resp = client
        .describe_security_groups()
        .set_filters(Some(filters))
        .send()
        .await
        .context("failed to describe security groups to check for unique tags")?;

    match resp.security_groups() {
        [] => Ok(None),
        [group] => Ok(group.group_id().map(str::to_string)),
        _ => bail!("found multiple security groups with matching name and tags"),
    }
}

/// True if DNS resolution is enabled on the VPC.
pub async fn vpc_dns_support_enabled(client: &aws_sdk_ec2::Client, vpc_id: &str) -> Result<bool> {
    let resp = client
        .describe_vpc_attribute()
        .vpc_id(vpc_id)
        .attribute(VpcAttributeName::EnableDnsSupport)
        .send()
        .await
        .context("failed to describe VPC DNS support attribute")?;

    Ok(resp
        .enable_dns_support()
        .and_then(AttributeBooleanValue::value)
        .unwrap_or(false))
}

/// True if DNS hostnames are enabled on the VPC.
pub async fn vpc_dns_hostnames_enabled(client: &aws_sdk_ec2::Client, vpc_id: &str) -> Result<bool> {
    let resp = client
        .describe_vpc_attribute()
        .vpc_id(vpc_id)
        .attribute(VpcAttributeName::EnableDnsHostnames)
        .send()
        .await
        .context("failed to describe VPC DNS hostnames attribute")?;

    Ok(resp
        .enable_dns_hostnames()
        .and_then(AttributeBooleanValue::value)
        .unwrap_or(false))
}
