//! Tag construction for provisioned resources.
//!
//! Every resource in a stack carries a `Name` tag with the stack name plus
//! any custom tags from the config. Resource kinds without globally unique
//! names are identified by this tag set, so the same builder must be used
//! for creation and for the tag-identity lookups in [`crate::ec2`].

use std::collections::HashMap;

use anyhow::{Context, Result};
use aws_sdk_ec2::types::{ResourceType, TagSpecification};

/// Build EC2 tags: a `Name` tag with the stack name plus any custom tags.
pub fn ec2_tags(name: &str, custom: &HashMap<String, String>) -> Vec<aws_sdk_ec2::types::Tag> {
    let mut tags = vec![aws_sdk_ec2::types::Tag::builder()
        .key("Name")
        .value(name)
        .build()];
    for (k, v) in custom {
        tags.push(aws_sdk_ec2::types::Tag::builder().key(k).value(v).build());
    }
    tags
}

/// Build IAM tags: a `Name` tag with the stack name plus any custom tags.
pub fn iam_tags(
    name: &str,
    custom: &HashMap<String, String>,
) -> Result<Vec<aws_sdk_iam::types::Tag>> {
    let mut tags = vec![aws_sdk_iam::types::Tag::builder()
        .key("Name")
        .value(name)
        .build()
        .context("failed to build IAM Name tag")?];
    for (k, v) in custom {
        tags.push(
            aws_sdk_iam::types::Tag::builder()
                .key(k)
                .value(v)
                .build()
                .context("failed to build IAM tag")?,
        );
    }
    Ok(tags)
}

/// Build RDS tags: a `Name` tag with the stack name plus any custom tags.
pub fn rds_tags(name: &str, custom: &HashMap<String, String>) -> Vec<aws_sdk_rds::types::Tag> {
    let mut tags = vec![aws_sdk_rds::types::Tag::builder()
        .key("Name")
        .value(name)
        .build()];
    for (k, v) in custom {
        tags.push(aws_sdk_rds::types::Tag::builder().key(k).value(v).build());
    }
    tags
}

/// Build S3 tags: a `Name` tag with the stack name plus any custom tags.
pub fn s3_tags(name: &str, custom: &HashMap<String, String>) -> Result<Vec<aws_sdk_s3::types::Tag>> {
    let mut tags = vec![aws_sdk_s3::types::Tag::builder()
        .key("Name")
        .value(name)
        .build()
        .context("failed to build S3 Name tag")?];
    for (k, v) in custom {
        tags.push(
            aws_sdk_s3::types::Tag::builder()
                .key(k)
                .value(v)
                .build()
                .context("failed to build S3 tag")?,
        );
    }
    Ok(tags)
}

/// Build plain-map tags for services that accept `HashMap<String, String>`.
pub fn map_tags(name: &str, custom: &HashMap<String, String>) -> HashMap<String, String> {
    let mut tags = custom.clone();
    tags.insert("Name".to_string(), name.to_string());
    tags
}

/// Wrap EC2 tags in a `TagSpecification` for the given resource type.
pub fn ec2_tag_spec(
    resource_type: ResourceType,
    tags: &[aws_sdk_ec2::types::Tag],
) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .set_tags(Some(tags.to_vec()))
        .build()
}

/// Return a copy of `tags` with one extra tag appended.
///
/// Used for discriminator tags (`ElasticIpRef`, `PrivateRouteTableRef`, ...)
/// that distinguish otherwise identically-tagged resources.
pub fn with_tag(
    tags: &[aws_sdk_ec2::types::Tag],
    key: &str,
    value: &str,
) -> Vec<aws_sdk_ec2::types::Tag> {
    let mut tags = tags.to_vec();
    tags.push(
        aws_sdk_ec2::types::Tag::builder()
            .key(key)
            .value(value)
            .build(),
    );
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom() -> HashMap<String, String> {
        HashMap::from([("team".to_string(), "platform".to_string())])
    }

    #[test]
    fn ec2_tags_include_name_and_custom() {
        let tags = ec2_tags("demo", &custom());
        assert_eq!(tags.len(), 2);
        assert!(tags
            .iter()
            .any(|t| t.key() == Some("Name") && t.value() == Some("demo")));
        assert!(tags
            .iter()
            .any(|t| t.key() == Some("team") && t.value() == Some("platform")));
    }

    #[test]
    fn map_tags_insert_name() {
        let tags = map_tags("demo", &custom());
        assert_eq!(tags.get("Name").map(String::as_str), Some("demo"));
        assert_eq!(tags.get("team").map(String::as_str), Some("platform"));
    }

    #[test]
    fn with_tag_appends_discriminator() {
        let tags = ec2_tags("demo", &HashMap::new());
        let tagged = with_tag(&tags, "ElasticIpRef", "1");
        assert_eq!(tagged.len(), 2);
        assert!(tagged
            .iter()
            .any(|t| t.key() == Some("ElasticIpRef") && t.value() == Some("1")));
        // the original set is untouched
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn iam_tags_include_name() {
        let tags = iam_tags("demo", &HashMap::new()).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].key(), "Name");
        assert_eq!(tags[0].value(), "demo");
    }
}
