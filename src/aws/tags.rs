//! AWS resource tag constants for parking-deploy
//!
//! Resources created by this tool are tagged so that a later run (or an
//! operator) can find them, most importantly the tag-based instance lookup
//! used when a launch response comes back without an instance id.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `parking-deploy:tool` | Static identifier ("parking-deploy") |
//! | `parking-deploy:deploy-id` | Unique deploy identifier (UUID) |
//! | `parking-deploy:created-at` | RFC 3339 creation timestamp |

use aws_sdk_ec2::types::{ResourceType, Tag, TagSpecification};

/// Tag key for tool identification - all parking-deploy resources have this
pub const TAG_TOOL: &str = "parking-deploy:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "parking-deploy";

/// Tag key for deploy ID - unique identifier per deploy run
pub const TAG_DEPLOY_ID: &str = "parking-deploy:deploy-id";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "parking-deploy:created-at";

/// Helper to format creation timestamp for tags
pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Build an EC2 TagSpecification with standard parking-deploy tags plus
/// optional extra tags.
pub fn ec2_tag_spec(
    resource_type: ResourceType,
    deploy_id: &str,
    extra_tags: &[(&str, &str)],
) -> TagSpecification {
    let created_at = format_created_at(chrono::Utc::now());
    let mut builder = TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key(TAG_TOOL).value(TAG_TOOL_VALUE).build())
        .tags(Tag::builder().key(TAG_DEPLOY_ID).value(deploy_id).build())
        .tags(
            Tag::builder()
                .key(TAG_CREATED_AT)
                .value(&created_at)
                .build(),
        );
    for (k, v) in extra_tags {
        builder = builder.tags(Tag::builder().key(*k).value(*v).build());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_spec_carries_standard_and_extra_tags() {
        let spec = ec2_tag_spec(
            ResourceType::Instance,
            "deploy-123",
            &[("Name", "parking-app")],
        );

        let keys: Vec<&str> = spec.tags().iter().filter_map(|t| t.key()).collect();
        assert!(keys.contains(&TAG_TOOL));
        assert!(keys.contains(&TAG_DEPLOY_ID));
        assert!(keys.contains(&TAG_CREATED_AT));
        assert!(keys.contains(&"Name"));

        let deploy_tag = spec
            .tags()
            .iter()
            .find(|t| t.key() == Some(TAG_DEPLOY_ID))
            .unwrap();
        assert_eq!(deploy_tag.value(), Some("deploy-123"));
    }
}
