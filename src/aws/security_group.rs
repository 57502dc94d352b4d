//! Security group management

use super::ec2::Ec2Client;
use super::types::Lookup;
use crate::aws::tags;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Filter, IpPermission, IpRange, ResourceType};
use tracing::{debug, info};

impl Ec2Client {
    /// Create the application security group, tagged at creation.
    ///
    /// Fails with an `InvalidGroup.Duplicate` classifiable error when a group
    /// of that name already exists; the pipeline then falls back to
    /// [`find_security_group`](Self::find_security_group).
    pub async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        deploy_id: &str,
    ) -> Result<String> {
        info!(name = %name, "Creating security group");

        let response = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::SecurityGroup,
                deploy_id,
                &[("Name", name)],
            ))
            .send()
            .await
            .context("Failed to create security group")?;

        let sg_id = response
            .group_id()
            .context("No security group ID in response")?
            .to_string();

        info!(sg_id = %sg_id, "Security group created");

        Ok(sg_id)
    }

    /// Look up a security group by name.
    pub async fn find_security_group(&self, name: &str) -> Result<Lookup<String>> {
        let response = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(name).build())
            .send()
            .await
            .context("Failed to describe security groups")?;

        match response
            .security_groups()
            .first()
            .and_then(|sg| sg.group_id())
        {
            Some(id) => {
                debug!(name = %name, sg_id = %id, "Found existing security group");
                Ok(Lookup::Found(id.to_string()))
            }
            None => Ok(Lookup::Missing),
        }
    }

    /// Add a TCP ingress rule open to any source.
    ///
    /// Fails with an `InvalidPermission.Duplicate` classifiable error when the
    /// rule already exists; the pipeline downgrades that to a warning.
    pub async fn authorize_ingress(
        &self,
        security_group_id: &str,
        port: u16,
        description: &str,
    ) -> Result<()> {
        info!(
            sg_id = %security_group_id,
            port,
            "Adding ingress rule"
        );

        let permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(i32::from(port))
            .to_port(i32::from(port))
            .ip_ranges(
                IpRange::builder()
                    .cidr_ip("0.0.0.0/0")
                    .description(description)
                    .build(),
            )
            .build();

        self.client
            .authorize_security_group_ingress()
            .group_id(security_group_id)
            .ip_permissions(permission)
            .send()
            .await
            .with_context(|| format!("Failed to add ingress rule for port {}", port))?;

        debug!(sg_id = %security_group_id, port, "Ingress rule added");

        Ok(())
    }
}
