//! EC2 instance management

use super::context::AwsContext;
use super::types::{LaunchRequest, Lookup};
use crate::aws::tags;
use crate::wait::{wait_for_resource, WaitConfig};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Filter, InstanceType, ResourceType};
use aws_sdk_ec2::Client;
use tracing::{debug, info};

/// EC2 client for managing the application instance
pub struct Ec2Client {
    pub(crate) client: Client,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Find the newest available AMI matching a name pattern, owned by the
    /// trusted publisher. Catalog fallback for when the SSM parameter path
    /// yields nothing usable.
    pub async fn find_latest_image(
        &self,
        name_pattern: &str,
        owner: &str,
    ) -> Result<Lookup<String>> {
        let response = self
            .client
            .describe_images()
            .owners(owner)
            .filters(
                Filter::builder()
                    .name("name")
                    .values(name_pattern)
                    .build(),
            )
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .context("Failed to describe images")?;

        let images = response.images();

        // Sort by creation date and get the latest
        let mut images: Vec<_> = images.iter().collect();
        images.sort_by(|a, b| {
            b.creation_date()
                .unwrap_or_default()
                .cmp(a.creation_date().unwrap_or_default())
        });

        match images.first().and_then(|img| img.image_id()) {
            Some(ami) => {
                debug!(ami = %ami, pattern = %name_pattern, "Found AMI via catalog query");
                Ok(Lookup::Found(ami.to_string()))
            }
            None => Ok(Lookup::Missing),
        }
    }

    /// Launch the application instance.
    ///
    /// Returns `Lookup::Missing` when the API response carries no instance id,
    /// which the pipeline treats as fatal after a tag-based lookup.
    pub async fn launch_instance(&self, request: LaunchRequest) -> Result<Lookup<String>> {
        let instance_type: InstanceType = request
            .instance_type
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid instance type: {}", request.instance_type))?;

        info!(
            instance_type = %request.instance_type,
            ami = %request.image_id,
            key_name = %request.key_name,
            "Launching instance"
        );

        let user_data_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            request.user_data.as_bytes(),
        );

        let response = self
            .client
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(instance_type)
            .min_count(1)
            .max_count(1)
            .key_name(&request.key_name)
            .security_group_ids(&request.security_group_id)
            .user_data(&user_data_b64)
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::Instance,
                &request.deploy_id,
                &[("Name", &request.name_tag)],
            ))
            .send()
            .await
            .context("Failed to launch instance")?;

        match response
            .instances()
            .first()
            .and_then(|i| i.instance_id())
        {
            Some(id) => {
                info!(instance_id = %id, "Instance launched");
                Ok(Lookup::Found(id.to_string()))
            }
            None => Ok(Lookup::Missing),
        }
    }

    /// Find a running-or-pending instance carrying the given tag.
    ///
    /// Used as a best-effort lookup when a launch response comes back without
    /// an instance id.
    pub async fn find_instance_by_tag(&self, key: &str, value: &str) -> Result<Lookup<String>> {
        let response = self
            .client
            .describe_instances()
            .filters(
                Filter::builder()
                    .name(format!("tag:{}", key))
                    .values(value)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("pending")
                    .values("running")
                    .build(),
            )
            .send()
            .await
            .context("Failed to describe instances by tag")?;

        let id = response
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| i.instance_id())
            .next();

        match id {
            Some(id) => Ok(Lookup::Found(id.to_string())),
            None => Ok(Lookup::Missing),
        }
    }

    /// Get the current state name of an instance.
    pub async fn instance_state(&self, instance_id: &str) -> Result<Lookup<String>> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to describe instance")?;

        let state = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first())
            .and_then(|i| i.state())
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string());

        match state {
            Some(s) => Ok(Lookup::Found(s)),
            None => Ok(Lookup::Missing),
        }
    }

    /// Block until the instance reports the `running` state.
    pub async fn wait_for_running(&self, instance_id: &str, config: WaitConfig) -> Result<()> {
        info!(instance_id = %instance_id, "Waiting for instance to be running");

        wait_for_resource(
            config,
            None,
            || async {
                let state = self.instance_state(instance_id).await?;
                match state {
                    Lookup::Found(s) if s == "running" => Ok(true),
                    Lookup::Found(s) if s == "pending" => Ok(false),
                    Lookup::Found(s) => {
                        anyhow::bail!("Instance {} entered unexpected state: {}", instance_id, s)
                    }
                    // Freshly launched instances can be briefly invisible to
                    // DescribeInstances; keep polling.
                    Lookup::Missing => Ok(false),
                }
            },
            instance_id,
        )
        .await
    }

    /// Get the public IP address assigned to an instance, if any.
    pub async fn public_ip(&self, instance_id: &str) -> Result<Lookup<String>> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to describe instance")?;

        let ip = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first())
            .and_then(|i| i.public_ip_address())
            .map(|s| s.to_string());

        match ip {
            Some(ip) => {
                debug!(instance_id = %instance_id, public_ip = %ip, "Instance has public IP");
                Ok(Lookup::Found(ip))
            }
            None => Ok(Lookup::Missing),
        }
    }
}
