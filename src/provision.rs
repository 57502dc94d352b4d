//! The deploy pipeline
//!
//! Runs the eight provisioning steps in order against a [`ProvisionOps`]
//! implementation: image resolution (with the one-shot catalog fallback),
//! security-group create-or-find, best-effort ingress rules, boot payload
//! assembly, instance launch (with tag-based lookup on a missing id), the
//! readiness wait, settle delay + address retrieval, and outcome assembly.
//!
//! Fatal conditions abort with an error; everything else is collected as a
//! warning and surfaced in the final report.

use crate::aws::error::classify_anyhow_error;
use crate::aws::tags::TAG_DEPLOY_ID;
use crate::aws::types::{LaunchRequest, Lookup, SecurityGroupOutcome};
use crate::aws::{ami, ProvisionOps};
use crate::config::{DeployConfig, APP_PORT, IMAGE_OWNER, SSH_PORT};
use crate::user_data::generate_user_data;
use crate::wait::WaitConfig;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Description applied to the security group at creation
const SECURITY_GROUP_DESCRIPTION: &str = "Parking app instance access";

/// A non-fatal anomaly recorded during the run
#[derive(Debug, Clone)]
pub struct Warning {
    /// Pipeline step the anomaly occurred in
    pub step: &'static str,
    pub message: String,
}

impl Warning {
    fn new(step: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(step, %message, "Deploy warning");
        Self { step, message }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.step, self.message)
    }
}

/// Everything a completed run produced
#[derive(Debug)]
pub struct DeployOutcome {
    pub deploy_id: String,
    pub image_id: String,
    pub security_group: SecurityGroupOutcome,
    pub instance_id: String,
    /// State re-queried after the readiness wait
    pub state_after_wait: Option<String>,
    /// Public address, absent when the provider had not assigned one yet
    pub public_ip: Option<String>,
    pub warnings: Vec<Warning>,
}

/// Executes the deploy pipeline against a [`ProvisionOps`] implementation
pub struct Provisioner<'a, O: ProvisionOps> {
    config: &'a DeployConfig,
    ops: &'a O,
}

impl<'a, O: ProvisionOps> Provisioner<'a, O> {
    pub fn new(config: &'a DeployConfig, ops: &'a O) -> Self {
        Self { config, ops }
    }

    /// Run the full pipeline.
    ///
    /// `app_source` is the verbatim content of the local application
    /// artifact, already validated by preflight.
    pub async fn run(&self, app_source: &str) -> Result<DeployOutcome> {
        let deploy_id = Uuid::now_v7().to_string();
        let mut warnings = Vec::new();

        info!(deploy_id = %deploy_id, region = %self.config.region, "Starting deploy");

        let image_id = self.resolve_image(&mut warnings).await?;
        let security_group = self.ensure_security_group(&deploy_id).await?;
        self.ensure_ingress_rules(security_group.id(), &mut warnings)
            .await;

        let user_data = generate_user_data(app_source)?;
        let instance_id = self
            .launch_instance(&deploy_id, &image_id, security_group.id(), user_data)
            .await?;

        let state_after_wait = self.await_running(&instance_id, &mut warnings).await;
        let public_ip = self.fetch_public_ip(&instance_id, &mut warnings).await;

        info!(
            deploy_id = %deploy_id,
            instance_id = %instance_id,
            public_ip = ?public_ip,
            warnings = warnings.len(),
            "Deploy complete"
        );

        Ok(DeployOutcome {
            deploy_id,
            image_id,
            security_group,
            instance_id,
            state_after_wait,
            public_ip,
            warnings,
        })
    }

    /// Resolve the machine image: parameter store first, then exactly one
    /// catalog fallback.
    async fn resolve_image(&self, warnings: &mut Vec<Warning>) -> Result<String> {
        let parameter = self.config.image_parameter();

        match self.ops.image_from_parameter(parameter).await {
            Ok(Lookup::Found(id)) if ami::is_valid_image_id(&id) => {
                info!(ami = %id, parameter = %parameter, "Image resolved from parameter store");
                return Ok(id);
            }
            Ok(Lookup::Found(id)) => {
                warnings.push(Warning::new(
                    "resolve-image",
                    format!("Parameter store returned malformed image id '{}', falling back to catalog", id),
                ));
            }
            Ok(Lookup::Missing) => {
                warnings.push(Warning::new(
                    "resolve-image",
                    format!("Parameter '{}' not found, falling back to catalog", parameter),
                ));
            }
            Err(e) => {
                warnings.push(Warning::new(
                    "resolve-image",
                    format!("Parameter lookup failed ({:#}), falling back to catalog", e),
                ));
            }
        }

        let pattern = self.config.architecture().image_name_pattern();
        let fallback = self
            .ops
            .latest_catalog_image(pattern, IMAGE_OWNER)
            .await
            .context("Image catalog fallback failed")?;

        match fallback {
            Lookup::Found(id) if ami::is_valid_image_id(&id) => {
                info!(ami = %id, pattern = %pattern, "Image resolved from catalog");
                Ok(id)
            }
            Lookup::Found(id) => {
                anyhow::bail!("Image catalog returned malformed image id: '{}'", id)
            }
            Lookup::Missing => {
                anyhow::bail!(
                    "No usable machine image: parameter '{}' and catalog pattern '{}' both came up empty",
                    parameter,
                    pattern
                )
            }
        }
    }

    /// Create the security group, or find it by name when creation reports a
    /// duplicate. Fatal only when neither path yields an identifier.
    async fn ensure_security_group(&self, deploy_id: &str) -> Result<SecurityGroupOutcome> {
        let name = &self.config.security_group_name;

        match self
            .ops
            .create_security_group(name, SECURITY_GROUP_DESCRIPTION, deploy_id)
            .await
        {
            Ok(id) if !id.is_empty() => return Ok(SecurityGroupOutcome::Created(id)),
            Ok(_) => {
                warn!(name = %name, "Security group creation returned an empty id, looking up by name");
            }
            Err(e) => {
                if classify_anyhow_error(&e).is_already_exists() {
                    info!(name = %name, "Security group already exists, looking up by name");
                } else {
                    warn!(name = %name, error = %e, "Security group creation failed, looking up by name");
                }
            }
        }

        match self
            .ops
            .find_security_group(name)
            .await
            .with_context(|| format!("Security group '{}' lookup failed", name))?
        {
            Lookup::Found(id) => Ok(SecurityGroupOutcome::Found(id)),
            Lookup::Missing => anyhow::bail!(
                "Security group '{}' could not be created or found",
                name
            ),
        }
    }

    /// Best-effort ingress rules: SSH and the application port, each from
    /// any source. Failures (typically duplicates) become warnings.
    async fn ensure_ingress_rules(&self, security_group_id: &str, warnings: &mut Vec<Warning>) {
        let rules: [(u16, &str); 2] = [
            (SSH_PORT, "SSH access"),
            (APP_PORT, "Parking app HTTP access"),
        ];

        for (port, description) in rules {
            if let Err(e) = self
                .ops
                .authorize_ingress(security_group_id, port, description)
                .await
            {
                if classify_anyhow_error(&e).is_already_exists() {
                    warnings.push(Warning::new(
                        "ingress-rules",
                        format!("Ingress rule for port {} already exists", port),
                    ));
                } else {
                    warnings.push(Warning::new(
                        "ingress-rules",
                        format!("Failed to add ingress rule for port {}: {:#}", port, e),
                    ));
                }
            }
        }
    }

    /// Launch the instance. A response without an instance id triggers a
    /// best-effort tag-based lookup (to report anything that may have been
    /// created anyway) and then fails the run.
    async fn launch_instance(
        &self,
        deploy_id: &str,
        image_id: &str,
        security_group_id: &str,
        user_data: String,
    ) -> Result<String> {
        let request = LaunchRequest {
            deploy_id: deploy_id.to_string(),
            image_id: image_id.to_string(),
            instance_type: self.config.instance_type.clone(),
            key_name: self.config.key_name.clone(),
            security_group_id: security_group_id.to_string(),
            user_data,
            name_tag: format!("parking-app-{}", deploy_id),
        };

        let failure: anyhow::Error = match self.ops.launch_instance(request).await {
            Ok(Lookup::Found(id)) => return Ok(id),
            Ok(Lookup::Missing) => {
                anyhow::anyhow!("Launch response carried no instance id")
            }
            Err(e) => e.context("Instance launch failed"),
        };

        match self.ops.find_instance_by_tag(TAG_DEPLOY_ID, deploy_id).await {
            Ok(Lookup::Found(id)) => {
                warn!(
                    instance_id = %id,
                    "An instance tagged with this deploy exists despite the failed launch response; it was NOT configured further"
                );
            }
            Ok(Lookup::Missing) => {
                info!("No instance tagged with this deploy was found");
            }
            Err(e) => {
                warn!(error = %e, "Tag-based instance lookup failed");
            }
        }

        Err(failure)
    }

    /// Block until the instance reports running, then re-verify. Neither a
    /// wait failure nor a state mismatch is fatal.
    async fn await_running(
        &self,
        instance_id: &str,
        warnings: &mut Vec<Warning>,
    ) -> Option<String> {
        if let Err(e) = self
            .ops
            .wait_for_running(instance_id, WaitConfig::default())
            .await
        {
            warnings.push(Warning::new(
                "await-running",
                format!("Wait for running state failed: {:#}", e),
            ));
        }

        match self.ops.instance_state(instance_id).await {
            Ok(Lookup::Found(state)) => {
                if state != "running" {
                    warnings.push(Warning::new(
                        "await-running",
                        format!("Instance state after wait is '{}', not 'running'", state),
                    ));
                }
                Some(state)
            }
            Ok(Lookup::Missing) => {
                warnings.push(Warning::new(
                    "await-running",
                    "Instance state could not be re-verified after the wait",
                ));
                None
            }
            Err(e) => {
                warnings.push(Warning::new(
                    "await-running",
                    format!("State re-verification failed: {:#}", e),
                ));
                None
            }
        }
    }

    /// Settle, then fetch the public address. Absence is a warning, not a
    /// failure; the report substitutes a placeholder.
    async fn fetch_public_ip(
        &self,
        instance_id: &str,
        warnings: &mut Vec<Warning>,
    ) -> Option<String> {
        if self.config.settle_delay_secs > 0 {
            info!(
                seconds = self.config.settle_delay_secs,
                "Waiting for the public address to propagate"
            );
            tokio::time::sleep(Duration::from_secs(self.config.settle_delay_secs)).await;
        }

        match self.ops.public_ip(instance_id).await {
            Ok(Lookup::Found(ip)) => Some(ip),
            Ok(Lookup::Missing) => {
                warnings.push(Warning::new(
                    "public-address",
                    "Public address not assigned yet; query the instance again shortly",
                ));
                None
            }
            Err(e) => {
                warnings.push(Warning::new(
                    "public-address",
                    format!("Public address lookup failed: {:#}", e),
                ));
                None
            }
        }
    }
}
