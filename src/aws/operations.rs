//! Control-plane operations trait for testing
//!
//! Abstracts every AWS call the deploy pipeline makes so that the
//! orchestration logic can be unit tested without hitting real AWS.

use super::ami::SsmClient;
use super::context::AwsContext;
use super::ec2::Ec2Client;
use super::types::{LaunchRequest, Lookup};
use crate::wait::WaitConfig;
use anyhow::Result;
use std::future::Future;

/// Trait over the control-plane calls the pipeline performs.
pub trait ProvisionOps: Send + Sync {
    /// Read an AMI id from the SSM parameter store
    fn image_from_parameter(
        &self,
        parameter_path: &str,
    ) -> impl Future<Output = Result<Lookup<String>>> + Send;

    /// Catalog fallback: newest available AMI matching a name pattern
    fn latest_catalog_image(
        &self,
        name_pattern: &str,
        owner: &str,
    ) -> impl Future<Output = Result<Lookup<String>>> + Send;

    /// Create the named security group, tagged at creation
    fn create_security_group(
        &self,
        name: &str,
        description: &str,
        deploy_id: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Look up a security group by name
    fn find_security_group(&self, name: &str)
        -> impl Future<Output = Result<Lookup<String>>> + Send;

    /// Add a TCP ingress rule open to any source
    fn authorize_ingress(
        &self,
        security_group_id: &str,
        port: u16,
        description: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Launch the application instance
    fn launch_instance(
        &self,
        request: LaunchRequest,
    ) -> impl Future<Output = Result<Lookup<String>>> + Send;

    /// Best-effort instance lookup by tag
    fn find_instance_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<Lookup<String>>> + Send;

    /// Block until the instance reports the running state
    fn wait_for_running(
        &self,
        instance_id: &str,
        config: WaitConfig,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current state name of the instance
    fn instance_state(
        &self,
        instance_id: &str,
    ) -> impl Future<Output = Result<Lookup<String>>> + Send;

    /// Public IP assigned to the instance, if any
    fn public_ip(&self, instance_id: &str) -> impl Future<Output = Result<Lookup<String>>> + Send;
}

/// Real client bundle implementing [`ProvisionOps`] against AWS.
pub struct CloudClients {
    pub ec2: Ec2Client,
    pub ssm: SsmClient,
}

impl CloudClients {
    /// Create the client bundle from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            ec2: Ec2Client::from_context(ctx),
            ssm: SsmClient::from_context(ctx),
        }
    }
}

impl ProvisionOps for CloudClients {
    async fn image_from_parameter(&self, parameter_path: &str) -> Result<Lookup<String>> {
        self.ssm.get_image_parameter(parameter_path).await
    }

    async fn latest_catalog_image(
        &self,
        name_pattern: &str,
        owner: &str,
    ) -> Result<Lookup<String>> {
        self.ec2.find_latest_image(name_pattern, owner).await
    }

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        deploy_id: &str,
    ) -> Result<String> {
        self.ec2
            .create_security_group(name, description, deploy_id)
            .await
    }

    async fn find_security_group(&self, name: &str) -> Result<Lookup<String>> {
        self.ec2.find_security_group(name).await
    }

    async fn authorize_ingress(
        &self,
        security_group_id: &str,
        port: u16,
        description: &str,
    ) -> Result<()> {
        self.ec2
            .authorize_ingress(security_group_id, port, description)
            .await
    }

    async fn launch_instance(&self, request: LaunchRequest) -> Result<Lookup<String>> {
        self.ec2.launch_instance(request).await
    }

    async fn find_instance_by_tag(&self, key: &str, value: &str) -> Result<Lookup<String>> {
        self.ec2.find_instance_by_tag(key, value).await
    }

    async fn wait_for_running(&self, instance_id: &str, config: WaitConfig) -> Result<()> {
        self.ec2.wait_for_running(instance_id, config).await
    }

    async fn instance_state(&self, instance_id: &str) -> Result<Lookup<String>> {
        self.ec2.instance_state(instance_id).await
    }

    async fn public_ip(&self, instance_id: &str) -> Result<Lookup<String>> {
        self.ec2.public_ip(instance_id).await
    }
}
