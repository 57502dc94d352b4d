//! Machine image resolution via the SSM parameter store
//!
//! The primary image lookup path reads the latest Amazon Linux 2023 AMI id
//! from AWS's public parameter. The catalog fallback lives on `Ec2Client`.

use super::context::AwsContext;
use super::error::classify_anyhow_error;
use super::types::Lookup;
use anyhow::Result;
use tracing::{debug, warn};

/// SSM client for parameter-store lookups
pub struct SsmClient {
    client: aws_sdk_ssm::Client,
}

impl SsmClient {
    /// Create an SSM client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ssm_client(),
        }
    }

    /// Read an AMI id from a public SSM parameter.
    ///
    /// Returns `Lookup::Missing` when the parameter does not exist or has no
    /// value; transport and permission failures surface as errors.
    pub async fn get_image_parameter(&self, parameter_path: &str) -> Result<Lookup<String>> {
        let result = self
            .client
            .get_parameter()
            .name(parameter_path)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                let err = anyhow::Error::new(e).context("Failed to read SSM parameter");
                if classify_anyhow_error(&err).is_not_found() {
                    warn!(parameter = %parameter_path, "SSM parameter not found");
                    return Ok(Lookup::Missing);
                }
                return Err(err);
            }
        };

        let value = response
            .parameter()
            .and_then(|p| p.value())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match value {
            Some(ami) => {
                debug!(parameter = %parameter_path, ami = %ami, "Resolved AMI from SSM parameter");
                Ok(Lookup::Found(ami.to_string()))
            }
            None => Ok(Lookup::Missing),
        }
    }
}

/// Check whether a string is a well-formed AMI identifier (`ami-` followed by
/// hex digits).
pub fn is_valid_image_id(id: &str) -> bool {
    match id.strip_prefix("ami-") {
        Some(rest) => rest.len() >= 8 && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
