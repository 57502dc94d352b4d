//! AWS service clients

pub mod account;
pub mod ami;
pub mod context;
pub mod ec2;
pub mod error;
pub mod operations;
mod security_group;
pub mod tags;
pub mod types;

pub use account::{get_current_account_id, AccountId};
pub use ami::{is_valid_image_id, SsmClient};
pub use context::AwsContext;
pub use ec2::Ec2Client;
pub use error::{classify_anyhow_error, classify_aws_error, AwsError};
pub use operations::{CloudClients, ProvisionOps};
pub use types::{LaunchRequest, Lookup, SecurityGroupOutcome};
