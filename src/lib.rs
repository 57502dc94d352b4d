//! parking-deploy - single-instance EC2 deployment for the parking app
//!
//! Provisions one EC2 instance, configures its security group, injects the
//! parking-lot ticketing application via user-data, waits for the instance
//! to run, and reports the resulting endpoint.

pub mod aws;
pub mod config;
pub mod preflight;
pub mod provision;
pub mod report;
pub mod user_data;
pub mod wait;
