//! Deploy summary report
//!
//! Renders the human-readable end-of-run summary: resource identifiers,
//! derived service endpoints, operator instructions, and collected warnings.
//! Endpoint URLs are only derived when a public address was actually
//! assigned.

use crate::aws::types::SecurityGroupOutcome;
use crate::config::{DeployConfig, ADDRESS_PLACEHOLDER, APP_PORT, REMOTE_LOG_PATH};
use crate::provision::DeployOutcome;
use std::fmt::Write;

/// Render the final report as plain text.
pub fn render_report(config: &DeployConfig, outcome: &DeployOutcome) -> String {
    let mut out = String::new();

    let address = outcome.public_ip.as_deref();
    let sg_origin = match &outcome.security_group {
        SecurityGroupOutcome::Created(_) => "created",
        SecurityGroupOutcome::Found(_) => "reused",
    };

    writeln!(out, "==============================================").unwrap();
    writeln!(out, " Parking app deployment complete").unwrap();
    writeln!(out, "==============================================").unwrap();
    writeln!(out, "Deploy id:       {}", outcome.deploy_id).unwrap();
    writeln!(out, "Region:          {}", config.region).unwrap();
    writeln!(out, "Image:           {}", outcome.image_id).unwrap();
    writeln!(
        out,
        "Security group:  {} ({})",
        outcome.security_group.id(),
        sg_origin
    )
    .unwrap();
    writeln!(out, "Instance id:     {}", outcome.instance_id).unwrap();
    writeln!(
        out,
        "Instance state:  {}",
        outcome.state_after_wait.as_deref().unwrap_or("unknown")
    )
    .unwrap();
    writeln!(
        out,
        "Public address:  {}",
        address.unwrap_or(ADDRESS_PLACEHOLDER)
    )
    .unwrap();
    writeln!(out).unwrap();

    match address {
        Some(ip) => {
            writeln!(out, "Service endpoints:").unwrap();
            writeln!(
                out,
                "  Entry: http://{}:{}/entry?plate=<plate>&parkingLot=<lot-id>",
                ip, APP_PORT
            )
            .unwrap();
            writeln!(
                out,
                "  Exit:  http://{}:{}/exit?ticketId=<ticket-id>",
                ip, APP_PORT
            )
            .unwrap();
            writeln!(out).unwrap();
            writeln!(out, "SSH access:").unwrap();
            writeln!(out, "  ssh -i {}.pem ec2-user@{}", config.key_name, ip).unwrap();
        }
        None => {
            writeln!(
                out,
                "The public address has not been assigned yet; service endpoints"
            )
            .unwrap();
            writeln!(
                out,
                "will be reachable on port {} once it is. Re-query the instance",
                APP_PORT
            )
            .unwrap();
            writeln!(out, "to obtain the address.").unwrap();
        }
    }

    writeln!(out).unwrap();
    writeln!(
        out,
        "The application takes a minute to bootstrap; its log is at {} on the instance.",
        REMOTE_LOG_PATH
    )
    .unwrap();

    if !outcome.warnings.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "Warnings:").unwrap();
        for warning in &outcome.warnings {
            writeln!(out, "  - {}", warning).unwrap();
        }
    }

    out
}
