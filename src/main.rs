//! parking-deploy: deploy the parking-lot ticketing service to EC2
//!
//! Provisions a single instance, configures network access, injects the
//! application via user-data, waits for it to run, and prints a summary.

use anyhow::Result;
use clap::Parser;
use parking_deploy::aws::{get_current_account_id, AwsContext, CloudClients};
use parking_deploy::config::{
    DeployConfig, DEFAULT_INSTANCE_TYPE, DEFAULT_KEY_NAME, DEFAULT_REGION, DEFAULT_SECURITY_GROUP,
    DEFAULT_SETTLE_DELAY_SECS,
};
use parking_deploy::provision::Provisioner;
use parking_deploy::{preflight, report};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "parking-deploy")]
#[command(about = "Deploy the parking-lot ticketing service to a single EC2 instance")]
#[command(version)]
struct Args {
    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// EC2 instance type
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    instance_type: String,

    /// Key-pair name for SSH access
    #[arg(short, long, default_value = DEFAULT_KEY_NAME)]
    key_name: String,

    /// Path to the application artifact
    #[arg(short, long, default_value = "app.py")]
    app: PathBuf,

    /// Security group name
    #[arg(long, default_value = DEFAULT_SECURITY_GROUP)]
    security_group: String,

    /// SSM parameter path for image resolution (derived from the instance
    /// type's architecture when unset)
    #[arg(long)]
    image_parameter: Option<String>,

    /// Seconds to wait before querying the public address
    #[arg(long, default_value_t = DEFAULT_SETTLE_DELAY_SECS)]
    settle_delay: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = DeployConfig {
        region: args.region,
        instance_type: args.instance_type,
        key_name: args.key_name,
        app_path: args.app,
        security_group_name: args.security_group,
        image_parameter: args.image_parameter,
        settle_delay_secs: args.settle_delay,
    };

    // Preflight: artifact first, then credentials - no cloud call before
    // both pass.
    let app_source = preflight::load_app_source(&config.app_path)?;

    let ctx = AwsContext::new(&config.region).await;
    let account = get_current_account_id(ctx.sdk_config()).await?;
    info!(account = %account, region = %config.region, "Preflight checks passed");

    let clients = CloudClients::from_context(&ctx);
    let provisioner = Provisioner::new(&config, &clients);
    let outcome = provisioner.run(&app_source).await?;

    print!("{}", report::render_report(&config, &outcome));

    Ok(())
}
