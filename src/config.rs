//! Configuration for a deploy run

use std::path::PathBuf;

/// Port the parking application listens on
pub const APP_PORT: u16 = 8080;

/// Port for administrative SSH access
pub const SSH_PORT: u16 = 22;

/// Owner of the base images accepted by the catalog fallback
pub const IMAGE_OWNER: &str = "amazon";

/// Path the application is written to on the instance
pub const REMOTE_APP_PATH: &str = "/home/ec2-user/app.py";

/// Path the application's log is redirected to on the instance
pub const REMOTE_LOG_PATH: &str = "/var/log/parking-app.log";

/// Placeholder printed when the public address has not been assigned yet
pub const ADDRESS_PLACEHOLDER: &str = "<IP not available yet>";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default EC2 instance type
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

/// Default key-pair name
pub const DEFAULT_KEY_NAME: &str = "parking-key";

/// Default security group name
pub const DEFAULT_SECURITY_GROUP: &str = "parking-app-sg";

/// Default settle delay before the public address query, in seconds
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 15;

/// Instance architecture, derived from the instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
    Arm64,
}

impl Architecture {
    /// SSM public parameter path for the latest AL2023 AMI of this architecture
    pub fn image_parameter(&self) -> &'static str {
        match self {
            Architecture::X86_64 => {
                "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64"
            }
            Architecture::Arm64 => {
                "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-arm64"
            }
        }
    }

    /// Image name pattern for the catalog fallback query
    pub fn image_name_pattern(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "al2023-ami-2023*-x86_64",
            Architecture::Arm64 => "al2023-ami-2023*-arm64",
        }
    }
}

/// Detect instance architecture from the instance type.
///
/// Graviton families have a 'g' after the generation number (t4g, c7g, m6g).
pub fn detect_architecture(instance_type: &str) -> Architecture {
    let family = instance_type.split('.').next().unwrap_or(instance_type);
    let mut chars = family.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() && chars.peek() == Some(&'g') {
            return Architecture::Arm64;
        }
    }
    Architecture::X86_64
}

/// Configuration for a deploy run, immutable after CLI parsing
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// AWS region
    pub region: String,

    /// EC2 instance type
    pub instance_type: String,

    /// Key-pair name for SSH access
    pub key_name: String,

    /// Local path of the application artifact
    pub app_path: PathBuf,

    /// Security group name
    pub security_group_name: String,

    /// SSM parameter path override for image resolution
    pub image_parameter: Option<String>,

    /// Settle delay before the public address query, in seconds
    pub settle_delay_secs: u64,
}

impl DeployConfig {
    /// Architecture derived from the configured instance type
    pub fn architecture(&self) -> Architecture {
        detect_architecture(&self.instance_type)
    }

    /// SSM parameter path to resolve the image from
    pub fn image_parameter(&self) -> &str {
        self.image_parameter
            .as_deref()
            .unwrap_or_else(|| self.architecture().image_parameter())
    }

    /// File name of the application artifact (for the Name tag and report)
    pub fn app_file_name(&self) -> String {
        self.app_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app.py".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DeployConfig {
        DeployConfig {
            region: DEFAULT_REGION.to_string(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            key_name: "parking-key".to_string(),
            app_path: PathBuf::from("app.py"),
            security_group_name: DEFAULT_SECURITY_GROUP.to_string(),
            image_parameter: None,
            settle_delay_secs: 0,
        }
    }

    #[test]
    fn detect_architecture_families() {
        assert_eq!(detect_architecture("t3.micro"), Architecture::X86_64);
        assert_eq!(detect_architecture("c7i.xlarge"), Architecture::X86_64);
        assert_eq!(detect_architecture("t4g.small"), Architecture::Arm64);
        assert_eq!(detect_architecture("m6gd.large"), Architecture::Arm64);
        assert_eq!(detect_architecture("c7g.metal"), Architecture::Arm64);
    }

    #[test]
    fn image_parameter_follows_architecture() {
        let cfg = config();
        assert!(cfg.image_parameter().ends_with("x86_64"));

        let mut arm = config();
        arm.instance_type = "t4g.small".to_string();
        assert!(arm.image_parameter().ends_with("arm64"));
    }

    #[test]
    fn image_parameter_override_wins() {
        let mut cfg = config();
        cfg.image_parameter = Some("/custom/ami/path".to_string());
        assert_eq!(cfg.image_parameter(), "/custom/ami/path");
    }

    #[test]
    fn app_file_name_from_path() {
        let mut cfg = config();
        cfg.app_path = PathBuf::from("/srv/deploy/app.py");
        assert_eq!(cfg.app_file_name(), "app.py");
    }
}
