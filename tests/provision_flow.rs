//! End-to-end pipeline tests against a mocked control plane
//!
//! Drives the full deploy pipeline through `ProvisionOps` with canned
//! responses, covering the fallback, create-or-find, fatal-ordering, and
//! placeholder behaviors.

use parking_deploy::aws::types::{LaunchRequest, Lookup, SecurityGroupOutcome};
use parking_deploy::aws::ProvisionOps;
use parking_deploy::config::{DeployConfig, ADDRESS_PLACEHOLDER};
use parking_deploy::provision::Provisioner;
use parking_deploy::report::render_report;
use parking_deploy::wait::WaitConfig;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Mutex;

const APP_SOURCE: &str = "from flask import Flask\napp = Flask(__name__)\napp.run(host='0.0.0.0', port=8080)\n";

/// Canned result for a mocked call: the lookup outcome or an error message.
///
/// Error messages containing a known AWS error code exercise the same
/// classification path as real SDK failures.
type Canned = std::result::Result<Lookup<String>, String>;

fn found(v: &str) -> Canned {
    Ok(Lookup::Found(v.to_string()))
}

fn missing() -> Canned {
    Ok(Lookup::Missing)
}

struct MockOps {
    parameter: Canned,
    catalog: Canned,
    create_sg: std::result::Result<String, String>,
    find_sg: Canned,
    ingress: std::result::Result<(), String>,
    launch: Canned,
    tag_lookup: Canned,
    wait: std::result::Result<(), String>,
    state: Canned,
    ip: Canned,
    calls: Mutex<Vec<String>>,
}

impl MockOps {
    /// Every call succeeds; the happy-path deploy.
    fn happy() -> Self {
        Self {
            parameter: found("ami-0123456789abcdef0"),
            catalog: found("ami-0fa11bacccafe0000"),
            create_sg: Ok("sg-0abc".to_string()),
            find_sg: missing(),
            ingress: Ok(()),
            launch: found("i-0123"),
            tag_lookup: missing(),
            wait: Ok(()),
            state: found("running"),
            ip: found("203.0.113.5"),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }
}

fn to_result(canned: &Canned) -> Result<Lookup<String>> {
    match canned {
        Ok(v) => Ok(v.clone()),
        Err(msg) => Err(anyhow!("{}", msg)),
    }
}

impl ProvisionOps for MockOps {
    async fn image_from_parameter(&self, _parameter_path: &str) -> Result<Lookup<String>> {
        self.record("image_from_parameter");
        to_result(&self.parameter)
    }

    async fn latest_catalog_image(
        &self,
        _name_pattern: &str,
        _owner: &str,
    ) -> Result<Lookup<String>> {
        self.record("latest_catalog_image");
        to_result(&self.catalog)
    }

    async fn create_security_group(
        &self,
        _name: &str,
        _description: &str,
        _deploy_id: &str,
    ) -> Result<String> {
        self.record("create_security_group");
        self.create_sg.clone().map_err(|msg| anyhow!("{}", msg))
    }

    async fn find_security_group(&self, _name: &str) -> Result<Lookup<String>> {
        self.record("find_security_group");
        to_result(&self.find_sg)
    }

    async fn authorize_ingress(
        &self,
        _security_group_id: &str,
        port: u16,
        _description: &str,
    ) -> Result<()> {
        self.record(&format!("authorize_ingress:{}", port));
        self.ingress.clone().map_err(|msg| anyhow!("{}", msg))
    }

    async fn launch_instance(&self, request: LaunchRequest) -> Result<Lookup<String>> {
        self.record("launch_instance");
        assert!(!request.user_data.is_empty());
        to_result(&self.launch)
    }

    async fn find_instance_by_tag(&self, _key: &str, _value: &str) -> Result<Lookup<String>> {
        self.record("find_instance_by_tag");
        to_result(&self.tag_lookup)
    }

    async fn wait_for_running(&self, _instance_id: &str, _config: WaitConfig) -> Result<()> {
        self.record("wait_for_running");
        self.wait.clone().map_err(|msg| anyhow!("{}", msg))
    }

    async fn instance_state(&self, _instance_id: &str) -> Result<Lookup<String>> {
        self.record("instance_state");
        to_result(&self.state)
    }

    async fn public_ip(&self, _instance_id: &str) -> Result<Lookup<String>> {
        self.record("public_ip");
        to_result(&self.ip)
    }
}

fn config() -> DeployConfig {
    DeployConfig {
        region: "us-east-1".to_string(),
        instance_type: "t3.micro".to_string(),
        key_name: "parking-key".to_string(),
        app_path: PathBuf::from("app.py"),
        security_group_name: "parking-app-sg".to_string(),
        image_parameter: None,
        settle_delay_secs: 0,
    }
}

#[tokio::test]
async fn happy_path_deploys_and_reports_endpoints() {
    let ops = MockOps::happy();
    let cfg = config();

    let outcome = Provisioner::new(&cfg, &ops).run(APP_SOURCE).await.unwrap();

    assert_eq!(outcome.image_id, "ami-0123456789abcdef0");
    assert_eq!(
        outcome.security_group,
        SecurityGroupOutcome::Created("sg-0abc".to_string())
    );
    assert_eq!(outcome.instance_id, "i-0123");
    assert_eq!(outcome.state_after_wait.as_deref(), Some("running"));
    assert_eq!(outcome.public_ip.as_deref(), Some("203.0.113.5"));
    assert!(outcome.warnings.is_empty());

    // No fallback paths taken
    assert_eq!(ops.count("latest_catalog_image"), 0);
    assert_eq!(ops.count("find_security_group"), 0);
    assert_eq!(ops.count("find_instance_by_tag"), 0);

    // Both ingress rules attempted
    assert_eq!(ops.count("authorize_ingress:22"), 1);
    assert_eq!(ops.count("authorize_ingress:8080"), 1);

    let report = render_report(&cfg, &outcome);
    assert!(report.contains("http://203.0.113.5:8080/entry?"));
    assert!(report.contains("http://203.0.113.5:8080/exit?"));
}

#[tokio::test]
async fn malformed_parameter_value_falls_back_to_catalog_once() {
    let mut ops = MockOps::happy();
    ops.parameter = found("None");

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    assert_eq!(ops.count("latest_catalog_image"), 1);
    assert_eq!(outcome.image_id, "ami-0fa11bacccafe0000");
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.step == "resolve-image"));
}

#[tokio::test]
async fn missing_parameter_falls_back_to_catalog_once() {
    let mut ops = MockOps::happy();
    ops.parameter = missing();

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    assert_eq!(ops.count("image_from_parameter"), 1);
    assert_eq!(ops.count("latest_catalog_image"), 1);
    assert_eq!(outcome.image_id, "ami-0fa11bacccafe0000");
}

#[tokio::test]
async fn exhausted_image_lookup_fails_before_any_mutation() {
    let mut ops = MockOps::happy();
    ops.parameter = missing();
    ops.catalog = missing();

    let err = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("No usable machine image"));
    assert_eq!(ops.count("latest_catalog_image"), 1);
    assert_eq!(ops.count("create_security_group"), 0);
    assert_eq!(ops.count("launch_instance"), 0);
}

#[tokio::test]
async fn duplicate_security_group_is_found_by_name() {
    let mut ops = MockOps::happy();
    ops.create_sg = Err("service error: InvalidGroup.Duplicate: group exists".to_string());
    ops.find_sg = found("sg-0existing");

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    assert_eq!(
        outcome.security_group,
        SecurityGroupOutcome::Found("sg-0existing".to_string())
    );
    assert_eq!(ops.count("create_security_group"), 1);
    assert_eq!(ops.count("find_security_group"), 1);

    let report = render_report(&config(), &outcome);
    assert!(report.contains("sg-0existing (reused)"));
}

#[tokio::test]
async fn unresolvable_security_group_fails_before_ingress_and_launch() {
    let mut ops = MockOps::happy();
    ops.create_sg = Err("service error: InvalidGroup.Duplicate: group exists".to_string());
    ops.find_sg = missing();

    let err = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("could not be created or found"));
    assert_eq!(ops.count("authorize_ingress:22"), 0);
    assert_eq!(ops.count("authorize_ingress:8080"), 0);
    assert_eq!(ops.count("launch_instance"), 0);
}

#[tokio::test]
async fn duplicate_ingress_rules_are_warnings_not_failures() {
    let mut ops = MockOps::happy();
    ops.ingress = Err("service error: InvalidPermission.Duplicate: rule exists".to_string());

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    let ingress_warnings: Vec<_> = outcome
        .warnings
        .iter()
        .filter(|w| w.step == "ingress-rules")
        .collect();
    assert_eq!(ingress_warnings.len(), 2);
    assert!(ingress_warnings[0].message.contains("already exists"));

    // The run still completed
    assert_eq!(outcome.instance_id, "i-0123");
}

#[tokio::test]
async fn launch_without_id_attempts_tag_lookup_then_fails() {
    let mut ops = MockOps::happy();
    ops.launch = missing();
    ops.tag_lookup = found("i-0stray");

    let err = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no instance id"));
    assert_eq!(ops.count("find_instance_by_tag"), 1);
}

#[tokio::test]
async fn launch_failure_with_empty_tag_lookup_still_fails() {
    let mut ops = MockOps::happy();
    ops.launch = Err("service error: something went wrong".to_string());
    ops.tag_lookup = missing();

    let err = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Instance launch failed"));
    assert_eq!(ops.count("find_instance_by_tag"), 1);
}

#[tokio::test]
async fn missing_address_yields_placeholder_and_no_endpoints() {
    let mut ops = MockOps::happy();
    ops.ip = missing();

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    assert_eq!(outcome.public_ip, None);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.step == "public-address"));

    let report = render_report(&config(), &outcome);
    assert!(report.contains(ADDRESS_PLACEHOLDER));
    assert!(!report.contains("http://"));
}

#[tokio::test]
async fn state_mismatch_after_wait_is_a_warning() {
    let mut ops = MockOps::happy();
    ops.state = found("pending");

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    assert_eq!(outcome.state_after_wait.as_deref(), Some("pending"));
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.step == "await-running" && w.message.contains("not 'running'")));
}

#[tokio::test]
async fn wait_failure_is_a_warning_and_run_completes() {
    let mut ops = MockOps::happy();
    ops.wait = Err("Timeout waiting for i-0123".to_string());

    let outcome = Provisioner::new(&config(), &ops)
        .run(APP_SOURCE)
        .await
        .unwrap();

    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.step == "await-running"));
    assert_eq!(outcome.public_ip.as_deref(), Some("203.0.113.5"));
}
