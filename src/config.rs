//! Configuration for the preflight checker.
//!
//! The reference deployment is baked into `Default`; credentials, port
//! and timeouts can be overridden from environment variables so a new
//! rig never requires a recompile.

use std::env;
use std::time::Duration;

/// A remote compute host reachable over SSH.
#[derive(Debug, Clone)]
pub struct HostTarget {
    pub address: String,
    pub username: String,
    pub password: String,
    pub port: u16,
}

/// A NAS share that must be mounted on a specific host.
#[derive(Debug, Clone)]
pub struct MountSpec {
    /// Short label used in the check name, e.g. "MDC1A".
    pub label: String,
    /// Address of the host the share is mounted on.
    pub host: String,
    /// Address of the NAS exporting the share.
    pub share_address: String,
}

/// One topic whose publish rate is measured.
#[derive(Debug, Clone)]
pub struct TopicSpec {
    pub name: String,
    pub topic: String,
    /// Operator instruction prepended to failure messages. Deployment
    /// safety precondition, declared per item rather than inferred from
    /// the command text.
    pub safety_note: Option<String>,
}

/// A group of topics measured against one host under a shared
/// concurrency budget.
#[derive(Debug, Clone)]
pub struct TopicGroup {
    /// Selection alias for this group, e.g. "mdc1".
    pub alias: String,
    pub host: String,
    /// Hosts have different spare capacity for concurrent sessions.
    pub max_concurrency: usize,
    pub topics: Vec<TopicSpec>,
}

/// Full deployment configuration injected into the engine.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// All hosts probed by the reachability gate.
    pub hosts: Vec<String>,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub cmd_timeout: Duration,
    /// The rate-measurement session gets a longer budget than plain
    /// commands; the measurement tool is slow to initialize.
    pub measure_timeout: Duration,
    /// Remote-side bound on the mount invocation itself.
    pub mount_timeout_secs: u64,
    pub share_user: String,
    pub share_password: String,
    pub mount_point: String,
    pub min_avail_gb: f64,
    pub mounts: Vec<MountSpec>,
    pub topic_groups: Vec<TopicGroup>,
}

const MDC1_IP: &str = "192.168.30.41";
const MDC2_IP: &str = "192.168.30.143";

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                MDC2_IP.to_string(),
                MDC1_IP.to_string(),
                "192.168.30.43".to_string(),
            ],
            username: "root".to_string(),
            password: "changeme".to_string(),
            port: 22,
            connect_timeout: Duration::from_secs(8),
            cmd_timeout: Duration::from_secs(8),
            measure_timeout: Duration::from_secs(20),
            mount_timeout_secs: 8,
            share_user: "admin".to_string(),
            share_password: "changeme".to_string(),
            mount_point: "/mnt/share".to_string(),
            min_avail_gb: 800.0,
            mounts: vec![
                MountSpec {
                    label: "MDC1A".to_string(),
                    host: MDC1_IP.to_string(),
                    share_address: "192.168.79.160".to_string(),
                },
                MountSpec {
                    label: "MDC2".to_string(),
                    host: MDC2_IP.to_string(),
                    share_address: "192.168.79.60".to_string(),
                },
            ],
            topic_groups: vec![
                TopicGroup {
                    alias: "mdc1".to_string(),
                    host: MDC1_IP.to_string(),
                    max_concurrency: 2,
                    topics: vec![
                        topic("MDC1A left DTOF", "/dtof_left"),
                        topic("MDC1A right DTOF", "/dtof_right"),
                        topic("MDC1A rear DTOF", "/dtof_rear"),
                        topic("MDC1A perception object list", "/object_array"),
                        topic("MDC1A fused perception object list", "/object_array_fusion"),
                        TopicSpec {
                            name: "MDC1A forward lidar".to_string(),
                            topic: "/lidar_side_front".to_string(),
                            safety_note: Some(
                                "driver: engage gear D and hold the brake".to_string(),
                            ),
                        },
                    ],
                },
                TopicGroup {
                    alias: "mdc2".to_string(),
                    host: MDC2_IP.to_string(),
                    max_concurrency: 4,
                    topics: vec![
                        topic("MDC2 rear lidar", "/lidar_side_rear"),
                        topic("MDC2 right lidar", "/lidar_side_right"),
                        topic("MDC2 roof lidar", "/lidar_side_roof"),
                        topic("MDC2 left lidar", "/lidar_side_left"),
                    ],
                },
            ],
        }
    }
}

fn topic(name: &str, path: &str) -> TopicSpec {
    TopicSpec {
        name: name.to_string(),
        topic: path.to_string(),
        safety_note: None,
    }
}

impl CheckConfig {
    /// Load configuration with environment overrides.
    ///
    /// Environment variables:
    /// - `PREFLIGHT_USER` / `PREFLIGHT_PASSWORD`: SSH credentials
    /// - `PREFLIGHT_PORT`: SSH port
    /// - `PREFLIGHT_SHARE_USER` / `PREFLIGHT_SHARE_PASSWORD`: NAS credentials
    /// - `PREFLIGHT_CONNECT_TIMEOUT_SECS` / `PREFLIGHT_CMD_TIMEOUT_SECS`
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(user) = env::var("PREFLIGHT_USER") {
            cfg.username = user;
        }
        if let Ok(pass) = env::var("PREFLIGHT_PASSWORD") {
            cfg.password = pass;
        }
        if let Ok(port_str) = env::var("PREFLIGHT_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.port = port;
            }
        }
        if let Ok(user) = env::var("PREFLIGHT_SHARE_USER") {
            cfg.share_user = user;
        }
        if let Ok(pass) = env::var("PREFLIGHT_SHARE_PASSWORD") {
            cfg.share_password = pass;
        }
        if let Ok(secs_str) = env::var("PREFLIGHT_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = secs_str.parse() {
                cfg.connect_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(secs_str) = env::var("PREFLIGHT_CMD_TIMEOUT_SECS") {
            if let Ok(secs) = secs_str.parse() {
                cfg.cmd_timeout = Duration::from_secs(secs);
            }
        }

        cfg
    }

    /// Connection target for a host address, using the deployment
    /// credentials.
    pub fn host_target(&self, address: &str) -> HostTarget {
        HostTarget {
            address: address.to_string(),
            username: self.username.clone(),
            password: self.password.clone(),
            port: self.port,
        }
    }

    /// The rate-measurement command for one topic. The remote-side
    /// `timeout` keeps a wedged measurement from holding the session.
    pub fn rate_command(&self, topic: &str) -> String {
        format!(
            "timeout {}s pmupload adstopic hz {}",
            self.cmd_timeout.as_secs(),
            topic
        )
    }
}
