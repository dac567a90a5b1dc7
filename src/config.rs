//! Settings for a switchnet run.
//!
//! Everything that used to be a script-level constant (base port, topology
//! shape, timing) lives in one immutable [`Settings`] value that is built once
//! and passed by reference into the builder and the sequencer.

use crate::topology::{Link, MAX_HOSTS, REFERENCE_SWITCH_COUNT};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Management-port base of the reference topology.
pub const DEFAULT_BASE_PORT: u16 = 22222;

/// Command script read for every switch.
pub const DEFAULT_COMMANDS_PATH: &str = "commands.txt";

/// Errors found while validating settings
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid readiness settings: {0}")]
    InvalidReadiness(String),

    #[error("Invalid tuning settings: {0}")]
    InvalidTuning(String),

    #[error("Invalid link settings: {0}")]
    InvalidLink(String),

    #[error("Invalid topology settings: {0}")]
    InvalidTopology(String),
}

/// Top-level settings.
///
/// Every field has a default, so an empty YAML document is a valid settings
/// file and reproduces the reference topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base for management ports; switch `i` listens on `base_port + i`
    pub base_port: u16,
    /// Number of hosts, named `h1..hN`
    pub host_count: usize,
    /// Declared topology edges, in order
    pub links: Vec<Link>,
    /// Command script replayed to every switch
    pub commands_path: PathBuf,
    /// Directory for switch logs, packet captures and the registry file
    pub runtime_dir: PathBuf,
    /// Address the management ports are reachable on
    pub management_host: IpAddr,
    /// Whether switches persist packet captures
    pub pcap_dump: bool,
    /// Characteristics applied to every link
    pub link: LinkParams,
    pub tuning: TuningConfig,
    pub readiness: ReadinessConfig,
    /// Time given to switch processes before they are health-checked
    #[serde(with = "humantime_serde")]
    pub startup_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            host_count: 2,
            links: vec![
                Link::new("h1", "s1"),
                Link::new("s1", "s2"),
                Link::new("s2", "s3"),
                Link::new("s3", "h2"),
            ],
            commands_path: PathBuf::from(DEFAULT_COMMANDS_PATH),
            runtime_dir: PathBuf::from("/tmp/switchnet"),
            management_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            pcap_dump: true,
            link: LinkParams::default(),
            tuning: TuningConfig::default(),
            readiness: ReadinessConfig::default(),
            startup_grace: Duration::from_millis(500),
        }
    }
}

impl Settings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.links.is_empty() {
            return Err(ValidationError::InvalidTopology(
                "links cannot be empty".to_string(),
            ));
        }

        if self.host_count > MAX_HOSTS {
            return Err(ValidationError::InvalidTopology(format!(
                "host_count {} exceeds the {} addresses of 10.0.0.0/8",
                self.host_count, MAX_HOSTS
            )));
        }

        if self.base_port.checked_add(REFERENCE_SWITCH_COUNT).is_none() {
            return Err(ValidationError::InvalidTopology(format!(
                "base_port {} leaves no room for {} management ports",
                self.base_port, REFERENCE_SWITCH_COUNT
            )));
        }

        self.readiness.validate()?;
        self.link.validate()?;

        if self.tuning.congestion_control.trim().is_empty() {
            return Err(ValidationError::InvalidTuning(
                "congestion_control cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// How the sequencer waits for a switch's management endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessConfig {
    /// Fixed pause before each switch is touched
    #[serde(with = "humantime_serde")]
    pub settle: Duration,
    /// Timeout of a single TCP connect probe
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Delay after the first failed probe; doubles on each retry
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Upper bound for the retry delay
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Probes before the switch is declared not ready
    pub max_attempts: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            connect_timeout: Duration::from_millis(500),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            max_attempts: 20,
        }
    }
}

impl ReadinessConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidReadiness(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            // TcpStream::connect_timeout rejects a zero duration
            return Err(ValidationError::InvalidReadiness(
                "connect_timeout must be non-zero".to_string(),
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ValidationError::InvalidReadiness(format!(
                "initial_backoff {:?} exceeds max_backoff {:?}",
                self.initial_backoff, self.max_backoff
            )));
        }
        Ok(())
    }
}

/// Host network-stack adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TuningConfig {
    /// TCP congestion control algorithm set on every host
    pub congestion_control: String,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            congestion_control: "reno".to_string(),
        }
    }
}

/// Emulated link characteristics. Unset fields leave the link unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkParams {
    /// Rate limit in Mbit/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_mbit: Option<u32>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub delay: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub jitter: Option<Duration>,
    /// Packet loss in percent (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_percent: Option<f64>,
}

impl LinkParams {
    /// Returns true when no characteristic is set.
    pub fn is_unconstrained(&self) -> bool {
        self.bandwidth_mbit.is_none()
            && self.delay.is_none()
            && self.jitter.is_none()
            && self.loss_percent.is_none()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.bandwidth_mbit == Some(0) {
            return Err(ValidationError::InvalidLink(
                "bandwidth_mbit must be positive".to_string(),
            ));
        }
        if let Some(loss) = self.loss_percent {
            if !(0.0..=100.0).contains(&loss) {
                return Err(ValidationError::InvalidLink(format!(
                    "loss_percent {} out of range (must be 0-100)",
                    loss
                )));
            }
        }
        if self.jitter.is_some() && self.delay.is_none() {
            return Err(ValidationError::InvalidLink(
                "jitter requires delay".to_string(),
            ));
        }
        Ok(())
    }
}
