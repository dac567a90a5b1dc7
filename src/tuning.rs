//! Host network tuning.
//!
//! Once the network is live, every host gets the same fixed list of stack
//! adjustments against its default interface: checksum/segmentation offloads
//! off, IPv6 off, a fixed TCP congestion control algorithm, and outbound ICMP
//! "destination unreachable" dropped. Commands run in order, synchronously,
//! with no rollback. A failing command is logged and recorded; the remaining
//! commands and hosts still run.

use crate::config::TuningConfig;
use crate::network::{LiveNetwork, Substrate};
use log::{info, warn};

pub const ETHTOOL_CMD: &str = "ethtool";
pub const SYSCTL_CMD: &str = "sysctl";
pub const IPTABLES_CMD: &str = "iptables";

/// Offloads disabled on the default interface, in order
const OFFLOADS: [&str; 3] = ["rx", "tx", "sg"];

/// Scopes on which IPv6 is disabled, in order
const IPV6_SCOPES: [&str; 3] = ["all", "default", "lo"];

/// A tuning command that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningFailure {
    pub host: String,
    pub command: String,
    pub detail: String,
}

/// The tuning commands for one host, in execution order.
///
/// Offload toggles are skipped when the host has no interface.
pub fn tuning_commands(interface: Option<&str>, config: &TuningConfig) -> Vec<String> {
    let mut commands = Vec::with_capacity(8);

    if let Some(interface) = interface {
        for offload in OFFLOADS {
            commands.push(format!("{} --offload {} {} off", ETHTOOL_CMD, interface, offload));
        }
    }
    for scope in IPV6_SCOPES {
        commands.push(format!("{} -w net.ipv6.conf.{}.disable_ipv6=1", SYSCTL_CMD, scope));
    }
    commands.push(format!(
        "{} -w net.ipv4.tcp_congestion_control={}",
        SYSCTL_CMD, config.congestion_control
    ));
    commands.push(format!(
        "{} -I OUTPUT -p icmp --icmp-type destination-unreachable -j DROP",
        IPTABLES_CMD
    ));

    commands
}

/// Apply the tuning commands to every host, returning the failures
pub fn tune_hosts<S: Substrate>(network: &mut LiveNetwork<S>, config: &TuningConfig) -> Vec<TuningFailure> {
    let mut failures = Vec::new();

    for host in network.hosts() {
        let interface = network.default_interface(&host.name).map(|i| i.name.clone());
        if interface.is_none() {
            warn!("Host {} has no interface, skipping offload settings", host.name);
        }

        for command in tuning_commands(interface.as_deref(), config) {
            info!("{}: {}", host.name, command);
            let detail = match network.host_cmd(&host.name, &command) {
                Ok(result) if result.success() => continue,
                Ok(result) => format!(
                    "exit status {}: {}",
                    result.exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    result.combined_output().trim()
                ),
                Err(e) => e.to_string(),
            };
            warn!("{}: '{}' failed: {}", host.name, command, detail);
            failures.push(TuningFailure {
                host: host.name.clone(),
                command,
                detail,
            });
        }
    }

    failures
}
