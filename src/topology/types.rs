//! Topology type definitions.
//!
//! A [`TopologySpec`] is the declarative description of the virtual network:
//! switches in declaration order, a host count and the links between them.
//! It is built once and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Prefix length of every host address
pub const HOST_PREFIX_LEN: u8 = 8;

/// Hosts that fit in the host network, excluding its network and broadcast addresses
pub const MAX_HOSTS: usize = (1 << 24) - 2;

/// Network the host addresses are taken from
const HOST_NETWORK: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);

/// Role of a switch in the fabric.
///
/// Informational only: it is logged and written to the registry, but every
/// switch receives the same command script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchRole {
    Edge,
    Aggregate,
}

impl SwitchRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchRole::Edge => "edge",
            SwitchRole::Aggregate => "aggregate",
        }
    }
}

/// One software switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchSpec {
    pub name: String,
    /// Switch executable, shared by all switches
    pub sw_path: PathBuf,
    /// Forwarding config handed to the switch and to the control client
    pub json_path: PathBuf,
    /// Management (thrift) port
    pub thrift_port: u16,
    /// Positive, unique per switch
    pub device_id: u32,
    /// Persist a packet capture of every port
    pub pcap_dump: bool,
    pub role: SwitchRole,
}

/// A host. Hosts are homogeneous; host `hN` gets address `10.0.0.N/8` and
/// MAC `00:00:00:00:00:0N` on its default interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub name: String,
    pub ip: Ipv4Addr,
    pub mac: String,
}

impl HostSpec {
    /// Host for a one-based host number
    pub fn numbered(number: u32) -> Self {
        let mac = number
            .to_be_bytes()
            .iter()
            .fold(String::from("00:00"), |mac, byte| format!("{}:{:02x}", mac, byte));
        Self {
            name: format!("h{}", number),
            ip: Ipv4Addr::from(u32::from(HOST_NETWORK) + number),
            mac,
        }
    }

    /// Address in CIDR notation, as given to `ip addr add`
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.ip, HOST_PREFIX_LEN)
    }
}

/// Point-to-point link between two named nodes.
///
/// Serialized as a two-element sequence, e.g. `[h1, s1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link(pub String, pub String);

impl Link {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Link(a.into(), b.into())
    }

    pub fn a(&self) -> &str {
        &self.0
    }

    pub fn b(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// Kind of a node referenced by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Host,
    Switch,
}

impl NodeKind {
    /// First port number handed out on a node of this kind.
    pub fn first_port(&self) -> u32 {
        match self {
            NodeKind::Host => 0,
            NodeKind::Switch => 1,
        }
    }
}

/// Declarative topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySpec {
    /// Switches, in the order they are brought up
    pub switches: Vec<SwitchSpec>,
    pub host_count: usize,
    pub links: Vec<Link>,
}

impl TopologySpec {
    /// Host name for a zero-based host index
    pub fn host_name(index: usize) -> String {
        format!("h{}", index + 1)
    }

    pub fn hosts(&self) -> Vec<HostSpec> {
        (0..self.host_count)
            .map(|i| HostSpec::numbered(i as u32 + 1))
            .collect()
    }

    pub fn switch(&self, name: &str) -> Option<&SwitchSpec> {
        self.switches.iter().find(|s| s.name == name)
    }

    /// Resolve a node name to its kind
    pub fn kind_of(&self, name: &str) -> Option<NodeKind> {
        if self.switch(name).is_some() {
            return Some(NodeKind::Switch);
        }
        let is_host = name
            .strip_prefix('h')
            .and_then(|n| n.parse::<usize>().ok())
            .map_or(false, |n| n >= 1 && n <= self.host_count && Self::host_name(n - 1) == name);
        if is_host {
            Some(NodeKind::Host)
        } else {
            None
        }
    }

    /// All node names: hosts first, then switches
    pub fn node_names(&self) -> Vec<String> {
        self.hosts()
            .into_iter()
            .map(|h| h.name)
            .chain(self.switches.iter().map(|s| s.name.clone()))
            .collect()
    }
}
