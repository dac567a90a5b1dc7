//! Topology validation.
//!
//! Runs before the network builder touches the substrate, so an invalid
//! topology never starts a single process.

use crate::topology::interfaces::{plan_links, MAX_INTERFACE_NAME_LEN};
use crate::topology::types::TopologySpec;
use crate::utils::validation::validate_node_name;
use std::collections::HashSet;

/// Reasons a topology is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("topology declares no switches")]
    NoSwitches,

    #[error("invalid node name: {0}")]
    InvalidName(String),

    #[error("duplicate node name '{0}'")]
    DuplicateName(String),

    #[error("link {link} references unknown node '{endpoint}'")]
    UnknownEndpoint { link: String, endpoint: String },

    #[error("link {link} connects '{node}' to itself")]
    SelfLink { link: String, node: String },

    #[error("interface name '{name}' exceeds {max} bytes")]
    InterfaceNameTooLong { name: String, max: usize },
}

/// Check every structural invariant of a topology.
///
/// - at least one switch
/// - node names are well formed and unique
/// - every link endpoint names a declared switch or host
/// - no link joins a node to itself
/// - every derived interface name fits the kernel limit
pub fn validate_topology(topology: &TopologySpec) -> Result<(), TopologyError> {
    if topology.switches.is_empty() {
        return Err(TopologyError::NoSwitches);
    }

    let mut seen = HashSet::new();
    for name in topology.node_names() {
        validate_node_name(&name).map_err(TopologyError::InvalidName)?;
        if !seen.insert(name.clone()) {
            return Err(TopologyError::DuplicateName(name));
        }
    }

    for link in &topology.links {
        for endpoint in [link.a(), link.b()] {
            if topology.kind_of(endpoint).is_none() {
                return Err(TopologyError::UnknownEndpoint {
                    link: link.to_string(),
                    endpoint: endpoint.to_string(),
                });
            }
        }
        if link.a() == link.b() {
            return Err(TopologyError::SelfLink {
                link: link.to_string(),
                node: link.a().to_string(),
            });
        }
    }

    for plan in plan_links(topology) {
        for interface in [&plan.a, &plan.b] {
            if interface.name.len() > MAX_INTERFACE_NAME_LEN {
                return Err(TopologyError::InterfaceNameTooLong {
                    name: interface.name.clone(),
                    max: MAX_INTERFACE_NAME_LEN,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::{Link, SwitchRole, SwitchSpec};
    use std::path::PathBuf;

    fn switch(name: &str) -> SwitchSpec {
        SwitchSpec {
            name: name.to_string(),
            sw_path: PathBuf::from("simple_switch"),
            json_path: PathBuf::from("edge.json"),
            thrift_port: 22223,
            device_id: 1,
            pcap_dump: false,
            role: SwitchRole::Edge,
        }
    }

    fn topo(switches: &[&str], host_count: usize, links: &[(&str, &str)]) -> TopologySpec {
        TopologySpec {
            switches: switches.iter().map(|s| switch(s)).collect(),
            host_count,
            links: links.iter().map(|(a, b)| Link::new(*a, *b)).collect(),
        }
    }

    #[test]
    fn test_valid_chain() {
        let t = topo(&["s1", "s2", "s3"], 2, &[("h1", "s1"), ("s1", "s2"), ("s2", "s3"), ("s3", "h2")]);
        assert_eq!(validate_topology(&t), Ok(()));
    }

    #[test]
    fn test_unknown_endpoint() {
        let t = topo(&["s1"], 1, &[("h1", "s1"), ("s1", "h2")]);
        assert_eq!(
            validate_topology(&t),
            Err(TopologyError::UnknownEndpoint {
                link: "s1-h2".to_string(),
                endpoint: "h2".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_switch_name() {
        let t = topo(&["s1", "s1"], 0, &[("s1", "s1")]);
        assert_eq!(validate_topology(&t), Err(TopologyError::DuplicateName("s1".to_string())));
    }

    #[test]
    fn test_switch_shadowing_host_name() {
        let t = topo(&["h1"], 1, &[]);
        assert_eq!(validate_topology(&t), Err(TopologyError::DuplicateName("h1".to_string())));
    }

    #[test]
    fn test_self_link() {
        let t = topo(&["s1"], 0, &[("s1", "s1")]);
        assert!(matches!(validate_topology(&t), Err(TopologyError::SelfLink { .. })));
    }

    #[test]
    fn test_no_switches() {
        let t = topo(&[], 2, &[("h1", "h2")]);
        assert_eq!(validate_topology(&t), Err(TopologyError::NoSwitches));
    }

    #[test]
    fn test_bad_name() {
        let t = topo(&["s-1"], 0, &[]);
        assert!(matches!(validate_topology(&t), Err(TopologyError::InvalidName(_))));
    }

    #[test]
    fn test_interface_name_too_long() {
        // "aggregation1-eth1" is 17 bytes
        let t = topo(&["aggregation1"], 1, &[("h1", "aggregation1")]);
        assert!(matches!(
            validate_topology(&t),
            Err(TopologyError::InterfaceNameTooLong { .. })
        ));
    }
}
