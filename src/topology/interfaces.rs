//! Interface planning.
//!
//! Every link consumes the next free port on both of its endpoints, in link
//! declaration order. Hosts number their ports from 0 (`h1-eth0`), switches
//! from 1 (`s1-eth1`), so a switch's port number matches the `-i` index it is
//! started with.

use crate::topology::types::{Link, NodeKind, TopologySpec};
use std::collections::HashMap;

/// Linux limit for interface names (IFNAMSIZ minus the trailing NUL).
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// One end of a realized link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub node: String,
    pub kind: NodeKind,
    pub port: u32,
    pub name: String,
}

impl Interface {
    pub fn new(node: &str, kind: NodeKind, port: u32) -> Self {
        Self {
            node: node.to_string(),
            kind,
            port,
            name: format!("{}-eth{}", node, port),
        }
    }
}

/// A declared link with both interfaces assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    pub link: Link,
    pub a: Interface,
    pub b: Interface,
}

/// Assign ports and interface names to every link.
///
/// Endpoints that do not resolve are skipped; [`super::validate_topology`]
/// rejects such topologies before planning matters.
pub fn plan_links(topology: &TopologySpec) -> Vec<LinkPlan> {
    let mut next_port: HashMap<&str, u32> = HashMap::new();
    let mut plans = Vec::with_capacity(topology.links.len());

    for link in &topology.links {
        let (Some(kind_a), Some(kind_b)) = (topology.kind_of(link.a()), topology.kind_of(link.b())) else {
            continue;
        };

        let port_a = *next_port.entry(link.a()).or_insert(kind_a.first_port());
        next_port.insert(link.a(), port_a + 1);
        let port_b = *next_port.entry(link.b()).or_insert(kind_b.first_port());
        next_port.insert(link.b(), port_b + 1);

        plans.push(LinkPlan {
            link: link.clone(),
            a: Interface::new(link.a(), kind_a, port_a),
            b: Interface::new(link.b(), kind_b, port_b),
        });
    }

    plans
}

/// Interfaces of one node, ordered by port
pub fn interfaces_of<'a>(plans: &'a [LinkPlan], node: &str) -> Vec<&'a Interface> {
    let mut interfaces: Vec<&Interface> = plans
        .iter()
        .flat_map(|p| [&p.a, &p.b])
        .filter(|i| i.node == node)
        .collect();
    interfaces.sort_by_key(|i| i.port);
    interfaces
}

/// The interface a host's tuning commands target: its lowest-numbered port.
pub fn default_interface<'a>(plans: &'a [LinkPlan], host: &str) -> Option<&'a Interface> {
    interfaces_of(plans, host).into_iter().next()
}
