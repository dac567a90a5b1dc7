//! The reference topology: three switches in a chain between two hosts.
//!
//! ```text
//! h1 -- s1 (edge) -- s2 (aggregate) -- s3 (edge) -- h2
//! ```
//!
//! Edge switches share the first forwarding config, the aggregate switch uses
//! the second. Host count and links come from [`Settings`], so the shape can
//! be changed without touching the switch declarations.

use crate::config::Settings;
use crate::registry::{management_port, RegistryError};
use crate::topology::types::{SwitchRole, SwitchSpec, TopologySpec};
use std::path::PathBuf;

/// Number of switches in the reference topology
pub const REFERENCE_SWITCH_COUNT: u16 = 3;

/// Paths supplied on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPaths {
    /// Switch executable shared by every switch
    pub behavioral_exe: PathBuf,
    /// Forwarding config of the edge switches
    pub edge_json: PathBuf,
    /// Forwarding config of the aggregate switch
    pub aggregate_json: PathBuf,
}

/// Build the reference topology.
///
/// Switch `i` (1-based) gets device id `i` and management port
/// `base_port + i`.
pub fn reference_topology(paths: &SwitchPaths, settings: &Settings) -> Result<TopologySpec, RegistryError> {
    let declared: [_; REFERENCE_SWITCH_COUNT as usize] = [
        ("s1", SwitchRole::Edge, &paths.edge_json),
        ("s2", SwitchRole::Aggregate, &paths.aggregate_json),
        ("s3", SwitchRole::Edge, &paths.edge_json),
    ];

    let mut switches = Vec::with_capacity(declared.len());
    for (offset, (name, role, json_path)) in (1u16..).zip(declared) {
        switches.push(SwitchSpec {
            name: name.to_string(),
            sw_path: paths.behavioral_exe.clone(),
            json_path: json_path.clone(),
            thrift_port: management_port(settings.base_port, offset)?,
            device_id: u32::from(offset),
            pcap_dump: settings.pcap_dump,
            role,
        });
    }

    Ok(TopologySpec {
        switches,
        host_count: settings.host_count,
        links: settings.links.clone(),
    })
}
