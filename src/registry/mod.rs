//! # Switch Identity Registry
//!
//! Every switch in a switchnet instance gets a device identifier and a
//! management (thrift) port. Ports are derived from one base shared by the
//! whole instance:
//!
//! ```text
//! thrift_port = base_port + offset        (offset = 1, 2, 3, ...)
//! ```
//!
//! so offsets must be distinct for ports not to collide.
//!
//! ## Registry File
//!
//! Once validated, the registry is written to the runtime directory so that
//! operators and external tooling can find each switch's endpoint:
//!
//! ```text
//! /tmp/switchnet/
//! \-- switch_registry.json
//! ```
//!
//! ```json
//! {
//!   "base_port": 22222,
//!   "switches": [
//!     { "name": "s1", "device_id": 1, "thrift_port": 22223,
//!       "json_path": "edge.json", "role": "edge" }
//!   ]
//! }
//! ```

use crate::topology::{SwitchRole, TopologySpec};
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the registry inside the runtime directory
pub const REGISTRY_FILE: &str = "switch_registry.json";

/// Identity collisions and out-of-range values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("management port offset {offset} overflows base port {base}")]
    PortOverflow { base: u16, offset: u16 },

    #[error("switch '{switch}' has device id 0 (device ids must be positive)")]
    ZeroDeviceId { switch: String },

    #[error("device id {device_id} assigned to both '{first}' and '{second}'")]
    DuplicateDeviceId { device_id: u32, first: String, second: String },

    #[error("management port {port} assigned to both '{first}' and '{second}'")]
    DuplicatePort { port: u16, first: String, second: String },
}

/// Management port for a switch at `offset`.
///
/// # Examples
/// ```
/// use switchnet::registry::management_port;
///
/// assert_eq!(management_port(22222, 1), Ok(22223));
/// assert!(management_port(65535, 1).is_err());
/// ```
pub fn management_port(base: u16, offset: u16) -> Result<u16, RegistryError> {
    base.checked_add(offset)
        .ok_or(RegistryError::PortOverflow { base, offset })
}

/// Identity of one switch as published in the registry file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchIdentity {
    pub name: String,
    pub device_id: u32,
    pub thrift_port: u16,
    pub json_path: PathBuf,
    pub role: SwitchRole,
}

/// Validated identities of every switch, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRegistry {
    pub base_port: u16,
    pub switches: Vec<SwitchIdentity>,
}

impl SwitchRegistry {
    /// Collect identities from a topology, rejecting collisions
    pub fn from_topology(topology: &TopologySpec, base_port: u16) -> Result<Self, RegistryError> {
        let mut ports: HashMap<u16, &str> = HashMap::new();
        let mut device_ids: HashMap<u32, &str> = HashMap::new();
        let mut switches = Vec::with_capacity(topology.switches.len());

        for switch in &topology.switches {
            if switch.device_id == 0 {
                return Err(RegistryError::ZeroDeviceId {
                    switch: switch.name.clone(),
                });
            }
            if let Some(first) = device_ids.insert(switch.device_id, &switch.name) {
                return Err(RegistryError::DuplicateDeviceId {
                    device_id: switch.device_id,
                    first: first.to_string(),
                    second: switch.name.clone(),
                });
            }
            if let Some(first) = ports.insert(switch.thrift_port, &switch.name) {
                return Err(RegistryError::DuplicatePort {
                    port: switch.thrift_port,
                    first: first.to_string(),
                    second: switch.name.clone(),
                });
            }

            switches.push(SwitchIdentity {
                name: switch.name.clone(),
                device_id: switch.device_id,
                thrift_port: switch.thrift_port,
                json_path: switch.json_path.clone(),
                role: switch.role,
            });
        }

        Ok(Self { base_port, switches })
    }

    pub fn get(&self, name: &str) -> Option<&SwitchIdentity> {
        self.switches.iter().find(|s| s.name == name)
    }
}

/// Write the registry to `<dir>/switch_registry.json`
pub fn write_registry(registry: &SwitchRegistry, dir: &Path) -> color_eyre::eyre::Result<PathBuf> {
    fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create runtime directory '{}'", dir.display()))?;

    let path = dir.join(REGISTRY_FILE);
    let json = serde_json::to_string_pretty(registry)?;
    fs::write(&path, json)
        .wrap_err_with(|| format!("Failed to write switch registry '{}'", path.display()))?;

    log::info!("Wrote switch registry with {} switches to {:?}", registry.switches.len(), path);
    Ok(path)
}
