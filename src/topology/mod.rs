//! Network topology module.
//!
//! This module contains the declarative topology description, its
//! validation, interface planning and the reference topology.

pub mod types;
pub mod interfaces;
pub mod validation;
pub mod reference;

// Re-export key types and functions for easier access
pub use types::{HostSpec, Link, NodeKind, SwitchRole, SwitchSpec, TopologySpec, HOST_PREFIX_LEN, MAX_HOSTS};
pub use interfaces::{default_interface, interfaces_of, plan_links, Interface, LinkPlan};
pub use validation::{validate_topology, TopologyError};
pub use reference::{reference_topology, SwitchPaths, REFERENCE_SWITCH_COUNT};
