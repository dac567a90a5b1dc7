//! Network builder.
//!
//! Turns a validated [`TopologySpec`] into a running [`LiveNetwork`]. How hosts,
//! links and switch processes are realized is left to a [`Substrate`]; the
//! builder only decides what gets created and in which order:
//!
//! 1. check every switch executable and forwarding config
//! 2. create hosts
//! 3. realize links (with link characteristics, when set)
//! 4. register switches with their planned interfaces
//! 5. start the substrate, wait the startup grace, health-check every switch
//!
//! Any failure is fatal. The partially built network is torn down before the
//! error is returned.

pub mod netns;

use crate::config::{LinkParams, Settings};
use crate::topology::{
    default_interface, interfaces_of, plan_links, HostSpec, Interface, LinkPlan, SwitchSpec, TopologySpec,
};
use crate::utils::binary::{validate_binary, validate_file, BinaryError};
use crate::utils::exec::{ExecError, ExecResult};
use log::{debug, info};
use std::io;
use std::path::PathBuf;
use std::thread;

pub use netns::NetnsSubstrate;

/// Fatal errors while building, starting or driving the network
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("switch '{switch}' cannot start: {source}")]
    MissingInput {
        switch: String,
        #[source]
        source: BinaryError,
    },

    #[error("failed to start switch '{switch}': {source}")]
    Spawn {
        switch: String,
        #[source]
        source: io::Error,
    },

    #[error("switch '{switch}' exited during startup ({status}); see {}", .log.display())]
    SwitchExited { switch: String, status: String, log: PathBuf },

    #[error("failed to check switch '{switch}': {source}")]
    Health {
        switch: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("failed to prepare '{}': {source}", .path.display())]
    RuntimeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// The mechanism that realizes hosts, links and switch processes.
///
/// Calls arrive in builder order: hosts, links, switches, `start`, health
/// checks. `stop` may be called at any point, including after a failed
/// step, and must release whatever was created so far.
pub trait Substrate {
    fn add_host(&mut self, host: &HostSpec) -> Result<(), NetworkError>;

    fn add_link(&mut self, plan: &LinkPlan, params: &LinkParams) -> Result<(), NetworkError>;

    /// Register a switch; its process is launched by `start`
    fn add_switch(&mut self, switch: &SwitchSpec, interfaces: &[Interface]) -> Result<(), NetworkError>;

    /// Launch every registered switch process
    fn start(&mut self) -> Result<(), NetworkError>;

    /// Fail if the switch process is no longer running
    fn check_switch(&mut self, switch: &str) -> Result<(), NetworkError>;

    /// Run a shell command inside a host
    fn host_cmd(&mut self, host: &str, command: &str) -> Result<ExecResult, NetworkError>;

    /// Stop all processes and remove all links
    fn stop(&mut self);
}

/// A running network. Torn down exactly once, on [`LiveNetwork::stop`] or drop.
pub struct LiveNetwork<S: Substrate> {
    substrate: S,
    topology: TopologySpec,
    links: Vec<LinkPlan>,
    stopped: bool,
}

impl<S: Substrate> LiveNetwork<S> {
    pub fn topology(&self) -> &TopologySpec {
        &self.topology
    }

    pub fn links(&self) -> &[LinkPlan] {
        &self.links
    }

    pub fn hosts(&self) -> Vec<HostSpec> {
        self.topology.hosts()
    }

    pub fn switches(&self) -> &[SwitchSpec] {
        &self.topology.switches
    }

    /// Interface a host's tuning commands apply to
    pub fn default_interface(&self, host: &str) -> Option<&Interface> {
        default_interface(&self.links, host)
    }

    pub fn host_cmd(&mut self, host: &str, command: &str) -> Result<ExecResult, NetworkError> {
        if self.topology.kind_of(host) != Some(crate::topology::NodeKind::Host) {
            return Err(NetworkError::UnknownNode(host.to_string()));
        }
        self.substrate.host_cmd(host, command)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop every process and remove every link. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!("Stopping network");
        self.substrate.stop();
    }
}

impl<S: Substrate> Drop for LiveNetwork<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Check executables and forwarding configs before anything is created
fn check_switch_inputs(topology: &TopologySpec) -> Result<(), NetworkError> {
    for switch in &topology.switches {
        validate_binary(&switch.sw_path)
            .and_then(|_| validate_file(&switch.json_path))
            .map_err(|source| NetworkError::MissingInput {
                switch: switch.name.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Build and start the network described by `topology`.
///
/// The topology must already have passed [`crate::topology::validate_topology`].
pub fn build_network<S: Substrate>(
    topology: &TopologySpec,
    settings: &Settings,
    substrate: S,
) -> Result<LiveNetwork<S>, NetworkError> {
    check_switch_inputs(topology)?;

    let links = plan_links(topology);

    // From here on a failure drops `network`, which tears down whatever the
    // substrate already created.
    let mut network = LiveNetwork {
        substrate,
        topology: topology.clone(),
        links,
        stopped: false,
    };

    for host in topology.hosts() {
        debug!("Adding host {}", host.name);
        network.substrate.add_host(&host)?;
    }

    for plan in &network.links {
        debug!("Adding link {} ({} <-> {})", plan.link, plan.a.name, plan.b.name);
        network.substrate.add_link(plan, &settings.link)?;
    }

    for switch in &topology.switches {
        let interfaces: Vec<Interface> = interfaces_of(&network.links, &switch.name)
            .into_iter()
            .cloned()
            .collect();
        debug!(
            "Adding switch {} (device id {}, thrift port {}, {} ports)",
            switch.name,
            switch.device_id,
            switch.thrift_port,
            interfaces.len()
        );
        network.substrate.add_switch(switch, &interfaces)?;
    }

    info!(
        "Starting network: {} hosts, {} switches, {} links",
        topology.host_count,
        topology.switches.len(),
        network.links.len()
    );
    network.substrate.start()?;

    if !settings.startup_grace.is_zero() {
        thread::sleep(settings.startup_grace);
    }
    for switch in &topology.switches {
        network.substrate.check_switch(&switch.name)?;
    }

    Ok(network)
}
