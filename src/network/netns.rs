//! Linux network-namespace substrate.
//!
//! Hosts are network namespaces, links are veth pairs, switches are child
//! processes in the root namespace bound to their veth ends:
//!
//! ```text
//!  netns h1            root namespace                 netns h2
//! +---------+        +---------------------+        +---------+
//! | h1-eth0 |--veth--| s1-eth1  [s1] s1-eth2|--...--| h2-eth0 |
//! +---------+        +---------------------+        +---------+
//! ```
//!
//! Everything goes through the `ip` and `tc` tools, so the process needs
//! CAP_NET_ADMIN (in practice: root).

use crate::config::LinkParams;
use crate::network::{NetworkError, Substrate};
use crate::topology::{HostSpec, Interface, LinkPlan, NodeKind, SwitchSpec};
use crate::utils::exec::{Cmd, ExecResult};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// `ip` tool used for namespaces, veth pairs and interface state
pub const IP_CMD: &str = "ip";

/// `tc` tool used for link characteristics
pub const TC_CMD: &str = "tc";

/// A switch registered with the substrate, and its process once started
struct SwitchProcess {
    spec: SwitchSpec,
    interfaces: Vec<Interface>,
    log: PathBuf,
    child: Option<Child>,
}

/// Substrate backed by network namespaces and veth pairs
pub struct NetnsSubstrate {
    runtime_dir: PathBuf,
    /// Namespaces created so far, in creation order
    namespaces: Vec<String>,
    /// Root-namespace veth ends; deleting one removes the pair
    root_links: Vec<String>,
    hosts: Vec<HostSpec>,
    /// Switches in declaration order
    switches: Vec<SwitchProcess>,
}

impl NetnsSubstrate {
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            namespaces: Vec::new(),
            root_links: Vec::new(),
            hosts: Vec::new(),
            switches: Vec::new(),
        }
    }

    /// Prefix a command so it runs inside `namespace`, or as-is for the root namespace
    fn in_namespace(namespace: Option<&str>, program: &str) -> Cmd {
        match namespace {
            Some(ns) => Cmd::new(IP_CMD).args_from(["netns", "exec", ns, program]),
            None => Cmd::new(program),
        }
    }

    /// Bring an interface up where it lives. Host interfaces are moved into
    /// their namespace first; a host's port 0 also gets its MAC and address.
    fn attach(&self, interface: &Interface) -> Result<(), NetworkError> {
        match interface.kind {
            NodeKind::Host => {
                run(Cmd::new(IP_CMD).args_from(["link", "set", &interface.name, "netns", &interface.node]))?;
                if interface.port == NodeKind::Host.first_port() {
                    if let Some(host) = self.hosts.iter().find(|h| h.name == interface.node) {
                        for cmd in host_address_cmds(host, &interface.name) {
                            run(cmd)?;
                        }
                    }
                }
                run(Self::in_namespace(Some(&interface.node), IP_CMD).args_from([
                    "link",
                    "set",
                    &interface.name,
                    "up",
                ]))?;
            }
            NodeKind::Switch => {
                run(Cmd::new(IP_CMD).args_from(["link", "set", &interface.name, "up"]))?;
            }
        }
        Ok(())
    }

    fn shape(interface: &Interface, params: &LinkParams) -> Result<(), NetworkError> {
        let namespace = match interface.kind {
            NodeKind::Host => Some(interface.node.as_str()),
            NodeKind::Switch => None,
        };
        run(Self::in_namespace(namespace, TC_CMD)
            .args_from(["qdisc", "add", "dev", &interface.name, "root"])
            .args_from(netem_args(params)))?;
        Ok(())
    }
}

/// Run a command and turn a non-zero exit into [`NetworkError::CommandFailed`]
fn run(cmd: Cmd) -> Result<ExecResult, NetworkError> {
    debug!("{}", cmd);
    let result = cmd.output()?;
    if !result.success() {
        return Err(NetworkError::CommandFailed {
            command: cmd.to_string(),
            output: result.combined_output().trim().to_string(),
        });
    }
    Ok(result)
}

/// Commands that set a host's MAC and address on `interface`
pub fn host_address_cmds(host: &HostSpec, interface: &str) -> Vec<Cmd> {
    vec![
        NetnsSubstrate::in_namespace(Some(&host.name), IP_CMD)
            .args_from(["link", "set", "dev", interface, "address", &host.mac]),
        NetnsSubstrate::in_namespace(Some(&host.name), IP_CMD)
            .args_from(["addr", "add", &host.cidr(), "dev", interface]),
    ]
}

/// `netem` arguments for the given link characteristics
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use switchnet::config::LinkParams;
/// use switchnet::network::netns::netem_args;
///
/// let params = LinkParams {
///     delay: Some(Duration::from_millis(5)),
///     loss_percent: Some(1.0),
///     ..LinkParams::default()
/// };
/// assert_eq!(netem_args(&params), vec!["netem", "delay", "5000us", "loss", "1%"]);
/// ```
pub fn netem_args(params: &LinkParams) -> Vec<String> {
    let mut args = vec!["netem".to_string()];
    if let Some(delay) = params.delay {
        args.push("delay".to_string());
        args.push(format!("{}us", delay.as_micros()));
        if let Some(jitter) = params.jitter {
            args.push(format!("{}us", jitter.as_micros()));
        }
    }
    if let Some(loss) = params.loss_percent {
        args.push("loss".to_string());
        args.push(format!("{}%", loss));
    }
    if let Some(rate) = params.bandwidth_mbit {
        args.push("rate".to_string());
        args.push(format!("{}mbit", rate));
    }
    args
}

/// Command line of a switch process
///
/// `<exe> -i <port>@<iface>... [--pcap <dir>] --thrift-port <port> --device-id <id> <json>`
pub fn switch_args(switch: &SwitchSpec, interfaces: &[Interface], pcap_dir: &Path) -> Vec<String> {
    let mut args = Vec::new();
    for interface in interfaces {
        args.push("-i".to_string());
        args.push(format!("{}@{}", interface.port, interface.name));
    }
    if switch.pcap_dump {
        args.push("--pcap".to_string());
        args.push(pcap_dir.display().to_string());
    }
    args.push("--thrift-port".to_string());
    args.push(switch.thrift_port.to_string());
    args.push("--device-id".to_string());
    args.push(switch.device_id.to_string());
    args.push(switch.json_path.display().to_string());
    args
}

impl Substrate for NetnsSubstrate {
    fn add_host(&mut self, host: &HostSpec) -> Result<(), NetworkError> {
        run(Cmd::new(IP_CMD).args_from(["netns", "add", &host.name]))?;
        self.namespaces.push(host.name.clone());
        self.hosts.push(host.clone());
        run(Self::in_namespace(Some(&host.name), IP_CMD).args_from(["link", "set", "lo", "up"]))?;
        Ok(())
    }

    fn add_link(&mut self, plan: &LinkPlan, params: &LinkParams) -> Result<(), NetworkError> {
        run(Cmd::new(IP_CMD).args_from([
            "link", "add", &plan.a.name, "type", "veth", "peer", "name", &plan.b.name,
        ]))?;

        // Host-to-host links disappear with their namespaces; anything else
        // keeps one end in the root namespace that must be deleted on stop.
        if let Some(root_end) = [&plan.a, &plan.b].into_iter().find(|i| i.kind == NodeKind::Switch) {
            self.root_links.push(root_end.name.clone());
        }

        self.attach(&plan.a)?;
        self.attach(&plan.b)?;

        if !params.is_unconstrained() {
            Self::shape(&plan.a, params)?;
            Self::shape(&plan.b, params)?;
        }
        Ok(())
    }

    fn add_switch(&mut self, switch: &SwitchSpec, interfaces: &[Interface]) -> Result<(), NetworkError> {
        let log = self.runtime_dir.join(format!("{}.log", switch.name));
        self.switches.push(SwitchProcess {
            spec: switch.clone(),
            interfaces: interfaces.to_vec(),
            log,
            child: None,
        });
        Ok(())
    }

    fn start(&mut self) -> Result<(), NetworkError> {
        fs::create_dir_all(&self.runtime_dir).map_err(|source| NetworkError::RuntimeDir {
            path: self.runtime_dir.clone(),
            source,
        })?;

        for switch in self.switches.iter_mut() {
            let name = &switch.spec.name;
            let log = File::create(&switch.log).map_err(|source| NetworkError::RuntimeDir {
                path: switch.log.clone(),
                source,
            })?;
            let log_err = log.try_clone().map_err(|source| NetworkError::RuntimeDir {
                path: switch.log.clone(),
                source,
            })?;

            let args = switch_args(&switch.spec, &switch.interfaces, &self.runtime_dir);
            info!("Starting switch {}: {} {}", name, switch.spec.sw_path.display(), args.join(" "));

            let child = Command::new(&switch.spec.sw_path)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::from(log))
                .stderr(Stdio::from(log_err))
                .spawn()
                .map_err(|source| NetworkError::Spawn {
                    switch: name.clone(),
                    source,
                })?;
            switch.child = Some(child);
        }
        Ok(())
    }

    fn check_switch(&mut self, name: &str) -> Result<(), NetworkError> {
        let switch = self
            .switches
            .iter_mut()
            .find(|s| s.spec.name == name)
            .ok_or_else(|| NetworkError::UnknownNode(name.to_string()))?;
        let Some(child) = switch.child.as_mut() else {
            return Err(NetworkError::SwitchExited {
                switch: name.to_string(),
                status: "never started".to_string(),
                log: switch.log.clone(),
            });
        };

        match child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => Err(NetworkError::SwitchExited {
                switch: name.to_string(),
                status: status.to_string(),
                log: switch.log.clone(),
            }),
            Err(source) => Err(NetworkError::Health {
                switch: name.to_string(),
                source,
            }),
        }
    }

    fn host_cmd(&mut self, host: &str, command: &str) -> Result<ExecResult, NetworkError> {
        if !self.namespaces.iter().any(|ns| ns == host) {
            return Err(NetworkError::UnknownNode(host.to_string()));
        }
        Ok(Self::in_namespace(Some(host), "sh").args_from(["-c", command]).output()?)
    }

    fn stop(&mut self) {
        for switch in self.switches.iter_mut() {
            let name = &switch.spec.name;
            if let Some(mut child) = switch.child.take() {
                debug!("Stopping switch {}", name);
                if let Err(e) = child.kill() {
                    debug!("kill {}: {}", name, e);
                }
                if let Err(e) = child.wait() {
                    warn!("Failed to reap switch {}: {}", name, e);
                }
            }
        }

        for link in self.root_links.drain(..) {
            if let Err(e) = run(Cmd::new(IP_CMD).args_from(["link", "del", &link])) {
                debug!("Removing link {}: {}", link, e);
            }
        }

        for ns in self.namespaces.drain(..).rev() {
            if let Err(e) = run(Cmd::new(IP_CMD).args_from(["netns", "del", &ns])) {
                warn!("Failed to remove namespace {}: {}", ns, e);
            }
        }
    }
}
