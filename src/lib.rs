//! # switchnet - bring-up orchestrator for software-switch test networks
//!
//! This library builds a small virtual network of software switches and
//! hosts, wires it into a fixed topology, configures every switch's control
//! plane through an external CLI, and hands the live network to an
//! interactive session.
//!
//! ## Overview
//!
//! The reference topology is a chain of three switches between two hosts:
//!
//! ```text
//! h1 -- s1 (edge) -- s2 (aggregate) -- s3 (edge) -- h2
//! ```
//!
//! Switch `i` gets device id `i` and management (thrift) port `22222 + i`.
//! Once the network is live, hosts are tuned, then each switch in turn is
//! probed for readiness and fed the shared command script on stdin.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: Run settings with defaults and validation
//! - `config_loader`: Optional YAML settings file
//! - `topology`: Topology description, interface planning, validation
//! - `registry`: Switch device ids and management ports
//! - `network`: Network builder and the `Substrate` seam (netns/veth adapter)
//! - `tuning`: Host network stack adjustments
//! - `bringup`: Readiness probing, control client and the bring-up sequencer
//! - `session`: Interactive session handoff
//! - `orchestrator`: One complete run, from settings to teardown
//! - `utils`: Subprocess execution and path validation helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use switchnet::bringup::{CliClient, TcpProbe};
//! use switchnet::network::NetnsSubstrate;
//! use switchnet::session::InteractiveShell;
//! use switchnet::topology::SwitchPaths;
//! use switchnet::{config_loader, orchestrator};
//!
//! let settings = config_loader::load_settings_from_env()?;
//! let paths = SwitchPaths {
//!     behavioral_exe: "/usr/local/bin/simple_switch".into(),
//!     edge_json: "edge.json".into(),
//!     aggregate_json: "aggregate.json".into(),
//! };
//!
//! let report = orchestrator::run(
//!     &paths,
//!     &settings,
//!     NetnsSubstrate::new(&settings.runtime_dir),
//!     CliClient::new("/usr/local/bin/runtime_CLI"),
//!     TcpProbe,
//!     &mut InteractiveShell::stdio(),
//! )?;
//! println!("{} switches processed", report.results.len());
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Each module has its own `thiserror` error type. The orchestrator and the
//! binary wrap them with `color_eyre` context. Per-switch and per-host
//! failures are not errors: they are logged and returned in the run report.

pub mod config;
pub mod config_loader;
pub mod topology;
pub mod registry;
pub mod network;
pub mod tuning;
pub mod bringup;
pub mod session;
pub mod orchestrator;
pub mod utils;
