//! Bring-up orchestrator.
//!
//! This module drives one complete run, from settings to teardown:
//!
//! 1. validate settings and build the reference topology
//! 2. assign switch identities and write the registry
//! 3. load the command script
//! 4. build and start the network
//! 5. tune every host
//! 6. configure every switch, one at a time
//! 7. hand the network to the interactive session
//! 8. tear the network down
//!
//! Steps 1-4 are fatal on error. Tuning and per-switch failures are logged
//! and recorded in the returned [`RunReport`].

use crate::bringup::{BringUpResult, CommandScript, ControlClient, ReadinessProbe, Sequencer};
use crate::config::Settings;
use crate::network::{build_network, Substrate};
use crate::registry::{write_registry, SwitchRegistry};
use crate::session::Session;
use crate::topology::{reference_topology, validate_topology, SwitchPaths};
use crate::tuning::{tune_hosts, TuningFailure};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::path::PathBuf;

/// What happened during a run that reached the session
#[derive(Debug)]
pub struct RunReport {
    pub registry_path: PathBuf,
    pub tuning_failures: Vec<TuningFailure>,
    pub results: Vec<BringUpResult>,
}

/// Run the whole bring-up against the given substrate, client, probe and session.
///
/// # Arguments
///
/// * `paths` - Switch executable and forwarding configs from the command line
/// * `settings` - Run settings
/// * `substrate` - Realizes hosts, links and switch processes
/// * `client` - Control-plane client used to configure each switch
/// * `probe` - Readiness probe for management endpoints
/// * `session` - Front end that owns the network until the operator is done
///
/// # Returns
///
/// The run report once the session has ended and the network is torn down.
/// A session error is returned after teardown.
pub fn run<S, C, P, X>(
    paths: &SwitchPaths,
    settings: &Settings,
    substrate: S,
    client: C,
    probe: P,
    session: &mut X,
) -> Result<RunReport>
where
    S: Substrate,
    C: ControlClient,
    P: ReadinessProbe,
    X: Session,
{
    settings.validate().wrap_err("Invalid settings")?;

    let topology = reference_topology(paths, settings).wrap_err("Failed to assign switch identities")?;
    validate_topology(&topology).wrap_err("Invalid topology")?;

    let registry = SwitchRegistry::from_topology(&topology, settings.base_port)
        .wrap_err("Failed to build switch registry")?;
    let registry_path = write_registry(&registry, &settings.runtime_dir)?;

    let script = CommandScript::load(&settings.commands_path)?;

    let mut network = build_network(&topology, settings, substrate).wrap_err("Failed to build network")?;
    info!("Network is up");

    let tuning_failures = tune_hosts(&mut network, &settings.tuning);
    if !tuning_failures.is_empty() {
        warn!("{} host tuning command(s) failed", tuning_failures.len());
    }

    let mut sequencer = Sequencer::new(client, probe, &settings.readiness, settings.management_host, &script);
    let results = sequencer.run(&topology.switches);

    info!("Ready !");
    let session_result = session.interact(&mut network);

    network.stop();
    session_result.wrap_err("Interactive session failed")?;

    Ok(RunReport {
        registry_path,
        tuning_failures,
        results,
    })
}
