//! Switch bring-up sequencer.
//!
//! Switches are configured one at a time, in declaration order. For each:
//!
//! 1. `Pending -> Configuring`
//! 2. settle for `readiness.settle`
//! 3. probe the management endpoint with backoff
//! 4. replay the whole command script through the control client
//! 5. `Configuring -> Configured | Failed`, logged inline
//!
//! A failed switch never stops the sequence. Running the sequencer again
//! replays the script to every switch from the start.

use crate::bringup::client::ControlClient;
use crate::bringup::readiness::{wait_for_endpoint, Readiness, ReadinessProbe};
use crate::bringup::script::CommandScript;
use crate::bringup::types::{BringUpOutcome, BringUpResult, FailureReason, SwitchState, SwitchTarget};
use crate::config::ReadinessConfig;
use crate::topology::SwitchSpec;
use log::{debug, error, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::thread;

pub struct Sequencer<'a, C: ControlClient, P: ReadinessProbe> {
    client: C,
    probe: P,
    readiness: &'a ReadinessConfig,
    management_host: IpAddr,
    script: &'a CommandScript,
    states: Vec<(String, SwitchState)>,
}

impl<'a, C: ControlClient, P: ReadinessProbe> Sequencer<'a, C, P> {
    pub fn new(
        client: C,
        probe: P,
        readiness: &'a ReadinessConfig,
        management_host: IpAddr,
        script: &'a CommandScript,
    ) -> Self {
        Self {
            client,
            probe,
            readiness,
            management_host,
            script,
            states: Vec::new(),
        }
    }

    /// State of every switch from the most recent run, in declaration order
    pub fn states(&self) -> &[(String, SwitchState)] {
        &self.states
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn advance(&mut self, index: usize, next: SwitchState) {
        let (name, state) = &mut self.states[index];
        debug_assert!(state.can_advance_to(next), "{}: {} -> {}", name, state, next);
        debug!("{}: {} -> {}", name, state, next);
        *state = next;
    }

    /// Configure every switch in order and return one result per switch
    pub fn run(&mut self, switches: &[SwitchSpec]) -> Vec<BringUpResult> {
        self.states = switches
            .iter()
            .map(|s| (s.name.clone(), SwitchState::Pending))
            .collect();

        info!(
            "Bringing up {} switches with {} commands from {:?}",
            switches.len(),
            self.script.command_count(),
            self.script.source()
        );

        let mut results = Vec::with_capacity(switches.len());
        for (index, switch) in switches.iter().enumerate() {
            self.advance(index, SwitchState::Configuring);

            if !self.readiness.settle.is_zero() {
                thread::sleep(self.readiness.settle);
            }

            let target = SwitchTarget::from(switch);
            let outcome = self.configure(&target);
            self.advance(index, outcome.state());
            report(&target, &outcome);

            results.push(BringUpResult {
                switch: target.name,
                thrift_port: target.thrift_port,
                outcome,
            });
        }
        results
    }

    fn configure(&self, target: &SwitchTarget) -> BringUpOutcome {
        let addr = SocketAddr::new(self.management_host, target.thrift_port);
        match wait_for_endpoint(&self.probe, addr, self.readiness) {
            Readiness::Ready { attempts } => {
                debug!("{} reachable at {} after {} probe(s)", target.name, addr, attempts);
            }
            Readiness::NotReady { attempts } => {
                return BringUpOutcome::Failed(FailureReason::NotReady { attempts });
            }
        }

        info!("{}", self.client.describe(target));
        match self.client.configure(target, self.script) {
            Ok(result) if result.success() => BringUpOutcome::Configured { stdout: result.stdout },
            Ok(result) => BringUpOutcome::Failed(FailureReason::ClientExited {
                code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            }),
            Err(e) => BringUpOutcome::Failed(FailureReason::ClientUnavailable { message: e.to_string() }),
        }
    }
}

/// Print an outcome to the console transcript
fn report(target: &SwitchTarget, outcome: &BringUpOutcome) {
    match outcome {
        BringUpOutcome::Configured { stdout } => {
            info!("{} configured (thrift port {})", target.name, target.thrift_port);
            for line in stdout.lines() {
                info!("  {}", line);
            }
        }
        BringUpOutcome::Failed(reason) => {
            error!("{} failed: {}", target.name, reason);
            if let FailureReason::ClientExited { stdout, stderr, .. } = reason {
                for line in stdout.lines().chain(stderr.lines()) {
                    warn!("  {}", line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::SwitchRole;
    use crate::utils::exec::{ExecError, ExecResult};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::io;
    use std::net::Ipv4Addr;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Client that records calls and fails on chosen ports
    #[derive(Default)]
    struct FakeClient {
        calls: RefCell<Vec<(String, Vec<u8>)>>,
        exit_nonzero: HashSet<u16>,
        unavailable: HashSet<u16>,
    }

    impl ControlClient for FakeClient {
        fn describe(&self, target: &SwitchTarget) -> String {
            format!("fake --thrift-port {}", target.thrift_port)
        }

        fn configure(&self, target: &SwitchTarget, script: &CommandScript) -> Result<ExecResult, ExecError> {
            self.calls.borrow_mut().push((target.name.clone(), script.as_bytes().to_vec()));
            if self.unavailable.contains(&target.thrift_port) {
                return Err(ExecError::Spawn {
                    command: self.describe(target),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            let failed = self.exit_nonzero.contains(&target.thrift_port);
            Ok(ExecResult {
                exit_code: Some(if failed { 1 } else { 0 }),
                stdout: format!("configured {}\n", target.name),
                stderr: if failed { "Could not connect".to_string() } else { String::new() },
            })
        }
    }

    /// Probe that reports chosen ports as permanently unreachable
    struct PortProbe {
        down: HashSet<u16>,
    }

    impl ReadinessProbe for PortProbe {
        fn probe(&self, addr: SocketAddr, _timeout: Duration) -> bool {
            !self.down.contains(&addr.port())
        }
    }

    fn up() -> PortProbe {
        PortProbe { down: HashSet::new() }
    }

    fn readiness() -> ReadinessConfig {
        ReadinessConfig {
            settle: Duration::ZERO,
            connect_timeout: Duration::from_millis(10),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            max_attempts: 3,
        }
    }

    fn switches() -> Vec<SwitchSpec> {
        (1..=3)
            .map(|i| SwitchSpec {
                name: format!("s{}", i),
                sw_path: PathBuf::from("simple_switch"),
                json_path: PathBuf::from(if i == 2 { "agg.json" } else { "edge.json" }),
                thrift_port: 22222 + i as u16,
                device_id: i,
                pcap_dump: true,
                role: if i == 2 { SwitchRole::Aggregate } else { SwitchRole::Edge },
            })
            .collect()
    }

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn test_switches_visited_in_declared_order() {
        let script = CommandScript::from_text("commands.txt", "table_add a b\n");
        let readiness = readiness();
        let mut sequencer = Sequencer::new(FakeClient::default(), up(), &readiness, localhost(), &script);

        let results = sequencer.run(&switches());

        let order: Vec<String> = sequencer.client().calls.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(order, vec!["s1", "s2", "s3"]);
        assert!(results.iter().all(|r| r.is_configured()));
        assert_eq!(
            results.iter().map(|r| r.thrift_port).collect::<Vec<_>>(),
            vec![22223, 22224, 22225]
        );
        assert!(sequencer.states().iter().all(|(_, s)| *s == SwitchState::Configured));
    }

    #[test]
    fn test_failure_does_not_stop_sequence() {
        let script = CommandScript::from_text("commands.txt", "table_add a b\n");
        let readiness = readiness();
        let client = FakeClient {
            exit_nonzero: HashSet::from([22224]),
            ..FakeClient::default()
        };
        let mut sequencer = Sequencer::new(client, up(), &readiness, localhost(), &script);

        let results = sequencer.run(&switches());

        assert_eq!(sequencer.client().calls.borrow().len(), 3);
        assert!(results[0].is_configured());
        assert_eq!(
            results[1].outcome,
            BringUpOutcome::Failed(FailureReason::ClientExited {
                code: Some(1),
                stdout: "configured s2\n".to_string(),
                stderr: "Could not connect".to_string(),
            })
        );
        assert!(results[2].is_configured());
        let states: Vec<SwitchState> = sequencer.states().iter().map(|(_, s)| *s).collect();
        assert_eq!(states, vec![SwitchState::Configured, SwitchState::Failed, SwitchState::Configured]);
    }

    #[test]
    fn test_unavailable_client_is_recorded() {
        let script = CommandScript::from_text("commands.txt", "");
        let readiness = readiness();
        let client = FakeClient {
            unavailable: HashSet::from([22223]),
            ..FakeClient::default()
        };
        let mut sequencer = Sequencer::new(client, up(), &readiness, localhost(), &script);

        let results = sequencer.run(&switches());
        assert!(matches!(
            results[0].outcome,
            BringUpOutcome::Failed(FailureReason::ClientUnavailable { .. })
        ));
        assert!(results[1].is_configured() && results[2].is_configured());
    }

    #[test]
    fn test_unreachable_switch_skips_client() {
        let script = CommandScript::from_text("commands.txt", "table_add a b\n");
        let readiness = readiness();
        let probe = PortProbe {
            down: HashSet::from([22225]),
        };
        let mut sequencer = Sequencer::new(FakeClient::default(), probe, &readiness, localhost(), &script);

        let results = sequencer.run(&switches());

        let order: Vec<String> = sequencer.client().calls.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(order, vec!["s1", "s2"]);
        assert_eq!(
            results[2].outcome,
            BringUpOutcome::Failed(FailureReason::NotReady { attempts: 3 })
        );
    }

    #[test]
    fn test_rerun_replays_full_script() {
        let text = "table_set_default t _drop\ntable_add t fwd 1 => 2\n";
        let script = CommandScript::from_text("commands.txt", text);
        let readiness = readiness();
        let mut sequencer = Sequencer::new(FakeClient::default(), up(), &readiness, localhost(), &script);

        let first = sequencer.run(&switches());
        let second = sequencer.run(&switches());

        assert_eq!(first, second);
        let calls = sequencer.client().calls.borrow();
        assert_eq!(calls.len(), 6);
        assert!(calls.iter().all(|(_, input)| input == text.as_bytes()));
        assert!(sequencer.states().iter().all(|(_, s)| s.is_terminal()));
    }
}
