//! End-to-end bring-up scenarios against a recording substrate and a real
//! control client script.

use std::cell::RefCell;
use std::fs;
use std::io::Cursor;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use switchnet::bringup::{BringUpOutcome, CliClient, FailureReason, ReadinessProbe};
use switchnet::config::{LinkParams, Settings};
use switchnet::network::{NetworkError, Substrate};
use switchnet::orchestrator;
use switchnet::registry::SwitchRegistry;
use switchnet::session::InteractiveShell;
use switchnet::topology::{HostSpec, Interface, LinkPlan, SwitchPaths, SwitchSpec};
use switchnet::utils::exec::ExecResult;
use tempfile::TempDir;

const COMMANDS: &str = "\
table_set_default mtag_tbl _drop
table_add mtag_tbl add_mtag 1 => 2
";

/// Substrate that only records what it was asked to do
#[derive(Clone, Default)]
struct Recorder {
    events: Rc<RefCell<Vec<String>>>,
    stops: Rc<RefCell<usize>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl Substrate for Recorder {
    fn add_host(&mut self, host: &HostSpec) -> Result<(), NetworkError> {
        self.push(format!("host {}", host.name));
        Ok(())
    }

    fn add_link(&mut self, plan: &LinkPlan, _params: &LinkParams) -> Result<(), NetworkError> {
        self.push(format!("link {}-{}", plan.a.name, plan.b.name));
        Ok(())
    }

    fn add_switch(&mut self, switch: &SwitchSpec, _interfaces: &[Interface]) -> Result<(), NetworkError> {
        self.push(format!("switch {} {}", switch.name, switch.thrift_port));
        Ok(())
    }

    fn start(&mut self) -> Result<(), NetworkError> {
        self.push("start".to_string());
        Ok(())
    }

    fn check_switch(&mut self, _switch: &str) -> Result<(), NetworkError> {
        Ok(())
    }

    fn host_cmd(&mut self, host: &str, command: &str) -> Result<ExecResult, NetworkError> {
        self.push(format!("cmd {} {}", host, command));
        Ok(ExecResult {
            exit_code: Some(0),
            stdout: format!("{} done\n", host),
            stderr: String::new(),
        })
    }

    fn stop(&mut self) {
        *self.stops.borrow_mut() += 1;
    }
}

struct Reachable;

impl ReadinessProbe for Reachable {
    fn probe(&self, _addr: SocketAddr, _timeout: Duration) -> bool {
        true
    }
}

struct Scenario {
    dir: TempDir,
    paths: SwitchPaths,
    settings: Settings,
    cli: PathBuf,
    cli_log: PathBuf,
}

fn write_executable(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A control client that logs its arguments and stdin, and fails for one port
fn scenario(failing_port: u16) -> Scenario {
    let dir = TempDir::new().unwrap();
    let exe = dir.path().join("simple_switch");
    write_executable(&exe, "#!/bin/sh\nexit 0\n");

    let edge = dir.path().join("edge.json");
    let aggregate = dir.path().join("aggregate.json");
    fs::write(&edge, "{\"program\": \"edge\"}").unwrap();
    fs::write(&aggregate, "{\"program\": \"aggregate\"}").unwrap();

    let commands = dir.path().join("commands.txt");
    fs::write(&commands, COMMANDS).unwrap();

    let cli_log = dir.path().join("cli.log");
    let cli = dir.path().join("runtime_CLI");
    write_executable(
        &cli,
        &format!(
            "#!/bin/sh\n\
             echo \"args $*\" >> {log}\n\
             cat >> {log}\n\
             if [ \"$4\" = \"{port}\" ]; then echo 'Could not connect to thrift client' >&2; exit 1; fi\n\
             echo 'RuntimeCmd: success'\n",
            log = cli_log.display(),
            port = failing_port
        ),
    );

    let mut settings = Settings::default();
    settings.commands_path = commands;
    settings.runtime_dir = dir.path().join("run");
    settings.startup_grace = Duration::ZERO;
    settings.readiness.settle = Duration::from_millis(10);

    Scenario {
        paths: SwitchPaths {
            behavioral_exe: exe,
            edge_json: edge,
            aggregate_json: aggregate,
        },
        settings,
        cli,
        cli_log,
        dir,
    }
}

#[test]
fn test_reference_bringup_with_failing_aggregate() {
    let s = scenario(22224);
    let substrate = Recorder::default();
    let mut shell = InteractiveShell::new(Cursor::new("nodes\nh1 ping -c 1 10.0.0.2\nexit\n"), Vec::new());

    let report = orchestrator::run(
        &s.paths,
        &s.settings,
        substrate.clone(),
        CliClient::new(&s.cli),
        Reachable,
        &mut shell,
    )
    .unwrap();

    // Switches are configured in declared order, each with the whole script
    let log = fs::read_to_string(&s.cli_log).unwrap();
    let edge = s.paths.edge_json.display().to_string();
    let aggregate = s.paths.aggregate_json.display().to_string();
    let expected = format!(
        "args --json {edge} --thrift-port 22223\n{COMMANDS}\
         args --json {aggregate} --thrift-port 22224\n{COMMANDS}\
         args --json {edge} --thrift-port 22225\n{COMMANDS}"
    );
    assert_eq!(log, expected);

    // The s2 failure is recorded and does not stop s3 or the handoff
    assert_eq!(report.results.len(), 3);
    assert!(report.results[0].is_configured());
    match &report.results[1].outcome {
        BringUpOutcome::Failed(FailureReason::ClientExited { code, stderr, .. }) => {
            assert_eq!(*code, Some(1));
            assert!(stderr.contains("Could not connect"));
        }
        other => panic!("unexpected outcome for s2: {:?}", other),
    }
    assert_eq!(
        report.results[2].outcome,
        BringUpOutcome::Configured {
            stdout: "RuntimeCmd: success\n".to_string()
        }
    );

    let output = String::from_utf8(shell.into_output()).unwrap();
    assert!(output.contains("h1 h2 s1 s2 s3"));
    assert!(output.contains("h1 done"));

    // Teardown happened exactly once, after the session
    assert_eq!(*substrate.stops.borrow(), 1);
    let events = substrate.events.borrow();
    assert_eq!(events.last().unwrap(), "cmd h1 ping -c 1 10.0.0.2");
}

#[test]
fn test_network_built_before_tuning() {
    let s = scenario(0);
    let substrate = Recorder::default();
    let mut shell = InteractiveShell::new(Cursor::new(""), Vec::new());

    let report = orchestrator::run(
        &s.paths,
        &s.settings,
        substrate.clone(),
        CliClient::new(&s.cli),
        Reachable,
        &mut shell,
    )
    .unwrap();
    assert!(report.results.iter().all(|r| r.is_configured()));

    let events = substrate.events.borrow();
    assert_eq!(
        &events[..9],
        &[
            "host h1",
            "host h2",
            "link h1-eth0-s1-eth1",
            "link s1-eth2-s2-eth1",
            "link s2-eth2-s3-eth1",
            "link s3-eth2-h2-eth0",
            "switch s1 22223",
            "switch s2 22224",
            "switch s3 22225",
        ]
    );
    assert_eq!(events[9], "start");
    // Eight tuning commands per host
    assert_eq!(events.iter().filter(|e| e.starts_with("cmd h1 ")).count(), 8);
    assert_eq!(events.iter().filter(|e| e.starts_with("cmd h2 ")).count(), 8);
    assert_eq!(*substrate.stops.borrow(), 1);
}

#[test]
fn test_registry_written_to_runtime_dir() {
    let s = scenario(0);
    let mut shell = InteractiveShell::new(Cursor::new("quit\n"), Vec::new());

    let report = orchestrator::run(
        &s.paths,
        &s.settings,
        Recorder::default(),
        CliClient::new(&s.cli),
        Reachable,
        &mut shell,
    )
    .unwrap();

    assert_eq!(report.registry_path, s.dir.path().join("run").join("switch_registry.json"));
    let registry: SwitchRegistry =
        serde_json::from_str(&fs::read_to_string(&report.registry_path).unwrap()).unwrap();
    assert_eq!(registry.base_port, 22222);
    let ports: Vec<(String, u32, u16)> = registry
        .switches
        .iter()
        .map(|s| (s.name.clone(), s.device_id, s.thrift_port))
        .collect();
    assert_eq!(
        ports,
        vec![
            ("s1".to_string(), 1, 22223),
            ("s2".to_string(), 2, 22224),
            ("s3".to_string(), 3, 22225),
        ]
    );
}

#[test]
fn test_missing_client_fails_every_switch() {
    let s = scenario(0);
    let substrate = Recorder::default();
    let mut shell = InteractiveShell::new(Cursor::new("exit\n"), Vec::new());

    let report = orchestrator::run(
        &s.paths,
        &s.settings,
        substrate.clone(),
        CliClient::new(s.dir.path().join("no_such_cli")),
        Reachable,
        &mut shell,
    )
    .unwrap();

    assert!(report.results.iter().all(|r| matches!(
        r.outcome,
        BringUpOutcome::Failed(FailureReason::ClientUnavailable { .. })
    )));
    assert_eq!(*substrate.stops.borrow(), 1);
}

#[test]
fn test_missing_forwarding_config_is_fatal() {
    let mut s = scenario(0);
    s.paths.aggregate_json = s.dir.path().join("missing.json");
    let substrate = Recorder::default();
    let mut shell = InteractiveShell::new(Cursor::new(""), Vec::new());

    let err = orchestrator::run(
        &s.paths,
        &s.settings,
        substrate.clone(),
        CliClient::new(&s.cli),
        Reachable,
        &mut shell,
    )
    .unwrap_err();

    assert!(format!("{:?}", err).contains("missing.json"));
    assert!(substrate.events.borrow().is_empty());
    assert!(!s.cli_log.exists());
}
