//! Control-plane client invocation.

use crate::bringup::script::CommandScript;
use crate::bringup::types::SwitchTarget;
use crate::utils::exec::{Cmd, ExecError, ExecResult};
use std::path::PathBuf;

/// Applies a command script to one switch's management endpoint
pub trait ControlClient {
    /// Human-readable command line, logged before each attempt
    fn describe(&self, target: &SwitchTarget) -> String;

    /// Run the client to completion. `Err` means the client could not be run
    /// at all; a non-zero exit is reported through the returned result.
    fn configure(&self, target: &SwitchTarget, script: &CommandScript) -> Result<ExecResult, ExecError>;
}

/// The external CLI, invoked as `<cli> --json <config> --thrift-port <port>`
/// with the script on stdin
#[derive(Debug, Clone)]
pub struct CliClient {
    cli_path: PathBuf,
}

impl CliClient {
    pub fn new(cli_path: impl Into<PathBuf>) -> Self {
        Self {
            cli_path: cli_path.into(),
        }
    }

    pub fn command(&self, target: &SwitchTarget) -> Cmd {
        Cmd::new(&self.cli_path)
            .arg("--json")
            .arg(&target.json_path)
            .arg("--thrift-port")
            .arg(target.thrift_port.to_string())
    }
}

impl ControlClient for CliClient {
    fn describe(&self, target: &SwitchTarget) -> String {
        self.command(target).to_string()
    }

    fn configure(&self, target: &SwitchTarget, script: &CommandScript) -> Result<ExecResult, ExecError> {
        self.command(target).input(script.as_bytes()).output()
    }
}
