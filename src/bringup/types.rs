//! Bring-up type definitions.

use crate::topology::SwitchSpec;
use std::fmt;
use std::path::PathBuf;

/// Per-switch bring-up state.
///
/// ```text
/// Pending -> Configuring -> Configured
///                        \-> Failed
/// ```
///
/// `Configured` and `Failed` are terminal; there is no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Pending,
    Configuring,
    Configured,
    Failed,
}

impl SwitchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwitchState::Configured | SwitchState::Failed)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(&self, next: SwitchState) -> bool {
        matches!(
            (self, next),
            (SwitchState::Pending, SwitchState::Configuring)
                | (SwitchState::Configuring, SwitchState::Configured)
                | (SwitchState::Configuring, SwitchState::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchState::Pending => "pending",
            SwitchState::Configuring => "configuring",
            SwitchState::Configured => "configured",
            SwitchState::Failed => "failed",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the control-plane client needs to reach one switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTarget {
    pub name: String,
    pub json_path: PathBuf,
    pub thrift_port: u16,
}

impl From<&SwitchSpec> for SwitchTarget {
    fn from(spec: &SwitchSpec) -> Self {
        Self {
            name: spec.name.clone(),
            json_path: spec.json_path.clone(),
            thrift_port: spec.thrift_port,
        }
    }
}

/// Why a switch ended up `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The management endpoint never accepted a connection
    NotReady { attempts: u32 },
    /// The client could not be run at all (missing binary, permissions)
    ClientUnavailable { message: String },
    /// The client ran and exited non-zero (or was killed: `code` is `None`)
    ClientExited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotReady { attempts } => {
                write!(f, "management endpoint not reachable after {} attempts", attempts)
            }
            FailureReason::ClientUnavailable { message } => write!(f, "control client unavailable: {}", message),
            FailureReason::ClientExited { code: Some(code), .. } => write!(f, "control client exited with status {}", code),
            FailureReason::ClientExited { code: None, .. } => write!(f, "control client terminated by signal"),
        }
    }
}

/// Outcome of one bring-up attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BringUpOutcome {
    Configured { stdout: String },
    Failed(FailureReason),
}

impl BringUpOutcome {
    /// Terminal state this outcome leaves the switch in
    pub fn state(&self) -> SwitchState {
        match self {
            BringUpOutcome::Configured { .. } => SwitchState::Configured,
            BringUpOutcome::Failed(_) => SwitchState::Failed,
        }
    }
}

/// Recorded outcome for one switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpResult {
    pub switch: String,
    pub thrift_port: u16,
    pub outcome: BringUpOutcome,
}

impl BringUpResult {
    pub fn is_configured(&self) -> bool {
        matches!(self.outcome, BringUpOutcome::Configured { .. })
    }
}
