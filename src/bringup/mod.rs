//! Switch bring-up.
//!
//! This module moves each switch from running-but-unconfigured to configured
//! by replaying the shared command script through the control-plane client.

pub mod types;
pub mod script;
pub mod readiness;
pub mod client;
pub mod sequencer;

// Re-export commonly used types
pub use types::{BringUpOutcome, BringUpResult, FailureReason, SwitchState, SwitchTarget};
pub use script::{CommandScript, ScriptError};
pub use readiness::{wait_for_endpoint, Readiness, ReadinessProbe, TcpProbe};
pub use client::{CliClient, ControlClient};
pub use sequencer::Sequencer;
