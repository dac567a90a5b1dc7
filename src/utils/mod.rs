//! Shared utilities: subprocess execution, path and name validation.

pub mod binary;
pub mod exec;
pub mod validation;

pub use binary::{validate_binary, validate_file, BinaryError};
pub use exec::{Cmd, ExecError, ExecResult};
pub use validation::validate_node_name;
