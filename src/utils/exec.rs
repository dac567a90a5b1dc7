//! Subprocess execution helpers.
//!
//! Every external tool the orchestrator touches (the `ip`/`tc` tools, host
//! tuning commands, the control-plane client) goes through [`Cmd`] so that
//! command lines are logged the same way and output is captured uniformly.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Write};
use std::iter::once;
use std::process::{Command, Output, Stdio};
use std::thread;

/// Errors raised while running a subprocess.
///
/// A non-zero exit status is not an error at this level; callers inspect
/// [`ExecResult::success`] and decide.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to collect output of '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to feed stdin of '{command}': {source}")]
    Stdin {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Result of a completed subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Returns stdout and stderr joined, for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    fn from_output(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A command line under construction.
#[derive(Debug, Clone)]
pub struct Cmd {
    exe: OsString,
    args: Vec<OsString>,
    input: Option<Vec<u8>>,
}

impl Cmd {
    pub fn new<S: Into<OsString>>(exe: S) -> Self {
        Self {
            exe: exe.into(),
            args: Vec::new(),
            input: None,
        }
    }

    pub fn exe(&self) -> &OsStr {
        &self.exe
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn arg<S: Into<OsString>>(mut self, a: S) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn args_from<I, S>(mut self, it: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(it.into_iter().map(Into::into));
        self
    }

    /// Bytes written to the child's stdin; stdin is closed afterwards.
    pub fn input(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.input = Some(bytes.into());
        self
    }

    /// Run to completion and capture stdout/stderr.
    ///
    /// Blocks until the child exits. No timeout is applied.
    pub fn output(&self) -> Result<ExecResult, ExecError> {
        let command = self.to_string();
        log::debug!("exec: {}", command);

        let mut cmd = Command::new(&self.exe);
        cmd.args(&self.args)
            .stdin(if self.input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: command.clone(),
            source,
        })?;

        // Feed stdin from a separate thread so a child that writes a lot
        // before draining its input cannot deadlock on a full pipe.
        let writer = match (self.input.clone(), child.stdin.take()) {
            (Some(input), Some(mut stdin)) => Some(thread::spawn(move || stdin.write_all(&input))),
            _ => None,
        };

        let output = child.wait_with_output().map_err(|source| ExecError::Wait {
            command: command.clone(),
            source,
        })?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child exited without reading everything; its exit
                // status already tells the story.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                    log::debug!("'{}' closed stdin early", command);
                }
                Ok(Err(source)) => return Err(ExecError::Stdin { command, source }),
                Err(_) => {
                    return Err(ExecError::Stdin {
                        command,
                        source: io::Error::new(io::ErrorKind::Other, "stdin writer panicked"),
                    })
                }
            }
        }

        Ok(ExecResult::from_output(output))
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = once(self.exe())
            .chain(self.args().iter().map(|s| &**s))
            .map(|os| os.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{s}")
    }
}
