//! Interactive session handoff.
//!
//! Once bring-up is over the live network is handed to a [`Session`]. The
//! shipped [`InteractiveShell`] is a small line-oriented front end for
//! inspecting the network and running commands inside hosts:
//!
//! ```text
//! switchnet> nodes
//! h1 h2 s1 s2 s3
//! switchnet> h1 ping -c 1 10.0.0.2
//! ```

use crate::network::{LiveNetwork, Substrate};
use color_eyre::Result;
use log::{debug, info};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Front end that owns the network until the operator is done
pub trait Session {
    fn interact<S: Substrate>(&mut self, network: &mut LiveNetwork<S>) -> Result<()>;
}

const HELP: &str = "\
Commands:
  help                 show this text
  nodes                list hosts and switches
  links                list links and their interfaces
  ports                list switch device ids and management ports
  <host> <command...>  run a shell command inside a host
  exit | quit          tear the network down and leave

Ctrl-C while a host command runs stops that command only.
At the prompt, Ctrl-C (or SIGTERM/SIGHUP) tears the network down and leaves.";

enum Input {
    Line(String),
    Eof,
    Interrupt,
}

/// Delivers interrupts to a running [`InteractiveShell`]. Cheap to clone and
/// safe to move into a signal handler.
#[derive(Clone)]
pub struct Interrupter(Sender<Input>);

impl Interrupter {
    pub fn interrupt(&self) {
        // The shell is gone once the receiver is dropped; nothing left to stop.
        let _ = self.0.send(Input::Interrupt);
    }
}

/// Line-oriented shell.
///
/// Input lines are read on a background thread and merged with interrupts,
/// so a signal reaches the shell even while it waits at the prompt.
pub struct InteractiveShell<W: Write> {
    inputs: Receiver<Input>,
    sender: Sender<Input>,
    /// Lines that arrived while a host command was running
    pending: VecDeque<Input>,
    output: W,
    prompt: String,
}

impl InteractiveShell<Stdout> {
    /// Shell over the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::<Stdin>::new(io::stdin()), io::stdout())
    }
}

impl<W: Write> InteractiveShell<W> {
    pub fn new<R: BufRead + Send + 'static>(input: R, output: W) -> Self {
        let (sender, inputs) = mpsc::channel();
        let lines = sender.clone();
        thread::spawn(move || read_lines(input, lines));
        Self {
            inputs,
            sender,
            pending: VecDeque::new(),
            output,
            prompt: "switchnet> ".to_string(),
        }
    }

    /// Handle for signal handlers
    pub fn interrupter(&self) -> Interrupter {
        Interrupter(self.sender.clone())
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn next_input(&mut self) -> Input {
        if let Some(input) = self.pending.pop_front() {
            return input;
        }
        // `self.sender` keeps the channel open, so this only fails if the
        // reader thread died without reporting EOF.
        self.inputs.recv().unwrap_or(Input::Eof)
    }

    /// Consume interrupts that arrived while a host command ran. Returns true
    /// if there was at least one.
    fn take_interrupts(&mut self) -> bool {
        let mut interrupted = false;
        while let Ok(input) = self.inputs.try_recv() {
            match input {
                Input::Interrupt => interrupted = true,
                other => self.pending.push_back(other),
            }
        }
        interrupted
    }

    fn run_in_host<S: Substrate>(&mut self, network: &mut LiveNetwork<S>, host: &str, command: &str) -> Result<()> {
        match network.host_cmd(host, command) {
            Ok(result) => {
                write!(self.output, "{}", result.stdout)?;
                write!(self.output, "{}", result.stderr)?;
                if !result.success() {
                    writeln!(self.output, "*** exit status {:?}", result.exit_code)?;
                }
            }
            Err(e) => writeln!(self.output, "*** {}", e)?,
        }
        if self.take_interrupts() {
            writeln!(self.output, "Interrupt")?;
        }
        Ok(())
    }

    /// Handle one line. Returns false when the session should end.
    fn dispatch<S: Substrate>(&mut self, network: &mut LiveNetwork<S>, line: &str) -> Result<bool> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(true);
        };

        match first {
            "exit" | "quit" => return Ok(false),
            "help" | "?" => writeln!(self.output, "{}", HELP)?,
            "nodes" => writeln!(self.output, "{}", network.topology().node_names().join(" "))?,
            "links" | "net" => {
                for plan in network.links() {
                    writeln!(self.output, "{} <-> {}", plan.a.name, plan.b.name)?;
                }
            }
            "ports" => {
                for switch in network.switches() {
                    writeln!(
                        self.output,
                        "{} device_id={} thrift_port={} role={} json={}",
                        switch.name,
                        switch.device_id,
                        switch.thrift_port,
                        switch.role.as_str(),
                        switch.json_path.display()
                    )?;
                }
            }
            node if network.topology().switch(node).is_some() => {
                writeln!(
                    self.output,
                    "*** {} is a switch; use the control client on port {}",
                    node,
                    network.topology().switch(node).map_or(0, |s| s.thrift_port)
                )?;
            }
            node if network.topology().kind_of(node).is_some() => {
                let command = line.trim_start()[node.len()..].trim();
                if command.is_empty() {
                    writeln!(self.output, "*** usage: {} <command...>", node)?;
                } else {
                    self.run_in_host(network, node, command)?;
                }
            }
            other => writeln!(self.output, "*** Unknown command: {} (try 'help')", other)?,
        }
        Ok(true)
    }
}

impl<W: Write> Session for InteractiveShell<W> {
    fn interact<S: Substrate>(&mut self, network: &mut LiveNetwork<S>) -> Result<()> {
        loop {
            write!(self.output, "{}", self.prompt)?;
            self.output.flush()?;

            match self.next_input() {
                Input::Line(line) => {
                    if !self.dispatch(network, &line)? {
                        return Ok(());
                    }
                }
                Input::Eof => {
                    writeln!(self.output)?;
                    return Ok(());
                }
                Input::Interrupt => {
                    writeln!(self.output, "\nInterrupt")?;
                    info!("Interrupted, leaving session");
                    return Ok(());
                }
            }
        }
    }
}

/// Forward lines from `input` until EOF or until the shell is gone
fn read_lines<R: BufRead>(mut input: R, lines: Sender<Input>) {
    loop {
        let mut line = String::new();
        let input = match input.read_line(&mut line) {
            Ok(0) => Input::Eof,
            Ok(_) => Input::Line(line),
            Err(e) => {
                debug!("Reading session input: {}", e);
                Input::Eof
            }
        };
        let eof = matches!(input, Input::Eof);
        if lines.send(input).is_err() || eof {
            return;
        }
    }
}
