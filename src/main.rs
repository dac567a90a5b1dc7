use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

use switchnet::bringup::{CliClient, TcpProbe};
use switchnet::config_loader;
use switchnet::network::NetnsSubstrate;
use switchnet::orchestrator;
use switchnet::session::InteractiveShell;
use switchnet::topology::SwitchPaths;

/// Build a software-switch test network, configure every switch and open an
/// interactive session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the behavioral switch executable
    #[arg(long)]
    behavioral_exe: PathBuf,

    /// Forwarding config (JSON) of the edge switches s1 and s3
    #[arg(long)]
    json1: PathBuf,

    /// Forwarding config (JSON) of the aggregate switch s2
    #[arg(long)]
    json2: PathBuf,

    /// Path to the switch control-plane CLI
    #[arg(long)]
    cli: PathBuf,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting switchnet");
    info!("Switch executable: {:?}", args.behavioral_exe);
    info!("Control CLI: {:?}", args.cli);

    let settings = config_loader::load_settings_from_env()?;
    debug!("Settings:\n{}", config_loader::settings_to_yaml(&settings)?);

    let paths = SwitchPaths {
        behavioral_exe: args.behavioral_exe,
        edge_json: args.json1,
        aggregate_json: args.json2,
    };

    // SIGINT, SIGTERM and SIGHUP end the session instead of the process, so
    // the network is always torn down.
    let mut shell = InteractiveShell::stdio();
    let interrupter = shell.interrupter();
    ctrlc::set_handler(move || interrupter.interrupt()).wrap_err("Failed to install signal handler")?;

    let report = orchestrator::run(
        &paths,
        &settings,
        NetnsSubstrate::new(&settings.runtime_dir),
        CliClient::new(args.cli),
        TcpProbe,
        &mut shell,
    )?;

    debug!(
        "Run finished: {} switches, {} tuning failures, registry at {:?}",
        report.results.len(),
        report.tuning_failures.len(),
        report.registry_path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from([
            "switchnet",
            "--behavioral-exe", "/usr/local/bin/simple_switch",
            "--json1", "edge.json",
            "--json2", "aggregate.json",
            "--cli", "/usr/local/bin/runtime_CLI",
        ]);

        assert_eq!(args.behavioral_exe, PathBuf::from("/usr/local/bin/simple_switch"));
        assert_eq!(args.json1, PathBuf::from("edge.json"));
        assert_eq!(args.json2, PathBuf::from("aggregate.json"));
        assert_eq!(args.cli, PathBuf::from("/usr/local/bin/runtime_CLI"));
    }

    #[test]
    fn test_every_flag_is_required() {
        let full = [
            ("--behavioral-exe", "ss"),
            ("--json1", "a.json"),
            ("--json2", "b.json"),
            ("--cli", "cli"),
        ];

        for skipped in 0..full.len() {
            let mut argv = vec!["switchnet"];
            for (i, (flag, value)) in full.iter().enumerate() {
                if i != skipped {
                    argv.push(*flag);
                    argv.push(*value);
                }
            }
            let err = Args::try_parse_from(argv).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn test_no_optional_flags() {
        let err = Args::try_parse_from([
            "switchnet",
            "--behavioral-exe", "ss",
            "--json1", "a.json",
            "--json2", "b.json",
            "--cli", "cli",
            "--verbose",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
