mod cli;
mod commands;
mod error;
mod output;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, ColorMode, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

fn main() {
    let mut cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(&mut cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &mut Cli) -> Result<(), CliError> {
    match &cli.command {
        // Config commands must work even when the file is broken
        Command::Config(args) => {
            let cfg = valet_config::load_config_or_default();
            apply_defaults(&mut cli.global, &cfg.defaults);
            commands::config_cmd::handle(args, &cfg, &cli.global)
        }

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "valet", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = valet_config::load_config()?;
            apply_defaults(&mut cli.global, &cfg.defaults);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cfg, &cli.global)
        }
    }
}

/// Fill output and color from the config file where no flag was given.
fn apply_defaults(global: &mut GlobalOpts, defaults: &valet_config::Defaults) {
    if global.output.is_none() {
        global.output = parse_default::<OutputFormat>("output", &defaults.output);
    }
    if global.color.is_none() {
        global.color = parse_default::<ColorMode>("color", &defaults.color);
    }
}

fn parse_default<T: ValueEnum>(field: &str, value: &str) -> Option<T> {
    match T::from_str(value, true) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(field, value, "ignoring unknown default in config");
            None
        }
    }
}
