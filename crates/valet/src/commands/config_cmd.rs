//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Input, Select};

use valet_config::{Config, config_path, save_config};
use valet_core::RateTable;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

const OUTPUT_CHOICES: [&str; 5] = ["table", "json", "json-compact", "yaml", "plain"];

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_amount(prompt: &str, current: f64) -> Result<f64, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(current)
        .validate_with(|v: &f64| {
            if v.is_finite() && *v >= 0.0 {
                Ok(())
            } else {
                Err("must be a non-negative amount")
            }
        })
        .interact_text()
        .map_err(prompt_err)
}

/// Walk the user through the settings a new lot usually changes.
fn prompt_config(mut cfg: Config) -> Result<Config, CliError> {
    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(cfg.data_dir().display().to_string())
        .interact_text()
        .map_err(prompt_err)?;
    cfg.data_dir = Some(PathBuf::from(data_dir));

    let rates = cfg.rates;
    cfg.rates = RateTable {
        first_hour: prompt_amount("First hour", rates.first_hour)?,
        additional_hour: prompt_amount("Each additional hour", rates.additional_hour)?,
        daily: prompt_amount("Daily cap", rates.daily)?,
        ..rates
    };

    let current = OUTPUT_CHOICES
        .iter()
        .position(|c| *c == cfg.defaults.output)
        .unwrap_or(0);
    let choice = Select::new()
        .with_prompt("Default output format")
        .items(&OUTPUT_CHOICES)
        .default(current)
        .interact()
        .map_err(prompt_err)?;
    cfg.defaults.output = OUTPUT_CHOICES
        .get(choice)
        .copied()
        .unwrap_or("table")
        .to_owned();

    Ok(cfg)
}

pub fn handle(args: &ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ConfigCommand::Init { force } => {
            let path = config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut new_cfg = Config::default();
            if let Some(dir) = &global.data_dir {
                new_cfg.data_dir = Some(dir.clone());
            }
            if !global.yes {
                new_cfg = prompt_config(new_cfg)?;
            }
            // Reject values the engine would refuse before writing them
            new_cfg.to_engine_config()?;

            let written = save_config(&new_cfg)?;
            output::notice(
                &format!("Configuration written to {}", written.display()),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let out = match global.format() {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(cfg).map_err(valet_config::ConfigError::from)?
                }
                format => output::render_single(&format, cfg, |_| String::new(), |_| String::new()),
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
