//! Command dispatch: bridges CLI args -> engine operations -> output formatting.

pub mod activity;
pub mod clients;
pub mod config_cmd;
pub mod rates;
pub mod report;
pub mod spots;
pub mod util;

use valet_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

use self::util::Lot;

/// Open the lot and dispatch a lot-bound command to its handler.
pub fn dispatch(cmd: &Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let lot = Lot::open(cfg, global)?;
    match cmd {
        Command::Spots(args) => spots::handle(&lot, args, cfg, global),
        Command::Clients(args) => clients::handle(&lot, args, global),
        Command::Activity(args) => activity::handle(&lot, args, global),
        Command::Report(args) => report::handle(&lot, args, global),
        Command::Rates(args) => rates::handle(&lot, args, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
