//! Clap derive structures for the `valet` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This
//! file is also compiled by `build.rs` for man page generation, so it may
//! only depend on clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// valet -- parking lot operations from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "valet",
    version,
    about = "Run a valet parking lot from the command line",
    long_about = "Check vehicles in and out of parking spots, bill stays from the\n\
        lot's rate table, and report on daily, weekly and monthly activity.\n\n\
        State is kept as JSON files in the data directory.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Directory holding the lot's JSON files (overrides config)
    #[arg(long, short = 'd', env = "VALET_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "VALET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

impl GlobalOpts {
    /// Output format in effect once config defaults have been applied.
    pub fn format(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.clone().unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Domain value enums ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Available,
    Occupied,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SectorArg {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpotTypeArg {
    Regular,
    #[value(alias = "pcd")]
    Accessible,
    Vip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Entry,
    Exit,
    Payment,
    System,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect spots and check vehicles in and out
    #[command(alias = "s")]
    Spots(SpotsArgs),

    /// Browse client records
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Browse the activity log
    #[command(alias = "log")]
    Activity(ActivityArgs),

    /// Daily, weekly and monthly reports
    Report(ReportArgs),

    /// View or change the rate table
    Rates(RatesArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Spots ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SpotsArgs {
    #[command(subcommand)]
    pub command: SpotsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SpotsCommand {
    /// List spots, optionally filtered
    #[command(alias = "ls")]
    List(SpotListArgs),

    /// Show one spot in detail
    Get {
        /// Spot number
        spot: u32,
    },

    /// Check a vehicle into an available spot
    #[command(alias = "in")]
    Occupy(OccupyArgs),

    /// Check a vehicle out and charge the stay
    #[command(alias = "out")]
    Release {
        /// Spot number
        spot: u32,

        /// Exit time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Show what releasing a spot would charge, without releasing it
    Quote {
        /// Spot number
        spot: u32,

        /// Quote time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Hold an available spot out of circulation
    Reserve {
        /// Spot number
        spot: u32,
    },

    /// Return a reserved spot to circulation
    Unreserve {
        /// Spot number
        spot: u32,
    },

    /// Rebuild every spot from a sector layout, discarding current state
    Regenerate {
        /// Layout file (TOML or JSON, `{ A = { start, end, accessible, vip } }`).
        /// Uses the configured layout when omitted.
        #[arg(long, short = 'f')]
        from_file: Option<PathBuf>,
    },

    /// Occupancy counters for the lot and each sector
    Summary,
}

#[derive(Debug, Args)]
pub struct SpotListArgs {
    /// Only spots in this status
    #[arg(long)]
    pub status: Option<StatusArg>,

    /// Only spots in this sector
    #[arg(long, ignore_case = true)]
    pub sector: Option<SectorArg>,

    /// Only spots of this type
    #[arg(long = "type", value_name = "TYPE")]
    pub spot_type: Option<SpotTypeArg>,

    /// Only spots whose parked vehicle's plate contains this text
    #[arg(long)]
    pub plate: Option<String>,
}

#[derive(Debug, Args)]
pub struct OccupyArgs {
    /// Spot number
    pub spot: u32,

    /// License plate
    #[arg(long)]
    pub plate: String,

    /// Client name
    #[arg(long)]
    pub name: String,

    /// Client phone
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Vehicle model
    #[arg(long, default_value = "")]
    pub model: String,

    /// Vehicle color
    #[arg(long = "vehicle-color", value_name = "COLOR", default_value = "")]
    pub vehicle_color: String,

    /// Entry time (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<String>,
}

// ── Clients ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List clients, optionally filtered
    #[command(alias = "ls")]
    List {
        /// Only clients whose name contains this text
        #[arg(long)]
        name: Option<String>,

        /// Only clients whose last plate contains this text
        #[arg(long)]
        plate: Option<String>,
    },

    /// Show one client in detail
    Get {
        /// Client ID
        id: u32,
    },
}

// ── Activity ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ActivityArgs {
    #[command(subcommand)]
    pub command: ActivityCommand,
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    /// List recent activity, newest first
    #[command(alias = "ls")]
    List {
        /// Only records of this kind
        #[arg(long)]
        kind: Option<KindArg>,

        /// Only records for this spot number
        #[arg(long)]
        spot: Option<u32>,

        /// Only records from this UTC day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Max records to show
        #[arg(long, short = 'l', default_value = "25")]
        limit: usize,
    },
}

// ── Reports ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// One UTC day: movements, revenue and peak hour
    Daily {
        /// Day to report (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// One ISO week, broken down per day
    Weekly {
        /// ISO week-numbering year; defaults to the current one
        #[arg(long)]
        year: Option<i32>,

        /// ISO week number (1-53); defaults to the current week
        #[arg(long)]
        week: Option<u32>,
    },

    /// One calendar month, broken down per ISO week
    Monthly {
        /// Calendar year; defaults to the current one
        #[arg(long)]
        year: Option<i32>,

        /// Month (1-12); defaults to the current month
        #[arg(long)]
        month: Option<u32>,
    },
}

// ── Rates ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RatesArgs {
    #[command(subcommand)]
    pub command: RatesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RatesCommand {
    /// Show the rate table in effect
    Show,

    /// Change one or more rates; unspecified rates keep their value
    Set(RatesSetArgs),
}

#[derive(Debug, Args)]
pub struct RatesSetArgs {
    /// Charge for the first (or only) hour
    #[arg(long)]
    pub first_hour: Option<f64>,

    /// Charge for each additional started hour
    #[arg(long)]
    pub additional_hour: Option<f64>,

    /// Cap for a single stay
    #[arg(long)]
    pub daily: Option<f64>,

    /// Discount for accessible spots (0.0-1.0)
    #[arg(long)]
    pub accessible_discount: Option<f64>,

    /// Discount for VIP spots (0.0-1.0)
    #[arg(long)]
    pub vip_discount: Option<f64>,

    /// Overnight plan price
    #[arg(long)]
    pub nightly: Option<f64>,

    /// Monthly plan price
    #[arg(long)]
    pub monthly: Option<f64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file, prompting for values unless --yes is given
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
