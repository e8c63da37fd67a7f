//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use valet_config::ConfigError;
use valet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const PERSISTENCE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Spot {spot} is not available")]
    #[diagnostic(
        code(valet::spot_unavailable),
        help("Find a free spot with: valet spots list --status available")
    )]
    SpotUnavailable { spot: String },

    #[error("Spot {spot} has no vehicle parked")]
    #[diagnostic(
        code(valet::spot_not_occupied),
        help("Occupied spots are listed by: valet spots list --status occupied")
    )]
    SpotNotOccupied { spot: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(valet::not_found),
        help("Run: valet {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(valet::validation))]
    Validation { field: String, reason: String },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("Could not save {key}: {reason}")]
    #[diagnostic(
        code(valet::persistence),
        help(
            "The change was applied but not written to disk.\n\
             Check permissions on the data directory: {data_dir}"
        )
    )]
    Persistence {
        key: String,
        reason: String,
        data_dir: String,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(valet::config_exists),
        help("Pass --force to overwrite it, or edit it by hand.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(valet::config),
        help("Check the config file (valet config path) and VALET_* variables.")
    )]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(valet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Aborted")]
    #[diagnostic(code(valet::aborted))]
    Aborted,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(valet::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::SpotUnavailable { .. }
            | Self::SpotNotOccupied { .. }
            | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Persistence { .. } => exit_code::PERSISTENCE,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the data directory to a persistence failure's help text.
    pub fn in_data_dir(self, dir: &std::path::Path) -> Self {
        match self {
            Self::Persistence { key, reason, .. } => Self::Persistence {
                key,
                reason,
                data_dir: dir.display().to_string(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SpotUnavailable { spot } => CliError::SpotUnavailable {
                spot: spot.to_string(),
            },

            CoreError::SpotNotOccupied { spot } => CliError::SpotNotOccupied {
                spot: spot.to_string(),
            },

            CoreError::SpotNotFound { spot } => CliError::NotFound {
                resource_type: "spot".into(),
                identifier: spot.to_string(),
                list_command: "spots list".into(),
            },

            CoreError::ClientNotFound { id } => CliError::NotFound {
                resource_type: "client".into(),
                identifier: id.to_string(),
                list_command: "clients list".into(),
            },

            CoreError::InvalidConfiguration { reason } => CliError::Validation {
                field: "configuration".into(),
                reason,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::PersistenceFailure { key, reason } => CliError::Persistence {
                key: key.to_string(),
                reason,
                data_dir: "(unknown)".into(),
            },
        }
    }
}
