//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use valet_config::Config;
use valet_core::{Command as CoreCommand, CommandResult, Engine, FileStorage, Layout};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Lot session ─────────────────────────────────────────────────────

/// An engine opened on the data directory for one CLI invocation.
pub struct Lot {
    pub engine: Engine,
    data_dir: PathBuf,
}

impl Lot {
    /// Open the lot; `--data-dir` wins over the configured directory.
    pub fn open(cfg: &Config, global: &GlobalOpts) -> Result<Self, CliError> {
        let data_dir = global.data_dir.clone().unwrap_or_else(|| cfg.data_dir());
        let engine_config = cfg.to_engine_config()?;
        debug!(data_dir = %data_dir.display(), "opening lot");

        let engine = Engine::open(engine_config, Box::new(FileStorage::new(&data_dir)))
            .map_err(|e| CliError::from(e).in_data_dir(&data_dir))?;
        Ok(Self { engine, data_dir })
    }

    /// Run a command now and write the result to disk.
    pub fn execute(&self, cmd: CoreCommand) -> Result<CommandResult, CliError> {
        self.execute_at(cmd, Utc::now())
    }

    pub fn execute_at(
        &self,
        cmd: CoreCommand,
        now: DateTime<Utc>,
    ) -> Result<CommandResult, CliError> {
        let result = self.engine.execute(cmd, now)?;
        self.save()?;
        Ok(result)
    }

    /// Flush every dirty collection.
    pub fn save(&self) -> Result<(), CliError> {
        if !self.engine.is_dirty() {
            return Ok(());
        }
        let keys = self.engine.dirty_keys();
        let written = self
            .engine
            .flush()
            .map_err(|e| CliError::from(e).in_data_dir(&self.data_dir))?;
        debug!(
            ?keys,
            written,
            saved_at = ?self.engine.store().last_saved(),
            "flushed collections"
        );
        Ok(())
    }
}

// ── Argument parsing ────────────────────────────────────────────────

/// Parse an optional `--at` timestamp, defaulting to now.
pub fn timestamp_or_now(at: Option<&str>) -> Result<DateTime<Utc>, CliError> {
    let Some(raw) = at else {
        return Ok(Utc::now());
    };
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CliError::Validation {
            field: "at".into(),
            reason: format!("expected an RFC 3339 timestamp like 2024-03-01T14:30:00Z: {e}"),
        })
}

/// Parse an optional `YYYY-MM-DD` date, defaulting to today (UTC).
pub fn date_or_today(field: &str, date: Option<&str>) -> Result<NaiveDate, CliError> {
    match date {
        None => Ok(Utc::now().date_naive()),
        Some(raw) => parse_date(field, raw),
    }
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("expected YYYY-MM-DD: {e}"),
    })
}

/// Read a sector layout from a TOML or JSON file (chosen by extension).
pub fn read_layout_file(path: &Path) -> Result<Layout, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    } else {
        toml::from_str(&contents).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid layout: {reason}"),
    })
}

// ── Interaction ─────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
