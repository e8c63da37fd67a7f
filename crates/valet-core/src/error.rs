// ── Core error types ──
//
// Every failure the engine reports is recoverable: the caller surfaces a
// message and the in-memory state is exactly what it was before the call.
// `PersistenceFailure` is the one exception to "nothing changed" -- the
// mutation stands, it just has not reached storage yet.

use thiserror::Error;

use crate::model::{ClientId, SpotId};
use crate::storage::StorageKey;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Spot {spot} is not available for check-in")]
    SpotUnavailable { spot: SpotId },

    #[error("Spot {spot} has no vehicle to check out")]
    SpotNotOccupied { spot: SpotId },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Spot not found: {spot}")]
    SpotNotFound { spot: SpotId },

    #[error("Client not found: {id}")]
    ClientNotFound { id: ClientId },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Storage errors ───────────────────────────────────────────────
    #[error("Failed to persist {key}: {reason}")]
    PersistenceFailure { key: StorageKey, reason: String },
}

impl CoreError {
    pub(crate) fn persistence(key: StorageKey, reason: impl ToString) -> Self {
        Self::PersistenceFailure {
            key,
            reason: reason.to_string(),
        }
    }
}
