// ── Storage port ──
//
// The engine never touches disk directly. Each collection is serialized
// to a string and handed to a `Storage` under a fixed key; how the bytes
// are kept is the adapter's business.

mod file;
mod memory;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Fixed identifiers of the persisted collections.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum StorageKey {
    Spots,
    Clients,
    Activities,
    Settings,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spots => "spots",
            Self::Clients => "clients",
            Self::Activities => "activities",
            Self::Settings => "settings",
        }
    }
}

/// Adapter-level failure. The engine wraps it into
/// [`CoreError::PersistenceFailure`](crate::CoreError::PersistenceFailure).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Synchronous key-value persistence used by the engine.
///
/// A save either stores the whole value or fails; adapters must not
/// leave a half-written value behind.
pub trait Storage: Send + Sync {
    /// Read the stored value for `key`, `None` if nothing was saved yet.
    fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Replace the stored value for `key`.
    fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;
}
