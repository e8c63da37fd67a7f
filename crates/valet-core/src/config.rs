// ── Runtime engine configuration ──
//
// Describes the lot the engine manages. Built by the front end (usually
// from `valet-config`) and handed in; core never reads config files.

use serde::{Deserialize, Serialize};

use crate::model::{DEFAULT_CAPACITY, Layout, RateTable};

/// Configuration for a single lot.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Fixed number of spots. Regeneration must keep this total.
    pub capacity: u32,
    /// Layout used when no spots have been stored yet.
    pub layout: Layout,
    /// Rates used when no settings have been stored yet.
    pub rates: RateTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            layout: Layout::default(),
            rates: RateTable::default(),
        }
    }
}

/// Mutable lot settings persisted under the `settings` storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub rates: RateTable,
    pub layout: Layout,
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            rates: config.rates,
            layout: config.layout.clone(),
        }
    }
}
