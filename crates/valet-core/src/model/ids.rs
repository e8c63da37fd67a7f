// ── Core identity types ──
//
// Spots, clients and activity records are keyed by small positive
// integers. Wrapping them keeps a spot number from being handed to a
// client lookup by accident.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ── SpotId ──────────────────────────────────────────────────────────

/// Identifier (and display number) of a parking spot, 1..=capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotId(pub u32);

impl SpotId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpotId {
    type Err = ParseIntError;

    /// Accepts `42`, `#42` and zero-padded `042`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('#');
        trimmed.parse::<u32>().map(Self)
    }
}

impl From<u32> for SpotId {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

// ── ClientId ────────────────────────────────────────────────────────

/// Identifier of a client record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

// ── ActivityId ──────────────────────────────────────────────────────

/// Identifier of an activity record. Monotonic in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub u64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
