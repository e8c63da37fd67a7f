// ── Filter predicates for entity snapshots ──
//
// Used by front ends to narrow snapshots without touching the store.

use chrono::{DateTime, Utc};

use crate::model::{
    ActivityKind, ActivityRecord, Client, ParkingSpot, Sector, SpotStatus, SpotType,
    normalize_plate,
};

/// Filter predicate for spot collections.
pub enum SpotFilter {
    All,
    ByStatus(SpotStatus),
    BySector(Sector),
    ByType(SpotType),
    /// Case-insensitive substring of the parked vehicle's plate.
    Plate(String),
    Custom(Box<dyn Fn(&ParkingSpot) -> bool + Send + Sync>),
}

impl SpotFilter {
    pub fn matches(&self, spot: &ParkingSpot) -> bool {
        match self {
            Self::All => true,
            Self::ByStatus(status) => spot.status == *status,
            Self::BySector(sector) => spot.sector == *sector,
            Self::ByType(spot_type) => spot.spot_type == *spot_type,
            Self::Plate(needle) => {
                let needle = normalize_plate(needle);
                spot.vehicle()
                    .is_some_and(|v| v.plate.contains(needle.as_str()))
            }
            Self::Custom(f) => f(spot),
        }
    }
}

/// Filter predicate for client collections.
pub enum ClientFilter {
    All,
    /// Case-insensitive substring of the client name.
    Name(String),
    /// Case-insensitive substring of the last known plate.
    Plate(String),
    Custom(Box<dyn Fn(&Client) -> bool + Send + Sync>),
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            Self::All => true,
            Self::Name(needle) => client
                .name
                .to_lowercase()
                .contains(needle.trim().to_lowercase().as_str()),
            Self::Plate(needle) => {
                let needle = normalize_plate(needle);
                client
                    .vehicle
                    .as_ref()
                    .is_some_and(|v| v.plate.contains(needle.as_str()))
            }
            Self::Custom(f) => f(client),
        }
    }
}

/// Filter predicate for the activity log.
pub enum ActivityFilter {
    All,
    Kind(ActivityKind),
    Spot(u32),
    /// Half-open time range `[from, to)`.
    Between(DateTime<Utc>, DateTime<Utc>),
    Custom(Box<dyn Fn(&ActivityRecord) -> bool + Send + Sync>),
}

impl ActivityFilter {
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        match self {
            Self::All => true,
            Self::Kind(kind) => record.kind == *kind,
            Self::Spot(number) => record.spot_number == Some(*number),
            Self::Between(from, to) => record.timestamp >= *from && record.timestamp < *to,
            Self::Custom(f) => f(record),
        }
    }
}
