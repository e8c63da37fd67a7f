// ── Parking spot domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ids::{ClientId, SpotId};
use super::layout::Sector;

/// Physical category of a spot. Drives size and rate discount.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SpotType {
    #[default]
    #[strum(to_string = "regular")]
    Regular,
    #[serde(alias = "pcd")]
    #[strum(to_string = "accessible", serialize = "pcd")]
    Accessible,
    #[strum(to_string = "vip")]
    Vip,
}

impl SpotType {
    /// Marked bay dimensions.
    pub fn size(self) -> SpotSize {
        match self {
            Self::Regular => SpotSize::new(2.5, 5.0),
            Self::Vip => SpotSize::new(3.0, 5.0),
            Self::Accessible => SpotSize::new(3.5, 5.5),
        }
    }
}

/// Occupancy state. `Reserved` is only entered through an administrative edit.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SpotStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
}

/// Where the spot sits in the building.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SpotLocation {
    #[default]
    Ground,
    Covered,
    Outdoor,
}

/// Bay dimensions in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotSize {
    pub width: f32,
    pub length: f32,
}

impl SpotSize {
    pub const fn new(width: f32, length: f32) -> Self {
        Self { width, length }
    }
}

/// A parked vehicle as captured at check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub color: String,
}

impl Vehicle {
    pub fn new(plate: impl Into<String>, model: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            plate: normalize_plate(&plate.into()),
            model: model.into().trim().to_owned(),
            color: color.into().trim().to_owned(),
        }
    }
}

/// Uppercase, whitespace-free plate used for display and search.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// A normalised plate is non-empty ASCII letters, digits and hyphens.
pub fn is_valid_plate(plate: &str) -> bool {
    !plate.is_empty()
        && plate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Back-reference from a spot to the client who parked there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: ClientId,
    pub name: String,
}

/// Everything attached to a spot while it is occupied.
///
/// Kept as one value so vehicle, client and entry time are always
/// present together or absent together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub vehicle: Vehicle,
    pub client: ClientRef,
    pub entry_time: DateTime<Utc>,
}

/// The canonical ParkingSpot type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpot {
    pub id: SpotId,
    pub number: u32,
    pub sector: Sector,
    #[serde(rename = "type")]
    pub spot_type: SpotType,
    pub location: SpotLocation,
    pub features: Vec<String>,
    pub size: SpotSize,
    pub status: SpotStatus,
    pub occupancy: Option<Occupancy>,
    #[serde(default)]
    pub notes: String,
}

impl ParkingSpot {
    pub fn is_available(&self) -> bool {
        self.status == SpotStatus::Available
    }

    pub fn is_occupied(&self) -> bool {
        self.status == SpotStatus::Occupied
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.occupancy.as_ref().map(|o| &o.vehicle)
    }

    pub fn client(&self) -> Option<&ClientRef> {
        self.occupancy.as_ref().map(|o| &o.client)
    }

    pub fn entry_time(&self) -> Option<DateTime<Utc>> {
        self.occupancy.as_ref().map(|o| o.entry_time)
    }

    /// Occupancy data is present exactly when the spot is occupied.
    pub fn is_consistent(&self) -> bool {
        self.is_occupied() == self.occupancy.is_some()
    }

    /// Attach an occupancy and flip the status.
    pub(crate) fn park(&mut self, occupancy: Occupancy) {
        self.occupancy = Some(occupancy);
        self.status = SpotStatus::Occupied;
    }

    /// Detach the occupancy, returning the spot to `Available`.
    pub(crate) fn vacate(&mut self) -> Option<Occupancy> {
        self.status = SpotStatus::Available;
        self.occupancy.take()
    }
}
