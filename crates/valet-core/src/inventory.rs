//! Spot inventory: deterministic generation from a [`Layout`] and
//! occupancy summaries for dashboards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{
    Layout, ParkingSpot, Sector, SectorLayout, SpotId, SpotLocation, SpotStatus, SpotType,
};

/// Spot numbers in sector C above this are under the roof.
const COVERED_FROM: u32 = 100;

/// Build the full spot list for a layout.
///
/// Sectors are laid out in range order and numbered contiguously from 1.
/// Inside a sector the first `accessible` spots are accessible, the next
/// `vip` are VIP, the rest regular. Same layout, same list.
pub fn generate(layout: &Layout) -> Vec<ParkingSpot> {
    let mut spots = Vec::with_capacity(usize::try_from(layout.total_spots()).unwrap_or(0));
    let mut number = 1u32;

    for (sector, sector_layout) in layout.ordered() {
        for offset in 0..sector_layout.size() {
            let spot_type = type_for_offset(&sector_layout, offset);
            let location = location_for(sector, number);
            spots.push(ParkingSpot {
                id: SpotId(number),
                number,
                sector,
                spot_type,
                location,
                features: features_for(spot_type, location),
                size: spot_type.size(),
                status: SpotStatus::Available,
                occupancy: None,
                notes: String::new(),
            });
            number += 1;
        }
    }

    spots
}

fn type_for_offset(layout: &SectorLayout, offset: u32) -> SpotType {
    if offset < layout.accessible {
        SpotType::Accessible
    } else if offset < layout.accessible + layout.vip {
        SpotType::Vip
    } else {
        SpotType::Regular
    }
}

pub(crate) fn location_for(sector: Sector, number: u32) -> SpotLocation {
    match sector {
        Sector::D => SpotLocation::Outdoor,
        Sector::C if number > COVERED_FROM => SpotLocation::Covered,
        _ => SpotLocation::Ground,
    }
}

pub(crate) fn features_for(spot_type: SpotType, location: SpotLocation) -> Vec<String> {
    let mut features: Vec<&str> = match spot_type {
        SpotType::Accessible => vec!["Widened", "Signage", "Ramp"],
        SpotType::Vip => vec!["Covered", "Monitored", "Near entrance"],
        SpotType::Regular => Vec::new(),
    };
    match location {
        SpotLocation::Covered if !features.contains(&"Covered") => features.push("Covered"),
        SpotLocation::Ground => features.push("Ground level"),
        _ => {}
    }
    features.into_iter().map(str::to_owned).collect()
}

// ── Summaries ───────────────────────────────────────────────────────

/// Status counts for one sector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub reserved: usize,
}

impl StatusCounts {
    fn add(&mut self, status: SpotStatus) {
        self.total += 1;
        match status {
            SpotStatus::Available => self.available += 1,
            SpotStatus::Occupied => self.occupied += 1,
            SpotStatus::Reserved => self.reserved += 1,
        }
    }
}

/// Dashboard counters for the whole lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    pub overall: StatusCounts,
    pub by_sector: BTreeMap<Sector, StatusCounts>,
    pub accessible_free: usize,
    pub vip_free: usize,
    /// Occupied share of the lot, 0..=100.
    pub occupancy_percent: f64,
}

impl InventorySummary {
    pub fn from_spots<'a>(spots: impl IntoIterator<Item = &'a ParkingSpot>) -> Self {
        let mut summary = Self::default();
        for spot in spots {
            summary.overall.add(spot.status);
            summary.by_sector.entry(spot.sector).or_default().add(spot.status);
            if spot.is_available() {
                match spot.spot_type {
                    SpotType::Accessible => summary.accessible_free += 1,
                    SpotType::Vip => summary.vip_free += 1,
                    SpotType::Regular => {}
                }
            }
        }
        summary.occupancy_percent = percent(summary.overall.occupied, summary.overall.total);
        summary
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
