// ── Lot layout ──
//
// Sector codes, per-sector numeric ranges, and special-spot quotas.
// A `Layout` is the input to spot generation and regeneration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::CoreError;

/// Total spots in the default lot.
pub const DEFAULT_CAPACITY: u32 = 200;

/// Share of the lot that may be reserved for accessible spots.
const MAX_ACCESSIBLE_SHARE: f64 = 0.10;

/// One of the fixed sector codes painted on the lot.
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
#[strum(ascii_case_insensitive)]
pub enum Sector {
    A,
    B,
    C,
    D,
}

impl Sector {
    /// Human label used on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Sector A - Main Entrance",
            Self::B => "Sector B - East",
            Self::C => "Sector C - Center",
            Self::D => "Sector D - West",
        }
    }
}

/// Numeric range and quotas for one sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorLayout {
    /// First spot number of the range (inclusive).
    pub start: u32,
    /// Last spot number of the range (inclusive).
    pub end: u32,
    /// Accessible spots at the head of the range.
    #[serde(default, alias = "pcd")]
    pub accessible: u32,
    /// VIP spots immediately after the accessible ones.
    #[serde(default)]
    pub vip: u32,
}

impl SectorLayout {
    pub const fn new(start: u32, end: u32, accessible: u32, vip: u32) -> Self {
        Self {
            start,
            end,
            accessible,
            vip,
        }
    }

    /// Number of spots in the range, or 0 for an inverted range.
    pub fn size(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }
}

/// Full lot layout: sector code → range and quotas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layout {
    pub sectors: BTreeMap<Sector, SectorLayout>,
}

impl Default for Layout {
    fn default() -> Self {
        let sectors = BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 30, 3, 2)),
            (Sector::B, SectorLayout::new(31, 60, 3, 2)),
            (Sector::C, SectorLayout::new(61, 130, 5, 8)),
            (Sector::D, SectorLayout::new(131, 200, 5, 8)),
        ]);
        Self { sectors }
    }
}

impl Layout {
    pub fn new(sectors: BTreeMap<Sector, SectorLayout>) -> Self {
        Self { sectors }
    }

    /// Sectors in generation order: by range start, then sector code.
    pub fn ordered(&self) -> Vec<(Sector, SectorLayout)> {
        let mut entries: Vec<_> = self.sectors.iter().map(|(s, l)| (*s, *l)).collect();
        entries.sort_by_key(|(sector, layout)| (layout.start, *sector));
        entries
    }

    pub fn total_spots(&self) -> u32 {
        self.sectors.values().map(SectorLayout::size).sum()
    }

    pub fn total_accessible(&self) -> u32 {
        self.sectors.values().map(|l| l.accessible).sum()
    }

    pub fn total_vip(&self) -> u32 {
        self.sectors.values().map(|l| l.vip).sum()
    }

    /// Check the layout against the lot's fixed capacity.
    pub fn validate(&self, capacity: u32) -> Result<(), CoreError> {
        if self.sectors.is_empty() {
            return Err(invalid("layout has no sectors"));
        }

        for (sector, layout) in &self.sectors {
            if layout.start == 0 || layout.end < layout.start {
                return Err(invalid(format!(
                    "sector {sector} has an empty or inverted range {}..={}",
                    layout.start, layout.end
                )));
            }
            if layout.accessible + layout.vip > layout.size() {
                return Err(invalid(format!(
                    "sector {sector} reserves {} special spots but only has {}",
                    layout.accessible + layout.vip,
                    layout.size()
                )));
            }
        }

        let mut next = 1;
        for (sector, layout) in self.ordered() {
            if layout.start != next {
                return Err(invalid(format!(
                    "sector {sector} starts at {} but must start at {next}; \
                     ranges must be contiguous from 1",
                    layout.start
                )));
            }
            next = layout.end.saturating_add(1);
        }

        let total = self.total_spots();
        if total != capacity {
            return Err(invalid(format!(
                "layout defines {total} spots but the lot capacity is {capacity}"
            )));
        }

        let accessible = self.total_accessible();
        if f64::from(accessible) > f64::from(total) * MAX_ACCESSIBLE_SHARE {
            return Err(invalid(format!(
                "{accessible} accessible spots exceeds 10% of {total}"
            )));
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidConfiguration {
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid_for_default_capacity() {
        let layout = Layout::default();
        assert_eq!(layout.total_spots(), DEFAULT_CAPACITY);
        assert_eq!(layout.total_accessible(), 16);
        assert_eq!(layout.total_vip(), 20);
        assert!(layout.validate(DEFAULT_CAPACITY).is_ok());
    }

    #[test]
    fn capacity_mismatch_is_rejected() {
        let layout = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 75, 5, 0)),
            (Sector::B, SectorLayout::new(76, 150, 5, 0)),
        ]));
        let err = layout.validate(200).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn overlapping_or_gapped_ranges_are_rejected() {
        let overlap = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 100, 0, 0)),
            (Sector::B, SectorLayout::new(1, 100, 0, 0)),
        ]));
        assert!(matches!(
            overlap.validate(200),
            Err(CoreError::InvalidConfiguration { .. })
        ));

        let gap = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 100, 0, 0)),
            (Sector::B, SectorLayout::new(111, 210, 0, 0)),
        ]));
        assert!(gap.validate(200).is_err());

        let late_start = Layout::new(BTreeMap::from([(
            Sector::A,
            SectorLayout::new(2, 201, 0, 0),
        )]));
        assert!(late_start.validate(200).is_err());
    }

    #[test]
    fn accessible_quota_over_ten_percent_is_rejected() {
        let layout = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 100, 11, 0)),
            (Sector::B, SectorLayout::new(101, 200, 10, 0)),
        ]));
        assert!(layout.validate(200).is_err());

        let at_limit = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 100, 10, 0)),
            (Sector::B, SectorLayout::new(101, 200, 10, 0)),
        ]));
        assert!(at_limit.validate(200).is_ok());
    }

    #[test]
    fn special_quota_larger_than_sector_is_rejected() {
        let layout = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(1, 3, 2, 2)),
            (Sector::B, SectorLayout::new(4, 40, 0, 0)),
        ]));
        assert!(layout.validate(40).is_err());
    }

    #[test]
    fn ordered_follows_range_start() {
        let layout = Layout::new(BTreeMap::from([
            (Sector::A, SectorLayout::new(11, 20, 0, 0)),
            (Sector::B, SectorLayout::new(1, 10, 0, 0)),
        ]));
        let order: Vec<Sector> = layout.ordered().into_iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec![Sector::B, Sector::A]);
    }

    #[test]
    fn sector_parses_case_insensitively() {
        assert_eq!("c".parse::<Sector>().ok(), Some(Sector::C));
        assert!("E".parse::<Sector>().is_err());
    }
}
