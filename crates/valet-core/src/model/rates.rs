// ── Rate table ──

use serde::{Deserialize, Serialize};

use super::spot::SpotType;
use crate::error::CoreError;

/// Current price sheet. Amounts are in the lot's currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub first_hour: f64,
    pub additional_hour: f64,
    pub daily: f64,
    /// Fraction taken off every component for accessible spots.
    #[serde(default, alias = "pcd_discount")]
    pub accessible_discount: f64,
    #[serde(default)]
    pub vip_discount: f64,
    /// Overnight flat rate. Published on the price sheet, not billed by the engine.
    #[serde(default)]
    pub nightly: f64,
    /// Monthly plan price. Published on the price sheet, not billed by the engine.
    #[serde(default)]
    pub monthly: f64,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            first_hour: 15.0,
            additional_hour: 10.0,
            daily: 80.0,
            accessible_discount: 0.5,
            vip_discount: 0.2,
            nightly: 50.0,
            monthly: 400.0,
        }
    }
}

/// The three amounts the fee calculation reads, after any discount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveRates {
    pub first_hour: f64,
    pub additional_hour: f64,
    pub daily: f64,
}

impl RateTable {
    /// A table with no discounts and no informational prices.
    pub fn flat(first_hour: f64, additional_hour: f64, daily: f64) -> Self {
        Self {
            first_hour,
            additional_hour,
            daily,
            accessible_discount: 0.0,
            vip_discount: 0.0,
            nightly: 0.0,
            monthly: 0.0,
        }
    }

    pub fn discount_for(&self, spot_type: SpotType) -> f64 {
        match spot_type {
            SpotType::Regular => 0.0,
            SpotType::Accessible => self.accessible_discount,
            SpotType::Vip => self.vip_discount,
        }
    }

    /// Base components scaled by `1 - discount` for the spot type.
    pub fn effective(&self, spot_type: SpotType) -> EffectiveRates {
        let factor = 1.0 - self.discount_for(spot_type);
        EffectiveRates {
            first_hour: self.first_hour * factor,
            additional_hour: self.additional_hour * factor,
            daily: self.daily * factor,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let amounts = [
            ("first_hour", self.first_hour),
            ("additional_hour", self.additional_hour),
            ("daily", self.daily),
            ("nightly", self.nightly),
            ("monthly", self.monthly),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidConfiguration {
                    reason: format!("rate {name} must be a non-negative amount, got {value}"),
                });
            }
        }

        let discounts = [
            ("accessible_discount", self.accessible_discount),
            ("vip_discount", self.vip_discount),
        ];
        for (name, value) in discounts {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::InvalidConfiguration {
                    reason: format!("{name} must be between 0 and 1, got {value}"),
                });
            }
        }

        Ok(())
    }
}
