//! Fee calculation.
//!
//! Pure functions over elapsed time and the rate table. Amounts are left
//! unrounded; rounding to cents is a presentation concern (see [`crate::money`]).

use chrono::{DateTime, Utc};

use crate::model::{RateTable, SpotType};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Stays longer than this many hours are billed at the daily rate.
const DAILY_THRESHOLD_HOURS: f64 = 24.0;

/// Elapsed hours between entry and `now`, clamped at zero.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn elapsed_hours(entry_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let ms = (now - entry_time).num_milliseconds().max(0);
    ms as f64 / MS_PER_HOUR
}

/// Amount owed for a stay from `entry_time` to `now` on a spot of `spot_type`.
///
/// The spot type's discount scales the first-hour, additional-hour and
/// daily components before the tiers and the daily cap are applied.
pub fn compute_fee(
    entry_time: DateTime<Utc>,
    now: DateTime<Utc>,
    rates: &RateTable,
    spot_type: SpotType,
) -> f64 {
    fee_for_hours(elapsed_hours(entry_time, now), rates, spot_type)
}

/// Same as [`compute_fee`] for an already-known duration in hours.
pub fn fee_for_hours(hours: f64, rates: &RateTable, spot_type: SpotType) -> f64 {
    let hours = if hours.is_finite() { hours.max(0.0) } else { 0.0 };
    let effective = rates.effective(spot_type);

    if hours <= 1.0 {
        effective.first_hour
    } else if hours > DAILY_THRESHOLD_HOURS {
        effective.daily
    } else {
        let extra_hours = (hours - 1.0).ceil();
        let fee = effective.first_hour + extra_hours * effective.additional_hour;
        fee.min(effective.daily)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).single().unwrap_or_default()
    }

    fn table() -> RateTable {
        RateTable::flat(15.0, 10.0, 80.0)
    }

    fn assert_money(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn zero_elapsed_charges_first_hour() {
        assert_money(compute_fee(t0(), t0(), &table(), SpotType::Regular), 15.0);
    }

    #[test]
    fn exactly_one_hour_is_still_first_hour() {
        let now = t0() + Duration::hours(1);
        assert_money(compute_fee(t0(), now, &table(), SpotType::Regular), 15.0);
    }

    #[test]
    fn two_and_a_half_hours() {
        let now = t0() + Duration::minutes(150);
        assert_money(compute_fee(t0(), now, &table(), SpotType::Regular), 35.0);
    }

    #[test]
    fn one_minute_past_the_hour_starts_next_hour() {
        let now = t0() + Duration::minutes(61);
        assert_money(compute_fee(t0(), now, &table(), SpotType::Regular), 25.0);
    }

    #[test]
    fn long_stay_capped_at_daily() {
        let now = t0() + Duration::hours(30);
        assert_money(compute_fee(t0(), now, &table(), SpotType::Regular), 80.0);

        // 8h would be 15 + 7*10 = 85 -> capped.
        let now = t0() + Duration::hours(8);
        assert_money(compute_fee(t0(), now, &table(), SpotType::Regular), 80.0);
    }

    #[test]
    fn accessible_discount_applies_to_base_rates() {
        let mut rates = table();
        rates.accessible_discount = 0.5;
        let now = t0() + Duration::minutes(30);
        assert_money(compute_fee(t0(), now, &rates, SpotType::Accessible), 7.5);

        let now = t0() + Duration::hours(30);
        assert_money(compute_fee(t0(), now, &rates, SpotType::Accessible), 40.0);
    }

    #[test]
    fn negative_elapsed_is_clamped() {
        let before = t0() - Duration::hours(3);
        assert_money(elapsed_hours(t0(), before), 0.0);
        assert_money(compute_fee(t0(), before, &table(), SpotType::Regular), 15.0);
    }

    #[test]
    fn fee_is_monotonic_and_capped() {
        let rates = RateTable::default();
        for spot_type in [SpotType::Regular, SpotType::Accessible, SpotType::Vip] {
            let cap = rates.effective(spot_type).daily;
            let mut previous = 0.0;
            for minutes in (0..=60 * 48).step_by(7) {
                let now = t0() + Duration::minutes(minutes);
                let fee = compute_fee(t0(), now, &rates, spot_type);
                assert!(fee >= previous, "{spot_type} fee dropped at {minutes}min");
                assert!(fee <= cap + 1e-9, "{spot_type} fee above cap at {minutes}min");
                previous = fee;
            }
        }
    }

    #[test]
    fn non_finite_hours_fall_back_to_first_hour() {
        assert_money(fee_for_hours(f64::NAN, &table(), SpotType::Regular), 15.0);
    }
}
