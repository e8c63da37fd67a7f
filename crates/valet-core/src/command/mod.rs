// ── Command API ──
//
// Every write operation can be expressed as a `Command`. Front ends
// build one from user input and hand it to `Engine::execute`, which
// routes it to the matching lifecycle method.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::{Engine, OccupyReceipt, ReleaseReceipt};
use crate::error::CoreError;
use crate::model::{ClientInfo, Layout, ParkingSpot, RateTable, SpotId, Vehicle};

/// All possible write operations against the lot.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Spot lifecycle ───────────────────────────────────────────────
    Occupy {
        spot: SpotId,
        vehicle: Vehicle,
        client: ClientInfo,
    },
    Release {
        spot: SpotId,
    },

    // ── Administration ───────────────────────────────────────────────
    Reserve {
        spot: SpotId,
    },
    Unreserve {
        spot: SpotId,
    },
    RegenerateSpots {
        layout: Layout,
    },
    UpdateRates {
        rates: RateTable,
    },
}

/// What a successful command produced.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Occupied(OccupyReceipt),
    Released(ReleaseReceipt),
    Spot(Arc<ParkingSpot>),
}

impl Engine {
    /// Run a command at time `now`.
    pub fn execute(&self, cmd: Command, now: DateTime<Utc>) -> Result<CommandResult, CoreError> {
        match cmd {
            Command::Occupy {
                spot,
                vehicle,
                client,
            } => self
                .occupy(spot, vehicle, client, now)
                .map(CommandResult::Occupied),
            Command::Release { spot } => self.release(spot, now).map(CommandResult::Released),
            Command::Reserve { spot } => self.set_reserved(spot, true, now).map(CommandResult::Spot),
            Command::Unreserve { spot } => {
                self.set_reserved(spot, false, now).map(CommandResult::Spot)
            }
            Command::RegenerateSpots { layout } => {
                self.regenerate_spots(layout, now)?;
                Ok(CommandResult::Ok)
            }
            Command::UpdateRates { rates } => {
                self.update_rate_table(rates, now)?;
                Ok(CommandResult::Ok)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::SpotStatus;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone};

    fn engine() -> Engine {
        Engine::open(EngineConfig::default(), Box::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn occupy_then_release_through_commands() {
        let engine = engine();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();

        let result = engine
            .execute(
                Command::Occupy {
                    spot: SpotId(10),
                    vehicle: Vehicle::new("QWE4R56", "", ""),
                    client: ClientInfo::new("Caio", ""),
                },
                now,
            )
            .unwrap();
        assert!(matches!(result, CommandResult::Occupied(r) if r.spot == SpotId(10)));

        let result = engine
            .execute(Command::Release { spot: SpotId(10) }, now + Duration::hours(2))
            .unwrap();
        let CommandResult::Released(receipt) = result else {
            panic!("expected a release receipt");
        };
        assert!((receipt.fee - 25.0).abs() < 1e-9);
    }

    #[test]
    fn reserve_command_returns_updated_spot() {
        let engine = engine();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let result = engine
            .execute(Command::Reserve { spot: SpotId(3) }, now)
            .unwrap();
        let CommandResult::Spot(spot) = result else {
            panic!("expected a spot");
        };
        assert_eq!(spot.status, SpotStatus::Reserved);
    }

    #[test]
    fn errors_pass_through() {
        let engine = engine();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        assert!(matches!(
            engine.execute(Command::Release { spot: SpotId(3) }, now),
            Err(CoreError::SpotNotOccupied { .. })
        ));
    }
}
