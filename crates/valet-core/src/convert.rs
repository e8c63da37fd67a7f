// ── Stored-record to domain type conversions ──
//
// Bridges whatever JSON is found under a storage key into canonical
// `valet_core::model` types. Older data used camelCase keys, `"pcd"`,
// Portuguese status words, millisecond timestamps and flat
// vehicle/client fields on the spot; all of it is accepted here so the
// rest of the engine only ever sees the canonical shape.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::inventory;
use crate::model::{
    ActivityId, ActivityKind, ActivityRecord, Client, ClientId, ClientRef, Layout, Occupancy,
    ParkingSpot, RateTable, Sector, SpotId, SpotLocation, SpotSize, SpotStatus, SpotType, Vehicle,
};

/// A decoded collection plus how many records had to be repaired.
#[derive(Debug)]
pub(crate) struct Loaded<T> {
    pub(crate) value: T,
    pub(crate) repaired: usize,
}

// ── Helpers ────────────────────────────────────────────────────────

/// Timestamps were written as ISO strings, epoch milliseconds, or
/// (rarely) fractional milliseconds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl RawTimestamp {
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Fractional(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
            Self::Fractional(_) => None,
            Self::Text(text) => parse_datetime(text),
        }
    }
}

/// RFC 3339 first, then a naive datetime or bare date read as UTC.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn resolve_time(raw: Option<&RawTimestamp>) -> Option<DateTime<Utc>> {
    raw.and_then(RawTimestamp::resolve)
}

/// A vehicle stored either as a bare plate or as an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVehicle {
    Plate(String),
    Full {
        plate: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
}

impl RawVehicle {
    fn into_vehicle(self) -> Option<Vehicle> {
        let vehicle = match self {
            Self::Plate(plate) => Vehicle::new(plate, "", ""),
            Self::Full {
                plate,
                model,
                color,
            } => Vehicle::new(plate, model.unwrap_or_default(), color.unwrap_or_default()),
        };
        (!vehicle.plate.is_empty()).then_some(vehicle)
    }
}

/// A spot's client stored as a bare name or as an object with or
/// without an id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawClientRef {
    Name(String),
    Ref {
        #[serde(default)]
        id: Option<ClientId>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        phone: Option<String>,
    },
}

/// Map a status word (English or Portuguese) onto [`SpotStatus`].
fn parse_status(raw: &str) -> Option<SpotStatus> {
    match raw.trim().to_lowercase().as_str() {
        "available" | "disponivel" | "disponível" | "livre" | "free" => Some(SpotStatus::Available),
        "occupied" | "ocupada" | "ocupado" => Some(SpotStatus::Occupied),
        "reserved" | "reservada" | "reservado" => Some(SpotStatus::Reserved),
        _ => None,
    }
}

/// Map a kind word onto [`ActivityKind`]; anything unknown (logins,
/// maintenance notes) is kept as a system record.
fn parse_kind(raw: &str) -> ActivityKind {
    match raw.trim().to_lowercase().as_str() {
        "entry" | "entrada" | "checkin" | "check-in" => ActivityKind::Entry,
        "exit" | "saida" | "saída" | "checkout" | "check-out" => ActivityKind::Exit,
        "payment" | "pagamento" => ActivityKind::Payment,
        _ => ActivityKind::System,
    }
}

// ── Spots ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawSpot {
    #[serde(default)]
    id: Option<u32>,
    number: u32,
    sector: String,
    #[serde(default, rename = "type", alias = "spot_type")]
    spot_type: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    features: Option<Vec<String>>,
    #[serde(default)]
    size: Option<SpotSize>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    occupancy: Option<Occupancy>,
    #[serde(default)]
    vehicle: Option<RawVehicle>,
    #[serde(default)]
    client: Option<RawClientRef>,
    #[serde(default, alias = "entryTime")]
    entry_time: Option<RawTimestamp>,
    #[serde(default)]
    notes: Option<String>,
}

/// Decode the `spots` collection.
///
/// `resolve_client` maps a stored client (name, phone) without an id to a
/// known client. Occupied spots missing any part of their occupancy are
/// reset to available; spots with an unknown sector are dropped.
pub(crate) fn spots_from_json(
    raw: &str,
    resolve_client: impl Fn(&str, &str) -> Option<ClientRef>,
) -> Result<Loaded<Vec<ParkingSpot>>, serde_json::Error> {
    let records: Vec<RawSpot> = serde_json::from_str(raw)?;
    let mut repaired = 0;
    let mut seen = HashSet::new();
    let mut spots = Vec::with_capacity(records.len());

    for record in records {
        let number = record.number;
        let Ok(sector) = record.sector.parse::<Sector>() else {
            warn!(spot = number, sector = %record.sector, "dropping spot with unknown sector");
            repaired += 1;
            continue;
        };
        let id = SpotId(record.id.unwrap_or(number));
        if !seen.insert(id) {
            warn!(spot = %id, "dropping duplicate spot");
            repaired += 1;
            continue;
        }

        let (spot, fixed) = normalize_spot(id, sector, record, &resolve_client);
        if fixed {
            repaired += 1;
        }
        spots.push(spot);
    }

    spots.sort_by_key(|s| s.id);
    debug!(count = spots.len(), repaired, "decoded spots");
    Ok(Loaded {
        value: spots,
        repaired,
    })
}

fn normalize_spot(
    id: SpotId,
    sector: Sector,
    record: RawSpot,
    resolve_client: &impl Fn(&str, &str) -> Option<ClientRef>,
) -> (ParkingSpot, bool) {
    let number = record.number;
    let spot_type = record
        .spot_type
        .as_deref()
        .and_then(|t| t.parse::<SpotType>().ok())
        .unwrap_or_default();
    let location = record
        .location
        .as_deref()
        .and_then(|l| l.parse::<SpotLocation>().ok())
        .unwrap_or_else(|| inventory::location_for(sector, number));
    let features = record
        .features
        .unwrap_or_else(|| inventory::features_for(spot_type, location));

    let status = match record.status.as_deref() {
        None => SpotStatus::Available,
        Some(word) => parse_status(word).unwrap_or_else(|| {
            warn!(spot = number, status = word, "unknown spot status, treating as available");
            SpotStatus::Available
        }),
    };

    // Canonical records carry `occupancy`; older ones spread it over
    // three optional fields.
    let occupancy = record.occupancy.or_else(|| {
        let vehicle = record.vehicle.and_then(RawVehicle::into_vehicle)?;
        let client = record.client.and_then(|c| client_ref(c, resolve_client))?;
        let entry_time = resolve_time(record.entry_time.as_ref())?;
        Some(Occupancy {
            vehicle,
            client,
            entry_time,
        })
    });

    let mut spot = ParkingSpot {
        id,
        number,
        sector,
        spot_type,
        location,
        features,
        size: record.size.unwrap_or_else(|| spot_type.size()),
        status,
        occupancy,
        notes: record.notes.unwrap_or_default(),
    };

    let fixed = !spot.is_consistent();
    if fixed {
        warn!(
            spot = %spot.id,
            status = %spot.status,
            has_occupancy = spot.occupancy.is_some(),
            "inconsistent occupancy, resetting spot to available"
        );
        spot.vacate();
    }
    (spot, fixed)
}

fn client_ref(
    raw: RawClientRef,
    resolve_client: &impl Fn(&str, &str) -> Option<ClientRef>,
) -> Option<ClientRef> {
    match raw {
        RawClientRef::Ref {
            id: Some(id),
            name,
            ..
        } => Some(ClientRef {
            id,
            name: name.unwrap_or_default(),
        }),
        RawClientRef::Ref {
            id: None,
            name,
            phone,
        } => resolve_client(&name.unwrap_or_default(), &phone.unwrap_or_default()),
        RawClientRef::Name(name) => resolve_client(&name, ""),
    }
}

// ── Clients ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawClient {
    id: ClientId,
    name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    vehicle: Option<RawVehicle>,
    #[serde(default, alias = "totalSpent")]
    total_spent: Option<f64>,
    #[serde(default)]
    visits: Option<u32>,
    #[serde(default, alias = "registeredAt", alias = "registrationDate")]
    registered_at: Option<RawTimestamp>,
    #[serde(default, alias = "lastVisit")]
    last_visit: Option<RawTimestamp>,
}

/// Decode the `clients` collection. Missing registration dates fall back
/// to `now`; duplicate ids keep the first record.
pub(crate) fn clients_from_json(
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Loaded<Vec<Client>>, serde_json::Error> {
    let records: Vec<RawClient> = serde_json::from_str(raw)?;
    let mut repaired = 0;
    let mut seen = HashSet::new();
    let mut clients = Vec::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.id) {
            warn!(client = %record.id, "dropping duplicate client");
            repaired += 1;
            continue;
        }
        let registered_at = resolve_time(record.registered_at.as_ref()).unwrap_or_else(|| {
            repaired += 1;
            now
        });
        let total_spent = record
            .total_spent
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or_default();

        clients.push(Client {
            id: record.id,
            name: record.name.trim().to_owned(),
            phone: record.phone.unwrap_or_default().trim().to_owned(),
            vehicle: record.vehicle.and_then(RawVehicle::into_vehicle),
            total_spent,
            visits: record.visits.unwrap_or_default(),
            registered_at,
            last_visit: resolve_time(record.last_visit.as_ref()),
        });
    }

    clients.sort_by_key(|c| c.id);
    debug!(count = clients.len(), repaired, "decoded clients");
    Ok(Loaded {
        value: clients,
        repaired,
    })
}

// ── Activities ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawActivity {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(alias = "type")]
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "time")]
    timestamp: Option<RawTimestamp>,
    #[serde(default, alias = "spot", alias = "spotNumber")]
    spot_number: Option<u32>,
}

/// Decode the `activities` collection.
///
/// Records without a readable timestamp are dropped. When ids are
/// missing, non-numeric or repeated, the log is ordered by time and
/// renumbered from 1 so ids stay monotonic with append order.
pub(crate) fn activities_from_json(
    raw: &str,
) -> Result<Loaded<Vec<ActivityRecord>>, serde_json::Error> {
    let records: Vec<RawActivity> = serde_json::from_str(raw)?;
    let mut repaired = 0;
    let mut ids_usable = true;
    let mut seen = HashSet::new();
    let mut activities = Vec::with_capacity(records.len());

    for record in records {
        let Some(timestamp) = resolve_time(record.timestamp.as_ref()) else {
            warn!(kind = %record.kind, "dropping activity without a timestamp");
            repaired += 1;
            continue;
        };
        let id = record.id.as_ref().and_then(serde_json::Value::as_u64);
        match id {
            Some(id) if id > 0 && seen.insert(id) => {}
            _ => ids_usable = false,
        }
        activities.push(ActivityRecord {
            id: ActivityId(id.unwrap_or_default()),
            kind: parse_kind(&record.kind),
            title: record.title.unwrap_or_default(),
            description: record.description.unwrap_or_default(),
            timestamp,
            spot_number: record.spot_number,
        });
    }

    if ids_usable {
        activities.sort_by_key(|a| a.id);
    } else {
        debug!("renumbering activity log");
        repaired += 1;
        activities.sort_by_key(|a| a.timestamp);
        for (activity, id) in activities.iter_mut().zip(1u64..) {
            activity.id = ActivityId(id);
        }
    }

    Ok(Loaded {
        value: activities,
        repaired,
    })
}

// ── Settings ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawRates {
    #[serde(default, alias = "firstHour")]
    first_hour: Option<f64>,
    #[serde(default, alias = "additionalHour")]
    additional_hour: Option<f64>,
    #[serde(default)]
    daily: Option<f64>,
    #[serde(default, alias = "pcd_discount", alias = "pcdDiscount")]
    accessible_discount: Option<f64>,
    #[serde(default, alias = "vipDiscount")]
    vip_discount: Option<f64>,
    #[serde(default)]
    nightly: Option<f64>,
    #[serde(default)]
    monthly: Option<f64>,
}

impl RawRates {
    fn over(self, base: RateTable) -> RateTable {
        RateTable {
            first_hour: self.first_hour.unwrap_or(base.first_hour),
            additional_hour: self.additional_hour.unwrap_or(base.additional_hour),
            daily: self.daily.unwrap_or(base.daily),
            accessible_discount: self.accessible_discount.unwrap_or(base.accessible_discount),
            vip_discount: self.vip_discount.unwrap_or(base.vip_discount),
            nightly: self.nightly.unwrap_or(base.nightly),
            monthly: self.monthly.unwrap_or(base.monthly),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default, alias = "prices")]
    rates: Option<RawRates>,
    #[serde(default)]
    layout: Option<Layout>,
}

/// Decode persisted settings over `defaults`.
///
/// Stored rates or layouts that fail validation are discarded in favour
/// of the defaults.
pub(crate) fn settings_from_json(
    raw: &str,
    defaults: &EngineSettings,
    capacity: u32,
) -> Result<Loaded<EngineSettings>, serde_json::Error> {
    let record: RawSettings = serde_json::from_str(raw)?;
    let mut repaired = 0;

    let rates = record
        .rates
        .map_or(defaults.rates, |r| r.over(defaults.rates));
    let rates = match rates.validate() {
        Ok(()) => rates,
        Err(e) => {
            warn!(error = %e, "stored rate table rejected, using defaults");
            repaired += 1;
            defaults.rates
        }
    };

    let layout = match record.layout {
        Some(layout) => match layout.validate(capacity) {
            Ok(()) => layout,
            Err(e) => {
                warn!(error = %e, "stored layout rejected, using defaults");
                repaired += 1;
                defaults.layout.clone()
            }
        },
        None => defaults.layout.clone(),
    };

    Ok(Loaded {
        value: EngineSettings { rates, layout },
        repaired,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn no_clients(_: &str, _: &str) -> Option<ClientRef> {
        None
    }

    fn known_client(name: &str, _: &str) -> Option<ClientRef> {
        (name == "Ana").then(|| ClientRef {
            id: ClientId(7),
            name: name.to_owned(),
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn canonical_spots_decode_unchanged() {
        let mut spots = inventory::generate(&Layout::default());
        spots[4].park(Occupancy {
            vehicle: Vehicle::new("ABC1234", "Civic", "Black"),
            client: ClientRef {
                id: ClientId(1),
                name: "Ana".into(),
            },
            entry_time: now(),
        });
        let json = serde_json::to_string(&spots).unwrap();

        let loaded = spots_from_json(&json, no_clients).unwrap();
        assert_eq!(loaded.repaired, 0);
        assert_eq!(loaded.value, spots);
    }

    #[test]
    fn legacy_spot_shape_is_accepted() {
        let json = r#"[{
            "id": 3, "number": 3, "sector": "a", "type": "PCD",
            "status": "ocupada",
            "vehicle": {"plate": "abc 1234", "model": "Gol", "color": null},
            "client": {"id": 2, "name": "Ana"},
            "entryTime": 1714564800000,
            "notes": null, "hourlyRate": 7.5
        }]"#;

        let loaded = spots_from_json(json, no_clients).unwrap();
        assert_eq!(loaded.repaired, 0);
        let spot = &loaded.value[0];
        assert_eq!(spot.sector, Sector::A);
        assert_eq!(spot.spot_type, SpotType::Accessible);
        assert_eq!(spot.status, SpotStatus::Occupied);
        assert_eq!(spot.vehicle().unwrap().plate, "ABC1234");
        assert_eq!(spot.client().unwrap().id, ClientId(2));
        assert_eq!(spot.entry_time(), Some(now()));
        assert_eq!(spot.size, SpotType::Accessible.size());
        assert!(spot.features.contains(&"Ramp".to_owned()));
    }

    #[test]
    fn iso_entry_time_and_named_client_resolve() {
        let json = r#"[{
            "number": 9, "sector": "B", "status": "occupied",
            "vehicle": "xyz9z99",
            "client": "Ana",
            "entryTime": "2024-05-01T12:00:00.000Z"
        }]"#;

        let loaded = spots_from_json(json, known_client).unwrap();
        let spot = &loaded.value[0];
        assert_eq!(spot.id, SpotId(9));
        assert!(spot.is_occupied());
        assert_eq!(spot.client().unwrap().id, ClientId(7));
        assert_eq!(spot.entry_time(), Some(now()));
    }

    #[test]
    fn occupied_spot_missing_entry_time_is_reset() {
        let json = r#"[{
            "number": 1, "sector": "A", "status": "occupied",
            "vehicle": {"plate": "AAA0000"}, "client": {"id": 1, "name": "X"}
        }]"#;

        let loaded = spots_from_json(json, no_clients).unwrap();
        assert_eq!(loaded.repaired, 1);
        let spot = &loaded.value[0];
        assert!(spot.is_available());
        assert!(spot.occupancy.is_none());
    }

    #[test]
    fn available_spot_with_leftover_vehicle_is_cleared() {
        let json = r#"[{
            "number": 1, "sector": "A", "status": "available",
            "vehicle": {"plate": "AAA0000"}, "client": {"id": 1, "name": "X"},
            "entryTime": 1714564800000
        }]"#;

        let loaded = spots_from_json(json, no_clients).unwrap();
        assert_eq!(loaded.repaired, 1);
        assert!(loaded.value[0].is_consistent());
        assert!(loaded.value[0].occupancy.is_none());
    }

    #[test]
    fn unknown_sector_and_duplicates_are_dropped() {
        let json = r#"[
            {"number": 1, "sector": "A"},
            {"number": 1, "sector": "A"},
            {"number": 2, "sector": "Z"}
        ]"#;

        let loaded = spots_from_json(json, no_clients).unwrap();
        assert_eq!(loaded.value.len(), 1);
        assert_eq!(loaded.repaired, 2);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(spots_from_json("{not json", no_clients).is_err());
        assert!(clients_from_json("[1, 2]", now()).is_err());
    }

    #[test]
    fn legacy_clients_decode() {
        let json = r#"[{
            "id": 1, "type": "regular", "name": " João ",
            "phone": "(11) 99999-9999",
            "registrationDate": "2023-01-15T00:00:00.000Z",
            "totalSpent": 2450.5, "visits": 42, "category": "gold"
        }]"#;

        let loaded = clients_from_json(json, now()).unwrap();
        assert_eq!(loaded.repaired, 0);
        let client = &loaded.value[0];
        assert_eq!(client.name, "João");
        assert_eq!(client.visits, 42);
        assert!((client.total_spent - 2450.5).abs() < 1e-9);
        assert_eq!(
            client.registered_at,
            Utc.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn client_without_registration_uses_now() {
        let loaded = clients_from_json(r#"[{"id": 4, "name": "Bo"}]"#, now()).unwrap();
        assert_eq!(loaded.value[0].registered_at, now());
        assert_eq!(loaded.repaired, 1);
    }

    #[test]
    fn legacy_activities_are_renumbered_in_time_order() {
        let json = r#"[
            {"id": "a-2", "type": "payment", "title": "Paid",
             "description": "R$ 35,00", "time": "2024-05-01T13:00:00Z", "spot": 4},
            {"id": "a-1", "type": "entry", "title": "In",
             "description": "", "time": "2024-05-01T12:00:00Z", "spot": 4},
            {"type": "login", "title": "Session", "time": "2024-05-01T11:00:00Z"},
            {"type": "exit", "title": "Broken"}
        ]"#;

        let loaded = activities_from_json(json).unwrap();
        let kinds: Vec<ActivityKind> = loaded.value.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ActivityKind::System, ActivityKind::Entry, ActivityKind::Payment]
        );
        let ids: Vec<u64> = loaded.value.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(loaded.value[1].spot_number, Some(4));
        assert_eq!(loaded.repaired, 2);
    }

    #[test]
    fn canonical_activities_keep_their_ids() {
        let json = r#"[
            {"id": 5, "kind": "exit", "title": "Out", "description": "",
             "timestamp": "2024-05-01T12:00:00Z", "spot_number": 1},
            {"id": 9, "kind": "payment", "title": "Paid", "description": "R$ 15,00",
             "timestamp": "2024-05-01T12:00:00Z", "spot_number": 1}
        ]"#;

        let loaded = activities_from_json(json).unwrap();
        assert_eq!(loaded.repaired, 0);
        assert_eq!(loaded.value[0].id, ActivityId(5));
        assert_eq!(loaded.value[1].id, ActivityId(9));
    }

    #[test]
    fn legacy_prices_fill_over_defaults() {
        let defaults = EngineSettings {
            rates: RateTable::default(),
            layout: Layout::default(),
        };
        let json = r#"{"prices": {"firstHour": 20, "pcdDiscount": 0.4, "carWash": 45},
                       "sectors": {"A": {"total": 30}}}"#;

        let loaded = settings_from_json(json, &defaults, 200).unwrap();
        assert_eq!(loaded.repaired, 0);
        assert!((loaded.value.rates.first_hour - 20.0).abs() < 1e-9);
        assert!((loaded.value.rates.accessible_discount - 0.4).abs() < 1e-9);
        assert!((loaded.value.rates.daily - 80.0).abs() < 1e-9);
        assert_eq!(loaded.value.layout, Layout::default());
    }

    #[test]
    fn invalid_stored_rates_fall_back() {
        let defaults = EngineSettings {
            rates: RateTable::default(),
            layout: Layout::default(),
        };
        let json = r#"{"rates": {"first_hour": -1, "additional_hour": 10, "daily": 80}}"#;

        let loaded = settings_from_json(json, &defaults, 200).unwrap();
        assert_eq!(loaded.repaired, 1);
        assert_eq!(loaded.value.rates, RateTable::default());
    }
}
