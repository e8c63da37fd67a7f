// ── Unified domain model ──
//
// Canonical representation of everything the engine tracks. Storage
// adapters and front ends depend on these types, never on the loose
// shapes found in older saved data (see `convert`).

pub mod ids;

pub mod activity;
pub mod client;
pub mod layout;
pub mod rates;
pub mod spot;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use valet_core::model::*` gives you everything.

// Core identity
pub use ids::{ActivityId, ClientId, SpotId};

// Layout
pub use layout::{DEFAULT_CAPACITY, Layout, Sector, SectorLayout};

// Spots
pub use spot::{
    ClientRef, Occupancy, ParkingSpot, SpotLocation, SpotSize, SpotStatus, SpotType, Vehicle,
    is_valid_plate, normalize_plate,
};

// Clients
pub use client::{Client, ClientInfo};

// Activity
pub use activity::{ActivityKind, ActivityRecord, NewActivity};

// Pricing
pub use rates::{EffectiveRates, RateTable};
