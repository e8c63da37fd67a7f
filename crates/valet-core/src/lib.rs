// valet-core: Parking lot engine shared by the valet front ends.
//
// Spots, clients and the activity log live in a reactive `DataStore`;
// the `Engine` drives the Available -> Occupied -> Available lifecycle,
// bills stays, and persists through a pluggable `Storage`.

pub mod activity_log;
pub mod billing;
pub mod command;
pub mod config;
mod convert;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod model;
pub mod money;
pub mod reports;
pub mod storage;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use activity_log::ActivityLog;
pub use command::{Command, CommandResult};
pub use config::{EngineConfig, EngineSettings};
pub use engine::{Engine, FeeQuote, OccupyReceipt, ReleaseReceipt};
pub use error::CoreError;
pub use inventory::{InventorySummary, StatusCounts};
pub use reports::{DailyReport, DayStats, MonthlyReport, PeriodStats, WeekStats, WeeklyReport};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageKey};
pub use store::DataStore;
pub use stream::{ActivityFilter, ClientFilter, EntityStream, SpotFilter};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Identity
    ActivityId, ClientId, SpotId,
    // Layout
    DEFAULT_CAPACITY, Layout, Sector, SectorLayout,
    // Spots
    ClientRef, Occupancy, ParkingSpot, SpotLocation, SpotSize, SpotStatus, SpotType, Vehicle,
    // Clients
    Client, ClientInfo,
    // Activity
    ActivityKind, ActivityRecord, NewActivity,
    // Pricing
    RateTable,
};
