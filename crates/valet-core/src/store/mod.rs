// ── Reactive data store ──
//
// Keyed entity storage with push-based change notification.

mod collection;
mod data_store;

pub(crate) use collection::EntityCollection;
pub use data_store::DataStore;
