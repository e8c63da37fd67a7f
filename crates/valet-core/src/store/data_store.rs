// ── Central reactive data store ──
//
// Owns the spot, client and activity collections. Mutations are
// broadcast to subscribers via `watch` channels; the engine decides
// *when* to mutate, the store only keeps things indexed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::activity_log::ActivityLog;
use crate::model::{ActivityRecord, Client, ClientId, ParkingSpot, SpotId};
use crate::stream::EntityStream;

/// Central reactive store for all engine entities.
pub struct DataStore {
    pub(crate) spots: EntityCollection<SpotId, ParkingSpot>,
    pub(crate) clients: EntityCollection<ClientId, Client>,
    pub(crate) activities: ActivityLog,
    /// Returning-client index: normalised name + phone -> id.
    pub(crate) client_index: DashMap<String, ClientId>,
    pub(crate) last_saved: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (last_saved, _) = watch::channel(None);

        Self {
            spots: EntityCollection::new(),
            clients: EntityCollection::new(),
            activities: ActivityLog::new(),
            client_index: DashMap::new(),
            last_saved,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn spots_snapshot(&self) -> Arc<Vec<Arc<ParkingSpot>>> {
        self.spots.snapshot()
    }

    pub fn clients_snapshot(&self) -> Arc<Vec<Arc<Client>>> {
        self.clients.snapshot()
    }

    /// Activities in append order (oldest first).
    pub fn activities_snapshot(&self) -> Arc<Vec<Arc<ActivityRecord>>> {
        self.activities.all()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn spot(&self, id: SpotId) -> Option<Arc<ParkingSpot>> {
        self.spots.get(&id)
    }

    pub fn client(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.get(&id)
    }

    pub fn client_by_key(&self, key: &str) -> Option<Arc<Client>> {
        let id = *self.client_index.get(key)?;
        self.clients.get(&id)
    }

    // ── Count accessors ──────────────────────────────────────────────

    pub fn spot_count(&self) -> usize {
        self.spots.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activities
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_spots(&self) -> EntityStream<ParkingSpot> {
        EntityStream::new(self.spots.subscribe())
    }

    pub fn subscribe_clients(&self) -> EntityStream<Client> {
        EntityStream::new(self.clients.subscribe())
    }

    pub fn subscribe_activities(&self) -> EntityStream<ActivityRecord> {
        self.activities.subscribe()
    }

    // ── Mutation helpers (engine only) ───────────────────────────────

    pub(crate) fn put_client(&self, client: Client) {
        self.client_index.insert(client.match_key(), client.id);
        self.clients.upsert(client.id, client);
    }

    pub(crate) fn replace_clients(&self, clients: Vec<Client>) {
        self.client_index.clear();
        for client in &clients {
            self.client_index.insert(client.match_key(), client.id);
        }
        self.clients
            .replace_all(clients.into_iter().map(|c| (c.id, c)));
    }

    pub(crate) fn next_client_id(&self) -> ClientId {
        ClientId(self.clients.max_key().map_or(1, |id| id.0 + 1))
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        *self.last_saved.borrow()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
