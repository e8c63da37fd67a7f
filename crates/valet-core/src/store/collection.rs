// ── Generic reactive entity collection ──
//
// O(1) keyed lookups plus an ordered snapshot that is pushed to
// subscribers through a `watch` channel on every mutation.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A reactive collection for a single entity type.
///
/// Snapshots are sorted by key so spot grids and activity feeds render
/// in a stable order.
pub(crate) struct EntityCollection<K, T>
where
    K: Copy + Eq + Hash + Ord + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Full ordered snapshot, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Copy + Eq + Hash + Ord + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or update an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, entity: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(entity)).is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Add an entity whose key sorts after every stored key.
    ///
    /// The snapshot is extended in place; a key that already exists
    /// falls back to a full rebuild.
    pub(crate) fn push(&self, key: K, entity: T) {
        let entity = Arc::new(entity);
        if self.by_key.insert(key, Arc::clone(&entity)).is_some() {
            self.rebuild_snapshot();
            return;
        }
        self.snapshot
            .send_modify(|snap| Arc::make_mut(snap).push(entity));
    }

    /// Replace the whole collection in one step (one snapshot rebuild).
    pub(crate) fn replace_all(&self, entities: impl IntoIterator<Item = (K, T)>) {
        self.by_key.clear();
        for (key, entity) in entities {
            self.by_key.insert(key, Arc::new(entity));
        }
        self.rebuild_snapshot();
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Largest key currently stored.
    pub(crate) fn max_key(&self) -> Option<K> {
        self.by_key.iter().map(|r| *r.key()).max()
    }

    /// Last entity of the ordered snapshot.
    pub(crate) fn last(&self) -> Option<Arc<T>> {
        self.snapshot.borrow().last().cloned()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values in key order and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(K, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (*r.key(), Arc::clone(r.value())))
            .collect();
        entries.sort_by_key(|(k, _)| *k);
        let values: Vec<Arc<T>> = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
