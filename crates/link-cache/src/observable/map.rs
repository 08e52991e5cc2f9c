use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::broadcast;

use super::{DEFAULT_OPERATION_CAPACITY, MapOperation};

/// Key/value map that emits an operation for every membership change.
///
/// Replacing the value of an existing key emits `Remove` for the old value
/// followed by `Add` for the new one, so derived aggregates can treat every
/// operation independently.
pub struct ObservableMap<K, V> {
    entries: Mutex<FxHashMap<K, V>>,
    operations: broadcast::Sender<MapOperation<K, V>>,
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OPERATION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (operations, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: Mutex::new(FxHashMap::default()),
            operations,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MapOperation<K, V>> {
        self.operations.subscribe()
    }

    fn emit(&self, operation: MapOperation<K, V>) {
        let _ = self.operations.send(operation);
    }

    /// Inserts or replaces, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.clone(), value.clone());
        if let Some(old) = &previous {
            self.emit(MapOperation::Remove {
                key: key.clone(),
                value: old.clone(),
            });
        }
        self.emit(MapOperation::Add { key, value });
        previous
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(key);
        if let Some(value) = &removed {
            self.emit(MapOperation::Remove {
                key: key.clone(),
                value: value.clone(),
            });
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        for (key, value) in entries.drain() {
            self.emit(MapOperation::Remove { key, value });
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
