//! # Cached Links Repository
//!
//! Owns every [`CachedLinks`] entry of the process. Each key maps to its own
//! slot holding the current value and a broadcast channel of updates, so
//! observing one film/episode never wakes subscribers of another.
//!
//! Mutations of a key are serialized by that slot's lock; unrelated keys never
//! contend beyond the brief map lookup. Every cache operation is total: racing
//! extractors, observers and removals can interleave freely without errors.

use std::sync::{Arc, Weak};

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};
use tracing::{debug, trace, warn};

use crate::model::{CacheKey, CachedLinks, FilmKey, MediaLink, Stream, Subtitle};

/// Immutable view of every entry at some point in time.
pub type CacheSnapshot = Arc<FxHashMap<CacheKey, CachedLinks>>;

/// Continuously updated view of one key: the current value first, then one
/// item per applied mutation. A removed entry yields `None` and ends the stream.
pub type CacheObservation = BoxStream<'static, Option<CachedLinks>>;

#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Updates buffered per observer before it starts lagging.
    pub observer_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            observer_capacity: 64,
        }
    }
}

struct SlotState {
    links: Option<CachedLinks>,
    // Set once the slot was removed from the map; writers must re-resolve.
    detached: bool,
}

type SlotMap = RwLock<FxHashMap<CacheKey, Arc<CacheSlot>>>;

struct Observer {
    key: CacheKey,
    slot: Arc<CacheSlot>,
    slots: Weak<SlotMap>,
    // Taken on drop, before the slot is checked for reclamation.
    receiver: Option<broadcast::Receiver<Option<CachedLinks>>>,
    // Emitted before any update
    initial: Option<Option<CachedLinks>>,
    finished: bool,
}

impl Drop for Observer {
    /// Reclaims the slot of a key that was observed but never populated.
    fn drop(&mut self) {
        drop(self.receiver.take());
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        let mut slots = slots.write();
        let Some(current) = slots.get(&self.key) else {
            return;
        };
        if !Arc::ptr_eq(current, &self.slot) {
            return;
        }
        {
            let mut state = self.slot.state.lock();
            if state.links.is_some() || self.slot.updates.receiver_count() > 0 {
                return;
            }
            state.detached = true;
        }
        slots.remove(&self.key);
        trace!(key = %self.key, "reclaimed unpopulated slot");
    }
}

struct CacheSlot {
    state: Mutex<SlotState>,
    updates: broadcast::Sender<Option<CachedLinks>>,
}

impl CacheSlot {
    fn new(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(SlotState {
                links: None,
                detached: false,
            }),
            updates,
        }
    }

    fn publish(&self, links: Option<CachedLinks>) {
        let _ = self.updates.send(links);
    }
}

pub struct CachedLinksRepository {
    slots: Arc<SlotMap>,
    snapshot: watch::Sender<CacheSnapshot>,
    config: RepositoryConfig,
}

impl Default for CachedLinksRepository {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl CachedLinksRepository {
    pub fn new(config: RepositoryConfig) -> Self {
        let (snapshot, _) = watch::channel(CacheSnapshot::default());
        Self {
            slots: Arc::new(RwLock::new(FxHashMap::default())),
            snapshot,
            config,
        }
    }

    fn slot(&self, key: &CacheKey) -> Arc<CacheSlot> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(CacheSlot::new(self.config.observer_capacity))),
        )
    }

    /// Runs `mutate` on the live slot of `key` under its lock. Retries when
    /// the slot was removed between lookup and lock.
    fn with_slot<R>(
        &self,
        key: &CacheKey,
        mutate: impl FnOnce(&CacheSlot, &mut SlotState) -> R,
    ) -> R {
        loop {
            let slot = self.slot(key);
            let mut state = slot.state.lock();
            if state.detached {
                continue;
            }
            return mutate(&slot, &mut state);
        }
    }

    fn update_snapshot(&self, key: &CacheKey, links: Option<&CachedLinks>) {
        self.snapshot.send_modify(|snapshot| {
            let map = Arc::make_mut(snapshot);
            match links {
                Some(links) => {
                    map.insert(key.clone(), links.clone());
                }
                None => {
                    map.remove(key);
                }
            }
        });
    }

    /// Inserts or replaces the entry for `key` wholesale.
    pub fn store_cache(&self, key: &CacheKey, links: CachedLinks) {
        self.with_slot(key, |slot, state| {
            self.update_snapshot(key, Some(&links));
            state.links = Some(links.clone());
            slot.publish(Some(links));
        });
        debug!(key = %key, "stored cache entry");
    }

    /// Returns the entry for `key`, creating it with `init` when absent.
    pub fn get_or_insert_with(
        &self,
        key: &CacheKey,
        init: impl FnOnce() -> CachedLinks,
    ) -> CachedLinks {
        self.with_slot(key, |slot, state| {
            if let Some(links) = &state.links {
                return links.clone();
            }
            let links = init();
            state.links = Some(links.clone());
            self.update_snapshot(key, Some(&links));
            slot.publish(Some(links.clone()));
            links
        })
    }

    /// Merges one discovered link into the entry for `key`, creating the
    /// entry if needed. Returns `true` if the link was new; observers are only
    /// notified in that case.
    pub fn add_link(&self, key: &CacheKey, link: MediaLink) -> bool {
        let added = self.with_slot(key, |slot, state| {
            let created = state.links.is_none();
            let links = state.links.get_or_insert_with(|| CachedLinks::for_key(key));
            let added = links.append(link);
            if added || created {
                let links = links.clone();
                self.update_snapshot(key, Some(&links));
                slot.publish(Some(links));
            }
            added
        });
        trace!(key = %key, added, "merged link");
        added
    }

    pub fn add_stream(&self, key: &CacheKey, stream: Stream) -> bool {
        self.add_link(key, MediaLink::Stream(stream))
    }

    pub fn add_subtitle(&self, key: &CacheKey, subtitle: Subtitle) -> bool {
        self.add_link(key, MediaLink::Subtitle(subtitle))
    }

    pub fn get_cache(&self, key: &CacheKey) -> Option<CachedLinks> {
        let slot = self.slots.read().get(key).cloned()?;
        let state = slot.state.lock();
        state.links.clone()
    }

    /// Every provider's entry for the same film/episode.
    pub fn find_by_film(&self, film: &FilmKey) -> Vec<(CacheKey, CachedLinks)> {
        let snapshot = self.caches();
        let mut found: Vec<_> = snapshot
            .iter()
            .filter(|(key, _)| key.film_key() == film)
            .map(|(key, links)| (key.clone(), links.clone()))
            .collect();
        found.sort_by(|(a, _), (b, _)| a.cmp(b));
        found
    }

    /// Observes `key`. The first item is the current entry, or `default` if
    /// there is none yet; every later mutation follows in application order.
    pub fn observe_cache(&self, key: &CacheKey, default: Option<CachedLinks>) -> CacheObservation {
        let (slot, current, receiver) = self.subscribe_slot(key);
        let observer = Observer {
            key: key.clone(),
            slot,
            slots: Arc::downgrade(&self.slots),
            receiver: Some(receiver),
            initial: Some(current.or(default)),
            finished: false,
        };

        stream::unfold(observer, |mut observer| async move {
            if let Some(initial) = observer.initial.take() {
                return Some((initial, observer));
            }
            if observer.finished {
                return None;
            }
            loop {
                let receiver = observer.receiver.as_mut()?;
                match receiver.recv().await {
                    Ok(Some(links)) => return Some((Some(links), observer)),
                    Ok(None) => {
                        observer.finished = true;
                        return Some((None, observer));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Every update carries the full entry, so resuming
                        // from a newer one loses no data.
                        warn!(key = %observer.key, skipped, "cache observer lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    /// Locks the live slot of `key` and subscribes to it while holding the
    /// lock, so the returned value and the update stream line up exactly.
    fn subscribe_slot(
        &self,
        key: &CacheKey,
    ) -> (
        Arc<CacheSlot>,
        Option<CachedLinks>,
        broadcast::Receiver<Option<CachedLinks>>,
    ) {
        loop {
            let slot = self.slot(key);
            let (current, receiver) = {
                let state = slot.state.lock();
                if state.detached {
                    continue;
                }
                (state.links.clone(), slot.updates.subscribe())
            };
            return (slot, current, receiver);
        }
    }

    /// Deletes the entry for `key`. Active observers receive `None` and end.
    pub fn remove_cache(&self, key: &CacheKey) -> Option<CachedLinks> {
        // The map stays locked until the snapshot is updated, so a writer
        // recreating the key cannot publish before this removal does.
        let removed = {
            let mut slots = self.slots.write();
            let slot = slots.remove(key)?;
            let mut state = slot.state.lock();
            state.detached = true;
            self.update_snapshot(key, None);
            slot.publish(None);
            state.links.take()
        };
        debug!(key = %key, existed = removed.is_some(), "removed cache entry");
        removed
    }

    /// Deletes every entry. Active observers receive `None` and end.
    pub fn clear(&self) {
        let mut slots = self.slots.write();
        let count = slots.len();
        for (key, slot) in slots.drain() {
            let mut state = slot.state.lock();
            state.detached = true;
            state.links = None;
            self.update_snapshot(&key, None);
            slot.publish(None);
        }
        drop(slots);
        debug!(count, "cleared link cache");
    }

    /// Current view of every entry.
    pub fn caches(&self) -> CacheSnapshot {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Live view of the whole map, latest value wins.
    pub fn observe_caches(&self) -> watch::Receiver<CacheSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }
}
