//! A string-keyed map that many threads can read and mutate at once.
//!
//! Every entry lives behind one reader/writer lock. Lookups and snapshots take
//! the shared side, mutations take the exclusive side, and
//! [`ConcurrentMap::insert_or_update`] does its existence check and write under
//! a single exclusive hold, so no other thread can slip in between.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use strmap::ConcurrentMap;
//!
//! let map: Arc<ConcurrentMap<u64>> = Arc::new(ConcurrentMap::new());
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || map.insert_or_update("hits", 1, |_, n| n + 1))
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(map.get("hits"), Some(4));
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::BuildHasher;

use log::{debug, trace};
use parking_lot::RwLock;

#[cfg(test)]
mod proptests;

/// Thread-safe map from `String` keys to values of type `V`.
///
/// All access goes through one [`RwLock`]: any number of readers may hold it
/// together, a writer holds it alone. There is no per-key locking.
///
/// Closures passed to [`insert_or_update`](Self::insert_or_update),
/// [`try_insert_or_update`](Self::try_insert_or_update) and
/// [`get_with`](Self::get_with) run while the lock is held. Calling back into
/// the same map from inside them deadlocks.
pub struct ConcurrentMap<V, S = ahash::RandomState> {
    entries: RwLock<HashMap<String, V, S>>,
}

impl<V> ConcurrentMap<V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::with_hasher(ahash::RandomState::new())
    }

    /// Creates an empty map with room for at least `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, ahash::RandomState::new())
    }
}

impl<V, S> ConcurrentMap<V, S> {
    /// Creates an empty map that hashes keys with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        debug!("new concurrent map");
        Self {
            entries: RwLock::new(HashMap::with_hasher(hasher)),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        debug!("new concurrent map, capacity {capacity}");
        Self {
            entries: RwLock::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
        }
    }

    /// Returns a snapshot of every key currently present, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        trace!("clear: dropping {} entries", entries.len());
        entries.clear();
    }
}

impl<V, S: BuildHasher> ConcurrentMap<V, S> {
    /// Inserts `value` under `key`, or merges into the value already there.
    ///
    /// If `key` is absent, `value` is stored as is. If `key` is present, the
    /// stored value becomes `merge(key, &old)` and `value` is dropped unused.
    ///
    /// The check and the write happen under one exclusive hold of the lock. If
    /// `merge` panics, the old value stays in place, the lock is released while
    /// unwinding and the panic reaches the caller.
    pub fn insert_or_update<F>(&self, key: impl Into<String>, value: V, merge: F)
    where
        F: FnOnce(&str, &V) -> V,
    {
        let mut entries = self.entries.write();
        match entries.entry(key.into()) {
            Entry::Occupied(mut slot) => {
                trace!("insert_or_update: merging into {:?}", slot.key());
                let merged = merge(slot.key().as_str(), slot.get());
                slot.insert(merged);
            }
            Entry::Vacant(slot) => {
                trace!("insert_or_update: inserting {:?}", slot.key());
                slot.insert(value);
            }
        }
    }

    /// Like [`insert_or_update`](Self::insert_or_update), but `merge` may fail.
    ///
    /// On `Err` the stored value is left untouched and the error is handed back
    /// unchanged. The insert path never calls `merge` and cannot fail.
    pub fn try_insert_or_update<F, E>(
        &self,
        key: impl Into<String>,
        value: V,
        merge: F,
    ) -> Result<(), E>
    where
        F: FnOnce(&str, &V) -> Result<V, E>,
    {
        let mut entries = self.entries.write();
        match entries.entry(key.into()) {
            Entry::Occupied(mut slot) => {
                let merged = merge(slot.key().as_str(), slot.get())?;
                trace!("try_insert_or_update: merged into {:?}", slot.key());
                slot.insert(merged);
            }
            Entry::Vacant(slot) => {
                trace!("try_insert_or_update: inserting {:?}", slot.key());
                slot.insert(value);
            }
        }
        Ok(())
    }

    /// Removes `key`. Absent keys are ignored.
    pub fn delete(&self, key: &str) {
        self.remove(key);
    }

    /// Removes `key` and returns the value it held, if any.
    pub fn remove(&self, key: &str) -> Option<V> {
        let removed = self.entries.write().remove(key);
        trace!("remove {key:?}: hit = {}", removed.is_some());
        removed
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Runs `f` on the value stored under `key` while holding the read lock.
    ///
    /// Useful when `V` is expensive or impossible to clone.
    pub fn get_with<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> R,
    {
        let entries = self.entries.read();
        f(entries.get(key))
    }
}

impl<V: Clone, S: BuildHasher> ConcurrentMap<V, S> {
    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with(key, |v| v.cloned())
    }
}

impl<V: Clone, S> ConcurrentMap<V, S> {
    /// Returns a snapshot of every value currently present, in no particular
    /// order. Equal values stored under different keys each appear once per key.
    pub fn values(&self) -> Vec<V> {
        self.entries.read().values().cloned().collect()
    }
}

impl<V, S: Default> Default for ConcurrentMap<V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<V: fmt::Debug, S> fmt::Debug for ConcurrentMap<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.read().iter()).finish()
    }
}

impl<K, V, S> FromIterator<(K, V)> for ConcurrentMap<V, S>
where
    K: Into<String>,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

// &mut self means no other thread can see the map, so skip the lock.
impl<K, V, S> Extend<(K, V)> for ConcurrentMap<V, S>
where
    K: Into<String>,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .get_mut()
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}
