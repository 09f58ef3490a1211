use core::borrow::Borrow;
use core::fmt;

use alloc::vec::Vec;

use log::{debug, trace};
use parking_lot::RwLock;

use crate::{InvariantError, RBTreeMap};

/// A [`RBTreeMap`] behind a single reader/writer lock.
///
/// Mutations ([`insert`], [`remove`], [`clear`]) take the lock exclusively;
/// lookups and snapshots take it shared, so any number of readers proceed
/// together but never overlap a writer. Each call holds the lock for its whole
/// duration, which makes every operation linearizable. The guard is dropped on
/// every return path, including "not found".
///
/// Values cross the lock boundary by clone, since a reference into the tree
/// cannot outlive the guard. Use [`read`] to borrow without cloning.
///
/// The lock is not reentrant. Calling back into the same `SyncRBTreeMap` from
/// inside [`read`] or [`write`] deadlocks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use rbtree_map::SyncRBTreeMap;
///
/// let map = Arc::new(SyncRBTreeMap::new());
/// let workers: Vec<_> = (0..4)
///     .map(|t| {
///         let map = Arc::clone(&map);
///         thread::spawn(move || {
///             for i in 0..100 {
///                 map.insert(t * 100 + i, i);
///             }
///         })
///     })
///     .collect();
/// for worker in workers {
///     worker.join().unwrap();
/// }
///
/// assert_eq!(map.len(), 400);
/// assert_eq!(map.get(&250), Some(50));
/// ```
///
/// [`insert`]: SyncRBTreeMap::insert
/// [`remove`]: SyncRBTreeMap::remove
/// [`clear`]: SyncRBTreeMap::clear
/// [`read`]: SyncRBTreeMap::read
/// [`write`]: SyncRBTreeMap::write
pub struct SyncRBTreeMap<K, V> {
    inner: RwLock<RBTreeMap<K, V>>,
}

impl<K, V> SyncRBTreeMap<K, V> {
    /// Makes a new, empty `SyncRBTreeMap`.
    #[must_use]
    pub const fn new() -> Self {
        SyncRBTreeMap {
            inner: RwLock::new(RBTreeMap::new()),
        }
    }

    /// Creates an empty map with room for at least `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        SyncRBTreeMap {
            inner: RwLock::new(RBTreeMap::with_capacity(capacity)),
        }
    }

    /// Consumes the wrapper and returns the map inside.
    pub fn into_inner(self) -> RBTreeMap<K, V> {
        self.inner.into_inner()
    }

    /// Returns a clone of the value for `key`, holding the shared lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::SyncRBTreeMap;
    ///
    /// let map = SyncRBTreeMap::new();
    /// map.insert(7, "seven");
    /// assert_eq!(map.get(&7), Some("seven"));
    /// assert_eq!(map.get(&8), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
        V: Clone,
    {
        self.inner.read().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.inner.read().contains_key(key)
    }

    /// Inserts under the exclusive lock. See [`RBTreeMap::insert`].
    pub fn insert(&self, key: K, value: V) -> Option<V>
    where
        K: Ord,
    {
        let mut map = self.inner.write();
        let previous = map.insert(key, value);
        trace!("SyncRBTreeMap::insert() - replaced: {}, len: {}", previous.is_some(), map.len());
        previous
    }

    /// Removes under the exclusive lock. See [`RBTreeMap::remove`].
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        let mut map = self.inner.write();
        let removed = map.remove(key);
        trace!("SyncRBTreeMap::remove() - found: {}, len: {}", removed.is_some(), map.len());
        removed
    }

    pub fn clear(&self) {
        let mut map = self.inner.write();
        debug!("SyncRBTreeMap::clear() - dropping {} entries", map.len());
        map.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    #[must_use]
    pub fn first_key_value(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().first_key_value().map(|(k, v)| (k.clone(), v.clone()))
    }

    #[must_use]
    pub fn last_key_value(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().last_key_value().map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Cloned entry after `key`; see [`RBTreeMap::successor`].
    pub fn successor<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord + Clone,
        Q: ?Sized + Ord,
        V: Clone,
    {
        self.inner.read().successor(key).map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Cloned entry before `key`; see [`RBTreeMap::predecessor`].
    pub fn predecessor<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord + Clone,
        Q: ?Sized + Ord,
        V: Clone,
    {
        self.inner.read().predecessor(key).map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Snapshot of the keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.read().keys().cloned().collect()
    }

    /// Snapshot of the values in key order (the in-order traversal).
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::SyncRBTreeMap;
    ///
    /// let map = SyncRBTreeMap::new();
    /// for key in [5, 3, 7, 1, 9] {
    ///     map.insert(key, key * 10);
    /// }
    /// assert_eq!(map.values(), [10, 30, 50, 70, 90]);
    /// ```
    #[must_use]
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.read().values().cloned().collect()
    }

    /// Snapshot of every entry in key order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Runs `f` against the map while holding the shared lock.
    ///
    /// `f` must not call back into this `SyncRBTreeMap`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::SyncRBTreeMap;
    ///
    /// let map = SyncRBTreeMap::new();
    /// map.insert("a", String::from("alpha"));
    /// let len = map.read(|m| m.get("a").map(String::len));
    /// assert_eq!(len, Some(5));
    /// ```
    pub fn read<R>(&self, f: impl FnOnce(&RBTreeMap<K, V>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` against the map while holding the exclusive lock, so several
    /// mutations land as one critical section.
    ///
    /// `f` must not call back into this `SyncRBTreeMap`.
    pub fn write<R>(&self, f: impl FnOnce(&mut RBTreeMap<K, V>) -> R) -> R {
        let mut map = self.inner.write();
        let result = f(&mut map);
        trace!("SyncRBTreeMap::write() - len: {}", map.len());
        result
    }

    /// Runs [`RBTreeMap::check_invariants`] under the shared lock.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantError`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Ord,
    {
        self.inner.read().check_invariants()
    }
}

impl<K, V> Default for SyncRBTreeMap<K, V> {
    fn default() -> Self {
        SyncRBTreeMap::new()
    }
}

impl<K, V> From<RBTreeMap<K, V>> for SyncRBTreeMap<K, V> {
    fn from(map: RBTreeMap<K, V>) -> Self {
        SyncRBTreeMap {
            inner: RwLock::new(map),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SyncRBTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(map) => f.debug_struct("SyncRBTreeMap").field("map", &*map).finish(),
            None => f.debug_struct("SyncRBTreeMap").field("map", &format_args!("<locked>")).finish(),
        }
    }
}
