use super::RBTreeMap;
use crate::raw::RawRBTreeMap;

impl<K, V> RBTreeMap<K, V> {
    /// Creates an empty map whose node arena has room for at least
    /// `capacity` entries before reallocating.
    ///
    /// This is an extension and is not part of the standard `BTreeMap` API.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::RBTreeMap;
    ///
    /// let map: RBTreeMap<i32, i32> = RBTreeMap::with_capacity(32);
    /// assert!(map.is_empty());
    /// assert!(map.capacity() >= 32);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        RBTreeMap {
            raw: RawRBTreeMap::with_capacity(capacity),
        }
    }

    /// Returns how many entries the map can hold without reallocating its
    /// node arena. Slots freed by removals are reused first.
    ///
    /// This is an extension and is not part of the standard `BTreeMap` API.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }
}
