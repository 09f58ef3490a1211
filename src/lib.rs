//! Red-Black Tree map for Rust.
//!
//! This crate provides [`RBTreeMap`], an ordered map with the same surface as
//! the standard library's `BTreeMap`, backed by a red-black tree whose nodes
//! live in an index-addressed arena. Search, insertion and removal are
//! O(log n) in the worst case for any insertion order.
//!
//! With the default `std` feature it also provides [`SyncRBTreeMap`], which
//! serializes every operation through one reader/writer lock so the map can be
//! shared between threads.
//!
//! # Example
//!
//! ```
//! use rbtree_map::RBTreeMap;
//!
//! let mut map = RBTreeMap::new();
//! for key in [5, 3, 7, 1, 9] {
//!     map.insert(key, key);
//! }
//!
//! assert_eq!(map.get(&7), Some(&7));
//! assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 3, 5, 7, 9]);
//!
//! // Neighbours of an existing key
//! assert_eq!(map.successor(&5), Some((&7, &7)));
//! assert_eq!(map.predecessor(&5), Some((&3, &3)));
//!
//! map.remove(&7);
//! assert_eq!(map.get(&7), None);
//! assert_eq!(map.check_invariants(), Ok(()));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Without the `std` feature only `alloc` is required
//! - **`std`** (default) - Enables [`SyncRBTreeMap`] on top of `parking_lot`
//!
//! # Implementation
//!
//! Every node is red or black, the root is black, no red node has a red child,
//! and every root-to-leaf path crosses the same number of black nodes.
//! Insertion repairs the tree bottom-up with recolorings and at most two
//! rotations; removal swaps a two-child node's entry with its in-order
//! successor, splices out a node with at most one child, and repairs the black
//! deficit with at most three rotations.

#![no_std]
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod rbtree_map;
#[cfg(feature = "std")]
mod sync;

pub use error::InvariantError;
pub use rbtree_map::RBTreeMap;
#[cfg(feature = "std")]
pub use sync::SyncRBTreeMap;
