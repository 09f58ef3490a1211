use thiserror::Error;

/// A red-black or binary-search-tree invariant that a tree failed to uphold.
///
/// Returned by [`RBTreeMap::check_invariants`](crate::RBTreeMap::check_invariants).
/// A correct tree never produces one; seeing this means memory corruption, a
/// key type whose `Ord` is not a total order, or a bug in this crate.
///
/// Depths are counted in edges from the root.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum InvariantError {
    #[error("root is red")]
    RedRoot,

    #[error("root has a parent link")]
    RootHasParent,

    #[error("child at depth {depth} does not link back to its parent")]
    BrokenParentLink { depth: usize },

    #[error("red node at depth {depth} has a red child")]
    RedRedEdge { depth: usize },

    #[error("black-height differs below depth {depth}: left {left}, right {right}")]
    BlackHeightMismatch { depth: usize, left: usize, right: usize },

    #[error("keys out of order at in-order position {position}")]
    KeysOutOfOrder { position: usize },

    #[error("reachable node count {reachable} does not match stored count {stored}")]
    CountMismatch { reachable: usize, stored: usize },
}
