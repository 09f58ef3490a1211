use core::borrow::Borrow;
use core::cmp::Ordering;
use core::mem;

use alloc::vec::Vec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Color, Dir, Node};
use crate::InvariantError;

/// The red-black tree engine backing `RBTreeMap`.
///
/// Nodes live in an arena and refer to each other by [`Handle`]. The engine
/// assumes a single logical operation at a time; synchronization is the
/// caller's business.
#[derive(Clone)]
pub(crate) struct RawRBTreeMap<K, V> {
    nodes: Arena<Node<K, V>>,
    root: Option<Handle>,
}

impl<K, V> RawRBTreeMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
        }
    }

    /// Creates a new tree with room for `capacity` nodes.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            root: None,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Returns the node behind `handle`.
    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    /// Handle of the minimum entry.
    pub(crate) fn first(&self) -> Option<Handle> {
        self.root.map(|root| self.extreme(root, Dir::Left))
    }

    /// Handle of the maximum entry.
    pub(crate) fn last(&self) -> Option<Handle> {
        self.root.map(|root| self.extreme(root, Dir::Right))
    }

    /// In-order successor of `handle`.
    pub(crate) fn next(&self, handle: Handle) -> Option<Handle> {
        self.step(handle, Dir::Right)
    }

    /// In-order predecessor of `handle`.
    pub(crate) fn prev(&self, handle: Handle) -> Option<Handle> {
        self.step(handle, Dir::Left)
    }

    /// Removes and returns the minimum entry.
    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let first = self.first()?;
        Some(self.remove_handle(first))
    }

    /// Removes and returns the maximum entry.
    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let last = self.last()?;
        Some(self.remove_handle(last))
    }

    /// Moves every entry out in key order, leaving the tree empty.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        let order = self.handles_in_order();
        let entries = order.into_iter().map(|h| self.nodes.take(h).into_entry()).collect();
        self.clear();
        entries
    }

    /// Mutable access to every entry in key order.
    pub(crate) fn entries_mut(&mut self) -> Vec<(&K, &mut V)> {
        let order = self.handles_in_order();
        let mut slots: Vec<Option<&mut Node<K, V>>> = self.nodes.slots_mut().collect();

        order
            .into_iter()
            .map(|h| {
                slots[h.to_index()]
                    .take()
                    .expect("`RawRBTreeMap::entries_mut()` - handle visited twice!")
                    .entry_mut()
            })
            .collect()
    }

    fn handles_in_order(&self) -> Vec<Handle> {
        let mut order = Vec::with_capacity(self.len());
        let mut current = self.first();
        while let Some(handle) = current {
            order.push(handle);
            current = self.next(handle);
        }
        order
    }

    /// Follows `dir` children from `handle` as far as they go.
    fn extreme(&self, mut handle: Handle, dir: Dir) -> Handle {
        while let Some(child) = self.nodes.get(handle).child(dir) {
            handle = child;
        }
        handle
    }

    /// In-order neighbour of `handle` on the `dir` side.
    fn step(&self, handle: Handle, dir: Dir) -> Option<Handle> {
        if let Some(child) = self.nodes.get(handle).child(dir) {
            return Some(self.extreme(child, dir.flip()));
        }

        // Climb until we leave a subtree through its `dir.flip()` edge.
        let mut current = handle;
        while let Some(parent) = self.nodes.get(current).parent() {
            if self.nodes.get(parent).child(dir.flip()) == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    fn is_red(&self, handle: Option<Handle>) -> bool {
        handle.is_some_and(|h| self.nodes.get(h).color() == Color::Red)
    }

    fn color_of(&self, handle: Handle) -> Color {
        self.nodes.get(handle).color()
    }

    fn set_color(&mut self, handle: Handle, color: Color) {
        self.nodes.get_mut(handle).set_color(color);
    }

    fn parent_of(&self, handle: Handle) -> Option<Handle> {
        self.nodes.get(handle).parent()
    }

    /// Which child slot of `parent` holds `child`.
    fn side_of(&self, child: Handle, parent: Handle) -> Dir {
        if self.nodes.get(parent).left() == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }

    /// Puts `new` where `old` hangs (under its parent, or at the root) and
    /// points `new` back at that parent. `old`'s own links are left stale.
    fn transplant(&mut self, old: Handle, new: Option<Handle>) {
        let parent = self.parent_of(old);
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(old, parent);
                self.nodes.get_mut(parent).set_child(side, new);
            }
        }
        if let Some(new) = new {
            self.nodes.get_mut(new).set_parent(parent);
        }
    }

    /// Rotates `handle` down towards `dir`; its `dir.flip()` child takes its
    /// place. `Dir::Left` is a left rotation. Colors are untouched.
    fn rotate(&mut self, handle: Handle, dir: Dir) {
        let pivot = self
            .nodes
            .get(handle)
            .child(dir.flip())
            .expect("`RawRBTreeMap::rotate()` - pivot child is missing!");
        let inner = self.nodes.get(pivot).child(dir);

        self.nodes.get_mut(handle).set_child(dir.flip(), inner);
        if let Some(inner) = inner {
            self.nodes.get_mut(inner).set_parent(Some(handle));
        }

        self.transplant(handle, Some(pivot));

        self.nodes.get_mut(pivot).set_child(dir, Some(handle));
        self.nodes.get_mut(handle).set_parent(Some(pivot));
    }

    /// Restores the red rule after `node` was attached red.
    fn insert_fixup(&mut self, mut node: Handle) {
        while let Some(parent) = self.parent_of(node) {
            if self.color_of(parent) == Color::Black {
                break;
            }

            // A red parent is never the root.
            let grandparent = self.parent_of(parent).expect("`RawRBTreeMap::insert_fixup()` - red root!");
            let side = self.side_of(parent, grandparent);
            let uncle = self.nodes.get(grandparent).child(side.flip());

            match uncle {
                Some(uncle) if self.is_red(Some(uncle)) => {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    node = grandparent;
                }
                _ => {
                    let mut parent = parent;
                    if self.side_of(node, parent) != side {
                        // Inner grandchild: straighten the triangle into a line.
                        self.rotate(parent, side);
                        parent = node;
                    }
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.rotate(grandparent, side.flip());
                    break;
                }
            }
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    /// Unlinks `handle` and returns its entry, rebalancing as needed.
    pub(crate) fn remove_handle(&mut self, handle: Handle) -> (K, V) {
        let node = self.nodes.get(handle);
        let target = match (node.left(), node.right()) {
            (Some(_), Some(right)) => {
                // Trade entries with the successor, which has no left child,
                // and unlink the successor's node instead.
                let successor = self.extreme(right, Dir::Left);
                let (node, successor_node) = self.nodes.get_pair_mut(handle, successor);
                node.swap_entry(successor_node);
                successor
            }
            _ => handle,
        };

        let target_node = self.nodes.get(target);
        let child = target_node.left().or(target_node.right());
        let parent = target_node.parent();
        let color = target_node.color();

        self.transplant(target, child);
        let entry = self.nodes.take(target).into_entry();

        if color == Color::Black {
            self.delete_fixup(child, parent);
        }

        entry
    }

    /// Restores equal black-heights after a black node was spliced out.
    ///
    /// `node` is the position that lost a black and may be an empty slot,
    /// which is why its `parent` travels alongside it.
    fn delete_fixup(&mut self, mut node: Option<Handle>, mut parent: Option<Handle>) {
        while node != self.root && !self.is_red(node) {
            let Some(p) = parent else {
                break;
            };
            let side = if self.nodes.get(p).left() == node {
                Dir::Left
            } else {
                Dir::Right
            };
            let Some(mut sibling) = self.sibling(p, side) else {
                break;
            };

            if self.is_red(Some(sibling)) {
                self.set_color(sibling, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, side);
                sibling = match self.sibling(p, side) {
                    Some(sibling) => sibling,
                    None => break,
                };
            }

            let near = self.nodes.get(sibling).child(side);
            let far = self.nodes.get(sibling).child(side.flip());

            if !self.is_red(near) && !self.is_red(far) {
                // Push the extra black up a level.
                self.set_color(sibling, Color::Red);
                node = Some(p);
                parent = self.parent_of(p);
                continue;
            }

            if let (Some(near), false) = (near, self.is_red(far)) {
                self.set_color(near, Color::Black);
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, side.flip());
                sibling = near;
            }

            let far = self.nodes.get(sibling).child(side.flip());
            self.set_color(sibling, self.color_of(p));
            self.set_color(p, Color::Black);
            if let Some(far) = far {
                self.set_color(far, Color::Black);
            }
            self.rotate(p, side);
            node = self.root;
            break;
        }

        if let Some(node) = node {
            self.set_color(node, Color::Black);
        }
    }

    /// The child of `parent` opposite `side`. A doubly black position always
    /// has one; its absence stops the fixup early.
    fn sibling(&self, parent: Handle, side: Dir) -> Option<Handle> {
        let sibling = self.nodes.get(parent).child(side.flip());
        debug_assert!(sibling.is_some(), "`RawRBTreeMap::delete_fixup()` - doubly black position has no sibling!");
        if sibling.is_none() {
            log::warn!("red-black delete fixup stopped early: doubly black position has no sibling");
        }
        sibling
    }
}

impl<K: Ord, V> RawRBTreeMap<K, V> {
    /// Binary-search descent for `key`.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            current = match key.cmp(node.key().borrow()) {
                Ordering::Less => node.left(),
                Ordering::Greater => node.right(),
                Ordering::Equal => return Some(handle),
            };
        }
        None
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.nodes.get(handle).value())
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.nodes.get_mut(handle).value_mut())
    }

    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.nodes.get(handle).entry())
    }

    /// Inserts `key`, returning the previous value if it was already present.
    ///
    /// Replacing a value is not a structural change: no node is created and
    /// no color moves.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(mut current) = self.root else {
            let mut node = Node::new(key, value);
            node.set_color(Color::Black);
            self.root = Some(self.nodes.alloc(node));
            return None;
        };

        let dir = loop {
            let node = self.nodes.get_mut(current);
            let dir = match key.cmp(node.key()) {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => return Some(mem::replace(node.value_mut(), value)),
            };
            match node.child(dir) {
                Some(child) => current = child,
                None => break dir,
            }
        };

        let mut node = Node::new(key, value);
        node.set_parent(Some(current));
        let handle = self.nodes.alloc(node);
        self.nodes.get_mut(current).set_child(dir, Some(handle));

        self.insert_fixup(handle);
        None
    }

    pub(crate) fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.remove_handle(handle))
    }

    /// Checks coloring, black-heights, parent links, node count and key order,
    /// stopping at the first violation found.
    pub(crate) fn check_invariants(&self) -> Result<(), InvariantError> {
        let Some(root) = self.root else {
            return if self.nodes.is_empty() {
                Ok(())
            } else {
                Err(InvariantError::CountMismatch {
                    reachable: 0,
                    stored: self.len(),
                })
            };
        };

        let root_node = self.nodes.get(root);
        if root_node.parent().is_some() {
            return Err(InvariantError::RootHasParent);
        }
        if root_node.color() == Color::Red {
            return Err(InvariantError::RedRoot);
        }

        let mut reachable = 0;
        self.check_subtree(root, 0, &mut reachable)?;
        if reachable != self.len() {
            return Err(InvariantError::CountMismatch {
                reachable,
                stored: self.len(),
            });
        }

        let mut previous: Option<&K> = None;
        for (position, handle) in self.handles_in_order().into_iter().enumerate() {
            let key = self.nodes.get(handle).key();
            if previous.is_some_and(|previous| previous >= key) {
                return Err(InvariantError::KeysOutOfOrder { position });
            }
            previous = Some(key);
        }

        Ok(())
    }

    /// Returns the black-height of `handle`'s subtree counting `handle` itself.
    fn check_subtree(&self, handle: Handle, depth: usize, reachable: &mut usize) -> Result<usize, InvariantError> {
        *reachable += 1;
        if *reachable > self.len() {
            // More nodes than slots means a cycle.
            return Err(InvariantError::CountMismatch {
                reachable: *reachable,
                stored: self.len(),
            });
        }

        let node = self.nodes.get(handle);
        let mut heights = [0usize; 2];
        for (height, dir) in heights.iter_mut().zip([Dir::Left, Dir::Right]) {
            let Some(child) = node.child(dir) else {
                continue;
            };
            let child_node = self.nodes.get(child);
            if child_node.parent() != Some(handle) {
                return Err(InvariantError::BrokenParentLink { depth: depth + 1 });
            }
            if node.color() == Color::Red && child_node.color() == Color::Red {
                return Err(InvariantError::RedRedEdge { depth });
            }
            *height = self.check_subtree(child, depth + 1, reachable)?;
        }

        let [left, right] = heights;
        if left != right {
            return Err(InvariantError::BlackHeightMismatch { depth, left, right });
        }
        Ok(left + usize::from(node.color() == Color::Black))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    impl<K: Copy, V> RawRBTreeMap<K, V> {
        /// Pre-order (key, color) listing; pins down the exact shape.
        fn shape(&self) -> Vec<(K, Color)> {
            fn walk<K: Copy, V>(tree: &RawRBTreeMap<K, V>, handle: Option<Handle>, out: &mut Vec<(K, Color)>) {
                if let Some(handle) = handle {
                    let node = tree.node(handle);
                    out.push((*node.key(), node.color()));
                    walk(tree, node.left(), out);
                    walk(tree, node.right(), out);
                }
            }

            let mut out = Vec::new();
            walk(self, self.root, &mut out);
            out
        }

        fn keys(&self) -> Vec<K> {
            self.handles_in_order().into_iter().map(|h| *self.node(h).key()).collect()
        }
    }

    fn build(keys: &[i32]) -> RawRBTreeMap<i32, i32> {
        let mut tree = RawRBTreeMap::new();
        for &key in keys {
            tree.insert(key, key);
            tree.check_invariants().unwrap();
        }
        tree
    }

    /// Every permutation of `items`, via Heap's algorithm.
    fn permutations(items: &[i32]) -> Vec<Vec<i32>> {
        fn heap(k: usize, items: &mut Vec<i32>, out: &mut Vec<Vec<i32>>) {
            if k <= 1 {
                out.push(items.clone());
                return;
            }
            heap(k - 1, items, out);
            for i in 0..k - 1 {
                if k % 2 == 0 {
                    items.swap(i, k - 1);
                } else {
                    items.swap(0, k - 1);
                }
                heap(k - 1, items, out);
            }
        }

        let mut items = items.to_vec();
        let mut out = Vec::new();
        heap(items.len(), &mut items, &mut out);
        out
    }

    use Color::{Black, Red};

    #[test]
    fn first_insert_is_black_root() {
        let tree = build(&[5]);
        assert_eq!(tree.shape(), vec![(5, Black)]);
    }

    #[test]
    fn ascending_triple_rotates_left() {
        let tree = build(&[1, 2, 3]);
        assert_eq!(tree.shape(), vec![(2, Black), (1, Red), (3, Red)]);
    }

    #[test]
    fn descending_triple_rotates_right() {
        let tree = build(&[3, 2, 1]);
        assert_eq!(tree.shape(), vec![(2, Black), (1, Red), (3, Red)]);
    }

    #[test]
    fn inner_grandchild_is_straightened_first() {
        assert_eq!(build(&[3, 1, 2]).shape(), vec![(2, Black), (1, Red), (3, Red)]);
        assert_eq!(build(&[1, 3, 2]).shape(), vec![(2, Black), (1, Red), (3, Red)]);
    }

    #[test]
    fn red_uncle_recolors_without_rotation() {
        let tree = build(&[2, 1, 3, 4]);
        assert_eq!(tree.shape(), vec![(2, Black), (1, Black), (3, Black), (4, Red)]);
    }

    #[test]
    fn duplicate_insert_replaces_value_only() {
        let mut tree = build(&[5, 3, 7]);
        let before = tree.shape();
        assert_eq!(tree.insert(3, 30), Some(3));
        assert_eq!(tree.shape(), before);
        assert_eq!(tree.get(&3), Some(&30));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn delete_with_two_children_uses_successor() {
        let mut tree = build(&[5, 3, 7, 6, 8]);
        assert_eq!(tree.remove_entry(&7), Some((7, 7)));
        tree.check_invariants().unwrap();
        assert_eq!(tree.get(&7), None);
        assert_eq!(tree.get(&6), Some(&6));
        assert_eq!(tree.get(&8), Some(&8));
        assert_eq!(tree.keys(), vec![3, 5, 6, 8]);
    }

    #[test]
    fn delete_black_leaf_with_red_sibling() {
        // 1 is a black leaf whose sibling 4 is red with black children.
        let mut tree = build(&[2, 1, 4, 3, 5, 6]);
        assert_eq!(tree.shape(), vec![(2, Black), (1, Black), (4, Red), (3, Black), (5, Black), (6, Red)]);
        tree.remove_entry(&1);
        tree.check_invariants().unwrap();
        assert_eq!(tree.keys(), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn delete_root_until_empty() {
        let mut tree = build(&[4, 2, 6, 1, 3, 5, 7]);
        while let Some(root) = tree.root {
            let key = *tree.node(root).key();
            assert_eq!(tree.remove_entry(&key), Some((key, key)));
            tree.check_invariants().unwrap();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn delete_missing_key_is_a_no_op() {
        let mut tree = build(&[5, 3, 7]);
        let before = tree.shape();
        assert_eq!(tree.remove_entry(&4), None);
        assert_eq!(tree.shape(), before);
    }

    #[test]
    fn freed_nodes_are_recycled() {
        let mut tree = build(&[1, 2, 3]);
        tree.remove_entry(&2);
        tree.insert(4, 4);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.nodes.len(), 3);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn neighbours_walk_parent_links() {
        let tree = build(&[50, 30, 70, 20, 40, 60, 80, 35, 45]);
        let mut forward = Vec::new();
        let mut current = tree.first();
        while let Some(h) = current {
            forward.push(*tree.node(h).key());
            current = tree.next(h);
        }
        let mut backward = Vec::new();
        let mut current = tree.last();
        while let Some(h) = current {
            backward.push(*tree.node(h).key());
            current = tree.prev(h);
        }
        backward.reverse();
        assert_eq!(forward, vec![20, 30, 35, 40, 45, 50, 60, 70, 80]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn drain_yields_sorted_entries() {
        let mut tree = build(&[3, 1, 2]);
        assert_eq!(tree.drain_to_vec(), vec![(1, 1), (2, 2), (3, 3)]);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn entries_mut_in_key_order() {
        let mut tree = build(&[3, 1, 2]);
        for (key, value) in tree.entries_mut() {
            *value = key * 10;
        }
        assert_eq!(tree.get(&1), Some(&10));
        assert_eq!(tree.get(&3), Some(&30));
    }

    #[test]
    fn check_invariants_catches_red_root() {
        let mut tree = build(&[1, 2, 3]);
        let root = tree.root.unwrap();
        tree.set_color(root, Red);
        assert_eq!(tree.check_invariants(), Err(InvariantError::RedRoot));
    }

    #[test]
    fn check_invariants_catches_red_red_edge() {
        let mut tree = build(&[2, 1, 3, 4]);
        let three = tree.search(&3).unwrap();
        tree.set_color(three, Red);
        assert_eq!(tree.check_invariants(), Err(InvariantError::RedRedEdge { depth: 1 }));
    }

    #[test]
    fn check_invariants_catches_black_height_mismatch() {
        let mut tree = build(&[2, 1, 3]);
        let one = tree.search(&1).unwrap();
        tree.set_color(one, Black);
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantError::BlackHeightMismatch { depth: 0, left: 1, right: 0 })
        );
    }

    #[test]
    fn check_invariants_catches_broken_parent_link() {
        let mut tree = build(&[2, 1, 3]);
        let one = tree.search(&1).unwrap();
        let three = tree.search(&3).unwrap();
        tree.nodes.get_mut(one).set_parent(Some(three));
        assert_eq!(tree.check_invariants(), Err(InvariantError::BrokenParentLink { depth: 1 }));
    }

    #[test]
    fn check_invariants_catches_misordered_keys() {
        let mut tree = build(&[2, 1, 3]);
        let one = tree.search(&1).unwrap();
        let three = tree.search(&3).unwrap();
        let (a, b) = tree.nodes.get_pair_mut(one, three);
        a.swap_entry(b);
        assert_eq!(tree.check_invariants(), Err(InvariantError::KeysOutOfOrder { position: 1 }));
    }

    fn full_tree() -> RawRBTreeMap<u32, u32> {
        let mut tree = RawRBTreeMap::new();
        let capacity = u32::try_from(Handle::MAX + 1).unwrap();
        for key in 0..capacity {
            tree.insert(key, key);
        }
        tree
    }

    #[test]
    fn full_arena_still_replaces_values() {
        let mut tree = full_tree();
        assert_eq!(tree.len(), Handle::MAX + 1);
        assert_eq!(tree.insert(7, 70), Some(7));
        assert_eq!(tree.get(&7), Some(&70));
        tree.check_invariants().unwrap();
    }

    #[test]
    #[should_panic(expected = "`Arena::alloc()` - arena is at maximum capacity")]
    fn insert_past_arena_capacity_panics() {
        let mut tree = full_tree();
        tree.insert(u32::MAX, 0);
    }

    // Walks every insertion order of seven keys and deletes them back out in
    // two different orders. In debug builds the sibling guard in
    // `delete_fixup` asserts, so this doubles as a reachability probe for it.
    #[test]
    fn every_small_permutation_stays_balanced() {
        let keys = [1, 2, 3, 4, 5, 6, 7];
        for order in permutations(&keys) {
            let tree = build(&order);

            let mut ascending = tree.clone();
            for key in keys {
                assert_eq!(ascending.remove_entry(&key), Some((key, key)));
                ascending.check_invariants().unwrap();
            }
            assert!(ascending.is_empty());

            let mut same_order = tree;
            for key in &order {
                assert_eq!(same_order.remove_entry(key), Some((*key, *key)));
                same_order.check_invariants().unwrap();
            }
            assert!(same_order.is_empty());
        }
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..1000).prop_map(Op::Insert),
            2 => (0i32..1000).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..600)) {
            let mut tree: RawRBTreeMap<i32, i32> = RawRBTreeMap::new();
            let mut model: Vec<i32> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let previous = tree.insert(key, key * 2);
                        prop_assert_eq!(previous.is_some(), model.contains(&key));
                        if previous.is_none() {
                            model.push(key);
                        }
                    }
                    Op::Remove(key) => {
                        let removed = tree.remove_entry(&key);
                        prop_assert_eq!(removed, model.contains(&key).then_some((key, key * 2)));
                        model.retain(|&k| k != key);
                    }
                }
                prop_assert_eq!(tree.check_invariants(), Ok(()));
                prop_assert_eq!(tree.len(), model.len());
            }

            model.sort_unstable();
            prop_assert_eq!(tree.keys(), model);
        }

        #[test]
        fn insert_then_remove_restores_contents(
            keys in prop::collection::btree_set(0i32..500, 0..100),
            extra in 500i32..600,
        ) {
            let keys: Vec<i32> = keys.into_iter().collect();
            let mut tree = build(&keys);
            let before = tree.keys();

            tree.insert(extra, -1);
            prop_assert_eq!(tree.remove_entry(&extra), Some((extra, -1)));
            prop_assert_eq!(tree.check_invariants(), Ok(()));
            prop_assert_eq!(tree.keys(), before);
            for key in keys {
                prop_assert_eq!(tree.get(&key), Some(&key));
            }
        }

        #[test]
        fn pops_drain_in_order(keys in prop::collection::vec(0i32..300, 0..150)) {
            let mut tree = build(&keys);
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            sorted.dedup();

            let mut front = Vec::new();
            let mut back = Vec::new();
            loop {
                let Some((key, _)) = tree.pop_first() else { break };
                front.push(key);
                prop_assert_eq!(tree.check_invariants(), Ok(()));
                let Some((key, _)) = tree.pop_last() else { break };
                back.push(key);
                prop_assert_eq!(tree.check_invariants(), Ok(()));
            }
            back.reverse();
            front.extend(back);
            prop_assert_eq!(front, sorted);
        }
    }
}
