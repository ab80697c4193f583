// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree structure: attaching, detaching, and walking nodes.

use alloc::vec::Vec;

use kurbo::Vec2;

use super::ProjectionTree;
use crate::dirty;
use crate::node::{INVALID, NodeId};

/// An iterator over the direct children of a node.
///
/// Created by [`ProjectionTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    next_sibling: &'a [u32],
    generation: &'a [u32],
    current: u32,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.next_sibling[idx as usize];
        Some(NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }
}

impl<I> ProjectionTree<I> {
    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// Returns `false` without changing anything if either handle is stale,
    /// `child` already has a parent, or `parent` is `child` or one of its
    /// descendants.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let (Some(p), Some(c)) = (self.slot(parent), self.slot(child)) else {
            return false;
        };
        if self.parent[c as usize] != INVALID || self.is_ancestor_or_self(c, p) {
            return false;
        }
        self.attach(p, c);
        true
    }

    /// Removes `child` from its current parent, making it a root.
    ///
    /// Returns `false` if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) -> bool {
        let Some(c) = self.slot(child) else {
            return false;
        };
        if self.parent[c as usize] == INVALID {
            return false;
        }
        self.detach(c);
        true
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// The node is detached from its old parent first. Returns `false`
    /// without changing anything if either handle is stale or `new_parent`
    /// is `child` or one of its descendants.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> bool {
        let (Some(c), Some(p)) = (self.slot(child), self.slot(new_parent)) else {
            return false;
        };
        if self.is_ancestor_or_self(c, p) {
            return false;
        }
        if self.parent[c as usize] != INVALID {
            self.detach(c);
        }
        self.attach(p, c);
        true
    }

    /// Sets the parent used by [`create_node`](Self::create_node) when none
    /// is given. A stale handle clears it.
    pub fn set_default_parent(&mut self, parent: Option<NodeId>) {
        self.config.default_parent = parent.filter(|&p| self.is_alive(p));
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.slot(id)?;
        let p = self.parent[idx as usize];
        (p != INVALID).then(|| self.id_at_unchecked(p))
    }

    /// Returns an iterator over the direct children of a node.
    ///
    /// The iterator is empty for a stale handle.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let current = self
            .slot(id)
            .map_or(INVALID, |idx| self.first_child[idx as usize]);
        Children {
            next_sibling: &self.next_sibling,
            generation: &self.generation,
            current,
        }
    }

    /// Returns the root of the tree containing a node.
    #[must_use]
    pub fn root(&self, id: NodeId) -> Option<NodeId> {
        let mut idx = self.slot(id)?;
        while self.parent[idx as usize] != INVALID {
            idx = self.parent[idx as usize];
        }
        Some(self.id_at_unchecked(idx))
    }

    /// Returns the ancestor chain from the root down to and including the
    /// node. Empty for a stale handle.
    #[must_use]
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let Some(mut idx) = self.slot(id) else {
            return path;
        };
        loop {
            path.push(self.id_at_unchecked(idx));
            let p = self.parent[idx as usize];
            if p == INVALID {
                break;
            }
            idx = p;
        }
        path.reverse();
        path
    }

    /// Returns every live node without a parent, in slot order.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len)
            .filter(|&idx| self.live[idx as usize] && self.parent[idx as usize] == INVALID)
            .map(|idx| self.id_at_unchecked(idx))
            .collect()
    }

    /// Returns the current traversal order (depth-first pre-order) as raw
    /// slot indices.
    ///
    /// Only valid after a [`flush`](Self::flush); structural changes since
    /// then are not reflected.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    // -- Internal helpers --

    /// Links `c` as the last child of `p` and adds its dependency edges.
    pub(crate) fn attach(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Child depends on parent for LAYOUT and PROJECTION.
        let _ = self.dirty.add_dependency(c, p, dirty::LAYOUT);
        let _ = self.dirty.add_dependency(c, p, dirty::PROJECTION);

        self.invalidate_subtree(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Unlinks `c` from its parent and removes its dependency edges.
    pub(crate) fn detach(&mut self, c: u32) {
        let p = self.parent[c as usize];
        let prev = self.prev_sibling[c as usize];
        let next = self.next_sibling[c as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[c as usize] = INVALID;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        self.dirty.remove_dependency(c, p, dirty::LAYOUT);
        self.dirty.remove_dependency(c, p, dirty::PROJECTION);

        self.invalidate_subtree(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Clears the projection of every node in the subtree rooted at `idx`.
    ///
    /// A projection computed under the old ancestry must not be read back.
    fn invalidate_subtree(&mut self, idx: u32) {
        for i in self.subtree(idx) {
            self.projection_delta[i as usize] = None;
            self.tree_scale[i as usize] = Vec2::new(1.0, 1.0);
        }
    }

    /// Whether `ancestor` is `idx` or one of its ancestors.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: u32, mut idx: u32) -> bool {
        loop {
            if idx == ancestor {
                return true;
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return false;
            }
        }
    }

    /// The subtree rooted at `idx` in depth-first pre-order.
    pub(crate) fn subtree(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        self.dfs_collect(idx, &mut out);
        out
    }

    /// Rebuilds the depth-first pre-order traversal of all live nodes.
    pub(crate) fn rebuild_traversal_order(&mut self) {
        let mut order = core::mem::take(&mut self.traversal_order);
        order.clear();
        for idx in 0..self.len {
            if self.live[idx as usize] && self.parent[idx as usize] == INVALID {
                self.dfs_collect(idx, &mut order);
            }
        }
        self.traversal_order = order;
    }

    /// Depth-first pre-order collection starting from `idx`.
    fn dfs_collect(&self, idx: u32, out: &mut Vec<u32>) {
        out.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child, out);
            child = self.next_sibling[child as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::node::ProjectionOptions;
    use crate::tree::tests::tree;

    #[test]
    fn add_child_and_query() {
        let (mut tree, _) = tree();
        let parent = tree.create_node(None, ProjectionOptions::new());
        let a = tree.create_node(None, ProjectionOptions::new());
        let b = tree.create_node(None, ProjectionOptions::new());
        assert!(tree.add_child(parent, a));
        assert!(tree.add_child(parent, b));
        assert_eq!(tree.parent(a), Some(parent));
        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![a, b]);
        assert_eq!(tree.root(b), Some(parent));
    }

    #[test]
    fn add_child_refuses_second_parent_and_cycles() {
        let (mut tree, _) = tree();
        let a = tree.create_node(None, ProjectionOptions::new());
        let b = tree.create_node(Some(a), ProjectionOptions::new());
        let c = tree.create_node(Some(b), ProjectionOptions::new());
        let other = tree.create_node(None, ProjectionOptions::new());
        assert!(!tree.add_child(other, b), "already parented");
        assert!(!tree.reparent(a, c), "would create a cycle");
        assert!(!tree.reparent(a, a));
        assert_eq!(tree.path(c), vec![a, b, c]);
    }

    #[test]
    fn reparent_detaches_first() {
        let (mut tree, _) = tree();
        let p1 = tree.create_node(None, ProjectionOptions::new());
        let p2 = tree.create_node(None, ProjectionOptions::new());
        let child = tree.create_node(Some(p1), ProjectionOptions::new());
        assert!(tree.reparent(child, p2));
        assert_eq!(tree.parent(child), Some(p2));
        assert!(tree.children(p1).next().is_none());
        assert_eq!(tree.path(child), vec![p2, child]);
    }

    #[test]
    fn remove_from_parent_makes_root() {
        let (mut tree, _) = tree();
        let parent = tree.create_node(None, ProjectionOptions::new());
        let child = tree.create_node(Some(parent), ProjectionOptions::new());
        assert!(tree.remove_from_parent(child));
        assert!(!tree.remove_from_parent(child));
        assert_eq!(tree.parent(child), None);
        assert_eq!(tree.roots(), vec![parent, child]);
    }

    #[test]
    fn removing_middle_sibling_keeps_order() {
        let (mut tree, _) = tree();
        let p = tree.create_node(None, ProjectionOptions::new());
        let a = tree.create_node(Some(p), ProjectionOptions::new());
        let b = tree.create_node(Some(p), ProjectionOptions::new());
        let c = tree.create_node(Some(p), ProjectionOptions::new());
        tree.remove_from_parent(b);
        let kids: Vec<_> = tree.children(p).collect();
        assert_eq!(kids, vec![a, c]);
    }

    #[test]
    fn traversal_order_is_depth_first() {
        let (mut tree, _) = tree();
        let a = tree.create_node(None, ProjectionOptions::new());
        let b = tree.create_node(Some(a), ProjectionOptions::new());
        let c = tree.create_node(Some(a), ProjectionOptions::new());
        let d = tree.create_node(Some(b), ProjectionOptions::new());
        tree.rebuild_traversal_order();
        assert_eq!(
            tree.traversal_order(),
            &[a.index(), b.index(), d.index(), c.index()]
        );
    }
}
