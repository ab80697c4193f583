// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout projection tree.
//!
//! A *projection node* tracks one visual element across renders. Each node
//! has:
//!
//! - An identity ([`NodeId`]): a generational handle that becomes inert when
//!   the node is unmounted.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//! - A bound host instance of type `I`, measured through a
//!   [`Surface`](crate::surface::Surface).
//! - Geometry: the current `layout`, the `snapshot` taken before the pending
//!   update, an optional explicit `target` or `target_delta`, and the computed
//!   `projection_delta` plus the `tree_scale` handed to children.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Update cycle
//!
//! ```text
//!   will_update ──► (host mutates layout) ──► frame fires
//!   snapshot subtree                            │
//!                                               ▼
//!                         flush: measure ──► project ──► notify
//!                                (top-down)  (top-down)  (did_update)
//! ```
//!
//! [`will_update`](ProjectionTree::will_update) snapshots the node and its
//! whole subtree *immediately*, before the host gets a chance to move
//! anything, and requests a frame. Repeated requests coalesce into one frame.
//! [`flush`](ProjectionTree::flush) then runs every pass in depth-first
//! pre-order so a child always reads its parent's already-resolved tree scale.
//!
//! # Failure policy
//!
//! Nothing in this module panics or returns a hard error. Stale handles are
//! inert, unmeasurable nodes are skipped for the frame (see
//! [`SkipReason`](crate::node::SkipReason)), and listener failures are
//! collected and reported through the [`trace`](crate::trace) sink.

mod flush;
mod topology;
mod update;

pub use flush::ProjectionChanges;
pub use topology::Children;

use alloc::rc::Rc;
use alloc::vec::Vec;

use kurbo::Vec2;
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::dirty;
use crate::events::{ListenerError, Listeners};
use crate::geometry::{Delta, LayoutBox, Point};
use crate::node::{
    AnimationType, INVALID, LayoutUpdate, NodeFlags, NodeId, ProjectionCallback,
    ProjectionOptions, Snapshot,
};
use crate::shared::{LayoutId, LeadChange, SharedRegistry};
use crate::surface::{FrameGate, FrameScheduler, ResizeListenerId, ResizeSignal, Surface};
use crate::trace::ListenerKind;
use crate::values::TransformValues;

/// Default tolerance, in pixels, for deciding whether a layout changed.
pub const DEFAULT_LAYOUT_EPSILON: f64 = 0.01;

/// Tree-wide configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeConfig {
    /// Largest per-edge movement still reported as "no layout change".
    pub layout_epsilon: f64,
    /// Parent for nodes created without an explicit one.
    pub default_parent: Option<NodeId>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            layout_epsilon: DEFAULT_LAYOUT_EPSILON,
            default_parent: None,
        }
    }
}

/// A listener failure waiting to be reported at the next flush.
#[derive(Debug)]
pub(crate) struct DeferredFailure {
    pub(crate) node: u32,
    pub(crate) kind: ListenerKind,
    pub(crate) error: ListenerError,
}

/// Struct-of-arrays storage and coordinator for projection nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Unmounted nodes are recycled
/// via a free list, and generation counters make stale handles inert.
pub struct ProjectionTree<I> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Host binding and options --
    pub(crate) instance: Vec<Option<I>>,
    pub(crate) resize_listener: Vec<Option<ResizeListenerId>>,
    pub(crate) animation_type: Vec<AnimationType>,
    pub(crate) measure_scroll: Vec<bool>,
    pub(crate) layout_id: Vec<Option<LayoutId>>,
    pub(crate) on_projection_update: Vec<Option<ProjectionCallback>>,
    pub(crate) flags: Vec<NodeFlags>,

    // -- Geometry --
    pub(crate) layout: Vec<Option<LayoutBox>>,
    pub(crate) snapshot: Vec<Option<Snapshot>>,
    pub(crate) target: Vec<Option<LayoutBox>>,
    pub(crate) target_delta: Vec<Option<Delta>>,
    pub(crate) resolved_target: Vec<Option<LayoutBox>>,
    pub(crate) scroll: Vec<Option<Point>>,
    pub(crate) latest_values: Vec<TransformValues>,

    // -- Computed (written by projection) --
    pub(crate) projection_delta: Vec<Option<Delta>>,
    pub(crate) tree_scale: Vec<Vec2>,

    // -- Events --
    pub(crate) will_update_listeners: Vec<Listeners<NodeId>>,
    pub(crate) did_update_listeners: Vec<Listeners<LayoutUpdate>>,
    pub(crate) next_listener_key: u64,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Coordination --
    pub(crate) shared: SharedRegistry,
    pub(crate) gate: Rc<FrameGate>,
    pub(crate) pending_leads: Vec<LeadChange>,
    pub(crate) pending_failures: Vec<DeferredFailure>,
    pub(crate) frame_index: u64,
    pub(crate) config: TreeConfig,
}

impl<I> core::fmt::Debug for ProjectionTree<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProjectionTree")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("frame_index", &self.frame_index)
            .field("shared", &self.shared)
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<I> ProjectionTree<I> {
    /// Creates an empty tree that requests frames from `scheduler`.
    #[must_use]
    pub fn new(scheduler: impl FrameScheduler + 'static) -> Self {
        Self::with_config(scheduler, TreeConfig::default())
    }

    /// Creates an empty tree with an explicit configuration.
    #[must_use]
    pub fn with_config(scheduler: impl FrameScheduler + 'static, config: TreeConfig) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            instance: Vec::new(),
            resize_listener: Vec::new(),
            animation_type: Vec::new(),
            measure_scroll: Vec::new(),
            layout_id: Vec::new(),
            on_projection_update: Vec::new(),
            flags: Vec::new(),
            layout: Vec::new(),
            snapshot: Vec::new(),
            target: Vec::new(),
            target_delta: Vec::new(),
            resolved_target: Vec::new(),
            scroll: Vec::new(),
            latest_values: Vec::new(),
            projection_delta: Vec::new(),
            tree_scale: Vec::new(),
            will_update_listeners: Vec::new(),
            did_update_listeners: Vec::new(),
            next_listener_key: 0,
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            shared: SharedRegistry::new(),
            gate: Rc::new(FrameGate::new(alloc::boxed::Box::new(scheduler))),
            pending_leads: Vec::new(),
            pending_failures: Vec::new(),
            frame_index: 0,
            config,
        }
    }

    /// The tree's configuration.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // -- Allocation API --

    /// Creates a node and returns its handle.
    ///
    /// The node is attached to `parent`, or to the configured default parent
    /// when `parent` is `None`. It has no instance until
    /// [`mount`](Self::mount) is called.
    pub fn create_node(&mut self, parent: Option<NodeId>, options: ProjectionOptions) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.reset_slot(i);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.instance.push(None);
            self.resize_listener.push(None);
            self.animation_type.push(AnimationType::default());
            self.measure_scroll.push(false);
            self.layout_id.push(None);
            self.on_projection_update.push(None);
            self.flags.push(NodeFlags::default());
            self.layout.push(None);
            self.snapshot.push(None);
            self.target.push(None);
            self.target_delta.push(None);
            self.resolved_target.push(None);
            self.scroll.push(None);
            self.latest_values.push(TransformValues::IDENTITY);
            self.projection_delta.push(None);
            self.tree_scale.push(Vec2::new(1.0, 1.0));
            self.will_update_listeners.push(Listeners::new());
            self.did_update_listeners.push(Listeners::new());
            self.generation.push(0);
            self.live.push(false);
            idx
        };
        self.live[idx as usize] = true;

        let id = self.id_at_unchecked(idx);
        self.merge_options(idx, options);

        self.traversal_dirty = true;
        self.dirty.mark(idx, dirty::TOPOLOGY);

        let parent = parent
            .or(self.config.default_parent)
            .and_then(|p| self.slot(p));
        if let Some(p) = parent {
            self.attach(p, idx);
        }
        id
    }

    /// Binds a host instance to the node.
    ///
    /// Attaches a resize listener through `surface`, registers the node's
    /// layout id, and schedules the node's first measurement. Mounting an
    /// already-mounted node replaces its instance. Returns `false` for a
    /// stale handle.
    pub fn mount(&mut self, node: NodeId, instance: I, surface: &mut dyn Surface<I>) -> bool {
        let Some(idx) = self.slot(node) else {
            return false;
        };
        let i = idx as usize;
        self.release_instance(idx, surface);

        let signal = ResizeSignal::new(Rc::clone(&self.gate), node);
        self.resize_listener[i] = surface.attach_resize_listener(&instance, signal);
        self.instance[i] = Some(instance);
        self.flags[i].mounted = true;
        self.snapshot[i] = None;
        self.projection_delta[i] = None;

        if let Some(id) = self.layout_id[i].clone() {
            self.register_shared(idx, &id);
        }

        self.flags[i].is_projection_dirty = true;
        self.dirty.mark(idx, dirty::LAYOUT);
        self.gate.schedule();
        true
    }

    /// Unmounts and destroys a node, freeing its slot for reuse.
    ///
    /// Releases the resize listener, hands off shared-element leadership,
    /// re-attaches the node's children to its parent (or makes them roots),
    /// and drops any pending work for the node. If no other node has pending
    /// work, the requested frame is cancelled. Stale handles are ignored.
    pub fn unmount(&mut self, node: NodeId, surface: &mut dyn Surface<I>) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        let i = idx as usize;

        if let Some(id) = self.layout_id[i].clone() {
            self.unregister_shared(idx, &id);
        }
        self.release_instance(idx, surface);

        // Children move up to the departing node's parent.
        let parent = self.parent[i];
        let mut child = self.first_child[i];
        while child != INVALID {
            let next = self.next_sibling[child as usize];
            self.detach(child);
            if parent != INVALID {
                self.attach(parent, child);
            }
            child = next;
        }
        if parent != INVALID {
            self.detach(idx);
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately become inert.
        self.generation[i] += 1;
        self.live[i] = false;
        self.reset_slot(i);
        self.free_list.push(idx);
        self.traversal_dirty = true;

        if !self.has_pending_work() {
            self.gate.cancel();
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Internal helpers --

    /// Returns the slot index for a live handle.
    pub(crate) fn slot(&self, id: NodeId) -> Option<u32> {
        let i = id.idx as usize;
        (id.idx < self.len && self.live[i] && self.generation[i] == id.generation).then_some(id.idx)
    }

    /// Builds a handle for a slot known to be live.
    pub(crate) fn id_at_unchecked(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Restores every per-slot field except topology links and generation to
    /// its initial value.
    fn reset_slot(&mut self, i: usize) {
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.instance[i] = None;
        self.resize_listener[i] = None;
        self.animation_type[i] = AnimationType::default();
        self.measure_scroll[i] = false;
        self.layout_id[i] = None;
        self.on_projection_update[i] = None;
        self.flags[i] = NodeFlags::default();
        self.layout[i] = None;
        self.snapshot[i] = None;
        self.target[i] = None;
        self.target_delta[i] = None;
        self.resolved_target[i] = None;
        self.scroll[i] = None;
        self.latest_values[i] = TransformValues::IDENTITY;
        self.projection_delta[i] = None;
        self.tree_scale[i] = Vec2::new(1.0, 1.0);
        self.will_update_listeners[i].clear();
        self.did_update_listeners[i].clear();
    }

    /// Detaches the resize listener and drops the instance, if any.
    fn release_instance(&mut self, idx: u32, surface: &mut dyn Surface<I>) {
        let i = idx as usize;
        let listener = self.resize_listener[i].take();
        if let Some(instance) = self.instance[i].take() {
            if let Some(listener) = listener {
                surface.detach_resize_listener(&instance, listener);
            }
        }
        self.flags[i].mounted = false;
    }

    /// Whether any live node still needs the requested frame.
    pub(crate) fn has_pending_work(&self) -> bool {
        self.gate.has_resized()
            || self.flags.iter().zip(&self.live).any(|(f, &live)| {
                live && (f.is_layout_dirty || f.is_projection_dirty || f.is_updating)
            })
    }

    /// Marks a node (and, through the dependency edges, its subtree) for
    /// re-projection.
    pub(crate) fn mark_projection(&mut self, idx: u32) {
        self.flags[idx as usize].is_projection_dirty = true;
        self.dirty
            .mark_with(idx, dirty::PROJECTION, &understory_dirty::EagerPolicy);
    }

    /// Queues listener failures for reporting at the next flush.
    pub(crate) fn defer_failures(
        &mut self,
        idx: u32,
        kind: ListenerKind,
        failures: &mut Vec<ListenerError>,
    ) {
        self.pending_failures
            .extend(failures.drain(..).map(|error| DeferredFailure {
                node: idx,
                kind,
                error,
            }));
    }

    /// Merges `options` into the node's configuration.
    ///
    /// Returns the previous layout id when it was replaced.
    pub(crate) fn merge_options(
        &mut self,
        idx: u32,
        options: ProjectionOptions,
    ) -> Option<Option<LayoutId>> {
        let i = idx as usize;
        if let Some(measure) = options.should_measure_scroll {
            self.measure_scroll[i] = measure;
            if !measure {
                self.scroll[i] = None;
            }
        }
        if let Some(animation_type) = options.animation_type {
            self.animation_type[i] = animation_type;
        }
        if let Some(callback) = options.on_projection_update {
            self.on_projection_update[i] = Some(callback);
        }
        match options.layout_id {
            Some(id) if self.layout_id[i].as_ref() != Some(&id) => {
                Some(self.layout_id[i].replace(id))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::headless::{HeadlessSurface, ManualFrames};

    pub(crate) fn tree() -> (ProjectionTree<u32>, ManualFrames) {
        let frames = ManualFrames::new();
        (ProjectionTree::new(frames.clone()), frames)
    }

    #[test]
    fn create_and_unmount() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        let id = tree.create_node(None, ProjectionOptions::new());
        assert!(tree.is_alive(id));
        assert_eq!(tree.node_count(), 1);
        tree.unmount(id, &mut surface);
        assert!(!tree.is_alive(id));
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn generation_makes_stale_handles_inert() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        let id1 = tree.create_node(None, ProjectionOptions::new());
        tree.unmount(id1, &mut surface);
        let id2 = tree.create_node(None, ProjectionOptions::new());
        assert_eq!(id1.index(), id2.index());
        assert_ne!(id1.generation(), id2.generation());
        assert!(!tree.is_alive(id1));
        assert!(tree.is_alive(id2));

        // Operations on the stale handle do nothing.
        assert!(!tree.mount(id1, 7, &mut surface));
        tree.will_update(id1, &mut surface, true);
        assert_eq!(tree.layout(id1), None);
        assert!(tree.instance(id2).is_none());
    }

    #[test]
    fn mount_attaches_resize_listener_and_schedules() {
        let (mut tree, frames) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, LayoutBox::from_edges(0.0, 10.0, 0.0, 10.0));
        let id = tree.create_node(None, ProjectionOptions::new());
        assert!(tree.mount(id, 1, &mut surface));
        assert!(surface.has_resize_listener(&1));
        assert!(frames.is_pending());
        assert_eq!(tree.instance(id), Some(&1));

        tree.unmount(id, &mut surface);
        assert!(!surface.has_resize_listener(&1));
    }

    #[test]
    fn unmount_last_dirty_node_cancels_frame() {
        let (mut tree, frames) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, LayoutBox::from_edges(0.0, 10.0, 0.0, 10.0));
        let id = tree.create_node(None, ProjectionOptions::new());
        tree.mount(id, 1, &mut surface);
        assert!(frames.is_pending());
        tree.unmount(id, &mut surface);
        assert!(!frames.is_pending());
        assert_eq!(frames.cancelled(), 1);
    }

    #[test]
    fn unmount_keeps_frame_for_other_dirty_nodes() {
        let (mut tree, frames) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, LayoutBox::from_edges(0.0, 10.0, 0.0, 10.0));
        surface.insert(2, LayoutBox::from_edges(0.0, 10.0, 0.0, 10.0));
        let a = tree.create_node(None, ProjectionOptions::new());
        let b = tree.create_node(None, ProjectionOptions::new());
        tree.mount(a, 1, &mut surface);
        tree.mount(b, 2, &mut surface);
        tree.unmount(a, &mut surface);
        assert!(frames.is_pending());
    }

    #[test]
    fn unmount_moves_children_to_grandparent() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        let root = tree.create_node(None, ProjectionOptions::new());
        let mid = tree.create_node(Some(root), ProjectionOptions::new());
        let leaf = tree.create_node(Some(mid), ProjectionOptions::new());
        tree.unmount(mid, &mut surface);
        assert_eq!(tree.parent(leaf), Some(root));
        assert_eq!(tree.path(leaf), alloc::vec![root, leaf]);
    }

    #[test]
    fn default_parent_is_used() {
        let frames = ManualFrames::new();
        let mut tree: ProjectionTree<u32> = ProjectionTree::new(frames);
        let root = tree.create_node(None, ProjectionOptions::new());
        tree.set_default_parent(Some(root));
        let child = tree.create_node(None, ProjectionOptions::new());
        assert_eq!(tree.parent(child), Some(root));
        assert_eq!(tree.config().default_parent, Some(root));
    }
}
