// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node update operations: snapshot, measurement, targets, projection,
//! listeners, and shared-element leadership.
//!
//! The `*_at` helpers take raw slot indices and assume the slot is live; the
//! public methods check the handle first and do nothing for stale ones.

use alloc::vec::Vec;

use kurbo::Vec2;
use understory_dirty::EagerPolicy;

use super::ProjectionTree;
use crate::dirty;
use crate::events::{ListenerKey, ListenerResult};
use crate::geometry::{DEFAULT_ORIGIN, Delta, LayoutBox, Point};
use crate::node::{
    AnimationType, INVALID, LayoutUpdate, NodeFlags, NodeId, ProjectionOptions, ProjectionStyles,
    SkipReason, Snapshot,
};
use crate::shared::LayoutId;
use crate::surface::Surface;
use crate::trace::ListenerKind;
use crate::values::TransformValues;

impl<I> ProjectionTree<I> {
    // -- Options --

    /// Merges `options` into the node's configuration.
    ///
    /// Fields left as `None` keep their current value. Never starts an update
    /// cycle; a changed layout id re-registers a mounted node, and the
    /// affected groups are re-projected at the next flush.
    pub fn set_options(&mut self, node: NodeId, options: ProjectionOptions) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        if let Some(previous) = self.merge_options(idx, options) {
            if self.flags[idx as usize].mounted {
                if let Some(old) = previous {
                    self.unregister_shared(idx, &old);
                }
                if let Some(new) = self.layout_id[idx as usize].clone() {
                    self.register_shared(idx, &new);
                }
            }
        }
    }

    // -- Update cycle --

    /// Starts an update cycle for the node and its subtree.
    ///
    /// Every node in the subtree that is not already part of the pending
    /// cycle has its scroll offset and snapshot captured right away, its
    /// projection cleared, and (when `notify` is set) its will-update
    /// listeners fired. A frame is requested. Calling this again before the
    /// frame has no further effect.
    ///
    /// Must be called before the host mutates the node's layout; a snapshot
    /// taken afterwards would already contain the new geometry.
    pub fn will_update(&mut self, node: NodeId, surface: &mut dyn Surface<I>, notify: bool) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        let mut failures = Vec::new();
        self.refresh_ancestor_scroll(idx, surface);
        for i in self.subtree(idx) {
            let flags = &mut self.flags[i as usize];
            if flags.is_layout_dirty {
                continue;
            }
            flags.is_layout_dirty = true;
            flags.is_updating = true;
            self.update_scroll_at(i, surface);
            self.update_snapshot_at(i, surface);
            self.projection_delta[i as usize] = None;
            if notify {
                let id = self.id_at_unchecked(i);
                self.will_update_listeners[i as usize].notify(&id, &mut failures);
                self.defer_failures(i, ListenerKind::WillUpdate, &mut failures);
            }
        }
        self.dirty.mark_with(idx, dirty::LAYOUT, &EagerPolicy);
        self.gate.schedule();
    }

    /// Marks the node and its subtree as updating without measuring
    /// anything.
    ///
    /// The flag is cleared by the next flush.
    pub fn start_update(&mut self, node: NodeId) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        for i in self.subtree(idx) {
            self.flags[i as usize].is_updating = true;
        }
        self.gate.schedule();
    }

    /// Measures the node and stores the result as its snapshot.
    ///
    /// Returns `None` (and clears the snapshot) when the node cannot be
    /// measured.
    pub fn update_snapshot(&mut self, node: NodeId, surface: &mut dyn Surface<I>) -> Option<Snapshot> {
        let idx = self.slot(node)?;
        self.update_snapshot_at(idx, surface)
    }

    /// Measures the node's current layout.
    ///
    /// Resets the applied projection transform first when needed, corrects
    /// for ancestor scroll, and removes the node's own applied transform
    /// values. Returns `None` (and clears the layout and projection) when the
    /// node cannot be measured.
    pub fn update_layout(&mut self, node: NodeId, surface: &mut dyn Surface<I>) -> Option<LayoutBox> {
        let idx = self.slot(node)?;
        self.update_layout_at(idx, surface)
    }

    /// Captures the node's own scroll offset if it is a scroll container.
    ///
    /// Returns the offset, or `None` for nodes that do not measure scroll.
    pub fn update_scroll(&mut self, node: NodeId, surface: &mut dyn Surface<I>) -> Option<Point> {
        let idx = self.slot(node)?;
        self.update_scroll_at(idx, surface)
    }

    /// Removes the applied projection transform from the node's instance.
    pub fn reset_transform(&mut self, node: NodeId, surface: &mut dyn Surface<I>) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        let i = idx as usize;
        if let Some(instance) = &self.instance[i] {
            surface.reset_transform(instance);
        }
        self.flags[i].should_reset_transform = false;
    }

    /// Reports a size change of the node's instance.
    ///
    /// At the next frame the node is re-measured and its snapshot replaced
    /// by the new layout, so the change is not animated.
    pub fn notify_resize(&mut self, node: NodeId) {
        if self.is_alive(node) {
            self.gate.push_resize(node);
            self.gate.schedule();
        }
    }

    /// Records the transform values the host currently applies to the node.
    ///
    /// They are removed from every later measurement.
    pub fn set_latest_values(&mut self, node: NodeId, values: TransformValues) {
        if let Some(idx) = self.slot(node) {
            self.latest_values[idx as usize] = values;
        }
    }

    // -- Targets and projection --

    /// Sets or clears an explicit target box.
    ///
    /// The node is re-projected, without being re-measured, at the next
    /// frame.
    pub fn set_target(&mut self, node: NodeId, target: Option<LayoutBox>) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        self.target[idx as usize] = target;
        self.mark_projection(idx);
        self.gate.schedule();
    }

    /// Sets or clears a delta that, applied to the node's layout, gives its
    /// target.
    ///
    /// Takes precedence over an explicit target box.
    pub fn set_target_delta(&mut self, node: NodeId, delta: Option<Delta>) {
        let Some(idx) = self.slot(node) else {
            return;
        };
        self.target_delta[idx as usize] = delta;
        self.mark_projection(idx);
        self.gate.schedule();
    }

    /// Resolves and stores the box the node's projection aims at.
    ///
    /// In priority order: the target delta applied to the layout, the
    /// explicit target box, the lead's layout for a shared-element follower,
    /// and finally the node's own layout. `None` until the node has a layout.
    pub fn resolve_target_delta(&mut self, node: NodeId) -> Option<LayoutBox> {
        let idx = self.slot(node)?;
        self.resolve_target_at(idx)
    }

    /// Computes the node's projection delta from its snapshot to its
    /// resolved target, corrected for the tree scale inherited from its
    /// parent.
    ///
    /// The parent's projection must already be current; the frame
    /// coordinator guarantees this by projecting in depth-first pre-order.
    pub fn calc_projection(&mut self, node: NodeId) -> Result<Delta, SkipReason> {
        let idx = self.slot(node).ok_or(SkipReason::Unmounted)?;
        self.calc_projection_at(idx)
    }

    /// Resolves the styles that render the node's projection.
    ///
    /// Pure: returns identical output for identical state, and identity
    /// styles for a node without a projection.
    #[must_use]
    pub fn get_projection_styles(&self, node: NodeId) -> ProjectionStyles {
        self.slot(node)
            .map_or(ProjectionStyles::IDENTITY, |idx| self.projection_styles_at(idx))
    }

    /// Completes the node's update cycle.
    ///
    /// Fires did-update listeners with the raw snapshot-to-layout delta and
    /// whether the layout moved beyond the tree's layout epsilon. Returns
    /// `None`, firing nothing, unless the node has both a layout and a
    /// snapshot.
    pub fn did_update(&mut self, node: NodeId) -> Option<LayoutUpdate> {
        let idx = self.slot(node)?;
        let update = self.did_update_at(idx);
        self.finish_cycle(idx);
        update
    }

    // -- Events --

    /// Subscribes to the node's will-update event.
    ///
    /// Returns `None` for a stale handle.
    pub fn on_layout_will_update(
        &mut self,
        node: NodeId,
        callback: impl FnMut(&NodeId) -> ListenerResult + 'static,
    ) -> Option<ListenerKey> {
        let idx = self.slot(node)?;
        let key = self.next_key();
        self.will_update_listeners[idx as usize].add_with_key(key, callback);
        Some(key)
    }

    /// Subscribes to the node's did-update event.
    ///
    /// Returns `None` for a stale handle.
    pub fn on_layout_did_update(
        &mut self,
        node: NodeId,
        callback: impl FnMut(&LayoutUpdate) -> ListenerResult + 'static,
    ) -> Option<ListenerKey> {
        let idx = self.slot(node)?;
        let key = self.next_key();
        self.did_update_listeners[idx as usize].add_with_key(key, callback);
        Some(key)
    }

    /// Unsubscribes a listener from either of the node's events.
    pub fn remove_listener(&mut self, node: NodeId, key: ListenerKey) -> bool {
        let Some(idx) = self.slot(node) else {
            return false;
        };
        let i = idx as usize;
        self.will_update_listeners[i].remove(key) || self.did_update_listeners[i].remove(key)
    }

    // -- Shared elements --

    /// Assigns `layout_id` to the node and registers it in that group.
    ///
    /// The node becomes lead if the group has none. An unmounted node is
    /// registered once it mounts.
    pub fn register_potential_node(&mut self, layout_id: &LayoutId, node: NodeId) {
        self.set_options(node, ProjectionOptions::new().layout_id(layout_id.clone()));
    }

    /// Whether `node` currently leads the group for `layout_id`.
    #[must_use]
    pub fn is_lead(&self, node: NodeId, layout_id: &LayoutId) -> bool {
        self.is_alive(node) && self.shared.is_lead(layout_id, node)
    }

    /// The current lead of the group for `layout_id`.
    #[must_use]
    pub fn lead(&self, layout_id: &LayoutId) -> Option<NodeId> {
        self.shared.lead(layout_id)
    }

    /// Members of the group for `layout_id`, in registration order.
    #[must_use]
    pub fn members(&self, layout_id: &LayoutId) -> &[NodeId] {
        self.shared.members(layout_id)
    }

    /// Makes the node the lead of its group.
    ///
    /// The new lead takes the previous lead's geometry as its snapshot, so it
    /// animates from where the previous lead was. Returns `false` if the node
    /// has no layout id or already leads.
    pub fn promote(&mut self, node: NodeId) -> bool {
        let Some(idx) = self.slot(node) else {
            return false;
        };
        let Some(id) = self.layout_id[idx as usize].clone() else {
            return false;
        };
        let previous = self.shared.lead(&id).and_then(|p| self.slot(p));
        let Some(change) = self.shared.promote(&id, node) else {
            return false;
        };
        if let Some(snapshot) = previous.and_then(|p| self.departing_geometry(p)) {
            self.adopt_snapshot(idx, snapshot);
        }
        self.mark_group(&id);
        self.pending_leads.push(change);
        self.gate.schedule();
        true
    }

    // -- Getters (read-only) --

    /// The bound host instance.
    #[must_use]
    pub fn instance(&self, node: NodeId) -> Option<&I> {
        self.instance[self.slot(node)? as usize].as_ref()
    }

    /// The last measured layout.
    #[must_use]
    pub fn layout(&self, node: NodeId) -> Option<LayoutBox> {
        self.layout[self.slot(node)? as usize]
    }

    /// The geometry captured before the pending update.
    #[must_use]
    pub fn snapshot(&self, node: NodeId) -> Option<Snapshot> {
        self.snapshot[self.slot(node)? as usize]
    }

    /// The explicit target box.
    #[must_use]
    pub fn target(&self, node: NodeId) -> Option<LayoutBox> {
        self.target[self.slot(node)? as usize]
    }

    /// The explicit target delta.
    #[must_use]
    pub fn target_delta(&self, node: NodeId) -> Option<Delta> {
        self.target_delta[self.slot(node)? as usize]
    }

    /// The box the last projection aimed at.
    #[must_use]
    pub fn resolved_target(&self, node: NodeId) -> Option<LayoutBox> {
        self.resolved_target[self.slot(node)? as usize]
    }

    /// The last captured scroll offset, for scroll containers.
    #[must_use]
    pub fn scroll(&self, node: NodeId) -> Option<Point> {
        self.scroll[self.slot(node)? as usize]
    }

    /// The current projection delta.
    #[must_use]
    pub fn projection_delta(&self, node: NodeId) -> Option<Delta> {
        self.projection_delta[self.slot(node)? as usize]
    }

    /// The tree scale the node hands to its children.
    #[must_use]
    pub fn tree_scale(&self, node: NodeId) -> Option<Vec2> {
        Some(self.tree_scale[self.slot(node)? as usize])
    }

    /// The node's flags.
    #[must_use]
    pub fn flags(&self, node: NodeId) -> Option<NodeFlags> {
        Some(self.flags[self.slot(node)? as usize])
    }

    /// The transform values recorded by
    /// [`set_latest_values`](Self::set_latest_values).
    #[must_use]
    pub fn latest_values(&self, node: NodeId) -> Option<TransformValues> {
        Some(self.latest_values[self.slot(node)? as usize])
    }

    /// The node's animation type.
    #[must_use]
    pub fn animation_type(&self, node: NodeId) -> Option<AnimationType> {
        Some(self.animation_type[self.slot(node)? as usize])
    }

    /// The node's layout id.
    #[must_use]
    pub fn layout_id(&self, node: NodeId) -> Option<&LayoutId> {
        self.layout_id[self.slot(node)? as usize].as_ref()
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `ProjectionChanges` or
    // `traversal_order()`) rather than `NodeId` handles.

    /// Returns the handle for a live slot.
    #[must_use]
    pub fn node_at(&self, idx: u32) -> Option<NodeId> {
        (idx < self.len && self.live[idx as usize]).then(|| self.id_at_unchecked(idx))
    }

    /// Returns the instance bound at raw slot `idx`.
    #[must_use]
    pub fn instance_at(&self, idx: u32) -> Option<&I> {
        self.instance.get(idx as usize)?.as_ref()
    }

    /// Returns the layout at raw slot `idx`.
    #[must_use]
    pub fn layout_at(&self, idx: u32) -> Option<LayoutBox> {
        *self.layout.get(idx as usize)?
    }

    /// Returns the projection styles at raw slot `idx`.
    #[must_use]
    pub fn projection_styles_at(&self, idx: u32) -> ProjectionStyles {
        let i = idx as usize;
        match self.projection_delta.get(i) {
            Some(Some(delta)) => ProjectionStyles::resolve(delta, &self.latest_values[i]),
            Some(None) => ProjectionStyles::resolve(&Delta::IDENTITY, &self.latest_values[i]),
            None => ProjectionStyles::IDENTITY,
        }
    }

    // -- Internal helpers --

    fn next_key(&mut self) -> ListenerKey {
        let key = ListenerKey(self.next_listener_key);
        self.next_listener_key += 1;
        key
    }

    /// Sum of the scroll offsets of every scroll-container ancestor.
    fn ancestor_scroll(&self, idx: u32) -> Vec2 {
        let mut offset = Vec2::ZERO;
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            if let Some(scroll) = self.scroll[p as usize] {
                offset += scroll.to_vec2();
            }
            p = self.parent[p as usize];
        }
        offset
    }

    /// Re-reads the scroll offset of every scroll-container ancestor.
    pub(crate) fn refresh_ancestor_scroll(&mut self, idx: u32, surface: &mut dyn Surface<I>) {
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            if self.measure_scroll[p as usize] {
                self.update_scroll_at(p, surface);
            }
            p = self.parent[p as usize];
        }
    }

    /// Measures the instance's visible box, corrected for ancestor scroll.
    fn measure_visible(&mut self, idx: u32, surface: &mut dyn Surface<I>) -> Option<LayoutBox> {
        let i = idx as usize;
        let instance = self.instance[i].as_ref()?;
        if self.flags[i].should_reset_transform {
            surface.reset_transform(instance);
            self.flags[i].should_reset_transform = false;
        }
        let measured = surface.measure_viewport_box(instance)?;
        Some(measured.translate(self.ancestor_scroll(idx)))
    }

    pub(crate) fn update_snapshot_at(
        &mut self,
        idx: u32,
        surface: &mut dyn Surface<I>,
    ) -> Option<Snapshot> {
        let snapshot = self.measure_visible(idx, surface).map(|visible| Snapshot {
            layout: self.latest_values[idx as usize].remove_from(visible),
            visible,
        });
        self.snapshot[idx as usize] = snapshot;
        snapshot
    }

    pub(crate) fn update_layout_at(
        &mut self,
        idx: u32,
        surface: &mut dyn Surface<I>,
    ) -> Option<LayoutBox> {
        let i = idx as usize;
        let layout = self
            .measure_visible(idx, surface)
            .map(|visible| self.latest_values[i].remove_from(visible));
        self.layout[i] = layout;
        if layout.is_none() {
            self.projection_delta[i] = None;
        }
        layout
    }

    pub(crate) fn update_scroll_at(
        &mut self,
        idx: u32,
        surface: &mut dyn Surface<I>,
    ) -> Option<Point> {
        let i = idx as usize;
        let scroll = match &self.instance[i] {
            Some(instance) if self.measure_scroll[i] => Some(surface.measure_scroll(instance)),
            _ => None,
        };
        self.scroll[i] = scroll;
        scroll
    }

    pub(crate) fn resolve_target_at(&mut self, idx: u32) -> Option<LayoutBox> {
        let i = idx as usize;
        let layout = self.layout[i]?;
        let resolved = if let Some(delta) = self.target_delta[i] {
            delta.apply_to(layout)
        } else if let Some(target) = self.target[i] {
            target
        } else {
            self.lead_layout(idx).unwrap_or(layout)
        };
        self.resolved_target[i] = Some(resolved);
        Some(resolved)
    }

    /// The lead's layout, when the node is a shared-element follower.
    fn lead_layout(&self, idx: u32) -> Option<LayoutBox> {
        let id = self.layout_id[idx as usize].as_ref()?;
        let lead = self.shared.lead(id).and_then(|l| self.slot(l))?;
        if lead == idx {
            return None;
        }
        self.layout[lead as usize]
    }

    /// Live followers of the group the node leads.
    ///
    /// Empty unless the node is the lead of a shared-element group.
    pub(crate) fn followers_at(&self, idx: u32) -> Vec<u32> {
        let Some(id) = self.layout_id[idx as usize].as_ref() else {
            return Vec::new();
        };
        if self.shared.lead(id).and_then(|l| self.slot(l)) != Some(idx) {
            return Vec::new();
        }
        self.shared
            .members(id)
            .iter()
            .filter_map(|&m| self.slot(m))
            .filter(|&m| m != idx)
            .collect()
    }

    /// Tree scale inherited from the parent.
    fn inherited_scale(&self, idx: u32) -> Vec2 {
        match self.parent[idx as usize] {
            INVALID => Vec2::new(1.0, 1.0),
            p => self.tree_scale[p as usize],
        }
    }

    pub(crate) fn calc_projection_at(&mut self, idx: u32) -> Result<Delta, SkipReason> {
        let i = idx as usize;
        let inherited = self.inherited_scale(idx);
        match self.project(idx, inherited) {
            Ok(delta) => {
                self.projection_delta[i] = Some(delta);
                self.tree_scale[i] = Vec2::new(
                    inherited.x * delta.x.scale,
                    inherited.y * delta.y.scale,
                );
                self.flags[i].should_reset_transform = !delta.is_identity();
                let id = self.id_at_unchecked(idx);
                if let Some(callback) = self.on_projection_update[i].as_mut() {
                    callback(id, &delta);
                }
                Ok(delta)
            }
            Err(reason) => {
                self.projection_delta[i] = None;
                self.tree_scale[i] = inherited;
                Err(reason)
            }
        }
    }

    fn project(&mut self, idx: u32, inherited: Vec2) -> Result<Delta, SkipReason> {
        let i = idx as usize;
        if self.instance[i].is_none() {
            return Err(SkipReason::Unmounted);
        }
        let layout = self.layout[i].ok_or(SkipReason::NotMeasured)?;
        let snapshot = self.snapshot[i].ok_or(SkipReason::NoSnapshot)?;
        let target = self.resolve_target_at(idx).unwrap_or(layout);

        let origin = Point::new(DEFAULT_ORIGIN, DEFAULT_ORIGIN);
        let source = self.animation_type[i].constrain(snapshot.layout, target, origin);
        let raw = Delta::between_with_origin(source, target, origin);
        Ok(raw.corrected_for(inherited))
    }

    pub(crate) fn did_update_at(&mut self, idx: u32) -> Option<LayoutUpdate> {
        let i = idx as usize;
        let (Some(layout), Some(snapshot)) = (self.layout[i], self.snapshot[i]) else {
            return None;
        };
        let update = LayoutUpdate {
            node: self.id_at_unchecked(idx),
            layout,
            snapshot,
            delta: Delta::between(snapshot.layout, layout),
            has_layout_changed: !layout.is_near(snapshot.layout, self.config.layout_epsilon),
        };
        let mut failures = Vec::new();
        self.did_update_listeners[i].notify(&update, &mut failures);
        self.defer_failures(idx, ListenerKind::DidUpdate, &mut failures);
        Some(update)
    }

    /// Clears the per-cycle flags.
    pub(crate) fn finish_cycle(&mut self, idx: u32) {
        let flags = &mut self.flags[idx as usize];
        flags.is_layout_dirty = false;
        flags.is_projection_dirty = false;
        flags.is_updating = false;
        flags.resize_pending = false;
    }

    /// Geometry a departing or demoted lead hands to its successor.
    ///
    /// A snapshot taken for the pending cycle wins over the last layout.
    fn departing_geometry(&self, idx: u32) -> Option<Snapshot> {
        let i = idx as usize;
        if self.flags[i].is_layout_dirty {
            if let Some(snapshot) = self.snapshot[i] {
                return Some(snapshot);
            }
        }
        self.layout[i].map(|layout| Snapshot {
            layout,
            visible: self.latest_values[i].apply_to(layout),
        })
    }

    /// Installs `snapshot` as the node's starting geometry and schedules the
    /// node for measurement.
    fn adopt_snapshot(&mut self, idx: u32, snapshot: Snapshot) {
        let i = idx as usize;
        self.snapshot[i] = Some(snapshot);
        self.projection_delta[i] = None;
        self.flags[i].is_layout_dirty = true;
        self.dirty.mark(idx, dirty::LAYOUT);
        self.gate.schedule();
    }

    /// Marks every member of a group for re-projection.
    fn mark_group(&mut self, id: &LayoutId) {
        let members: Vec<u32> = self
            .shared
            .members(id)
            .iter()
            .filter_map(|&m| self.slot(m))
            .collect();
        for m in members {
            self.mark_projection(m);
        }
    }

    pub(crate) fn register_shared(&mut self, idx: u32, id: &LayoutId) {
        let node = self.id_at_unchecked(idx);
        if let Some(change) = self.shared.register(id, node) {
            if let Some(parked) = self.shared.take_parked(id) {
                self.adopt_snapshot(idx, parked);
            }
            self.pending_leads.push(change);
        }
        self.mark_group(id);
    }

    pub(crate) fn unregister_shared(&mut self, idx: u32, id: &LayoutId) {
        let node = self.id_at_unchecked(idx);
        if self.shared.is_lead(id, node) {
            if let Some(geometry) = self.departing_geometry(idx) {
                self.shared.park(id, geometry);
            }
        }
        if let Some(change) = self.shared.unregister(id, node) {
            if let Some(lead) = change.current.and_then(|l| self.slot(l)) {
                if let Some(parked) = self.shared.take_parked(id) {
                    self.adopt_snapshot(lead, parked);
                }
            }
            self.pending_leads.push(change);
        }
        self.mark_group(id);
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::RefCell;

    use super::*;
    use crate::events::ListenerError;
    use crate::headless::HeadlessSurface;
    use crate::tree::tests::tree;

    fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> LayoutBox {
        LayoutBox::from_edges(x0, x1, y0, y1)
    }

    #[test]
    fn will_update_snapshots_subtree_once() {
        let (mut tree, frames) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        surface.insert(2, rect(10.0, 20.0, 10.0, 20.0));
        let parent = tree.create_node(None, ProjectionOptions::new());
        let child = tree.create_node(Some(parent), ProjectionOptions::new());
        tree.mount(parent, 1, &mut surface);
        tree.mount(child, 2, &mut surface);

        let calls = Rc::new(RefCell::new(0));
        let c = Rc::clone(&calls);
        tree.on_layout_will_update(child, move |_| {
            *c.borrow_mut() += 1;
            Ok(())
        });

        tree.will_update(parent, &mut surface, true);
        surface.set_box(&2, rect(50.0, 60.0, 10.0, 20.0));
        tree.will_update(parent, &mut surface, true);

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(
            tree.snapshot(child).map(|s| s.layout),
            Some(rect(10.0, 20.0, 10.0, 20.0)),
            "second call must not re-snapshot"
        );
        assert_eq!(frames.requested(), 1);
    }

    #[test]
    fn update_layout_removes_scroll_and_latest_values() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 500.0, 0.0, 500.0));
        surface.set_scroll(&1, Point::new(0.0, 40.0));
        surface.insert(2, rect(0.0, 100.0, 60.0, 110.0));
        let scroller = tree.create_node(None, ProjectionOptions::new().measure_scroll(true));
        let item = tree.create_node(Some(scroller), ProjectionOptions::new());
        tree.mount(scroller, 1, &mut surface);
        tree.mount(item, 2, &mut surface);

        assert_eq!(tree.update_scroll(scroller, &mut surface), Some(Point::new(0.0, 40.0)));
        tree.set_latest_values(item, TransformValues::translation(10.0, 0.0));
        let layout = tree.update_layout(item, &mut surface);
        assert_eq!(layout, Some(rect(-10.0, 90.0, 100.0, 150.0)));
    }

    #[test]
    fn unmeasurable_node_has_no_layout() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 9, &mut surface);
        assert_eq!(tree.update_layout(node, &mut surface), None);
        assert_eq!(tree.calc_projection(node), Err(SkipReason::NotMeasured));
    }

    #[test]
    fn target_priority() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        tree.update_layout(node, &mut surface);

        assert_eq!(tree.resolve_target_delta(node), Some(rect(0.0, 100.0, 0.0, 100.0)));

        tree.set_target(node, Some(rect(0.0, 50.0, 0.0, 50.0)));
        assert_eq!(tree.resolve_target_delta(node), Some(rect(0.0, 50.0, 0.0, 50.0)));

        let shift = Delta::between(rect(0.0, 100.0, 0.0, 100.0), rect(20.0, 120.0, 0.0, 100.0));
        tree.set_target_delta(node, Some(shift));
        assert_eq!(tree.resolve_target_delta(node), Some(rect(20.0, 120.0, 0.0, 100.0)));
    }

    #[test]
    fn projection_without_snapshot_is_skipped() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        tree.update_layout(node, &mut surface);
        assert_eq!(tree.calc_projection(node), Err(SkipReason::NoSnapshot));
        assert_eq!(tree.projection_delta(node), None);
    }

    #[test]
    fn projection_callback_fires() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        let node = tree.create_node(
            None,
            ProjectionOptions::new().on_projection_update(move |_, d| {
                *s.borrow_mut() = Some(d.x.translate);
            }),
        );
        tree.mount(node, 1, &mut surface);
        tree.update_snapshot(node, &mut surface);
        surface.set_box(&1, rect(30.0, 130.0, 0.0, 100.0));
        tree.update_layout(node, &mut surface);
        let delta = tree.calc_projection(node).expect("projected");
        assert_eq!(delta.x.translate, 30.0);
        assert_eq!(*seen.borrow(), Some(30.0));
        assert!(tree.flags(node).is_some_and(|f| f.should_reset_transform));
    }

    #[test]
    fn listeners_share_key_space() {
        let (mut tree, _) = tree();
        let node = tree.create_node(None, ProjectionOptions::new());
        let will = tree.on_layout_will_update(node, |_| Ok(())).expect("live");
        let did = tree
            .on_layout_did_update(node, |_| Err(ListenerError::new("x")))
            .expect("live");
        assert_ne!(will, did);
        assert!(tree.remove_listener(node, did));
        assert!(tree.remove_listener(node, will));
        assert!(!tree.remove_listener(node, will));
    }

    #[test]
    fn set_options_keeps_unset_fields() {
        let (mut tree, _) = tree();
        let node = tree.create_node(
            None,
            ProjectionOptions::new().animation_type(AnimationType::Size),
        );
        tree.set_options(node, ProjectionOptions::new().measure_scroll(true));
        assert_eq!(tree.animation_type(node), Some(AnimationType::Size));
    }

    #[test]
    fn styles_default_to_identity() {
        let (mut tree, _) = tree();
        let node = tree.create_node(None, ProjectionOptions::new());
        assert_eq!(tree.get_projection_styles(node), ProjectionStyles::IDENTITY);
        tree.set_latest_values(node, TransformValues::translation(5.0, 0.0));
        assert_eq!(tree.get_projection_styles(node).translate, Vec2::new(5.0, 0.0));
    }
}
