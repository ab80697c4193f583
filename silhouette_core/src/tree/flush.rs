// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame coordination and change tracking.
//!
//! A flush follows a drain-then-walk pattern:
//!
//! 1. Pending resize notifications are turned into **LAYOUT** marks.
//! 2. **LAYOUT**, **PROJECTION**, and **TOPOLOGY** are drained. Nodes drained
//!    from LAYOUT are measured and projected; nodes drained from PROJECTION
//!    (with their dependents) are projected only.
//! 3. The cached depth-first traversal is walked three times: measure,
//!    project, notify. Each pass visits a parent before its descendants, so
//!    every node reads an already-current tree scale from its parent.
//! 4. Lead changes and listener failures collected since the last flush are
//!    reported to the trace sink.
//!
//! [`ProjectionChanges`] uses raw slot indices (`u32`) rather than
//! [`NodeId`](crate::node::NodeId) handles so that hosts can read results
//! through the `*_at()` accessors (e.g.
//! [`projection_styles_at`](super::ProjectionTree::projection_styles_at))
//! without a generation check per access.

use alloc::vec;
use alloc::vec::Vec;

use understory_dirty::EagerPolicy;

use super::ProjectionTree;
use crate::dirty;
use crate::node::{SkipReason, Snapshot};
use crate::shared::LeadChange;
use crate::surface::Surface;
use crate::trace::{
    FrameBeginEvent, FrameSummary, LeadChangedEvent, ListenerFailedEvent, NodeSkippedEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer,
};

const MEASURE: u8 = 1;
const PROJECT: u8 = 2;
const SKIPPED: u8 = 4;

/// The set of changes produced by a single [`ProjectionTree::flush`] call.
#[derive(Clone, Debug, Default)]
pub struct ProjectionChanges {
    /// Frame counter of the flush.
    pub frame_index: u64,
    /// Nodes whose layout was re-measured.
    pub measured: Vec<u32>,
    /// Nodes that received a new projection delta, in traversal order.
    pub projected: Vec<u32>,
    /// Nodes whose layout moved beyond the layout epsilon.
    pub changed: Vec<u32>,
    /// Nodes left out of the frame, with the reason.
    pub skipped: Vec<(u32, SkipReason)>,
    /// Shared-element lead changes since the previous flush.
    pub lead_changes: Vec<LeadChange>,
    /// Listener callbacks that returned an error since the previous flush.
    pub listener_failures: usize,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
}

impl ProjectionChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.frame_index = 0;
        self.measured.clear();
        self.projected.clear();
        self.changed.clear();
        self.skipped.clear();
        self.lead_changes.clear();
        self.listener_failures = 0;
        self.topology_changed = false;
    }

    /// Whether the flush did nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
            && self.projected.is_empty()
            && self.skipped.is_empty()
            && self.lead_changes.is_empty()
            && self.listener_failures == 0
    }
}

impl<I> ProjectionTree<I> {
    /// Requests a frame. Requests made before the frame fires coalesce into
    /// one.
    pub fn schedule_update_projection(&mut self) {
        self.gate.schedule();
    }

    /// Whether a requested frame has not fired yet.
    #[must_use]
    pub fn is_frame_pending(&self) -> bool {
        self.gate.is_pending()
    }

    /// Number of flushes run so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Host callback for a frame requested through the
    /// [`FrameScheduler`](crate::surface::FrameScheduler).
    pub fn on_frame(
        &mut self,
        surface: &mut dyn Surface<I>,
        tracer: &mut Tracer<'_>,
    ) -> ProjectionChanges {
        self.gate.frame_fired();
        self.flush(surface, tracer)
    }

    /// Runs one frame: measures, projects, and notifies every node with
    /// pending work, and returns what changed.
    pub fn flush(
        &mut self,
        surface: &mut dyn Surface<I>,
        tracer: &mut Tracer<'_>,
    ) -> ProjectionChanges {
        let mut changes = ProjectionChanges::default();
        self.flush_into(surface, tracer, &mut changes);
        changes
    }

    /// Like [`flush`](Self::flush), but reuses a caller-provided buffer.
    pub fn flush_into(
        &mut self,
        surface: &mut dyn Surface<I>,
        tracer: &mut Tracer<'_>,
        changes: &mut ProjectionChanges,
    ) {
        changes.clear();
        self.frame_index += 1;
        let frame_index = self.frame_index;
        changes.frame_index = frame_index;

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        // Resized nodes are re-measured without animating.
        let resized = self.gate.take_resized();
        let mut resized_count = 0;
        for node in resized {
            if let Some(idx) = self.slot(node) {
                resized_count += 1;
                self.flags[idx as usize].resize_pending = true;
                self.dirty.mark(idx, dirty::LAYOUT);
                self.dirty.mark_with(idx, dirty::PROJECTION, &EagerPolicy);
            }
        }

        // LAYOUT marks are eager already; PROJECTION pulls in dependents.
        let layout_dirty: Vec<u32> = self
            .dirty
            .drain(dirty::LAYOUT)
            .deterministic()
            .run()
            .collect();
        let projection_dirty: Vec<u32> = self
            .dirty
            .drain(dirty::PROJECTION)
            .affected()
            .deterministic()
            .run()
            .collect();
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        let mut pass = vec![0_u8; self.len as usize];
        for &idx in &layout_dirty {
            if let Some(p) = pass.get_mut(idx as usize) {
                *p |= MEASURE | PROJECT;
            }
        }
        for &idx in &projection_dirty {
            if let Some(p) = pass.get_mut(idx as usize) {
                *p |= PROJECT;
            }
        }

        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            layout_dirty: layout_dirty.len(),
            projection_dirty: projection_dirty.len(),
            resized: resized_count,
        });

        let order = core::mem::take(&mut self.traversal_order);

        // -- Measure --
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Measure,
        });
        for &idx in &order {
            let i = idx as usize;
            if pass[i] & MEASURE == 0 {
                continue;
            }
            if self.instance[i].is_none() {
                self.layout[i] = None;
                pass[i] |= SKIPPED;
                skip(changes, tracer, frame_index, idx, SkipReason::Unmounted);
                continue;
            }
            self.refresh_ancestor_scroll(idx, surface);
            self.update_scroll_at(idx, surface);
            let Some(layout) = self.update_layout_at(idx, surface) else {
                pass[i] |= SKIPPED;
                skip(changes, tracer, frame_index, idx, SkipReason::NotMeasured);
                continue;
            };
            if self.flags[i].resize_pending {
                self.snapshot[i] = Some(Snapshot {
                    layout,
                    visible: self.latest_values[i].apply_to(layout),
                });
            }
            // Followers aim at the lead's layout.
            for follower in self.followers_at(idx) {
                for j in self.subtree(follower) {
                    if let Some(p) = pass.get_mut(j as usize) {
                        *p |= PROJECT;
                    }
                }
            }
            changes.measured.push(idx);
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Measure,
            nodes: changes.measured.len(),
        });

        // -- Project --
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Project,
        });
        for &idx in &order {
            let i = idx as usize;
            if pass[i] & PROJECT == 0 {
                continue;
            }
            if pass[i] & SKIPPED != 0 {
                // Already reported; children inherit the parent's scale.
                let _ = self.calc_projection_at(idx);
                continue;
            }
            match self.calc_projection_at(idx) {
                Ok(_delta) => {
                    changes.projected.push(idx);
                    #[cfg(feature = "trace-rich")]
                    tracer.node_projected(
                        frame_index,
                        &crate::trace::NodeProjection {
                            node: idx,
                            delta: _delta,
                            tree_scale: self.tree_scale[i],
                        },
                    );
                }
                Err(reason) => skip(changes, tracer, frame_index, idx, reason),
            }
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Project,
            nodes: changes.projected.len(),
        });

        // -- Notify --
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Notify,
        });
        let mut notified = 0;
        for &idx in &changes.measured {
            if let Some(update) = self.did_update_at(idx) {
                notified += 1;
                if update.has_layout_changed {
                    changes.changed.push(idx);
                }
            }
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Notify,
            nodes: notified,
        });

        // No cycle survives a flush.
        for &idx in &order {
            self.finish_cycle(idx);
        }
        self.traversal_order = order;

        for change in core::mem::take(&mut self.pending_leads) {
            tracer.lead_changed(&LeadChangedEvent {
                frame_index,
                change: change.clone(),
            });
            changes.lead_changes.push(change);
        }
        for failure in core::mem::take(&mut self.pending_failures) {
            changes.listener_failures += 1;
            tracer.listener_failed(&ListenerFailedEvent {
                frame_index,
                node: failure.node,
                kind: failure.kind,
                error: failure.error,
            });
        }
        self.shared.clear_parked();

        tracer.frame_summary(&FrameSummary {
            frame_index,
            measured: changes.measured.len(),
            projected: changes.projected.len(),
            changed: changes.changed.len(),
            skipped: changes.skipped.len(),
            listener_failures: changes.listener_failures,
        });
    }
}

fn skip(
    changes: &mut ProjectionChanges,
    tracer: &mut Tracer<'_>,
    frame_index: u64,
    node: u32,
    reason: SkipReason,
) {
    changes.skipped.push((node, reason));
    tracer.node_skipped(&NodeSkippedEvent {
        frame_index,
        node,
        reason,
    });
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use kurbo::Vec2;

    use super::*;
    use crate::events::ListenerError;
    use crate::geometry::LayoutBox;
    use crate::headless::HeadlessSurface;
    use crate::node::{LayoutUpdate, ProjectionOptions};
    use crate::shared::LayoutId;
    use crate::tree::tests::tree;

    fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> LayoutBox {
        LayoutBox::from_edges(x0, x1, y0, y1)
    }

    #[test]
    fn translate_scenario() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 50.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        let updates = Rc::new(RefCell::new(Vec::<LayoutUpdate>::new()));
        let u = Rc::clone(&updates);
        tree.on_layout_did_update(node, move |update| {
            u.borrow_mut().push(*update);
            Ok(())
        });

        tree.will_update(node, &mut surface, true);
        surface.set_box(&1, rect(50.0, 150.0, 0.0, 50.0));
        let changes = tree.flush(&mut surface, &mut Tracer::none());

        assert_eq!(changes.projected, &[node.index()]);
        assert_eq!(changes.changed, &[node.index()]);
        let delta = tree.projection_delta(node).expect("projected");
        assert_eq!(delta.x.translate, 50.0);
        assert_eq!(delta.x.scale, 1.0);
        assert!(delta.y.is_identity());

        let updates = updates.borrow();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].has_layout_changed);
        assert_eq!(updates[0].delta.x.translate, 50.0);
    }

    #[test]
    fn parent_scale_is_corrected_in_child() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        surface.insert(2, rect(25.0, 75.0, 25.0, 75.0));
        let parent = tree.create_node(None, ProjectionOptions::new());
        let child = tree.create_node(Some(parent), ProjectionOptions::new());
        tree.mount(parent, 1, &mut surface);
        tree.mount(child, 2, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        tree.will_update(parent, &mut surface, true);
        surface.set_box(&1, rect(-50.0, 150.0, -50.0, 150.0));
        let changes = tree.flush(&mut surface, &mut Tracer::none());

        assert_eq!(changes.projected, &[parent.index(), child.index()]);
        let parent_delta = tree.projection_delta(parent).expect("parent");
        assert_eq!(parent_delta.scale(), Vec2::new(2.0, 2.0));
        let child_delta = tree.projection_delta(child).expect("child");
        assert_eq!(child_delta.scale(), Vec2::new(0.5, 0.5));
        assert_eq!(tree.tree_scale(child), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn parent_translation_is_not_removed_from_child() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        surface.insert(2, rect(25.0, 75.0, 25.0, 75.0));
        let parent = tree.create_node(None, ProjectionOptions::new());
        let child = tree.create_node(Some(parent), ProjectionOptions::new());
        tree.mount(parent, 1, &mut surface);
        tree.mount(child, 2, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        tree.will_update(parent, &mut surface, false);
        surface.set_box(&1, rect(50.0, 150.0, 0.0, 100.0));
        surface.set_box(&2, rect(75.0, 125.0, 25.0, 75.0));
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        let parent_delta = tree.projection_delta(parent).expect("parent");
        let child_delta = tree.projection_delta(child).expect("child");
        assert_eq!(parent_delta.x.translate, 50.0);
        assert_eq!(child_delta.x.translate, 50.0);
        assert_eq!(child_delta.x.scale, 1.0);
    }

    #[test]
    fn unmeasurable_node_is_skipped_not_zeroed() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        tree.will_update(node, &mut surface, true);
        surface.detach(&1);
        let changes = tree.flush(&mut surface, &mut Tracer::none());
        assert_eq!(changes.skipped, &[(node.index(), SkipReason::NotMeasured)]);
        assert!(changes.projected.is_empty());
        assert_eq!(tree.layout(node), None);
        assert_eq!(tree.projection_delta(node), None);
    }

    #[test]
    fn first_mount_reports_missing_snapshot() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let changes = tree.flush(&mut surface, &mut Tracer::none());
        assert_eq!(changes.measured, &[node.index()]);
        assert_eq!(changes.skipped, &[(node.index(), SkipReason::NoSnapshot)]);
        assert!(changes.topology_changed);
    }

    #[test]
    fn resize_is_not_animated() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        surface.resize(&1, rect(0.0, 300.0, 0.0, 100.0));
        assert!(tree.is_frame_pending());
        let changes = tree.on_frame(&mut surface, &mut Tracer::none());
        assert_eq!(changes.measured, &[node.index()]);
        assert!(changes.changed.is_empty());
        assert_eq!(tree.projection_delta(node).map(|d| d.is_identity()), Some(true));
        assert_eq!(tree.layout(node), Some(rect(0.0, 300.0, 0.0, 100.0)));
    }

    #[test]
    fn listener_failures_are_counted_and_isolated() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        let hits = Rc::new(RefCell::new(0));
        tree.on_layout_will_update(node, |_| Err(ListenerError::new("will")));
        tree.on_layout_did_update(node, |_| Err(ListenerError::new("did")));
        let h = Rc::clone(&hits);
        tree.on_layout_did_update(node, move |_| {
            *h.borrow_mut() += 1;
            Ok(())
        });

        tree.will_update(node, &mut surface, true);
        let changes = tree.flush(&mut surface, &mut Tracer::none());
        assert_eq!(changes.listener_failures, 2);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn target_change_reprojects_without_measuring() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let _ = tree.flush(&mut surface, &mut Tracer::none());
        tree.will_update(node, &mut surface, false);
        let _ = tree.flush(&mut surface, &mut Tracer::none());

        tree.set_target(node, Some(rect(0.0, 200.0, 0.0, 100.0)));
        let changes = tree.flush(&mut surface, &mut Tracer::none());
        assert!(changes.measured.is_empty());
        assert_eq!(changes.projected, &[node.index()]);
        assert_eq!(tree.projection_delta(node).map(|d| d.x.scale), Some(2.0));
    }

    #[test]
    fn empty_flush_is_empty() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        let _ = tree.create_node(None, ProjectionOptions::new());
        let _ = tree.flush(&mut surface, &mut Tracer::none());
        let changes = tree.flush(&mut surface, &mut Tracer::none());
        assert!(changes.is_empty());
        assert!(!changes.topology_changed);
    }

    #[test]
    fn lead_changes_are_reported_at_flush() {
        let (mut tree, _) = tree();
        let mut surface = HeadlessSurface::new();
        surface.insert(1, rect(0.0, 10.0, 0.0, 10.0));
        let id = LayoutId::from("hero");
        let node = tree.create_node(None, ProjectionOptions::new().layout_id(id.clone()));
        tree.mount(node, 1, &mut surface);
        let changes = tree.flush(&mut surface, &mut Tracer::none());
        assert_eq!(changes.lead_changes.len(), 1);
        assert_eq!(changes.lead_changes[0].current, Some(node));
        assert!(tree.is_lead(node, &id));
    }
}
