// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host capabilities injected into the projection tree.
//!
//! The tree never talks to a render target directly. It relies on two
//! capabilities supplied by the host:
//!
//! - **[`Surface`]**: measures an instance's viewport box and scroll offset,
//!   resets the projection transform applied to it, and attaches resize
//!   listeners. DOM-like hosts, alternate renderers, and the
//!   [`headless`](crate::headless) test surface all implement it.
//!
//! - **[`FrameScheduler`]**: the host's per-frame callback primitive
//!   (`requestAnimationFrame` or equivalent). The tree requests at most one
//!   frame at a time; the host calls
//!   [`ProjectionTree::on_frame`](crate::tree::ProjectionTree::on_frame)
//!   when it fires.
//!
//! # Frame loop
//!
//! ```rust,ignore
//! // Before the host mutates layout:
//! tree.will_update(node, &mut surface, true);
//!
//! // ... host re-renders, moving and resizing elements ...
//!
//! // When the requested frame fires:
//! let changes = tree.on_frame(&mut surface, &mut Tracer::none());
//! for &idx in &changes.projected {
//!     // apply tree.get_projection_styles(..) to the element
//! }
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::geometry::{LayoutBox, Point};
use crate::node::NodeId;

/// Identifies a frame request made through a [`FrameScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

/// Identifies a resize listener attached through a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResizeListenerId(pub u64);

/// Measurement capability for host instances of type `I`.
///
/// Only [`measure_viewport_box`](Self::measure_viewport_box) is required; the
/// remaining methods default to "no scroll", "nothing to reset", and "resize
/// not observable".
pub trait Surface<I> {
    /// Returns the instance's current box relative to the viewport, or
    /// `None` if the instance is not attached to a measurable surface.
    fn measure_viewport_box(&mut self, instance: &I) -> Option<LayoutBox>;

    /// Returns the instance's own scroll offset.
    fn measure_scroll(&mut self, instance: &I) -> Point {
        _ = instance;
        Point::ZERO
    }

    /// Removes any projection transform applied to the instance.
    fn reset_transform(&mut self, instance: &I) {
        _ = instance;
    }

    /// Starts observing the instance for size changes, calling
    /// [`ResizeSignal::notify`] on each one.
    fn attach_resize_listener(
        &mut self,
        instance: &I,
        signal: ResizeSignal,
    ) -> Option<ResizeListenerId> {
        _ = (instance, signal);
        None
    }

    /// Stops a resize listener returned by
    /// [`attach_resize_listener`](Self::attach_resize_listener).
    fn detach_resize_listener(&mut self, instance: &I, listener: ResizeListenerId) {
        _ = (instance, listener);
    }
}

/// The host's per-frame callback primitive.
///
/// Methods take `&self` because schedulers are typically thin wrappers over
/// global platform functions.
pub trait FrameScheduler {
    /// Requests a callback on the next frame.
    fn request_frame(&self) -> FrameRequestId;

    /// Cancels a pending request.
    fn cancel_frame(&self, id: FrameRequestId);
}

/// Coalesces frame requests and collects resize notifications.
///
/// Shared between the tree and the [`ResizeSignal`]s it hands out.
pub(crate) struct FrameGate {
    scheduler: Box<dyn FrameScheduler>,
    pending: Cell<Option<FrameRequestId>>,
    resized: RefCell<Vec<NodeId>>,
}

impl fmt::Debug for FrameGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameGate")
            .field("pending", &self.pending.get())
            .field("resized", &self.resized.borrow().len())
            .finish_non_exhaustive()
    }
}

impl FrameGate {
    pub(crate) fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            pending: Cell::new(None),
            resized: RefCell::new(Vec::new()),
        }
    }

    /// Requests a frame unless one is already pending.
    ///
    /// Returns `true` if a new request was made.
    pub(crate) fn schedule(&self) -> bool {
        if self.pending.get().is_some() {
            return false;
        }
        self.pending.set(Some(self.scheduler.request_frame()));
        true
    }

    /// Cancels the pending request, if any.
    pub(crate) fn cancel(&self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    /// Forgets the pending request after its frame fired.
    pub(crate) fn frame_fired(&self) {
        self.pending.set(None);
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    pub(crate) fn push_resize(&self, node: NodeId) {
        let mut resized = self.resized.borrow_mut();
        if !resized.contains(&node) {
            resized.push(node);
        }
    }

    pub(crate) fn take_resized(&self) -> Vec<NodeId> {
        core::mem::take(&mut *self.resized.borrow_mut())
    }

    pub(crate) fn has_resized(&self) -> bool {
        !self.resized.borrow().is_empty()
    }
}

/// Handed to [`Surface::attach_resize_listener`]; reports a resize of one
/// node's instance back to the tree.
#[derive(Clone)]
pub struct ResizeSignal {
    gate: Rc<FrameGate>,
    node: NodeId,
}

impl fmt::Debug for ResizeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeSignal")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl ResizeSignal {
    pub(crate) fn new(gate: Rc<FrameGate>, node: NodeId) -> Self {
        Self { gate, node }
    }

    /// The node whose instance this signal observes.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Reports a resize and requests a frame.
    ///
    /// The node is re-measured on that frame without animating; a stale
    /// node is ignored.
    pub fn notify(&self) {
        self.gate.push_resize(self.node);
        self.gate.schedule();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        requested: Rc<Cell<u64>>,
        cancelled: Rc<Cell<u64>>,
    }

    impl FrameScheduler for Counting {
        fn request_frame(&self) -> FrameRequestId {
            let n = self.requested.get();
            self.requested.set(n + 1);
            FrameRequestId(n)
        }

        fn cancel_frame(&self, _id: FrameRequestId) {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }

    #[test]
    fn schedule_coalesces_until_fired() {
        let requested = Rc::new(Cell::new(0));
        let gate = FrameGate::new(Box::new(Counting {
            requested: Rc::clone(&requested),
            ..Counting::default()
        }));
        assert!(gate.schedule());
        assert!(!gate.schedule());
        assert_eq!(requested.get(), 1);
        gate.frame_fired();
        assert!(gate.schedule());
        assert_eq!(requested.get(), 2);
    }

    #[test]
    fn cancel_forwards_pending_request() {
        let cancelled = Rc::new(Cell::new(0));
        let gate = FrameGate::new(Box::new(Counting {
            cancelled: Rc::clone(&cancelled),
            ..Counting::default()
        }));
        gate.cancel();
        assert_eq!(cancelled.get(), 0, "nothing pending");
        gate.schedule();
        gate.cancel();
        assert_eq!(cancelled.get(), 1);
        assert!(!gate.is_pending());
    }

    #[test]
    fn resize_signal_queues_once_and_schedules() {
        let requested = Rc::new(Cell::new(0));
        let gate = Rc::new(FrameGate::new(Box::new(Counting {
            requested: Rc::clone(&requested),
            ..Counting::default()
        })));
        let node = NodeId {
            idx: 4,
            generation: 0,
        };
        let signal = ResizeSignal::new(Rc::clone(&gate), node);
        signal.notify();
        signal.notify();
        assert_eq!(gate.take_resized(), alloc::vec![node]);
        assert_eq!(requested.get(), 1);
    }
}
