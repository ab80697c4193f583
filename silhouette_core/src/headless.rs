// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host capabilities for tests and headless tools.
//!
//! - [`HeadlessSurface`] keeps a box, an applied transform, and a scroll
//!   offset per instance key, and measures by transforming the box.
//! - [`ManualFrames`] records frame requests; the caller decides when a
//!   frame "fires".
//! - [`HeadlessScrollHost`] records native scroll listeners and resize
//!   observers for the [`ScrollAggregator`](crate::scroll::ScrollAggregator).
//!
//! Instances are plain `u32` keys.
//!
//! ```rust
//! use silhouette_core::geometry::LayoutBox;
//! use silhouette_core::headless::{HeadlessSurface, ManualFrames};
//! use silhouette_core::node::ProjectionOptions;
//! use silhouette_core::trace::Tracer;
//! use silhouette_core::tree::ProjectionTree;
//!
//! let frames = ManualFrames::new();
//! let mut tree: ProjectionTree<u32> = ProjectionTree::new(frames.clone());
//! let mut surface = HeadlessSurface::new();
//! surface.insert(1, LayoutBox::from_edges(0.0, 100.0, 0.0, 100.0));
//!
//! let node = tree.create_node(None, ProjectionOptions::new());
//! tree.mount(node, 1, &mut surface);
//! assert!(frames.take_pending());
//! let changes = tree.on_frame(&mut surface, &mut Tracer::none());
//! assert_eq!(changes.measured, [node.index()]);
//! ```

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use hashbrown::{HashMap, HashSet};
use kurbo::Affine;

use crate::geometry::{LayoutBox, Point};
use crate::node::ProjectionStyles;
use crate::scroll::{ScrollHost, ScrollMetrics};
use crate::surface::{FrameRequestId, FrameScheduler, ResizeListenerId, ResizeSignal, Surface};

#[derive(Debug)]
struct Element {
    rect: LayoutBox,
    transform: Affine,
    scroll: Point,
    attached: bool,
    listener: Option<(ResizeListenerId, ResizeSignal)>,
}

/// A [`Surface`] over in-memory boxes keyed by `u32`.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    elements: HashMap<u32, Element>,
    next_listener: u64,
    resets: usize,
}

impl HeadlessSurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an attached element laid out at `rect`.
    pub fn insert(&mut self, key: u32, rect: LayoutBox) {
        self.elements.insert(
            key,
            Element {
                rect,
                transform: Affine::IDENTITY,
                scroll: Point::ZERO,
                attached: true,
                listener: None,
            },
        );
    }

    /// Removes an element entirely.
    pub fn remove(&mut self, key: &u32) {
        self.elements.remove(key);
    }

    /// Moves an element without reporting a resize, as a re-render would.
    pub fn set_box(&mut self, key: &u32, rect: LayoutBox) {
        if let Some(element) = self.elements.get_mut(key) {
            element.rect = rect;
        }
    }

    /// Changes an element's box and fires its resize listener, if any.
    pub fn resize(&mut self, key: &u32, rect: LayoutBox) {
        let Some(element) = self.elements.get_mut(key) else {
            return;
        };
        element.rect = rect;
        if let Some((_, signal)) = &element.listener {
            signal.notify();
        }
    }

    /// Sets an element's own scroll offset.
    pub fn set_scroll(&mut self, key: &u32, scroll: Point) {
        if let Some(element) = self.elements.get_mut(key) {
            element.scroll = scroll;
        }
    }

    /// Detaches an element; it can no longer be measured.
    pub fn detach(&mut self, key: &u32) {
        if let Some(element) = self.elements.get_mut(key) {
            element.attached = false;
        }
    }

    /// Applies projection styles, as a host would write a CSS transform.
    pub fn apply_styles(&mut self, key: &u32, styles: &ProjectionStyles) {
        if let Some(element) = self.elements.get_mut(key) {
            element.transform = styles.to_affine(element.rect);
        }
    }

    /// The transform currently applied to an element.
    #[must_use]
    pub fn transform(&self, key: &u32) -> Option<Affine> {
        self.elements.get(key).map(|e| e.transform)
    }

    /// Whether a resize listener is attached to an element.
    #[must_use]
    pub fn has_resize_listener(&self, key: &u32) -> bool {
        self.elements
            .get(key)
            .is_some_and(|e| e.listener.is_some())
    }

    /// Number of [`Surface::reset_transform`] calls that cleared a transform.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Surface<u32> for HeadlessSurface {
    fn measure_viewport_box(&mut self, instance: &u32) -> Option<LayoutBox> {
        let element = self.elements.get(instance).filter(|e| e.attached)?;
        Some(LayoutBox::from_rect(
            element.transform.transform_rect_bbox(element.rect.to_rect()),
        ))
    }

    fn measure_scroll(&mut self, instance: &u32) -> Point {
        self.elements
            .get(instance)
            .map_or(Point::ZERO, |e| e.scroll)
    }

    fn reset_transform(&mut self, instance: &u32) {
        if let Some(element) = self.elements.get_mut(instance) {
            if element.transform != Affine::IDENTITY {
                element.transform = Affine::IDENTITY;
                self.resets += 1;
            }
        }
    }

    fn attach_resize_listener(
        &mut self,
        instance: &u32,
        signal: ResizeSignal,
    ) -> Option<ResizeListenerId> {
        let element = self.elements.get_mut(instance)?;
        let id = ResizeListenerId(self.next_listener);
        self.next_listener += 1;
        element.listener = Some((id, signal));
        Some(id)
    }

    fn detach_resize_listener(&mut self, instance: &u32, listener: ResizeListenerId) {
        if let Some(element) = self.elements.get_mut(instance) {
            if element.listener.as_ref().is_some_and(|(id, _)| *id == listener) {
                element.listener = None;
            }
        }
    }
}

#[derive(Debug, Default)]
struct FrameLog {
    next: u64,
    pending: Vec<FrameRequestId>,
    requested: usize,
    cancelled: usize,
}

/// A [`FrameScheduler`] whose frames fire only when the caller says so.
///
/// Clones share state, so a test can keep one clone while the tree owns
/// another.
#[derive(Clone, Debug, Default)]
pub struct ManualFrames {
    log: Rc<RefCell<FrameLog>>,
}

impl ManualFrames {
    /// Creates a scheduler with nothing requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.log.borrow().pending.is_empty()
    }

    /// Total number of requests made.
    #[must_use]
    pub fn requested(&self) -> usize {
        self.log.borrow().requested
    }

    /// Total number of requests cancelled.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.log.borrow().cancelled
    }

    /// Consumes every outstanding request. Returns `true` if there was any,
    /// meaning the caller should now run its frame callback.
    pub fn take_pending(&self) -> bool {
        let mut log = self.log.borrow_mut();
        let any = !log.pending.is_empty();
        log.pending.clear();
        any
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self) -> FrameRequestId {
        let mut log = self.log.borrow_mut();
        let id = FrameRequestId(log.next);
        log.next += 1;
        log.requested += 1;
        log.pending.push(id);
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        let mut log = self.log.borrow_mut();
        if let Some(pos) = log.pending.iter().position(|&p| p == id) {
            log.pending.remove(pos);
            log.cancelled += 1;
        }
    }
}

/// A [`ScrollHost`] over `u32` container keys that records native listener
/// state.
#[derive(Debug, Default)]
pub struct HeadlessScrollHost {
    roots: HashSet<u32>,
    metrics: HashMap<u32, ScrollMetrics>,
    listening: HashSet<u32>,
    observed: HashSet<u32>,
    frames: ManualFrames,
}

impl HeadlessScrollHost {
    /// Creates a host with no containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a container as the document root, which is never resize
    /// observed.
    pub fn set_root(&mut self, container: u32) {
        self.roots.insert(container);
    }

    /// Sets the metrics reported for a container.
    pub fn set_metrics(&mut self, container: u32, metrics: ScrollMetrics) {
        self.metrics.insert(container, metrics);
    }

    /// Whether a native scroll listener is installed on a container.
    #[must_use]
    pub fn has_listener(&self, container: &u32) -> bool {
        self.listening.contains(container)
    }

    /// Whether a resize observer is installed on a container.
    #[must_use]
    pub fn is_observed(&self, container: &u32) -> bool {
        self.observed.contains(container)
    }

    /// The frame requests made by the aggregator.
    #[must_use]
    pub fn frames(&self) -> &ManualFrames {
        &self.frames
    }
}

impl ScrollHost<u32> for HeadlessScrollHost {
    fn add_scroll_listener(&mut self, container: &u32) {
        self.listening.insert(*container);
    }

    fn remove_scroll_listener(&mut self, container: &u32) {
        self.listening.remove(container);
    }

    fn observe_resize(&mut self, container: &u32) {
        self.observed.insert(*container);
    }

    fn unobserve_resize(&mut self, container: &u32) {
        self.observed.remove(container);
    }

    fn is_root(&self, container: &u32) -> bool {
        self.roots.contains(container)
    }

    fn request_frame(&mut self, _container: &u32) -> FrameRequestId {
        self.frames.request_frame()
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.frames.cancel_frame(id);
    }

    fn scroll_metrics(&mut self, container: &u32) -> ScrollMetrics {
        self.metrics.get(container).copied().unwrap_or_default()
    }
}
