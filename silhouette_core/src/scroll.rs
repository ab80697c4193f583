// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll and resize aggregation.
//!
//! Many logical observers can watch the same scroll container. The
//! [`ScrollAggregator`] installs exactly **one** native listener per
//! container and fans each native event out to every subscribed
//! [`ScrollHandler`] in three lockstep phases:
//!
//! ```text
//!   native event ──► measure (all) ──► update (all) ──► notify (all)
//! ```
//!
//! No handler's `update` runs before every handler has measured, and no
//! `notify` runs before every handler has updated, so all observers see the
//! same frame.
//!
//! The registry is keyed by container and has an explicit lifecycle: a
//! container's entry (with its native listener, and for non-root containers
//! its resize observer) is created by the first [`subscribe`] and torn down
//! by the last [`unsubscribe`].
//!
//! [`subscribe`]: ScrollAggregator::subscribe
//! [`unsubscribe`]: ScrollAggregator::unsubscribe

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;
use kurbo::{Size, Vec2};

use crate::surface::FrameRequestId;

/// Elapsed time (ms) above which velocity is reported as zero.
pub const MAX_VELOCITY_DELTA_MS: f64 = 50.0;

/// Geometry of a scroll container at the time of a native event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    /// Current scroll offset.
    pub offset: Vec2,
    /// Size of the scrollable content.
    pub content: Size,
    /// Size of the visible viewport.
    pub viewport: Size,
}

/// A logical scroll observer.
pub trait ScrollHandler {
    /// Reads the container's metrics for this event.
    fn measure(&mut self, metrics: &ScrollMetrics);

    /// Derives state from the measurement. `time` is in milliseconds.
    fn update(&mut self, time: f64);

    /// Reports the derived state.
    fn notify(&mut self);
}

/// Native capabilities the aggregator needs from the host, for containers
/// of type `C`.
pub trait ScrollHost<C> {
    /// Installs the container's native scroll (and viewport resize)
    /// listener.
    fn add_scroll_listener(&mut self, container: &C);

    /// Removes the listener installed by
    /// [`add_scroll_listener`](Self::add_scroll_listener).
    fn remove_scroll_listener(&mut self, container: &C);

    /// Starts observing the container's own size.
    fn observe_resize(&mut self, container: &C);

    /// Stops observing the container's own size.
    fn unobserve_resize(&mut self, container: &C);

    /// Whether the container is the document root, whose size follows the
    /// viewport.
    fn is_root(&self, container: &C) -> bool;

    /// Requests a frame on which the host dispatches `container`.
    fn request_frame(&mut self, container: &C) -> FrameRequestId;

    /// Cancels a frame request. Cancelling a frame that already fired must
    /// do nothing.
    fn cancel_frame(&mut self, id: FrameRequestId);

    /// Measures the container.
    fn scroll_metrics(&mut self, container: &C) -> ScrollMetrics;
}

/// A live subscription returned by [`ScrollAggregator::subscribe`].
///
/// Pass it back to [`ScrollAggregator::unsubscribe`] to stop receiving
/// events.
#[must_use = "dropping a subscription without unsubscribing leaks the handler"]
#[derive(Debug, PartialEq, Eq)]
pub struct ScrollSubscription<C> {
    container: C,
    key: u64,
    initial_frame: FrameRequestId,
}

impl<C> ScrollSubscription<C> {
    /// The observed container.
    pub fn container(&self) -> &C {
        &self.container
    }
}

struct Entry {
    handlers: Vec<(u64, Box<dyn ScrollHandler>)>,
    observes_resize: bool,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("handlers", &self.handlers.len())
            .field("observes_resize", &self.observes_resize)
            .finish()
    }
}

/// Per-container registry of scroll handlers.
pub struct ScrollAggregator<C> {
    containers: HashMap<C, Entry>,
    next_key: u64,
}

impl<C: fmt::Debug> fmt::Debug for ScrollAggregator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAggregator")
            .field("containers", &self.containers)
            .finish_non_exhaustive()
    }
}

impl<C> Default for ScrollAggregator<C> {
    fn default() -> Self {
        Self {
            containers: HashMap::new(),
            next_key: 0,
        }
    }
}

impl<C: Eq + Hash + Clone> ScrollAggregator<C> {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for `container`.
    ///
    /// The first handler for a container installs its native listener, and
    /// a resize observer unless the container is the root. Every
    /// subscription requests an initial frame so the handler sees the
    /// current position without waiting for a scroll.
    pub fn subscribe(
        &mut self,
        container: C,
        handler: Box<dyn ScrollHandler>,
        host: &mut dyn ScrollHost<C>,
    ) -> ScrollSubscription<C> {
        let key = self.next_key;
        self.next_key += 1;

        let entry = self.containers.entry(container.clone()).or_insert_with(|| {
            host.add_scroll_listener(&container);
            let observes_resize = !host.is_root(&container);
            if observes_resize {
                host.observe_resize(&container);
            }
            Entry {
                handlers: Vec::new(),
                observes_resize,
            }
        });
        entry.handlers.push((key, handler));

        let initial_frame = host.request_frame(&container);
        ScrollSubscription {
            container,
            key,
            initial_frame,
        }
    }

    /// Removes a handler and returns it.
    ///
    /// Cancels the subscription's initial frame. Removing the last handler
    /// of a container tears down its native listener and resize observer.
    pub fn unsubscribe(
        &mut self,
        subscription: ScrollSubscription<C>,
        host: &mut dyn ScrollHost<C>,
    ) -> Option<Box<dyn ScrollHandler>> {
        host.cancel_frame(subscription.initial_frame);

        let entry = self.containers.get_mut(&subscription.container)?;
        let pos = entry
            .handlers
            .iter()
            .position(|(k, _)| *k == subscription.key)?;
        let (_, handler) = entry.handlers.remove(pos);

        if entry.handlers.is_empty() {
            let observes_resize = entry.observes_resize;
            self.containers.remove(&subscription.container);
            host.remove_scroll_listener(&subscription.container);
            if observes_resize {
                host.unobserve_resize(&subscription.container);
            }
        }
        Some(handler)
    }

    /// Runs every handler of `container` for one native event.
    ///
    /// The container is measured once; all handlers then measure, update,
    /// and notify in phase order. Returns the number of handlers run.
    pub fn dispatch(&mut self, container: &C, time: f64, host: &mut dyn ScrollHost<C>) -> usize {
        let Some(entry) = self.containers.get_mut(container) else {
            return 0;
        };
        let metrics = host.scroll_metrics(container);
        for (_, handler) in &mut entry.handlers {
            handler.measure(&metrics);
        }
        for (_, handler) in &mut entry.handlers {
            handler.update(time);
        }
        for (_, handler) in &mut entry.handlers {
            handler.notify();
        }
        entry.handlers.len()
    }

    /// Whether any handler observes `container`.
    #[must_use]
    pub fn is_observed(&self, container: &C) -> bool {
        self.containers.contains_key(container)
    }

    /// Number of handlers observing `container`.
    #[must_use]
    pub fn handler_count(&self, container: &C) -> usize {
        self.containers.get(container).map_or(0, |e| e.handlers.len())
    }

    /// Number of observed containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether no container is observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

// -- ScrollTracker --

/// Scroll state along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollInfo {
    /// Current offset.
    pub current: f64,
    /// Offset at the previous update.
    pub previous: f64,
    /// Maximum offset (content length minus viewport length).
    pub scroll_length: f64,
    /// `current / scroll_length`; `1.0` when nothing can scroll.
    pub progress: f64,
    /// Offset change per second.
    pub velocity: f64,
}

impl ScrollInfo {
    fn measure(&mut self, offset: f64, content: f64, viewport: f64) {
        self.current = offset;
        self.scroll_length = (content - viewport).max(0.0);
    }

    fn update(&mut self, elapsed: f64) {
        self.progress = if self.scroll_length == 0.0 {
            1.0
        } else {
            self.current / self.scroll_length
        };
        self.velocity = if elapsed > 0.0 && elapsed <= MAX_VELOCITY_DELTA_MS {
            (self.current - self.previous) * 1000.0 / elapsed
        } else {
            0.0
        };
        self.previous = self.current;
    }
}

/// Two-axis scroll state reported by a [`ScrollTracker`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollProgress {
    /// Time of the latest update, in milliseconds.
    pub time: f64,
    /// Horizontal axis.
    pub x: ScrollInfo,
    /// Vertical axis.
    pub y: ScrollInfo,
}

/// A ready-made [`ScrollHandler`] computing offset, progress, and velocity
/// per axis and passing them to a callback.
pub struct ScrollTracker {
    progress: ScrollProgress,
    last_time: Option<f64>,
    on_scroll: Box<dyn FnMut(&ScrollProgress)>,
}

impl fmt::Debug for ScrollTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollTracker")
            .field("progress", &self.progress)
            .field("last_time", &self.last_time)
            .finish_non_exhaustive()
    }
}

impl ScrollTracker {
    /// Creates a tracker that reports through `on_scroll`.
    pub fn new(on_scroll: impl FnMut(&ScrollProgress) + 'static) -> Self {
        Self {
            progress: ScrollProgress::default(),
            last_time: None,
            on_scroll: Box::new(on_scroll),
        }
    }

    /// The most recent state.
    #[must_use]
    pub fn progress(&self) -> &ScrollProgress {
        &self.progress
    }
}

impl ScrollHandler for ScrollTracker {
    fn measure(&mut self, metrics: &ScrollMetrics) {
        self.progress
            .x
            .measure(metrics.offset.x, metrics.content.width, metrics.viewport.width);
        self.progress
            .y
            .measure(metrics.offset.y, metrics.content.height, metrics.viewport.height);
    }

    fn update(&mut self, time: f64) {
        let elapsed = self.last_time.map_or(0.0, |last| time - last);
        self.last_time = Some(time);
        self.progress.time = time;
        self.progress.x.update(elapsed);
        self.progress.y.update(elapsed);
    }

    fn notify(&mut self) {
        (self.on_scroll)(&self.progress);
    }
}
