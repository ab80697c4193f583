// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for projection frames.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`ProjectionTree::flush`](crate::tree::ProjectionTree::flush) calls at each
//! stage. All method bodies default to no-ops, so implementing only the events
//! you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Listener failures are the only errors the tree produces at runtime; they
//! are reported here as [`ListenerFailedEvent`]s rather than returned.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates the per-node [`NodeProjection`]
//!   event and the corresponding `TraceSink` method.

use crate::events::ListenerError;
use crate::node::SkipReason;
use crate::shared::LeadChange;

#[cfg(feature = "trace-rich")]
use crate::geometry::Delta;
#[cfg(feature = "trace-rich")]
use kurbo::Vec2;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which pass of a projection frame is being reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Layout measurement of dirty nodes.
    Measure,
    /// Top-down projection delta computation.
    Project,
    /// Did-update listener delivery.
    Notify,
}

impl PhaseKind {
    /// Short lowercase name, for log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Measure => "measure",
            Self::Project => "project",
            Self::Notify => "notify",
        }
    }
}

/// Which per-node event a failing listener was subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// `on_layout_will_update`.
    WillUpdate,
    /// `on_layout_did_update`.
    DidUpdate,
}

impl ListenerKind {
    /// Short lowercase name, for log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WillUpdate => "will_update",
            Self::DidUpdate => "did_update",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a flush starts.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic flush counter.
    pub frame_index: u64,
    /// Nodes marked layout-dirty.
    pub layout_dirty: usize,
    /// Nodes marked projection-dirty only.
    pub projection_dirty: usize,
    /// Nodes whose instance reported a resize.
    pub resized: usize,
}

/// Marks the beginning of a frame pass.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which pass is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a frame pass.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which pass is ending.
    pub phase: PhaseKind,
    /// Nodes the pass visited.
    pub nodes: usize,
}

/// Emitted when a node is left out of a frame's projection.
#[derive(Clone, Copy, Debug)]
pub struct NodeSkippedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Raw slot index of the node.
    pub node: u32,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Emitted for every listener that returned an error.
#[derive(Clone, Debug)]
pub struct ListenerFailedEvent {
    /// Frame counter of the flush that reported the failure.
    pub frame_index: u64,
    /// Raw slot index of the node the listener was subscribed on.
    pub node: u32,
    /// Which event the listener was subscribed to.
    pub kind: ListenerKind,
    /// The error the listener returned.
    pub error: ListenerError,
}

/// Emitted when a shared-element group changes lead.
#[derive(Clone, Debug)]
pub struct LeadChangedEvent {
    /// Frame counter of the flush that reported the change.
    pub frame_index: u64,
    /// The change.
    pub change: LeadChange,
}

/// Per-frame counts, emitted when a flush ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Nodes re-measured.
    pub measured: usize,
    /// Nodes that received a projection delta.
    pub projected: usize,
    /// Nodes whose layout moved beyond the layout epsilon.
    pub changed: usize,
    /// Nodes skipped.
    pub skipped: usize,
    /// Listener callbacks that returned an error.
    pub listener_failures: usize,
}

/// A per-node projection record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct NodeProjection {
    /// Raw slot index of the node.
    pub node: u32,
    /// The node's final projection delta.
    pub delta: Delta,
    /// Tree scale handed to the node's children.
    pub tree_scale: Vec2,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from projection frames.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a flush starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame pass.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame pass.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a node is skipped.
    fn on_node_skipped(&mut self, e: &NodeSkippedEvent) {
        _ = e;
    }

    /// Called when a listener returned an error.
    fn on_listener_failed(&mut self, e: &ListenerFailedEvent) {
        _ = e;
    }

    /// Called when a shared-element group changes lead.
    fn on_lead_changed(&mut self, e: &LeadChangedEvent) {
        _ = e;
    }

    /// Called with per-frame counts.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called for each projected node (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_node_projected(&mut self, frame_index: u64, projection: &NodeProjection) {
        _ = (frame_index, projection);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`NodeSkippedEvent`].
    #[inline]
    pub fn node_skipped(&mut self, e: &NodeSkippedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_node_skipped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ListenerFailedEvent`].
    #[inline]
    pub fn listener_failed(&mut self, e: &ListenerFailedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_listener_failed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LeadChangedEvent`].
    #[inline]
    pub fn lead_changed(&mut self, e: &LeadChangedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_lead_changed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a per-node projection (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_projected(&mut self, frame_index: u64, projection: &NodeProjection) {
        if let Some(s) = &mut self.sink {
            s.on_node_projected(frame_index, projection);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
