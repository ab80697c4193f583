// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps an owned copy of every
//! event, in arrival order, for inspection in tests or export through
//! [`json::export`](crate::json::export).

use silhouette_core::trace::{
    FrameBeginEvent, FrameSummary, LeadChangedEvent, ListenerFailedEvent, NodeProjection,
    NodeSkippedEvent, PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// A recorded trace event.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`NodeSkippedEvent`].
    NodeSkipped(NodeSkippedEvent),
    /// A [`ListenerFailedEvent`].
    ListenerFailed(ListenerFailedEvent),
    /// A [`LeadChangedEvent`].
    LeadChanged(LeadChangedEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// A per-node projection.
    NodeProjected {
        /// Frame counter.
        frame_index: u64,
        /// The projection.
        projection: NodeProjection,
    },
}

impl RecordedEvent {
    /// Frame counter of the event.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        match self {
            Self::FrameBegin(e) => e.frame_index,
            Self::PhaseBegin(e) => e.frame_index,
            Self::PhaseEnd(e) => e.frame_index,
            Self::NodeSkipped(e) => e.frame_index,
            Self::ListenerFailed(e) => e.frame_index,
            Self::LeadChanged(e) => e.frame_index,
            Self::FrameSummary(s) => s.frame_index,
            Self::NodeProjected { frame_index, .. } => *frame_index,
        }
    }
}

/// A [`TraceSink`] that records every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// The summaries recorded so far, one per flush.
    pub fn summaries(&self) -> impl Iterator<Item = &FrameSummary> {
        self.events.iter().filter_map(|e| match e {
            RecordedEvent::FrameSummary(s) => Some(s),
            _ => None,
        })
    }

    /// Discards all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.events.push(RecordedEvent::FrameBegin(*e));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.events.push(RecordedEvent::PhaseBegin(*e));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.events.push(RecordedEvent::PhaseEnd(*e));
    }

    fn on_node_skipped(&mut self, e: &NodeSkippedEvent) {
        self.events.push(RecordedEvent::NodeSkipped(*e));
    }

    fn on_listener_failed(&mut self, e: &ListenerFailedEvent) {
        self.events.push(RecordedEvent::ListenerFailed(e.clone()));
    }

    fn on_lead_changed(&mut self, e: &LeadChangedEvent) {
        self.events.push(RecordedEvent::LeadChanged(e.clone()));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.events.push(RecordedEvent::FrameSummary(*s));
    }

    fn on_node_projected(&mut self, frame_index: u64, projection: &NodeProjection) {
        self.events.push(RecordedEvent::NodeProjected {
            frame_index,
            projection: *projection,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silhouette_core::geometry::LayoutBox;
    use silhouette_core::headless::{HeadlessSurface, ManualFrames};
    use silhouette_core::node::{ProjectionOptions, SkipReason};
    use silhouette_core::trace::{PhaseKind, Tracer};
    use silhouette_core::tree::ProjectionTree;

    #[test]
    fn records_a_full_frame() {
        let frames = ManualFrames::new();
        let mut tree: ProjectionTree<u32> = ProjectionTree::new(frames.clone());
        let mut surface = HeadlessSurface::new();
        surface.insert(1, LayoutBox::from_edges(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);

        let mut sink = RecorderSink::new();
        let _ = tree.flush(&mut surface, &mut Tracer::new(&mut sink));

        let events = sink.events();
        assert!(matches!(events[0], RecordedEvent::FrameBegin(_)));
        assert!(matches!(events.last(), Some(RecordedEvent::FrameSummary(_))));
        let phases: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::PhaseBegin(p) => Some(p.phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            [PhaseKind::Measure, PhaseKind::Project, PhaseKind::Notify]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            RecordedEvent::NodeSkipped(s) if s.reason == SkipReason::NoSnapshot
        )));
        assert!(events.iter().all(|e| e.frame_index() == 1));
    }

    #[test]
    fn records_projections_and_summaries() {
        let frames = ManualFrames::new();
        let mut tree: ProjectionTree<u32> = ProjectionTree::new(frames);
        let mut surface = HeadlessSurface::new();
        surface.insert(1, LayoutBox::from_edges(0.0, 100.0, 0.0, 100.0));
        let node = tree.create_node(None, ProjectionOptions::new());
        tree.mount(node, 1, &mut surface);
        let mut sink = RecorderSink::new();
        let _ = tree.flush(&mut surface, &mut Tracer::new(&mut sink));

        tree.will_update(node, &mut surface, false);
        surface.set_box(&1, LayoutBox::from_edges(0.0, 50.0, 0.0, 100.0));
        let _ = tree.flush(&mut surface, &mut Tracer::new(&mut sink));

        let projected: Vec<_> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::NodeProjected { projection, .. } => Some(projection.delta.x.scale),
                _ => None,
            })
            .collect();
        assert_eq!(projected, [0.5]);
        let summaries: Vec<_> = sink.summaries().map(|s| s.changed).collect();
        assert_eq!(summaries, [0, 1]);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
