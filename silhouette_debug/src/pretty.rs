// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use silhouette_core::node::{NodeId, SkipReason};
use silhouette_core::trace::{
    FrameBeginEvent, FrameSummary, LeadChangedEvent, ListenerFailedEvent, NodeProjection,
    NodeSkippedEvent, PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints phase boundaries and per-node projections.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn reason_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NotMeasured => "not-measured",
        SkipReason::NoSnapshot => "no-snapshot",
        SkipReason::Unmounted => "unmounted",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] {} layout={} projection={} resized={}",
            e.frame_index, e.layout_dirty, e.projection_dirty, e.resized,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        if self.verbose {
            let _ = writeln!(
                self.writer,
                "[phase:begin] frame={} {}",
                e.frame_index,
                e.phase.name(),
            );
        }
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        if self.verbose {
            let _ = writeln!(
                self.writer,
                "[phase:end] frame={} {} nodes={}",
                e.frame_index,
                e.phase.name(),
                e.nodes,
            );
        }
    }

    fn on_node_skipped(&mut self, e: &NodeSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] frame={} node={} {}",
            e.frame_index,
            e.node,
            reason_name(e.reason),
        );
    }

    fn on_listener_failed(&mut self, e: &ListenerFailedEvent) {
        let _ = writeln!(
            self.writer,
            "[listener] frame={} node={} {} FAILED: {}",
            e.frame_index,
            e.node,
            e.kind.name(),
            e.error,
        );
    }

    fn on_lead_changed(&mut self, e: &LeadChangedEvent) {
        let slot = |n: Option<NodeId>| {
            n.map_or_else(|| "-".to_owned(), |n| n.index().to_string())
        };
        let _ = writeln!(
            self.writer,
            "[lead] frame={} id={} {} -> {}",
            e.frame_index,
            e.change.layout_id,
            slot(e.change.previous),
            slot(e.change.current),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} measured={} projected={} changed={} skipped={} failures={}",
            s.frame_index, s.measured, s.projected, s.changed, s.skipped, s.listener_failures,
        );
    }

    fn on_node_projected(&mut self, frame_index: u64, projection: &NodeProjection) {
        if self.verbose {
            let d = &projection.delta;
            let _ = writeln!(
                self.writer,
                "[node] frame={frame_index} node={} translate=({:.2}, {:.2}) scale=({:.3}, {:.3})",
                projection.node, d.x.translate, d.y.translate, d.x.scale, d.y.scale,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silhouette_core::events::ListenerError;
    use silhouette_core::trace::{ListenerKind, PhaseKind};

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).expect("utf-8 output")
    }

    #[test]
    fn pretty_print_frame_and_summary() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_begin(&FrameBeginEvent {
            frame_index: 3,
            layout_dirty: 2,
            projection_dirty: 1,
            resized: 0,
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 3,
            measured: 2,
            projected: 3,
            changed: 1,
            skipped: 0,
            listener_failures: 0,
        });
        let out = output(sink);
        assert!(out.contains("[frame] 3 layout=2"), "got: {out}");
        assert!(out.contains("changed=1"), "got: {out}");
    }

    #[test]
    fn phases_only_in_verbose_mode() {
        let event = PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Project,
        };
        let mut quiet = PrettyPrintSink::with_writer(Vec::<u8>::new());
        quiet.on_phase_begin(&event);
        assert!(output(quiet).is_empty());

        let mut loud = PrettyPrintSink::with_writer(Vec::<u8>::new()).verbose(true);
        loud.on_phase_begin(&event);
        assert!(output(loud).contains("project"));
    }

    #[test]
    fn pretty_print_failures_and_skips() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_listener_failed(&ListenerFailedEvent {
            frame_index: 2,
            node: 5,
            kind: ListenerKind::WillUpdate,
            error: ListenerError::new("boom"),
        });
        sink.on_node_skipped(&NodeSkippedEvent {
            frame_index: 2,
            node: 6,
            reason: SkipReason::NotMeasured,
        });
        let out = output(sink);
        assert!(out.contains("will_update FAILED: boom"), "got: {out}");
        assert!(out.contains("node=6 not-measured"), "got: {out}");
    }
}
