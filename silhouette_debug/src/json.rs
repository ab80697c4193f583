// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON export of recorded events.
//!
//! [`export`] writes the events captured by a
//! [`RecorderSink`](crate::recorder::RecorderSink) as a JSON array, one object
//! per event, each tagged with an `"event"` name and its `"frame"` counter.

use std::io::{self, Write};

use serde_json::{Value, json};

use silhouette_core::node::NodeId;

use crate::recorder::RecordedEvent;

/// Writes recorded events as a pretty-printed JSON array.
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &to_value(events))?;
    writeln!(writer)
}

/// Converts recorded events into a JSON array value.
#[must_use]
pub fn to_value(events: &[RecordedEvent]) -> Value {
    Value::Array(events.iter().map(event_value).collect())
}

fn slot(node: Option<NodeId>) -> Value {
    node.map_or(Value::Null, |n| json!(n.index()))
}

fn event_value(recorded: &RecordedEvent) -> Value {
    let frame = recorded.frame_index();
    match recorded {
        RecordedEvent::FrameBegin(e) => json!({
            "event": "FrameBegin",
            "frame": frame,
            "layout_dirty": e.layout_dirty,
            "projection_dirty": e.projection_dirty,
            "resized": e.resized,
        }),
        RecordedEvent::PhaseBegin(e) => json!({
            "event": "PhaseBegin",
            "frame": frame,
            "phase": e.phase.name(),
        }),
        RecordedEvent::PhaseEnd(e) => json!({
            "event": "PhaseEnd",
            "frame": frame,
            "phase": e.phase.name(),
            "nodes": e.nodes,
        }),
        RecordedEvent::NodeSkipped(e) => json!({
            "event": "NodeSkipped",
            "frame": frame,
            "node": e.node,
            "reason": format!("{:?}", e.reason),
        }),
        RecordedEvent::ListenerFailed(e) => json!({
            "event": "ListenerFailed",
            "frame": frame,
            "node": e.node,
            "kind": e.kind.name(),
            "error": e.error.message(),
        }),
        RecordedEvent::LeadChanged(e) => json!({
            "event": "LeadChanged",
            "frame": frame,
            "layout_id": e.change.layout_id.as_str(),
            "previous": slot(e.change.previous),
            "current": slot(e.change.current),
        }),
        RecordedEvent::FrameSummary(s) => json!({
            "event": "FrameSummary",
            "frame": frame,
            "measured": s.measured,
            "projected": s.projected,
            "changed": s.changed,
            "skipped": s.skipped,
            "listener_failures": s.listener_failures,
        }),
        RecordedEvent::NodeProjected { projection, .. } => {
            let d = &projection.delta;
            json!({
                "event": "NodeProjected",
                "frame": frame,
                "node": projection.node,
                "translate": [d.x.translate, d.y.translate],
                "scale": [d.x.scale, d.y.scale],
                "tree_scale": [projection.tree_scale.x, projection.tree_scale.y],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silhouette_core::node::SkipReason;
    use silhouette_core::trace::{FrameSummary, NodeSkippedEvent};

    #[test]
    fn export_writes_a_json_array() {
        let events = vec![
            RecordedEvent::NodeSkipped(NodeSkippedEvent {
                frame_index: 4,
                node: 2,
                reason: SkipReason::Unmounted,
            }),
            RecordedEvent::FrameSummary(FrameSummary {
                frame_index: 4,
                measured: 1,
                ..FrameSummary::default()
            }),
        ];
        let mut out = Vec::new();
        export(&events, &mut out).expect("write to Vec");

        let parsed: Value = serde_json::from_slice(&out).expect("valid JSON");
        let array = parsed.as_array().expect("array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["event"], "NodeSkipped");
        assert_eq!(array[0]["reason"], "Unmounted");
        assert_eq!(array[1]["frame"], 4);
        assert_eq!(array[1]["measured"], 1);
    }

    #[test]
    fn empty_recording_is_empty_array() {
        assert_eq!(to_value(&[]), json!([]));
    }
}
