// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projection node identity, options, and per-node value types.

use alloc::boxed::Box;
use core::fmt;

use kurbo::{Affine, Vec2};

use crate::geometry::{Axis, Delta, LayoutBox, Point};
use crate::shared::LayoutId;
use crate::values::TransformValues;

/// Sentinel value indicating "no node" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`ProjectionTree`](crate::tree::ProjectionTree).
///
/// Contains both a slot index and a generation counter so that handles to
/// unmounted nodes are detected after the slot is reused. Operations given a
/// stale handle do nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// Which components of a layout change a node animates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimationType {
    /// Animate size only; position changes are applied immediately.
    Size,
    /// Animate position only; size changes are applied immediately.
    Position,
    /// Animate both.
    #[default]
    Both,
}

impl AnimationType {
    /// Adjusts `source` so that the delta towards `target` only carries the
    /// components this animation type allows.
    ///
    /// `Size` re-centres the source on the target's origin point, so the
    /// resulting translation is zero. `Position` gives the source the
    /// target's length about its own origin point, so the resulting scale is
    /// one.
    #[must_use]
    pub fn constrain(self, source: LayoutBox, target: LayoutBox, origin: Point) -> LayoutBox {
        match self {
            Self::Both => source,
            Self::Size => LayoutBox {
                x: recentre(source.x, target.x.mix(origin.x), origin.x),
                y: recentre(source.y, target.y.mix(origin.y), origin.y),
            },
            Self::Position => LayoutBox {
                x: resize(source.x, target.x.length(), origin.x),
                y: resize(source.y, target.y.length(), origin.y),
            },
        }
    }
}

fn recentre(axis: Axis, origin_point: f64, origin: f64) -> Axis {
    let min = origin_point - axis.length() * origin;
    Axis::new(min, min + axis.length())
}

fn resize(axis: Axis, length: f64, origin: f64) -> Axis {
    let min = axis.mix(origin) - length * origin;
    Axis::new(min, min + length)
}

/// Callback invoked after a node's projection delta is computed.
pub type ProjectionCallback = Box<dyn FnMut(NodeId, &Delta)>;

/// Configuration for a projection node.
///
/// Fields left as `None` keep their current value when merged with
/// [`ProjectionTree::set_options`](crate::tree::ProjectionTree::set_options).
#[derive(Default)]
pub struct ProjectionOptions {
    /// Whether this node is a scroll container whose offset must be folded
    /// into descendant measurements.
    pub should_measure_scroll: Option<bool>,
    /// Which components of a layout change are animated.
    pub animation_type: Option<AnimationType>,
    /// Shared-element identity.
    pub layout_id: Option<LayoutId>,
    /// Invoked after every projection of this node.
    pub on_projection_update: Option<ProjectionCallback>,
}

impl fmt::Debug for ProjectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionOptions")
            .field("should_measure_scroll", &self.should_measure_scroll)
            .field("animation_type", &self.animation_type)
            .field("layout_id", &self.layout_id)
            .field("on_projection_update", &self.on_projection_update.is_some())
            .finish()
    }
}

impl ProjectionOptions {
    /// Empty options; merging them changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the node's scroll offset is measured.
    #[must_use]
    pub fn measure_scroll(mut self, yes: bool) -> Self {
        self.should_measure_scroll = Some(yes);
        self
    }

    /// Sets the animation type.
    #[must_use]
    pub fn animation_type(mut self, animation_type: AnimationType) -> Self {
        self.animation_type = Some(animation_type);
        self
    }

    /// Sets the shared-element identity.
    #[must_use]
    pub fn layout_id(mut self, id: impl Into<LayoutId>) -> Self {
        self.layout_id = Some(id.into());
        self
    }

    /// Sets the projection callback.
    #[must_use]
    pub fn on_projection_update(mut self, callback: impl FnMut(NodeId, &Delta) + 'static) -> Self {
        self.on_projection_update = Some(Box::new(callback));
        self
    }
}

/// Per-node boolean state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// The node has a host instance bound.
    pub mounted: bool,
    /// The node must be re-measured in the next flush.
    pub is_layout_dirty: bool,
    /// The node's target or inherited tree scale changed; it must be
    /// re-projected in the next flush.
    pub is_projection_dirty: bool,
    /// The node is part of an update cycle that has not finished.
    pub is_updating: bool,
    /// The host may have applied the node's projection styles; they must be
    /// reset before the next measurement.
    pub should_reset_transform: bool,
    /// The host reported a resize; the next measurement replaces the snapshot
    /// instead of animating from it.
    pub resize_pending: bool,
}

/// A node's geometry captured before an update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    /// Layout box with scroll and applied transforms removed.
    pub layout: LayoutBox,
    /// Box as seen on screen, corrected for ancestor scroll.
    pub visible: LayoutBox,
}

/// Payload delivered to layout-did-update listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutUpdate {
    /// The node that updated.
    pub node: NodeId,
    /// Newly measured layout.
    pub layout: LayoutBox,
    /// Geometry captured before the update.
    pub snapshot: Snapshot,
    /// Delta mapping `snapshot.layout` onto `layout`.
    pub delta: Delta,
    /// Whether any edge moved by more than the tree's layout epsilon.
    pub has_layout_changed: bool,
}

/// Why a node was left out of a frame's projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The surface could not measure the node's instance.
    NotMeasured,
    /// The node has no snapshot to animate from.
    NoSnapshot,
    /// The node has no instance bound.
    Unmounted,
}

/// Style values resolved from a node's projection delta and applied
/// transform values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionStyles {
    /// Translation in pixels.
    pub translate: Vec2,
    /// Per-axis scale.
    pub scale: Vec2,
    /// Transform origin as a fraction of the box.
    pub origin: Point,
}

impl ProjectionStyles {
    /// No transform, centred origin.
    pub const IDENTITY: Self = Self {
        translate: Vec2::ZERO,
        scale: Vec2::new(1.0, 1.0),
        origin: Point::new(0.5, 0.5),
    };

    /// Resolves styles from a projection delta and applied transform values.
    #[must_use]
    pub fn resolve(delta: &Delta, values: &TransformValues) -> Self {
        let applied = values.effective_scale();
        Self {
            translate: delta.translate() + Vec2::new(values.x, values.y),
            scale: Vec2::new(delta.x.scale * applied.x, delta.y.scale * applied.y),
            origin: Point::new(delta.x.origin, delta.y.origin),
        }
    }

    /// Whether the styles leave the element untransformed.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.translate == Vec2::ZERO && self.scale == Vec2::new(1.0, 1.0)
    }

    /// Returns the styles as an absolute transform for an element laid out
    /// at `layout`.
    ///
    /// Ancestor correction only divides out the inherited scale. The
    /// translation is the node's own offset in viewport space, with no
    /// ancestor translation removed. A host that composes a child's transform
    /// inside its parent's must subtract the parent's projected translation
    /// itself.
    #[must_use]
    pub fn to_affine(&self, layout: LayoutBox) -> Affine {
        let origin = layout.origin_point(self.origin).to_vec2();
        Affine::translate(origin + self.translate)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::translate(-origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_constraint_removes_translation() {
        let source = LayoutBox::from_edges(0.0, 100.0, 0.0, 100.0);
        let target = LayoutBox::from_edges(300.0, 500.0, 0.0, 100.0);
        let origin = Point::new(0.5, 0.5);
        let adjusted = AnimationType::Size.constrain(source, target, origin);
        let d = Delta::between(adjusted, target);
        assert_eq!(d.x.translate, 0.0);
        assert_eq!(d.x.scale, 2.0);
    }

    #[test]
    fn position_constraint_removes_scale() {
        let source = LayoutBox::from_edges(0.0, 100.0, 0.0, 100.0);
        let target = LayoutBox::from_edges(300.0, 500.0, 0.0, 100.0);
        let origin = Point::new(0.5, 0.5);
        let adjusted = AnimationType::Position.constrain(source, target, origin);
        let d = Delta::between(adjusted, target);
        assert_eq!(d.x.scale, 1.0);
        assert_eq!(d.x.translate, 350.0);
    }

    #[test]
    fn styles_affine_maps_layout_onto_projection() {
        let layout = LayoutBox::from_edges(0.0, 100.0, 0.0, 50.0);
        let target = LayoutBox::from_edges(50.0, 250.0, 0.0, 50.0);
        let d = Delta::between(layout, target);
        let styles = ProjectionStyles::resolve(&d, &TransformValues::IDENTITY);
        let mapped = LayoutBox::from_rect(styles.to_affine(layout).transform_rect_bbox(layout.to_rect()));
        assert!(mapped.is_near(target, 1e-9), "mapped {mapped:?}");
    }

    #[test]
    fn identity_styles() {
        let styles = ProjectionStyles::resolve(&Delta::IDENTITY, &TransformValues::IDENTITY);
        assert!(styles.is_identity());
        assert_eq!(styles, ProjectionStyles::IDENTITY);
    }
}
