// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry primitives for layout projection.
//!
//! Boxes are stored per axis as `{min, max}` pairs rather than as a
//! `kurbo::Rect` because every projection computation (delta, scale
//! correction, transform removal) runs independently on the x and y axes.
//! Conversions to and from [`kurbo::Rect`] are provided for hosts that
//! measure in kurbo types.
//!
//! A [`Delta`] describes how to map one box onto another: each axis carries a
//! scale about an origin point followed by a translation. Applying the delta
//! computed by [`Delta::between`] to its source box reproduces the target box.

use kurbo::{Rect, Vec2};

pub use kurbo::Point;

/// Translations closer to zero than this are snapped to exactly zero.
pub const TRANSLATE_EPSILON: f64 = 0.01;

/// Scales closer to one than this are snapped to exactly one.
pub const SCALE_EPSILON: f64 = 0.0001;

/// Default transform origin: the centre of the box.
pub const DEFAULT_ORIGIN: f64 = 0.5;

#[inline]
fn mix(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[inline]
fn is_near(value: f64, target: f64, epsilon: f64) -> bool {
    (value - target).abs() <= epsilon
}

/// One axis of a [`LayoutBox`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Axis {
    /// Leading edge.
    pub min: f64,
    /// Trailing edge. Never less than `min`.
    pub max: f64,
}

impl Axis {
    /// The empty axis at the origin.
    pub const ZERO: Self = Self { min: 0.0, max: 0.0 };

    /// Creates an axis from two edges, swapping them if given out of order.
    #[inline]
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Returns `max - min`.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.max - self.min
    }

    /// Returns the point at fraction `t` between `min` and `max`.
    #[inline]
    #[must_use]
    pub fn mix(self, t: f64) -> f64 {
        mix(self.min, self.max, t)
    }

    /// Returns the axis shifted by `distance`.
    #[inline]
    #[must_use]
    pub fn translate(self, distance: f64) -> Self {
        Self {
            min: self.min + distance,
            max: self.max + distance,
        }
    }

    /// Whether both edges are within `epsilon` of `other`'s.
    #[inline]
    #[must_use]
    pub fn is_near(self, other: Self, epsilon: f64) -> bool {
        is_near(self.min, other.min, epsilon) && is_near(self.max, other.max, epsilon)
    }
}

/// An axis-aligned box with `min <= max` on both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutBox {
    /// Horizontal extent.
    pub x: Axis,
    /// Vertical extent.
    pub y: Axis,
}

impl LayoutBox {
    /// The empty box at the origin.
    pub const ZERO: Self = Self {
        x: Axis::ZERO,
        y: Axis::ZERO,
    };

    /// Creates a box from its two axes.
    #[inline]
    #[must_use]
    pub const fn from_axes(x: Axis, y: Axis) -> Self {
        Self { x, y }
    }

    /// Creates a box from edge coordinates, normalising each axis.
    #[inline]
    #[must_use]
    pub fn from_edges(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x: Axis::new(x_min, x_max),
            y: Axis::new(y_min, y_max),
        }
    }

    /// Creates a box from an origin and a size.
    #[inline]
    #[must_use]
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        Self::from_edges(origin.x, origin.x + width, origin.y, origin.y + height)
    }

    /// Converts a `kurbo::Rect`, normalising negative extents.
    #[inline]
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self::from_edges(rect.x0, rect.x1, rect.y0, rect.y1)
    }

    /// Converts to a `kurbo::Rect`.
    #[inline]
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x.min, self.y.min, self.x.max, self.y.max)
    }

    /// Width of the box.
    #[inline]
    #[must_use]
    pub fn width(self) -> f64 {
        self.x.length()
    }

    /// Height of the box.
    #[inline]
    #[must_use]
    pub fn height(self) -> f64 {
        self.y.length()
    }

    /// Returns the point at fractional position `origin` within the box.
    #[inline]
    #[must_use]
    pub fn origin_point(self, origin: Point) -> Point {
        Point::new(self.x.mix(origin.x), self.y.mix(origin.y))
    }

    /// Returns the box shifted by `offset`.
    #[inline]
    #[must_use]
    pub fn translate(self, offset: Vec2) -> Self {
        Self {
            x: self.x.translate(offset.x),
            y: self.y.translate(offset.y),
        }
    }

    /// Whether every edge is within `epsilon` of `other`'s.
    #[inline]
    #[must_use]
    pub fn is_near(self, other: Self, epsilon: f64) -> bool {
        self.x.is_near(other.x, epsilon) && self.y.is_near(other.y, epsilon)
    }
}

impl From<Rect> for LayoutBox {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl From<LayoutBox> for Rect {
    fn from(b: LayoutBox) -> Self {
        b.to_rect()
    }
}

/// Per-axis component of a [`Delta`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisDelta {
    /// Distance the origin point moves.
    pub translate: f64,
    /// Length ratio `target / source`.
    pub scale: f64,
    /// Fractional position of the scale origin within the box.
    pub origin: f64,
    /// Absolute position of the scale origin on the source axis.
    pub origin_point: f64,
}

impl Default for AxisDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AxisDelta {
    /// The delta that maps any axis onto itself.
    pub const IDENTITY: Self = Self {
        translate: 0.0,
        scale: 1.0,
        origin: DEFAULT_ORIGIN,
        origin_point: 0.0,
    };

    /// Computes the delta mapping `source` onto `target`, scaling about the
    /// point at fraction `origin` of `source`.
    ///
    /// A zero-length source cannot be scaled meaningfully; its scale is
    /// reported as `1.0`.
    #[must_use]
    pub fn between(source: Axis, target: Axis, origin: f64) -> Self {
        let origin_point = source.mix(origin);

        let source_len = source.length();
        let mut scale = if source_len.abs() < f64::EPSILON {
            1.0
        } else {
            target.length() / source_len
        };
        if scale.is_nan() || !scale.is_finite() || is_near(scale, 1.0, SCALE_EPSILON) {
            scale = 1.0;
        }

        let mut translate = target.mix(origin) - origin_point;
        if translate.is_nan() || is_near(translate, 0.0, TRANSLATE_EPSILON) {
            translate = 0.0;
        }

        Self {
            translate,
            scale,
            origin,
            origin_point,
        }
    }

    /// Applies the delta to `axis`, scaling about `axis`'s own origin point.
    #[must_use]
    pub fn apply_to(&self, axis: Axis) -> Axis {
        let origin_point = axis.mix(self.origin);
        let project = |p: f64| origin_point + self.scale * (p - origin_point) + self.translate;
        Axis::new(project(axis.min), project(axis.max))
    }

    /// Divides translate and scale by an inherited ancestor scale.
    ///
    /// Ancestor translation is not subtracted. A non-finite or zero
    /// `tree_scale` leaves the delta unchanged.
    #[must_use]
    pub fn corrected_for(self, tree_scale: f64) -> Self {
        if tree_scale == 0.0 || !tree_scale.is_finite() || tree_scale == 1.0 {
            return self;
        }
        Self {
            translate: self.translate / tree_scale,
            scale: self.scale / tree_scale,
            ..self
        }
    }

    /// Whether the delta is a no-op.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.translate == 0.0 && self.scale == 1.0
    }
}

/// Two-axis transform that maps one [`LayoutBox`] onto another.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Delta {
    /// Horizontal component.
    pub x: AxisDelta,
    /// Vertical component.
    pub y: AxisDelta,
}

impl Delta {
    /// The delta that maps any box onto itself.
    pub const IDENTITY: Self = Self {
        x: AxisDelta::IDENTITY,
        y: AxisDelta::IDENTITY,
    };

    /// Computes the delta mapping `source` onto `target` about the box centre.
    #[must_use]
    pub fn between(source: LayoutBox, target: LayoutBox) -> Self {
        Self::between_with_origin(source, target, Point::new(DEFAULT_ORIGIN, DEFAULT_ORIGIN))
    }

    /// Computes the delta mapping `source` onto `target` about the fractional
    /// `origin`.
    #[must_use]
    pub fn between_with_origin(source: LayoutBox, target: LayoutBox, origin: Point) -> Self {
        Self {
            x: AxisDelta::between(source.x, target.x, origin.x),
            y: AxisDelta::between(source.y, target.y, origin.y),
        }
    }

    /// Applies the delta to `b`.
    #[must_use]
    pub fn apply_to(&self, b: LayoutBox) -> LayoutBox {
        LayoutBox {
            x: self.x.apply_to(b.x),
            y: self.y.apply_to(b.y),
        }
    }

    /// Divides the delta by an inherited per-axis ancestor scale.
    #[must_use]
    pub fn corrected_for(self, tree_scale: Vec2) -> Self {
        Self {
            x: self.x.corrected_for(tree_scale.x),
            y: self.y.corrected_for(tree_scale.y),
        }
    }

    /// Per-axis scale as a vector.
    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec2 {
        Vec2::new(self.x.scale, self.y.scale)
    }

    /// Per-axis translation as a vector.
    #[inline]
    #[must_use]
    pub fn translate(&self) -> Vec2 {
        Vec2::new(self.x.translate, self.y.translate)
    }

    /// Whether both axes are no-ops.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.x.is_identity() && self.y.is_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_new_normalises() {
        let a = Axis::new(10.0, 2.0);
        assert_eq!(a, Axis { min: 2.0, max: 10.0 });
        assert_eq!(a.length(), 8.0);
    }

    #[test]
    fn rect_round_trip() {
        let rect = Rect::new(5.0, 6.0, 25.0, 36.0);
        let b = LayoutBox::from_rect(rect);
        assert_eq!(b.width(), 20.0);
        assert_eq!(b.height(), 30.0);
        assert_eq!(Rect::from(b), rect);
    }

    #[test]
    fn translation_only_delta() {
        let source = LayoutBox::from_edges(0.0, 100.0, 0.0, 50.0);
        let target = LayoutBox::from_edges(50.0, 150.0, 0.0, 50.0);
        let d = Delta::between(source, target);
        assert_eq!(d.x.translate, 50.0);
        assert_eq!(d.x.scale, 1.0);
        assert!(d.y.is_identity());
    }

    #[test]
    fn applying_delta_reproduces_target() {
        let source = LayoutBox::from_edges(10.0, 30.0, 40.0, 80.0);
        let target = LayoutBox::from_edges(-5.0, 95.0, 0.0, 10.0);
        let d = Delta::between(source, target);
        let projected = d.apply_to(source);
        assert!(
            projected.is_near(target, 1e-9),
            "projected {projected:?} != {target:?}"
        );
    }

    #[test]
    fn zero_length_source_has_unit_scale() {
        let d = AxisDelta::between(Axis::new(10.0, 10.0), Axis::new(0.0, 40.0), 0.5);
        assert_eq!(d.scale, 1.0);
        assert_eq!(d.translate, 10.0);
    }

    #[test]
    fn near_values_snap() {
        let d = AxisDelta::between(Axis::new(0.0, 100.0), Axis::new(0.001, 100.004), 0.5);
        assert!(d.is_identity(), "sub-epsilon deltas snap to identity");
    }

    #[test]
    fn correction_divides_by_tree_scale() {
        let d = AxisDelta {
            translate: 10.0,
            scale: 1.0,
            origin: 0.5,
            origin_point: 0.0,
        };
        let c = d.corrected_for(2.0);
        assert_eq!(c.translate, 5.0);
        assert_eq!(c.scale, 0.5);
        assert_eq!(d.corrected_for(0.0), d);
    }
}
