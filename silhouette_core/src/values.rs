// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform values currently applied to an element.
//!
//! Hosts animate elements by writing transform values (a translation, a
//! uniform scale, and per-axis scales about a fractional origin). A measured
//! box includes those transforms, so before a measurement can be compared
//! against a snapshot the node removes them again with
//! [`TransformValues::remove_from`]. Skipping that step would count an
//! in-flight animation as a layout change.

use kurbo::Vec2;

use crate::geometry::{Axis, DEFAULT_ORIGIN, LayoutBox};

/// The resolved transform values applied to an element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformValues {
    /// Horizontal translation.
    pub x: f64,
    /// Vertical translation.
    pub y: f64,
    /// Uniform scale, multiplied into both axes.
    pub scale: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Horizontal transform origin as a fraction of the width.
    pub origin_x: f64,
    /// Vertical transform origin as a fraction of the height.
    pub origin_y: f64,
}

impl Default for TransformValues {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformValues {
    /// No transform.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
        scale_x: 1.0,
        scale_y: 1.0,
        origin_x: DEFAULT_ORIGIN,
        origin_y: DEFAULT_ORIGIN,
    };

    /// A pure translation.
    #[must_use]
    pub const fn translation(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::IDENTITY
        }
    }

    /// A uniform scale about the centre.
    #[must_use]
    pub const fn uniform_scale(scale: f64) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    /// Combined per-axis scale (`scale * scale_x`, `scale * scale_y`).
    #[inline]
    #[must_use]
    pub fn effective_scale(&self) -> Vec2 {
        Vec2::new(self.scale * self.scale_x, self.scale * self.scale_y)
    }

    /// Whether no transform is applied.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        let s = self.effective_scale();
        self.x == 0.0 && self.y == 0.0 && s.x == 1.0 && s.y == 1.0
    }

    /// Applies the transform to an untransformed box.
    #[must_use]
    pub fn apply_to(&self, b: LayoutBox) -> LayoutBox {
        let s = self.effective_scale();
        LayoutBox {
            x: apply_axis(b.x, self.x, s.x, self.origin_x),
            y: apply_axis(b.y, self.y, s.y, self.origin_y),
        }
    }

    /// Removes the transform from a measured box, yielding the box the
    /// element occupies in layout.
    #[must_use]
    pub fn remove_from(&self, b: LayoutBox) -> LayoutBox {
        if self.is_identity() {
            return b;
        }
        let s = self.effective_scale();
        LayoutBox {
            x: remove_axis(b.x, self.x, s.x, self.origin_x),
            y: remove_axis(b.y, self.y, s.y, self.origin_y),
        }
    }
}

fn apply_axis(axis: Axis, translate: f64, scale: f64, origin: f64) -> Axis {
    let origin_point = axis.mix(origin);
    let project = |p: f64| origin_point + scale * (p - origin_point) + translate;
    Axis::new(project(axis.min), project(axis.max))
}

fn remove_axis(axis: Axis, translate: f64, scale: f64, origin: f64) -> Axis {
    // Scaling about the origin leaves it fixed, so the transformed origin is
    // the layout origin shifted by `translate`.
    let origin_point = axis.mix(origin) - translate;
    let unproject = |p: f64| {
        let p = p - translate;
        if scale == 0.0 {
            p
        } else {
            origin_point + (p - origin_point) / scale
        }
    };
    Axis::new(unproject(axis.min), unproject(axis.max))
}
