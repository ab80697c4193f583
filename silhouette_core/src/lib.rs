// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout projection tree for FLIP-style layout animation.
//!
//! `silhouette_core` tracks visual elements across re-renders and computes,
//! for each one, the transform that makes it *appear* to still occupy its
//! previous box while its real layout has already moved. Animating that
//! transform back to identity produces a smooth layout transition. It is
//! `no_std` compatible (with `alloc`) and stores nodes in struct-of-arrays
//! layout with generational handles.
//!
//! # Architecture
//!
//! ```text
//!   host: will_update(node) ──► snapshot subtree ──► FrameScheduler
//!                                                         │
//!                 ┌───────────────────────────────────────┘
//!                 ▼
//!   ProjectionTree::on_frame() ── Surface ──► measure ──► project ──► notify
//!                 │
//!                 ▼
//!   ProjectionChanges ──► host applies get_projection_styles() and animates
//! ```
//!
//! **[`tree`]**: The [`ProjectionTree`](tree::ProjectionTree): node
//! allocation, topology, the update cycle, and the per-frame flush.
//!
//! **[`geometry`]**: Axis-separated boxes and the [`Delta`](geometry::Delta)
//! mapping one box onto another.
//!
//! **[`node`]**: Handles, options, flags, snapshots, and projection styles.
//!
//! **[`values`]**: Transform values the host currently applies, removed from
//! every measurement.
//!
//! **[`shared`]**: Shared-element (`layout_id`) groups and leadership.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//!
//! **[`events`]**: Per-node listener lists with isolated failures.
//!
//! **[`surface`]**: The [`Surface`](surface::Surface) and
//! [`FrameScheduler`](surface::FrameScheduler) capabilities the host injects.
//!
//! **[`scroll`]**: One native listener per scroll container, fanned out to
//! many handlers in lockstep phases.
//!
//! **[`headless`]**: In-memory capabilities for tests and tools.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   projection events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod events;
pub mod geometry;
pub mod headless;
pub mod node;
pub mod scroll;
pub mod shared;
pub mod surface;
pub mod trace;
pub mod tree;
pub mod values;
