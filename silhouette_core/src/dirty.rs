// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The projection tree uses multi-channel dirty tracking (via
//! [`understory_dirty`]) to decide which nodes a frame must touch. Every node
//! has a dependency edge on its parent in the propagating channels.
//!
//! - **[`LAYOUT`]**: the node's geometry may have changed. Marked with
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) by
//!   [`will_update`](crate::tree::ProjectionTree::will_update), so the whole
//!   subtree is snapshotted and re-measured: moving or resizing a parent moves
//!   its descendants too.
//! - **[`PROJECTION`]**: only the node's target changed (an explicit target
//!   box, a target delta, or a new shared-element lead). The node is
//!   re-projected without being re-measured. Propagates, because descendants
//!   inherit the node's tree scale.
//! - **[`TOPOLOGY`]**: structural changes; triggers a traversal-order rebuild
//!   and does not propagate.
//!
//! # Consumption
//!
//! [`ProjectionTree::flush`](crate::tree::ProjectionTree::flush) drains all
//! channels once per frame and reports what it did as
//! [`ProjectionChanges`](crate::tree::ProjectionChanges).

use understory_dirty::Channel;

/// Geometry may have changed: snapshot, re-measure, and re-project.
pub const LAYOUT: Channel = Channel::new(0);

/// Target changed: re-project without measuring.
pub const PROJECTION: Channel = Channel::new(1);

/// Tree topology changed: triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(2);
