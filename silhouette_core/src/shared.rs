// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared-element leadership.
//!
//! Nodes that carry the same [`LayoutId`] form a group. Exactly one member of
//! a non-empty group is the *lead*; the others are followers whose projection
//! targets the lead's box.
//!
//! ```text
//!   (no nodes) ──register──► (lead, followers…)
//!        ▲                        │
//!        └── last member leaves ──┤ lead leaves: earliest-registered
//!                                 │ survivor becomes lead
//! ```
//!
//! Leadership is decided at registration time: the first node registered
//! into an empty group leads, later ones follow in registration order.
//! [`SharedRegistry::promote`] overrides that.
//!
//! When a lead leaves, its last geometry is parked as the group's *departed*
//! box. The next node to become lead of that id takes it over as its
//! snapshot, which lets an element unmounted in one place animate out of the
//! position of an element that just disappeared elsewhere. Parked boxes are
//! discarded at the end of every flush.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::node::{NodeId, Snapshot};

/// Logical identity shared by nodes that represent the same element.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(Rc<str>);

impl LayoutId {
    /// Creates a layout id.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(Rc::from(id))
    }

    /// Returns the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayoutId({:?})", &*self.0)
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayoutId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LayoutId {
    fn from(id: String) -> Self {
        Self(Rc::from(id))
    }
}

/// A change of lead within one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadChange {
    /// The group.
    pub layout_id: LayoutId,
    /// Lead before the change.
    pub previous: Option<NodeId>,
    /// Lead after the change; `None` once the group is empty.
    pub current: Option<NodeId>,
}

#[derive(Debug, Default)]
struct Group {
    /// Registration order.
    members: Vec<NodeId>,
    lead: Option<NodeId>,
}

/// Registry of shared-element groups.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    groups: HashMap<LayoutId, Group>,
    departed: HashMap<LayoutId, Snapshot>,
}

impl SharedRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node` to the group for `id`.
    ///
    /// The node becomes lead if the group has none. Registering a node twice
    /// is a no-op.
    pub fn register(&mut self, id: &LayoutId, node: NodeId) -> Option<LeadChange> {
        let group = self.groups.entry(id.clone()).or_default();
        if group.members.contains(&node) {
            return None;
        }
        group.members.push(node);
        if group.lead.is_none() {
            group.lead = Some(node);
            return Some(LeadChange {
                layout_id: id.clone(),
                previous: None,
                current: Some(node),
            });
        }
        None
    }

    /// Removes `node` from the group for `id`.
    ///
    /// If the node was lead, the earliest-registered remaining member is
    /// promoted. The group is dropped once empty.
    pub fn unregister(&mut self, id: &LayoutId, node: NodeId) -> Option<LeadChange> {
        let group = self.groups.get_mut(id)?;
        let before = group.members.len();
        group.members.retain(|&m| m != node);
        if group.members.len() == before {
            return None;
        }
        let change = if group.lead == Some(node) {
            group.lead = group.members.first().copied();
            Some(LeadChange {
                layout_id: id.clone(),
                previous: Some(node),
                current: group.lead,
            })
        } else {
            None
        };
        if group.members.is_empty() {
            self.groups.remove(id);
        }
        change
    }

    /// Makes `node` the lead of its group, overriding registration order.
    ///
    /// Returns `None` if the node is not registered under `id` or is
    /// already lead.
    pub fn promote(&mut self, id: &LayoutId, node: NodeId) -> Option<LeadChange> {
        let group = self.groups.get_mut(id)?;
        if !group.members.contains(&node) || group.lead == Some(node) {
            return None;
        }
        let previous = group.lead.replace(node);
        Some(LeadChange {
            layout_id: id.clone(),
            previous,
            current: Some(node),
        })
    }

    /// Whether `node` currently leads the group for `id`.
    #[must_use]
    pub fn is_lead(&self, id: &LayoutId, node: NodeId) -> bool {
        self.lead(id) == Some(node)
    }

    /// The current lead for `id`.
    #[must_use]
    pub fn lead(&self, id: &LayoutId) -> Option<NodeId> {
        self.groups.get(id).and_then(|g| g.lead)
    }

    /// Members of the group for `id`, in registration order.
    #[must_use]
    pub fn members(&self, id: &LayoutId) -> &[NodeId] {
        match self.groups.get(id) {
            Some(group) => &group.members,
            None => &[],
        }
    }

    /// Number of non-empty groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Parks the geometry of a departing lead.
    pub(crate) fn park(&mut self, id: &LayoutId, snapshot: Snapshot) {
        self.departed.insert(id.clone(), snapshot);
    }

    /// Takes the parked geometry for `id`, if any.
    pub(crate) fn take_parked(&mut self, id: &LayoutId) -> Option<Snapshot> {
        self.departed.remove(id)
    }

    /// Discards all parked geometry.
    pub(crate) fn clear_parked(&mut self) {
        self.departed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(idx: u32) -> NodeId {
        NodeId { idx, generation: 0 }
    }

    #[test]
    fn first_registered_leads() {
        let mut reg = SharedRegistry::new();
        let id = LayoutId::from("card");
        let change = reg.register(&id, node(0));
        assert_eq!(change.map(|c| c.current), Some(Some(node(0))));
        assert!(reg.register(&id, node(1)).is_none());
        assert!(reg.is_lead(&id, node(0)));
        assert!(!reg.is_lead(&id, node(1)));
    }

    #[test]
    fn lead_leaving_promotes_earliest_survivor() {
        let mut reg = SharedRegistry::new();
        let id = LayoutId::from("card");
        reg.register(&id, node(0));
        reg.register(&id, node(1));
        reg.register(&id, node(2));
        let change = reg.unregister(&id, node(0)).expect("lead changed");
        assert_eq!(change.previous, Some(node(0)));
        assert_eq!(change.current, Some(node(1)));
        assert_eq!(reg.members(&id), &[node(1), node(2)]);
    }

    #[test]
    fn follower_leaving_keeps_lead() {
        let mut reg = SharedRegistry::new();
        let id = LayoutId::from("card");
        reg.register(&id, node(0));
        reg.register(&id, node(1));
        assert!(reg.unregister(&id, node(1)).is_none());
        assert!(reg.is_lead(&id, node(0)));
    }

    #[test]
    fn last_member_clears_group() {
        let mut reg = SharedRegistry::new();
        let id = LayoutId::from("card");
        reg.register(&id, node(0));
        let change = reg.unregister(&id, node(0)).expect("lead changed");
        assert_eq!(change.current, None);
        assert!(reg.is_empty());
        assert_eq!(reg.lead(&id), None);
    }

    #[test]
    fn promote_overrides_order() {
        let mut reg = SharedRegistry::new();
        let id = LayoutId::from("card");
        reg.register(&id, node(0));
        reg.register(&id, node(1));
        let change = reg.promote(&id, node(1)).expect("promoted");
        assert_eq!(change.previous, Some(node(0)));
        assert!(reg.is_lead(&id, node(1)));
        assert!(reg.promote(&id, node(1)).is_none());
        assert!(reg.promote(&id, node(7)).is_none());
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut reg = SharedRegistry::new();
        let id = LayoutId::from("card");
        reg.register(&id, node(3));
        reg.register(&id, node(3));
        assert_eq!(reg.members(&id), &[node(3)]);
    }
}
