//! Change-feed records emitted by a `Document` while it is observed.
//!
//! Invariants:
//! - Records are queued in the order the mutations were applied.
//! - A record is queued only when its target lies inside the observed root
//!   (or is the root itself), and only for the record kinds the active
//!   `ObserverOptions` select.
//! - Attribute records honour the attribute filter; names are canonical
//!   ASCII-lowercase.
//! - Node ids in `added`/`removed` stay valid after removal (arena slots are
//!   never reused), so consumers may inspect a removed node and find it
//!   disconnected.

use crate::types::NodeId;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub character_data: bool,
    /// `None` observes no attributes.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserverOptions {
    pub fn watches_attribute(&self, name: &str) -> bool {
        self.attribute_filter
            .as_ref()
            .is_some_and(|filter| filter.iter().any(|f| f.eq_ignore_ascii_case(name)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted into and/or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute named `name` on element `target` was set.
    Attributes { target: NodeId, name: Arc<str> },
    /// The data of text or comment node `target` changed.
    CharacterData { target: NodeId },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::Attributes { target, .. }
            | MutationRecord::CharacterData { target } => *target,
        }
    }
}
