use crate::mutation::{MutationRecord, ObserverOptions};
use crate::types::{Attribute, NodeData, NodeId};
use core_types::Location;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} has the wrong kind for this operation")]
    WrongNodeKind(NodeId),
    #[error("node {0:?} cannot have children")]
    InvalidParent(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },
}

const ROOT: NodeId = NodeId(0);

#[derive(Debug)]
struct NodeRecord {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Observer {
    target: NodeId,
    options: ObserverOptions,
    queue: Vec<MutationRecord>,
}

/// Live, mutable document tree.
///
/// Nodes live in an append-only arena: removing a node detaches its subtree
/// but keeps the ids resolvable, so stale ids from mutation records can be
/// inspected safely. Every mutating method feeds the observer (when one is
/// installed) exactly like a host change feed would.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeRecord>,
    location: Option<Location>,
    observer: Option<Observer>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord {
                data: NodeData::Document { doctype: None },
                parent: None,
                children: Vec::new(),
            }],
            location: None,
            observer: None,
        }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub(crate) fn set_doctype(&mut self, value: String) {
        if let NodeData::Document { doctype } = &mut self.nodes[ROOT.index()].data {
            *doctype = Some(value);
        }
    }

    pub fn doctype(&self) -> Option<&str> {
        match &self.nodes[ROOT.index()].data {
            NodeData::Document { doctype } => doctype.as_deref(),
            _ => None,
        }
    }

    // -- Location ---

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Replace the document location without touching the tree, the way a
    /// history push does on single-page navigations.
    pub fn navigate(&mut self, location: Location) {
        log::debug!(target: "dom", "navigate to {location}");
        self.location = Some(location);
    }

    // -- Read access ---

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT.index()].children.is_empty()
    }

    fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ROOT)
    }

    /// `id` itself followed by its parent chain up to the topmost ancestor.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.node(id).map(|_| id),
        }
    }

    /// Pre-order walk of the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.node(id).is_some() {
            vec![id]
        } else {
            Vec::new()
        };
        Descendants { doc: self, stack }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.data(id).is_some_and(NodeData::is_element)
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element_named(&self, id: NodeId, target: &str) -> bool {
        self.element_name(id)
            .is_some_and(|name| name.eq_ignore_ascii_case(target))
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.data(id) {
            Some(NodeData::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Value of attribute `name`; a present attribute without a value reads
    /// as the empty string.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn class_name(&self, id: NodeId) -> &str {
        self.attribute(id, "class").unwrap_or("")
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_name(id).split_whitespace().any(|c| c == class)
    }

    /// Data of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Concatenated descendant text, as `Node.textContent` reads it.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        match self.data(id) {
            Some(NodeData::Text { text }) | Some(NodeData::Comment { text }) => {
                out.push_str(text);
            }
            Some(_) => {
                for node in self.descendants(id) {
                    if let Some(text) = self.text(node) {
                        out.push_str(text);
                    }
                }
            }
            None => {}
        }
        out
    }

    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        self.descendants(ROOT)
            .find(|&id| self.is_element_named(id, name))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element("body")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.find_element("head")
    }

    /// Title text with surrounding whitespace stripped and inner runs
    /// collapsed, as `document.title` reads it.
    pub fn title(&self) -> String {
        let Some(title) = self.find_element("title") else {
            return String::new();
        };
        self.text_content(title)
            .split_ascii_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn set_title(&mut self, value: &str) -> Result<(), DomError> {
        let title = match self.find_element("title") {
            Some(title) => title,
            None => {
                let parent = self.head().unwrap_or(ROOT);
                let title = self.create_element("title", Vec::new());
                self.append_child(parent, title)?;
                title
            }
        };
        self.set_text_content(title, value)
    }

    // -- Construction ---

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element; the name is canonicalised to lowercase.
    pub fn create_element(&mut self, name: &str, attributes: Vec<Attribute>) -> NodeId {
        self.push(NodeData::element(name, attributes))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment {
            text: text.to_string(),
        })
    }

    // -- Mutation ---

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `before`, or at the end when
    /// `before` is `None` or not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.ensure_parent(parent)?;
        self.node(child).ok_or(DomError::UnknownNode(child))?;
        if child == ROOT || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::CycleDetected { parent, child });
        }
        self.detach(child)?;

        let record = self.node_mut(parent)?;
        let pos = before
            .and_then(|b| record.children.iter().position(|&c| c == b))
            .unwrap_or(record.children.len());
        record.children.insert(pos, child);
        self.node_mut(child)?.parent = Some(parent);

        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Insert `node` directly after `reference`, like `insertAdjacent*("afterend")`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        let before = self.next_sibling(reference);
        self.insert_before(parent, node, before)
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id).ok_or(DomError::UnknownNode(id))?;
        if self.parent(id).is_none() {
            return Err(DomError::Detached(id));
        }
        self.detach(id)
    }

    fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name: Arc<str> = Arc::from(name.to_ascii_lowercase());
        let record = self.node_mut(id)?;
        let NodeData::Element { attributes, .. } = &mut record.data else {
            return Err(DomError::WrongNodeKind(id));
        };
        match attributes.iter_mut().find(|(k, _)| **k == *name) {
            Some((_, v)) => *v = Some(value.to_string()),
            None => attributes.push((Arc::clone(&name), Some(value.to_string()))),
        }
        self.record(MutationRecord::Attributes { target: id, name });
        Ok(())
    }

    /// Replace the data of a text or comment node.
    pub fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let record = self.node_mut(id)?;
        match &mut record.data {
            NodeData::Text { text } | NodeData::Comment { text } => {
                *text = value.to_string();
            }
            _ => return Err(DomError::WrongNodeKind(id)),
        }
        self.record(MutationRecord::CharacterData { target: id });
        Ok(())
    }

    /// `textContent` assignment: an element loses all children and gains a
    /// single text node (none for an empty value); a text node has its data
    /// replaced.
    pub fn set_text_content(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let is_container = self.data(id).map(NodeData::can_have_children);
        match is_container {
            None => Err(DomError::UnknownNode(id)),
            Some(false) => self.set_text(id, value),
            Some(true) => {
                let removed = std::mem::take(&mut self.node_mut(id)?.children);
                for &child in &removed {
                    self.node_mut(child)?.parent = None;
                }
                let mut added = Vec::new();
                if !value.is_empty() {
                    let text = self.create_text(value);
                    self.node_mut(id)?.children.push(text);
                    self.node_mut(text)?.parent = Some(id);
                    added.push(text);
                }
                self.record(MutationRecord::ChildList {
                    target: id,
                    added,
                    removed,
                });
                Ok(())
            }
        }
    }

    fn ensure_parent(&self, id: NodeId) -> Result<(), DomError> {
        let node = self.node(id).ok_or(DomError::UnknownNode(id))?;
        if !node.data.can_have_children() {
            return Err(DomError::InvalidParent(id));
        }
        Ok(())
    }

    // -- Change feed ---

    /// Start queueing records for `target` (and its subtree when
    /// `options.subtree`). Replaces any previous observer.
    pub fn observe(&mut self, target: NodeId, options: ObserverOptions) {
        self.observer = Some(Observer {
            target,
            options,
            queue: Vec::new(),
        });
    }

    pub fn is_observed(&self) -> bool {
        self.observer.is_some()
    }

    pub fn has_pending_records(&self) -> bool {
        self.observer.as_ref().is_some_and(|o| !o.queue.is_empty())
    }

    /// Drain the queued batch.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.observer
            .as_mut()
            .map(|o| std::mem::take(&mut o.queue))
            .unwrap_or_default()
    }

    fn record(&mut self, record: MutationRecord) {
        let Some(observer) = self.observer.as_ref() else {
            return;
        };
        let selected = match &record {
            MutationRecord::ChildList { .. } => observer.options.child_list,
            MutationRecord::Attributes { name, .. } => observer.options.watches_attribute(name),
            MutationRecord::CharacterData { .. } => observer.options.character_data,
        };
        if !selected {
            return;
        }
        let target = record.target();
        let in_scope = target == observer.target
            || (observer.options.subtree
                && self.ancestors(target).skip(1).any(|a| a == observer.target));
        if !in_scope {
            return;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.queue.push(record);
        }
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        // Push children in reverse so they are yielded in document order.
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
