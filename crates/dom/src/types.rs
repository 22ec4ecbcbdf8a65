use std::sync::Arc;

/// Arena index of a node inside one `Document`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

pub type Attribute = (Arc<str>, Option<String>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document {
        doctype: Option<String>,
    },
    Element {
        name: Arc<str>,
        attributes: Vec<Attribute>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl NodeData {
    pub fn element(name: &str, attributes: Vec<Attribute>) -> Self {
        NodeData::Element {
            name: Arc::from(name.to_ascii_lowercase()),
            attributes,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, NodeData::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeData::Text { .. })
    }

    pub fn can_have_children(&self) -> bool {
        matches!(self, NodeData::Document { .. } | NodeData::Element { .. })
    }
}

/// Shorthand for building attribute lists in fixtures and inserted markup.
pub fn attr(name: &str, value: &str) -> Attribute {
    (Arc::from(name.to_ascii_lowercase()), Some(value.to_string()))
}
