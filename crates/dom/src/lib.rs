pub mod dom_utils;
pub mod mutation;
pub mod selector;

mod document;
mod entities;
mod parse;
mod types;

pub use crate::document::{Ancestors, Descendants, Document, DomError};
pub use crate::mutation::{MutationRecord, ObserverOptions};
pub use crate::parse::parse_html;
pub use crate::selector::{Selector, SelectorError};
pub use crate::types::{Attribute, NodeData, NodeId, attr};
