//! Rule store and text resolver.
//!
//! A [`RuleStore`] holds one language's dictionary sections: per-context
//! exact maps and ordered regex rules, a `public` section applied under
//! every context and a `title` section for the document title. A
//! [`Resolver`] scopes a store to one context and answers lookups.

pub mod builtin;
pub mod conf;
mod error;
mod resolve;
mod section;
mod store;
mod template;

pub use conf::{ALL_CONTEXTS, EngineConf, capture_context};
pub use error::{Result, RuleError};
pub use resolve::{Resolver, is_candidate, normalize};
pub use section::{DictionarySection, RegexRule, SelectorRule};
pub use store::{PUBLIC, RuleStore, TITLE};
pub use template::{ComputeFn, Replacement, Template};
