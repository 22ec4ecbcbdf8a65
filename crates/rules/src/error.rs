use dom::SelectorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("dictionary JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dictionary has no language {0:?}")]
    MissingLanguage(String),
    #[error("invalid pattern {pattern:?} in section {section:?}: {source}")]
    Regex {
        section: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown flag {flag:?} on pattern {pattern:?}")]
    Flag { pattern: String, flag: char },
    #[error("invalid selector {selector:?} in {section:?}: {source}")]
    Selector {
        section: String,
        selector: String,
        #[source]
        source: SelectorError,
    },
}

pub type Result<T> = std::result::Result<T, RuleError>;
