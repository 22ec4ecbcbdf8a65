use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

pub type ControlId = u32;
pub type Generation = u64;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid location {href:?}: {source}")]
    Parse {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("location {0:?} has no host")]
    MissingHost(String),
}

/// Navigation location of the hosted page.
///
/// Equality is by full href: two locations differing only in query or
/// fragment are distinct navigations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn parse(href: &str) -> Result<Self, LocationError> {
        let url = Url::parse(href.trim()).map_err(|source| LocationError::Parse {
            href: href.to_string(),
            source,
        })?;
        if url.host_str().is_none() {
            return Err(LocationError::MissingHost(href.to_string()));
        }
        Ok(Self { url })
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Word-character prefix of the first `name=` query value.
    ///
    /// `?tab=repositories&x=1` yields `repositories`; an empty or non-word
    /// value yields `None`.
    pub fn query_word(&self, name: &str) -> Option<String> {
        let (_, value) = self.url.query_pairs().find(|(k, _)| k == name)?;
        let word: String = value
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        (!word.is_empty()).then_some(word)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.href())
    }
}

/// Opaque page-kind key that scopes dictionaries and ignore rules.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageContext(Arc<str>);

impl PageContext {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageContext {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
