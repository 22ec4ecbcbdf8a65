use crate::builtin;
use crate::conf::{EngineConf, RawConf};
use crate::error::{Result, RuleError};
use crate::resolve::normalize;
use crate::section::{DictionarySection, RegexRule, SelectorRule};
use core_types::PageContext;
use dom::Selector;
use serde::Deserialize;
use std::collections::HashMap;

/// Section applied under every context.
pub const PUBLIC: &str = "public";
/// Section consulted for the document title.
pub const TITLE: &str = "title";

const BUNDLED: &str = include_str!("../data/zh.json");

#[derive(Debug, Deserialize)]
struct RawDictionary {
    #[serde(default)]
    conf: RawConf,
    #[serde(flatten)]
    languages: HashMap<String, HashMap<String, RawSection>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSection {
    #[serde(default, rename = "static")]
    exact: HashMap<String, String>,
    #[serde(default)]
    regexp: Vec<RawRule>,
    #[serde(default)]
    selector: Vec<(String, String)>,
    #[serde(default, rename = "time-regexp")]
    time_regexp: Vec<RawRule>,
}

/// `[pattern, template]` or `[pattern, template, flags]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Flagged(String, String, String),
    Plain(String, String),
}

impl RawRule {
    fn compile(&self, section: &str) -> Result<RegexRule> {
        match self {
            RawRule::Flagged(pattern, template, flags) => {
                RegexRule::compile(section, pattern, template, flags)
            }
            RawRule::Plain(pattern, template) => RegexRule::compile(section, pattern, template, ""),
        }
    }
}

impl RawSection {
    fn compile(self, name: &str) -> Result<DictionarySection> {
        let regexp = compile_rules(name, &self.regexp)?;
        let time_regexp = compile_rules(name, &self.time_regexp)?;
        let selector = self
            .selector
            .into_iter()
            .map(|(css, text)| {
                Selector::parse(&css)
                    .map(|selector| SelectorRule { selector, text })
                    .map_err(|source| RuleError::Selector {
                        section: name.to_string(),
                        selector: css,
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let outputs = self
            .exact
            .iter()
            .filter(|(key, value)| key != value)
            .map(|(_, value)| value.as_str())
            .chain(selector.iter().map(|rule| rule.text.as_str()))
            .map(normalize)
            .filter(|output| !output.is_empty())
            .collect();
        Ok(DictionarySection {
            exact: self.exact,
            regexp,
            selector,
            time_regexp,
            outputs,
        })
    }
}

fn compile_rules(section: &str, raw: &[RawRule]) -> Result<Vec<RegexRule>> {
    raw.iter().map(|rule| rule.compile(section)).collect()
}

/// Dictionary sections for one language plus the engine configuration.
///
/// Immutable once loaded; the engine shares it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct RuleStore {
    lang: String,
    public: DictionarySection,
    title: DictionarySection,
    sections: HashMap<PageContext, DictionarySection>,
    conf: EngineConf,
}

impl RuleStore {
    /// Load the `lang` half of a dictionary file. Built-in computed rules
    /// are not included; see [`RuleStore::with_builtins`].
    pub fn from_json(json: &str, lang: &str) -> Result<Self> {
        let raw: RawDictionary = serde_json::from_str(json)?;
        let conf = EngineConf::compile(raw.conf)?;
        let mut languages = raw.languages;
        let raw_sections = languages
            .remove(lang)
            .ok_or_else(|| RuleError::MissingLanguage(lang.to_string()))?;

        let mut public = DictionarySection::default();
        let mut title = DictionarySection::default();
        let mut sections = HashMap::new();
        for (name, raw_section) in raw_sections {
            let section = raw_section.compile(&name)?;
            match name.as_str() {
                PUBLIC => public = section,
                TITLE => title = section,
                _ => {
                    sections.insert(PageContext::new(&name), section);
                }
            }
        }

        log::debug!(
            target: "rules.load",
            "loaded {lang}: {} context sections, {} public exact, {} public regexp",
            sections.len(),
            public.exact.len(),
            public.regexp.len()
        );
        Ok(Self {
            lang: lang.to_string(),
            public,
            title,
            sections,
            conf,
        })
    }

    /// The bundled Chinese dictionary with the built-in time rules.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED, "zh")?.with_builtins()
    }

    pub fn with_builtins(mut self) -> Result<Self> {
        builtin::register(&mut self.public)?;
        Ok(self)
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn public(&self) -> &DictionarySection {
        &self.public
    }

    pub fn title(&self) -> &DictionarySection {
        &self.title
    }

    pub fn section(&self, context: &PageContext) -> Option<&DictionarySection> {
        self.sections.get(context)
    }

    pub fn has_section(&self, context: &PageContext) -> bool {
        self.sections.contains_key(context)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &PageContext> {
        self.sections.keys()
    }

    pub fn conf(&self) -> &EngineConf {
        &self.conf
    }
}
