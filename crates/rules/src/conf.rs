//! Engine configuration carried in the dictionary's `conf` block.
//!
//! Every key is optional; a missing key falls back to the bundled default
//! below. Regexes are compiled and selectors parsed once, at load time.

use crate::error::{Result, RuleError};
use core_types::PageContext;
use dom::Selector;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Key under `ignore` / `ignoreMutation` that applies to every context.
pub const ALL_CONTEXTS: &str = "*";

const PAGE_CLASS: &str =
    r"\b(page-account|page-new-repo|page-create-org|page-profile|session-authentication)\b";
const PROFILE_CLASS: &str = "page-profile";
const SESSION_CLASS: &str = "session-authentication";
const LOGGED_IN_CLASS: &str = "logged-in";
const PRIMARY_HOST: &str = "github.com";
const REPO_PATH: &str = r"^/[^/]+/[^/]+/(issues|pulls?|tree|blob|commits?|releases|tags|actions|projects|security|pulse|graphs|network|settings|wiki|discussions|compare|branches|stargazers|watchers|forks|labels|milestones)";
const ORG_PATH: &str = r"^/orgs/[^/]+/(repositories|people|teams|projects|packages|settings|discussions)|^/organizations/(new|plan)";
const PAGE_PATH: &str = r"^/(notifications|watching|stars|issues|pulls|search|trending|showcases|new|settings|marketplace|explore|sponsors|codespaces|topics|collections|login|signup)";

const SITES: [(&str, &str); 3] = [
    ("gist.github.com", "gist"),
    ("www.githubstatus.com", "status"),
    ("skills.github.com", "skills"),
];

const IGNORE: [&str; 9] = [
    "code",
    "script",
    "style",
    "pre",
    "kbd",
    "marked-text",
    "#translate-me",
    "[itemprop~=name]",
    ".markdown-body",
];

const TRANSLATE_TARGETS: [(&str, &str); 2] = [
    ("repository", ".f4.my-3"),
    ("gist", ".gist-content [itemprop='about']"),
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RawConf {
    re_page_class: Option<String>,
    profile_class: Option<String>,
    session_class: Option<String>,
    logged_in_class: Option<String>,
    primary_host: Option<String>,
    sites: Option<BTreeMap<String, String>>,
    re_page_path_repo: Option<String>,
    re_page_path_org: Option<String>,
    re_page_path: Option<String>,
    ignore: Option<BTreeMap<String, Vec<String>>>,
    ignore_mutation: Option<BTreeMap<String, Vec<String>>>,
    character_data: Option<Vec<String>>,
    translate_targets: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default)]
struct SelectorTable {
    global: Vec<Selector>,
    by_context: HashMap<String, Vec<Selector>>,
}

impl SelectorTable {
    fn compile(key: &str, raw: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut table = SelectorTable::default();
        for (context, selectors) in raw {
            let parsed = selectors
                .iter()
                .map(|s| parse_selector(key, s))
                .collect::<Result<Vec<_>>>()?;
            if context == ALL_CONTEXTS {
                table.global.extend(parsed);
            } else {
                table.by_context.entry(context).or_default().extend(parsed);
            }
        }
        Ok(table)
    }

    fn for_context(&self, context: &PageContext) -> Vec<Selector> {
        let scoped = self.by_context.get(context.as_str()).into_iter().flatten();
        self.global.iter().chain(scoped).cloned().collect()
    }
}

/// Classifier tables, ignore rules and per-context switches.
#[derive(Clone, Debug)]
pub struct EngineConf {
    pub page_class: Regex,
    pub profile_class: String,
    pub session_class: String,
    pub logged_in_class: String,
    pub primary_host: String,
    pub sites: HashMap<String, PageContext>,
    pub repo_path: Regex,
    pub org_path: Regex,
    pub page_path: Regex,
    ignore: SelectorTable,
    ignore_mutation: SelectorTable,
    character_data: HashSet<PageContext>,
    translate_targets: HashMap<PageContext, Selector>,
}

impl EngineConf {
    pub(crate) fn compile(raw: RawConf) -> Result<Self> {
        let sites = raw.sites.unwrap_or_else(|| {
            SITES
                .iter()
                .map(|(host, ctx)| (host.to_string(), ctx.to_string()))
                .collect()
        });
        let ignore = raw.ignore.unwrap_or_else(|| {
            BTreeMap::from([(
                ALL_CONTEXTS.to_string(),
                IGNORE.iter().map(|s| s.to_string()).collect(),
            )])
        });
        let targets = raw.translate_targets.unwrap_or_else(|| {
            TRANSLATE_TARGETS
                .iter()
                .map(|(ctx, sel)| (ctx.to_string(), sel.to_string()))
                .collect()
        });
        let translate_targets = targets
            .iter()
            .map(|(ctx, sel)| -> Result<(PageContext, Selector)> {
                Ok((PageContext::new(ctx), parse_selector("translateTargets", sel)?))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            page_class: compile_regex("rePageClass", raw.re_page_class.as_deref().unwrap_or(PAGE_CLASS))?,
            profile_class: raw.profile_class.unwrap_or_else(|| PROFILE_CLASS.to_string()),
            session_class: raw.session_class.unwrap_or_else(|| SESSION_CLASS.to_string()),
            logged_in_class: raw
                .logged_in_class
                .unwrap_or_else(|| LOGGED_IN_CLASS.to_string()),
            primary_host: raw.primary_host.unwrap_or_else(|| PRIMARY_HOST.to_string()),
            sites: sites
                .into_iter()
                .map(|(host, ctx)| (host, PageContext::new(ctx)))
                .collect(),
            repo_path: compile_regex(
                "rePagePathRepo",
                raw.re_page_path_repo.as_deref().unwrap_or(REPO_PATH),
            )?,
            org_path: compile_regex(
                "rePagePathOrg",
                raw.re_page_path_org.as_deref().unwrap_or(ORG_PATH),
            )?,
            page_path: compile_regex("rePagePath", raw.re_page_path.as_deref().unwrap_or(PAGE_PATH))?,
            ignore: SelectorTable::compile("ignore", ignore)?,
            ignore_mutation: SelectorTable::compile(
                "ignoreMutation",
                raw.ignore_mutation.unwrap_or_default(),
            )?,
            character_data: raw
                .character_data
                .unwrap_or_default()
                .iter()
                .map(PageContext::new)
                .collect(),
            translate_targets,
        })
    }

    /// Traversal ignore selectors: global list then the context's own.
    pub fn ignore_for(&self, context: &PageContext) -> Vec<Selector> {
        self.ignore.for_context(context)
    }

    /// Selectors whose subtrees are excluded from reactive re-processing.
    pub fn ignore_mutation_for(&self, context: &PageContext) -> Vec<Selector> {
        self.ignore_mutation.for_context(context)
    }

    /// Whether text-content changes are re-processed for `context`.
    pub fn is_text_sensitive(&self, context: &PageContext) -> bool {
        self.character_data.contains(context)
    }

    pub fn translate_target(&self, context: &PageContext) -> Option<&Selector> {
        self.translate_targets.get(context)
    }
}

/// First non-empty participating group of `re` in `haystack`.
pub fn capture_context(re: &Regex, haystack: &str) -> Option<String> {
    let caps = re.captures(haystack)?;
    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn compile_regex(key: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| RuleError::Regex {
        section: format!("conf.{key}"),
        pattern: pattern.to_string(),
        source,
    })
}

fn parse_selector(key: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|source| RuleError::Selector {
        section: format!("conf.{key}"),
        selector: selector.to_string(),
        source,
    })
}
