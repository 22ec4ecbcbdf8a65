//! Page classification.
//!
//! `classify` maps a location and a handful of document markers to a page
//! context, trying each rule in a fixed priority order and stopping at the
//! first that applies. A context without a dictionary section is reported
//! as unknown.

use core_types::{Location, PageContext};
use dom::Document;
use rules::{EngineConf, RuleStore, capture_context};

const ANALYTICS_META: &str = "analytics-location";
const REPOSITORY_MARKER: &str = "/<user-name>/<repo-name>";
const ORGANIZATION_MARKER: &str = "/<org-login>";
const REPOSITORY: &str = "repository";
const ORGS: &str = "orgs";
const DASHBOARD: &str = "page-dashboard";
const HOMEPAGE: &str = "homepage";

/// Document-level inputs to classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentMarkers {
    /// Class attribute of the body element.
    pub body_class: String,
    /// Content of the `analytics-location` meta tag.
    pub analytics_location: Option<String>,
}

impl DocumentMarkers {
    pub fn from_document(doc: &Document) -> Self {
        let body_class = doc
            .body()
            .map(|body| doc.class_name(body).to_string())
            .unwrap_or_default();
        let analytics_location = doc
            .descendants(doc.root())
            .filter(|&id| doc.is_element_named(id, "meta"))
            .find(|&id| doc.attribute(id, "name") == Some(ANALYTICS_META))
            .and_then(|id| doc.attribute(id, "content"))
            .map(str::to_string);
        Self {
            body_class,
            analytics_location,
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.body_class.split_ascii_whitespace().any(|c| c == class)
    }

    fn analytics_contains(&self, marker: &str) -> bool {
        self.analytics_location
            .as_deref()
            .is_some_and(|a| a.contains(marker))
    }
}

/// Context key before dictionary validation.
pub fn classify_raw(
    conf: &EngineConf,
    location: &Location,
    markers: &DocumentMarkers,
) -> Option<PageContext> {
    let path = location.path();

    // Session and other fixed body categories.
    if markers.has_class(&conf.session_class) {
        return Some(PageContext::new(&conf.session_class));
    }
    let category = capture_context(&conf.page_class, &markers.body_class);
    if let Some(category) = category.as_deref()
        && category != conf.profile_class
    {
        return Some(PageContext::new(category));
    }

    if let Some(site) = conf.sites.get(location.host()) {
        return Some(site.clone());
    }

    if markers.has_class(&conf.profile_class) || category.is_some() {
        let sub = location
            .query_word("tab")
            .or_else(|| path.contains("/stars").then(|| "stars".to_string()));
        return Some(match sub {
            Some(tab) => PageContext::new(format!("{}/{tab}", conf.profile_class)),
            None => PageContext::new(&conf.profile_class),
        });
    }

    if path == "/" && location.host() == conf.primary_host {
        let logged_in = markers.has_class(&conf.logged_in_class);
        return Some(PageContext::new(if logged_in { DASHBOARD } else { HOMEPAGE }));
    }

    if markers.analytics_contains(REPOSITORY_MARKER) {
        return Some(scoped(REPOSITORY, capture_context(&conf.repo_path, path)));
    }

    let org_path = path.starts_with("/orgs") || path.starts_with("/organizations");
    if markers.analytics_contains(ORGANIZATION_MARKER) || org_path {
        return Some(scoped(ORGS, capture_context(&conf.org_path, path)));
    }

    capture_context(&conf.page_path, path).map(PageContext::new)
}

fn scoped(base: &str, sub: Option<String>) -> PageContext {
    match sub {
        Some(sub) => PageContext::new(format!("{base}/{sub}")),
        None => PageContext::new(base),
    }
}

/// Classify and keep the result only if the store has a section for it.
pub fn classify(
    store: &RuleStore,
    location: &Location,
    markers: &DocumentMarkers,
) -> Option<PageContext> {
    let Some(context) = classify_raw(store.conf(), location, markers) else {
        log::info!(target: "engine.classify", "no context for {location}");
        return None;
    };
    if !store.has_section(&context) {
        log::info!(
            target: "engine.classify",
            "context {context} for {location} has no {} dictionary section",
            store.lang()
        );
        return None;
    }
    log::debug!(target: "engine.classify", "{location} -> {context}");
    Some(context)
}
