//! Text resolution: pre-filter, normalisation, tiered lookup and splice.

use crate::section::DictionarySection;
use crate::store::RuleStore;
use core_types::PageContext;

/// Trim and collapse every whitespace run (including no-break space) to
/// one space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn is_numeric(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        && text.parse::<f64>().is_ok()
}

fn is_target_script(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'     // kana
        | '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}'   // compatibility ideographs
        | '\u{FF00}'..='\u{FFEF}'   // fullwidth forms
    )
}

/// Cheap rejects that run before any lookup.
///
/// Rejects blank or numeric text, text without any source-script letter
/// or `,`/`.`, and text whose letters are all target-script already.
pub fn is_candidate(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_numeric(trimmed) {
        return false;
    }
    if !trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() || c == ',' || c == '.')
    {
        return false;
    }
    let mut letters = trimmed.chars().filter(|c| c.is_alphabetic()).peekable();
    let all_target = letters.peek().is_some() && letters.all(is_target_script);
    !all_target
}

/// Resolver bound to one store, one scoped section and the regex switch.
///
/// Cheap to build; the engine makes one per pass.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    store: &'a RuleStore,
    section: Option<&'a DictionarySection>,
    regex_enabled: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a RuleStore, context: Option<&PageContext>, regex_enabled: bool) -> Self {
        Self {
            store,
            section: context.and_then(|c| store.section(c)),
            regex_enabled,
        }
    }

    pub fn regex_enabled(&self) -> bool {
        self.regex_enabled
    }

    /// Translation of `text` with its surrounding whitespace preserved, or
    /// `None` when nothing applies or the result would equal the input.
    pub fn resolve(&self, text: &str) -> Option<String> {
        if !is_candidate(text) {
            return None;
        }
        let key = normalize(text);
        if self.is_prior_output(&key) {
            return None;
        }
        let translated = self.lookup(&key)?;
        if translated == key {
            return None;
        }
        Some(splice(text, &translated))
    }

    /// `key` is text the active section or public writes, and neither has
    /// an exact entry for it.
    fn is_prior_output(&self, key: &str) -> bool {
        let public = self.store.public();
        let has_entry =
            public.exact(key).is_some() || self.section.is_some_and(|s| s.exact(key).is_some());
        !has_entry && (public.is_output(key) || self.section.is_some_and(|s| s.is_output(key)))
    }

    /// Tiered lookup on an already-normalised key.
    ///
    /// An exact hit is final even when it maps the key to itself.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let public = self.store.public();
        if let Some(hit) = self.section.and_then(|s| s.exact(key)) {
            return Some(hit.to_string());
        }
        if let Some(hit) = public.exact(key) {
            return Some(hit.to_string());
        }
        if !self.regex_enabled {
            return None;
        }
        self.section
            .and_then(|s| DictionarySection::first_rewrite(s.regexp(), key))
            .or_else(|| DictionarySection::first_rewrite(public.regexp(), key))
    }

    /// Time-display text against the public `time-regexp` rules. Consulted
    /// whether or not the regex tier is enabled.
    pub fn resolve_time(&self, text: &str) -> Option<String> {
        let key = normalize(text);
        if key.is_empty() {
            return None;
        }
        let translated = DictionarySection::first_rewrite(self.store.public().time_regexp(), &key)?;
        Some(splice(text, &translated))
    }

    /// Document title against the `title` section: exact map, then its
    /// rules in order.
    pub fn resolve_title(&self, title: &str) -> Option<String> {
        let key = normalize(title);
        if key.is_empty() {
            return None;
        }
        let section = self.store.title();
        let translated = match section.exact(&key) {
            Some(hit) => hit.to_string(),
            None => DictionarySection::first_rewrite(section.regexp(), &key)?,
        };
        (translated != key).then_some(translated)
    }
}

/// Put `translated` where the trimmed text sat in `original`.
fn splice(original: &str, translated: &str) -> String {
    let trimmed = original.trim();
    let start = original.len() - original.trim_start().len();
    let end = start + trimmed.len();
    let mut out = String::with_capacity(original.len() + translated.len());
    out.push_str(&original[..start]);
    out.push_str(translated);
    out.push_str(&original[end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT: &str = r#"{
        "zh": {
            "public": {
                "static": { "Settings": "设置", "Star": "星标", "GitHub": "GitHub", "Sign in": "登录" },
                "regexp": [
                    ["^(\\d+) stars?$", "$1 星标"],
                    ["^(\\d+) ([a-z]+)$", "$1 个$2"],
                    ["^Same$", "Same"],
                    ["^(Same|Other)$", "其他"]
                ]
            },
            "title": {
                "static": { "Notifications": "通知" },
                "regexp": [["^Issues · (.+)$", "议题 · $1"]]
            },
            "repository": {
                "static": { "Star": "收藏" },
                "regexp": [["^(\\d+) stars$", "$1 颗星"]]
            }
        }
    }"#;

    fn store() -> RuleStore {
        RuleStore::from_json(DICT, "zh").unwrap().with_builtins().unwrap()
    }

    fn repo() -> PageContext {
        PageContext::new("repository")
    }

    #[test]
    fn prefilter_rejects_blank_numeric_and_target_text() {
        assert!(!is_candidate("   "));
        assert!(!is_candidate(" 1,024 ".replace(',', "").as_str()));
        assert!(!is_candidate("42"));
        assert!(!is_candidate("-3.5e2"));
        assert!(!is_candidate("设置"));
        assert!(!is_candidate("设置."));
        assert!(!is_candidate("→ ✓"));
        assert!(is_candidate("Settings"));
        assert!(is_candidate("GitHub 设置"));
        assert!(is_candidate("1,024"));
    }

    #[test]
    fn normalize_collapses_whitespace_and_nbsp() {
        assert_eq!(normalize("  Sign\u{a0}\u{a0}in \n"), "Sign in");
    }

    #[test]
    fn resolve_splices_into_original_whitespace() {
        let store = store();
        let r = Resolver::new(&store, Some(&repo()), true);
        assert_eq!(r.resolve("\n  Sign\u{a0}in  ").as_deref(), Some("\n  登录  "));
    }

    #[test]
    fn exact_beats_regex_and_context_beats_public() {
        let store = store();
        let r = Resolver::new(&store, Some(&repo()), true);
        assert_eq!(r.resolve("Star").as_deref(), Some("收藏"));
        assert_eq!(r.resolve("12 stars").as_deref(), Some("12 颗星"));
        assert_eq!(r.resolve("1 star").as_deref(), Some("1 星标"));

        let public_only = Resolver::new(&store, Some(&PageContext::new("gist")), true);
        assert_eq!(public_only.resolve("Star").as_deref(), Some("星标"));
        assert_eq!(public_only.resolve("12 stars").as_deref(), Some("12 星标"));
    }

    #[test]
    fn earlier_regex_rule_wins() {
        let store = store();
        let r = Resolver::new(&store, None, true);
        // Both the stars rule and the generic counter rule match.
        assert_eq!(r.resolve("3 stars").as_deref(), Some("3 星标"));
        assert_eq!(r.resolve("3 forks").as_deref(), Some("3 个forks"));
    }

    #[test]
    fn unchanged_rewrite_skips_to_next_rule() {
        let store = store();
        let r = Resolver::new(&store, None, true);
        assert_eq!(r.resolve("Same").as_deref(), Some("其他"));
    }

    #[test]
    fn identity_exact_entry_is_no_match() {
        let store = store();
        let r = Resolver::new(&store, None, true);
        assert_eq!(r.resolve("GitHub"), None);
    }

    #[test]
    fn disabling_regex_keeps_exact_tier() {
        let store = store();
        let r = Resolver::new(&store, Some(&repo()), false);
        assert_eq!(r.resolve("3 days ago"), None);
        assert_eq!(r.resolve("Settings").as_deref(), Some("设置"));
        assert_eq!(
            Resolver::new(&store, Some(&repo()), true).resolve("3 days ago").as_deref(),
            Some("3 天之前")
        );
    }

    #[test]
    fn translating_twice_is_a_no_op() {
        let store = store();
        let r = Resolver::new(&store, Some(&repo()), true);
        for input in [
            "Settings",
            "Star",
            "12 stars",
            "3 forks",
            "on Mar 19, 2015",
            "about a year ago",
            "in 6 minutes",
            " Sign in ",
        ] {
            let once = r.resolve(input).unwrap_or_else(|| panic!("expected a match for {input:?}"));
            assert_eq!(r.resolve(&once), None, "re-resolving {once:?} (from {input:?}) changed it");
        }
    }

    const SCOPED: &str = r#"{
        "zh": {
            "public": {
                "static": { "Copilot": "Copilot", "Open": "打开" },
                "regexp": [["^Code (.+)$", "代码 $1"]]
            },
            "repository": {
                "static": { "Copilot": "副驾驶", "Code scanning": "Code 扫描" }
            },
            "repository/pulls": { "static": { "Open pull request": "Open" } }
        }
    }"#;

    #[test]
    fn context_entry_beats_public_identity_entry() {
        let store = RuleStore::from_json(SCOPED, "zh").unwrap();
        let r = Resolver::new(&store, Some(&repo()), true);
        assert_eq!(r.resolve("Copilot").as_deref(), Some("副驾驶"));
        let public_only = Resolver::new(&store, None, true);
        assert_eq!(public_only.resolve("Copilot"), None);
    }

    #[test]
    fn outputs_of_other_contexts_do_not_block_lookup() {
        let store = RuleStore::from_json(SCOPED, "zh").unwrap();
        let r = Resolver::new(&store, Some(&repo()), true);
        assert_eq!(r.resolve("Open").as_deref(), Some("打开"));
    }

    #[test]
    fn prior_output_is_guarded_within_its_scope_only() {
        let store = RuleStore::from_json(SCOPED, "zh").unwrap();
        let r = Resolver::new(&store, Some(&repo()), true);
        assert_eq!(r.resolve("Code scanning").as_deref(), Some("Code 扫描"));
        assert_eq!(r.resolve("Code 扫描"), None);
        let gist = Resolver::new(&store, Some(&PageContext::new("gist")), true);
        assert_eq!(gist.resolve("Code 扫描").as_deref(), Some("代码 扫描"));
    }

    #[test]
    fn time_text_ignores_regex_switch() {
        let store = store();
        let r = Resolver::new(&store, None, false);
        assert_eq!(r.resolve_time(" 3 days ago ").as_deref(), Some(" 3 天之前 "));
        assert_eq!(r.resolve_time("3 天之前"), None);
    }

    #[test]
    fn title_uses_title_section_only() {
        let store = store();
        let r = Resolver::new(&store, Some(&repo()), true);
        assert_eq!(r.resolve_title("Notifications").as_deref(), Some("通知"));
        assert_eq!(
            r.resolve_title("Issues · octo/repo").as_deref(),
            Some("议题 · octo/repo")
        );
        assert_eq!(r.resolve_title("Settings"), None);
    }
}
