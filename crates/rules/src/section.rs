use crate::error::{Result, RuleError};
use crate::template::{Replacement, Template};
use dom::Selector;
use regex::{Captures, Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};

/// One ordered pattern rule.
///
/// `global` rules rewrite every match; others rewrite the first one only.
#[derive(Clone, Debug)]
pub struct RegexRule {
    pattern: Regex,
    replacement: Replacement,
    global: bool,
}

impl RegexRule {
    /// Compile a dictionary entry. Flags are `g`, `i`, `m` and `s`;
    /// `u` is accepted and ignored.
    pub fn compile(section: &str, pattern: &str, template: &str, flags: &str) -> Result<Self> {
        let mut builder = RegexBuilder::new(pattern);
        let mut global = false;
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'u' => {}
                other => {
                    return Err(RuleError::Flag {
                        pattern: pattern.to_string(),
                        flag: other,
                    });
                }
            }
        }
        let regex = builder.build().map_err(|source| RuleError::Regex {
            section: section.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;
        let template = Template::parse(template, regex.captures_len() - 1);
        Ok(Self {
            pattern: regex,
            replacement: Replacement::Template(template),
            global,
        })
    }

    pub fn computed<F>(pattern: &str, compute: F) -> std::result::Result<Self, regex::Error>
    where
        F: Fn(&Captures<'_>) -> String + Send + Sync + 'static,
    {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: Replacement::Computed(std::sync::Arc::new(compute)),
            global: false,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Rewrite `input`. `None` when the pattern does not match or the
    /// rewrite leaves the text unchanged.
    pub fn apply(&self, input: &str) -> Option<String> {
        if !self.pattern.is_match(input) {
            return None;
        }
        let expand = |caps: &Captures<'_>| self.replacement.expand(caps);
        let out = if self.global {
            self.pattern.replace_all(input, expand)
        } else {
            self.pattern.replace(input, expand)
        };
        (out != input).then(|| out.into_owned())
    }
}

#[derive(Clone, Debug)]
pub struct SelectorRule {
    pub selector: Selector,
    pub text: String,
}

/// All rules keyed under one page context (or `public` / `title`).
#[derive(Clone, Debug, Default)]
pub struct DictionarySection {
    pub(crate) exact: HashMap<String, String>,
    pub(crate) regexp: Vec<RegexRule>,
    pub(crate) selector: Vec<SelectorRule>,
    pub(crate) time_regexp: Vec<RegexRule>,
    /// Normalised exact and selector outputs, identity entries excluded.
    pub(crate) outputs: HashSet<String>,
}

impl DictionarySection {
    pub fn exact(&self, key: &str) -> Option<&str> {
        self.exact.get(key).map(String::as_str)
    }

    pub fn regexp(&self) -> &[RegexRule] {
        &self.regexp
    }

    pub fn selectors(&self) -> &[SelectorRule] {
        &self.selector
    }

    pub fn time_regexp(&self) -> &[RegexRule] {
        &self.time_regexp
    }

    /// Whether `key` (already normalised) is text this section writes.
    pub fn is_output(&self, key: &str) -> bool {
        self.outputs.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.regexp.is_empty()
            && self.selector.is_empty()
            && self.time_regexp.is_empty()
    }

    /// First rule that changes `key`, in declaration order.
    pub(crate) fn first_rewrite(rules: &[RegexRule], key: &str) -> Option<String> {
        rules.iter().find_map(|rule| rule.apply(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flag_rewrites_every_match() {
        let once = RegexRule::compile("t", "(\\d+)", "<$1>", "").unwrap();
        let all = RegexRule::compile("t", "(\\d+)", "<$1>", "g").unwrap();
        assert_eq!(once.apply("1 and 2").as_deref(), Some("<1> and 2"));
        assert_eq!(all.apply("1 and 2").as_deref(), Some("<1> and <2>"));
    }

    #[test]
    fn case_insensitive_flag() {
        let rule = RegexRule::compile("t", "^sign in$", "登录", "i").unwrap();
        assert_eq!(rule.apply("Sign In").as_deref(), Some("登录"));
    }

    #[test]
    fn no_change_is_reported_as_no_match() {
        let rule = RegexRule::compile("t", "^(GitHub)$", "$1", "").unwrap();
        assert_eq!(rule.apply("GitHub"), None);
    }

    #[test]
    fn unknown_flags_and_bad_patterns_are_errors() {
        assert!(matches!(
            RegexRule::compile("t", "a", "b", "x"),
            Err(RuleError::Flag { flag: 'x', .. })
        ));
        let err = RegexRule::compile("repository", "(", "b", "").unwrap_err();
        assert!(
            matches!(&err, RuleError::Regex { section, .. } if section == "repository"),
            "expected regex error naming its section, got: {err:?}"
        );
    }
}
