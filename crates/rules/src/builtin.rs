//! Computed date and relative-time rules.
//!
//! These need table lookups and reordering that a template cannot express,
//! so they are registered in code rather than carried in the dictionary
//! file. Every output is free of Latin letters, which keeps it out of the
//! resolver's reach on a second pass.

use crate::error::{Result, RuleError};
use crate::section::{DictionarySection, RegexRule};
use regex::Captures;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTH_ALT: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

const WEEKDAYS: [(&str, &str); 7] = [
    ("Sun", "周日"),
    ("Mon", "周一"),
    ("Tue", "周二"),
    ("Wed", "周三"),
    ("Thu", "周四"),
    ("Fri", "周五"),
    ("Sat", "周六"),
];

const UNITS: [(&str, &str); 7] = [
    ("second", "秒"),
    ("minute", "分钟"),
    ("hour", "小时"),
    ("day", "天"),
    ("week", "周"),
    ("month", "个月"),
    ("year", "年"),
];

const APPROXIMATIONS: [(&str, &str); 3] = [("over", "超过"), ("almost", "将近"), ("about", "大约")];

const UNIT_ALT: &str = "second|minute|hour|day|week|month|year";

fn group<'h>(caps: &Captures<'h>, index: usize) -> &'h str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn month_number(name: &str) -> Option<usize> {
    let prefix = name.get(..3)?;
    MONTHS.iter().position(|m| *m == prefix).map(|i| i + 1)
}

/// `M月D日`, prefixed with `YYYY年` when a year is present.
fn format_date(year: &str, month: &str, day: &str) -> Option<String> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;
    Some(if year.is_empty() {
        format!("{month}月{day}日")
    } else {
        format!("{year}年{month}月{day}日")
    })
}

/// `[approx ]N unit` for a relative phrase. `a`/`an` count as one.
fn format_amount(approx: &str, count: &str, unit: &str) -> Option<String> {
    let unit = lookup(&UNITS, unit)?;
    let count = if count == "a" || count == "an" { "1" } else { count };
    Some(match lookup(&APPROXIMATIONS, approx) {
        Some(prefix) => format!("{prefix} {count} {unit}"),
        None => format!("{count} {unit}"),
    })
}

/// Unchanged match text, so a table miss reads as "no change".
fn unchanged(caps: &Captures<'_>) -> String {
    group(caps, 0).to_string()
}

fn rule<F>(pattern: &str, compute: F) -> Result<RegexRule>
where
    F: Fn(&Captures<'_>) -> String + Send + Sync + 'static,
{
    RegexRule::computed(pattern, compute).map_err(|source| RuleError::Regex {
        section: "builtin".to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

fn fixed(pattern: &str, output: &'static str) -> Result<RegexRule> {
    rule(pattern, move |_| output.to_string())
}

/// Built-in rules in match order.
pub fn time_rules() -> Result<Vec<RegexRule>> {
    let weekday_date = format!(
        r"^(Sun|Mon|Tue|Wed|Thu|Fri|Sat)[a-z]*,? ({MONTH_ALT})[a-z]*\.? (\d{{1,2}}),? (\d{{4}})$"
    );
    let date = format!(r"^(?:on )?({MONTH_ALT})[a-z]*\.? (\d{{1,2}})(?:,? (\d{{4}}))?$");
    let past = format!(r"^(?:(over|almost|about) )?(an?|\d+) ({UNIT_ALT})s? ago$");
    let future = format!(r"^in (?:(over|almost|about) )?(an?|\d+) ({UNIT_ALT})s?$");

    Ok(vec![
        rule(&weekday_date, |caps| {
            let date = format_date(group(caps, 4), group(caps, 2), group(caps, 3));
            match (date, lookup(&WEEKDAYS, group(caps, 1))) {
                (Some(date), Some(weekday)) => format!("{date} {weekday}"),
                _ => unchanged(caps),
            }
        })?,
        rule(&date, |caps| {
            format_date(group(caps, 3), group(caps, 1), group(caps, 2))
                .unwrap_or_else(|| unchanged(caps))
        })?,
        rule(&past, |caps| {
            format_amount(group(caps, 1), group(caps, 2), group(caps, 3))
                .map_or_else(|| unchanged(caps), |amount| format!("{amount}之前"))
        })?,
        rule(&future, |caps| {
            format_amount(group(caps, 1), group(caps, 2), group(caps, 3))
                .map_or_else(|| unchanged(caps), |amount| format!("{amount}之内"))
        })?,
        fixed(r"(?i)^just now$", "刚刚")?,
        fixed(r"(?i)^now$", "现在")?,
        fixed(r"(?i)^today$", "今天")?,
        fixed(r"(?i)^yesterday$", "昨天")?,
        rule(r"(?i)^last (week|month|year)$", |caps| {
            match group(caps, 1).to_ascii_lowercase().as_str() {
                "week" => "上周".to_string(),
                "month" => "上个月".to_string(),
                "year" => "去年".to_string(),
                _ => unchanged(caps),
            }
        })?,
    ])
}

/// Append the built-ins to the public `regexp` and `time-regexp` lists.
pub fn register(public: &mut DictionarySection) -> Result<()> {
    let rules = time_rules()?;
    log::debug!(target: "rules.load", "registering {} built-in time rules", rules.len());
    public.regexp.extend(rules.iter().cloned());
    public.time_regexp.extend(rules);
    Ok(())
}
