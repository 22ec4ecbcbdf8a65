//! Tree walker and filter.
//!
//! A visit translates a subtree in pre-order. Each element is given one
//! [`ElementRole`], which decides the attributes it translates and whether
//! its children are visited. Writes happen only when the resolver returns
//! something, and the resolver never returns the text it was given, so
//! visiting a translated subtree again writes nothing.

use dom::{Document, NodeData, NodeId, Selector};
use rules::Resolver;

/// Text nodes longer than this many UTF-16 units are left alone.
pub const MAX_TEXT_UNITS: usize = 500;

const TIME_ELEMENTS: [&str; 4] = ["relative-time", "time-ago", "time", "local-time"];
const TOOLTIP_MARKER: &str = "tooltipped";
const HOVERCARD: &str = "data-hovercard-type";

const BUTTON_ATTRIBUTES: [&str; 6] = [
    "title",
    "data-confirm",
    "data-confirm-text",
    "data-confirm-cancel-text",
    "cancel-confirm-text",
    "data-disable-with",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementRole {
    TimeDisplay,
    FormInput { button_like: bool },
    Button { tooltip: bool },
    OptionGroup,
    /// A hovercard link names a user or repository; its children are
    /// skipped.
    Link { hovercard: bool },
    Tooltip,
    Plain,
}

impl ElementRole {
    /// `None` for anything that is not an element.
    pub fn of(doc: &Document, node: NodeId) -> Option<Self> {
        let name = doc.element_name(node)?;
        let tooltip = doc.class_name(node).contains(TOOLTIP_MARKER);
        Some(match name {
            n if TIME_ELEMENTS.contains(&n) => ElementRole::TimeDisplay,
            "input" | "textarea" => {
                let kind = doc.attribute(node, "type").unwrap_or_default();
                ElementRole::FormInput {
                    button_like: ["button", "submit", "reset"]
                        .iter()
                        .any(|t| kind.eq_ignore_ascii_case(t)),
                }
            }
            "button" => ElementRole::Button { tooltip },
            "optgroup" => ElementRole::OptionGroup,
            "a" => ElementRole::Link {
                hovercard: doc.has_attribute(node, HOVERCARD),
            },
            _ if tooltip => ElementRole::Tooltip,
            _ => ElementRole::Plain,
        })
    }

    fn attributes(self) -> &'static [&'static str] {
        match self {
            ElementRole::TimeDisplay | ElementRole::Plain => &[],
            ElementRole::FormInput { button_like: true } => &["data-confirm", "value"],
            ElementRole::FormInput { button_like: false } => &["placeholder"],
            ElementRole::Button { .. } => &BUTTON_ATTRIBUTES,
            ElementRole::OptionGroup => &["label"],
            ElementRole::Link { .. } => &["title"],
            ElementRole::Tooltip => &["aria-label"],
        }
    }

    fn descends(self) -> bool {
        !matches!(
            self,
            ElementRole::TimeDisplay | ElementRole::Link { hovercard: true }
        )
    }
}

/// One walker per pass: a scoped resolver plus the traversal ignore list.
pub struct Walker<'a> {
    resolver: Resolver<'a>,
    ignore: &'a [Selector],
}

impl<'a> Walker<'a> {
    pub fn new(resolver: Resolver<'a>, ignore: &'a [Selector]) -> Self {
        Self { resolver, ignore }
    }

    pub fn is_ignored(&self, doc: &Document, node: NodeId) -> bool {
        self.ignore.iter().any(|s| s.matches(doc, node))
    }

    /// Translate the subtree at `root`. Returns the number of writes.
    pub fn visit(&self, doc: &mut Document, root: NodeId) -> usize {
        let mut writes = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.is_ignored(doc, node) {
                continue;
            }
            let data = doc.data(node);
            let is_text = data.is_some_and(NodeData::is_text);
            let is_document = matches!(data, Some(NodeData::Document { .. }));
            let descend = if is_text {
                writes += self.translate_text(doc, node);
                false
            } else if let Some(role) = ElementRole::of(doc, node) {
                writes += self.translate_element(doc, node, role);
                role.descends()
            } else {
                is_document
            };
            if descend {
                stack.extend(doc.children(node).iter().rev().copied());
            }
        }
        writes
    }

    fn translate_text(&self, doc: &mut Document, node: NodeId) -> usize {
        let Some(text) = doc.text(node) else {
            return 0;
        };
        if text.encode_utf16().count() > MAX_TEXT_UNITS {
            return 0;
        }
        let Some(translated) = self.resolver.resolve(text) else {
            return 0;
        };
        write(doc.set_text(node, &translated))
    }

    fn translate_element(&self, doc: &mut Document, node: NodeId, role: ElementRole) -> usize {
        if role == ElementRole::TimeDisplay {
            return self.translate_time(doc, node);
        }
        let mut writes = 0;
        if role == (ElementRole::Button { tooltip: true }) {
            writes += self.translate_attribute(doc, node, "aria-label");
        }
        for name in role.attributes() {
            writes += self.translate_attribute(doc, node, name);
        }
        writes
    }

    fn translate_attribute(&self, doc: &mut Document, node: NodeId, name: &str) -> usize {
        let Some(value) = doc.attribute(node, name) else {
            return 0;
        };
        let Some(translated) = self.resolver.resolve(value) else {
            return 0;
        };
        write(doc.set_attribute(node, name, &translated))
    }

    /// The key is the last child's text when there are children, else the
    /// element's own text content.
    pub fn translate_time(&self, doc: &mut Document, node: NodeId) -> usize {
        let key = match doc.last_child(node) {
            Some(last) => doc.text_content(last),
            None => doc.text_content(node),
        };
        let Some(translated) = self.resolver.resolve_time(&key) else {
            return 0;
        };
        write(doc.set_text_content(node, &translated))
    }
}

fn write(result: Result<(), dom::DomError>) -> usize {
    match result {
        Ok(()) => 1,
        Err(err) => {
            log::debug!(target: "engine.walk", "skipping write: {err}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::parse_html;
    use rules::RuleStore;

    const DICT: &str = r#"{
        "zh": {
            "public": {
                "static": {
                    "Settings": "设置", "Search": "搜索", "Save": "保存",
                    "Are you sure?": "您确定吗？", "Saving…": "保存中…",
                    "Copy": "复制", "Filters": "筛选器", "Profile": "个人资料",
                    "Cancel": "取消", "OK": "确定", "Star": "星标"
                }
            },
            "repository": {}
        }
    }"#;

    fn run(html: &str, ignore: &[&str]) -> (dom::Document, usize) {
        let store = RuleStore::from_json(DICT, "zh").unwrap().with_builtins().unwrap();
        let ignore: Vec<Selector> = ignore.iter().map(|s| Selector::parse(s).unwrap()).collect();
        let context = core_types::PageContext::new("repository");
        let walker = Walker::new(Resolver::new(&store, Some(&context), true), &ignore);
        let mut doc = parse_html(html);
        let root = doc.root();
        let writes = walker.visit(&mut doc, root);
        (doc, writes)
    }

    fn by_id(doc: &dom::Document, id: &str) -> NodeId {
        doc.descendants(doc.root())
            .find(|&n| doc.attribute(n, "id") == Some(id))
            .unwrap_or_else(|| panic!("no element #{id}"))
    }

    #[test]
    fn text_nodes_translate_in_place() {
        let (doc, writes) = run("<body><p id=p> Settings </p></body>", &[]);
        assert_eq!(writes, 1);
        assert_eq!(doc.text_content(by_id(&doc, "p")), " 设置 ");
    }

    #[test]
    fn long_text_is_skipped() {
        let long = format!("Settings {}", "x".repeat(MAX_TEXT_UNITS));
        let (doc, writes) = run(&format!("<p id=p>{long}</p>"), &[]);
        assert_eq!(writes, 0);
        assert_eq!(doc.text_content(by_id(&doc, "p")), long);
    }

    #[test]
    fn ignore_selector_excludes_whole_subtree() {
        let (doc, writes) = run(
            "<div id=keep>Settings</div><pre id=skip><span>Settings</span></pre>",
            &["pre"],
        );
        assert_eq!(writes, 1);
        assert_eq!(doc.text_content(by_id(&doc, "keep")), "设置");
        assert_eq!(doc.text_content(by_id(&doc, "skip")), "Settings");
    }

    #[test]
    fn form_inputs_by_type() {
        let (doc, _) = run(
            r#"<input id=b type=submit value=Save data-confirm="Are you sure?" placeholder=Search>
               <input id=t type=text value=Save placeholder=Search>
               <textarea id=a placeholder=Search></textarea>"#,
            &[],
        );
        let b = by_id(&doc, "b");
        assert_eq!(doc.attribute(b, "value"), Some("保存"));
        assert_eq!(doc.attribute(b, "data-confirm"), Some("您确定吗？"));
        assert_eq!(doc.attribute(b, "placeholder"), Some("Search"));
        let t = by_id(&doc, "t");
        assert_eq!(doc.attribute(t, "value"), Some("Save"));
        assert_eq!(doc.attribute(t, "placeholder"), Some("搜索"));
        assert_eq!(doc.attribute(by_id(&doc, "a"), "placeholder"), Some("搜索"));
    }

    #[test]
    fn button_attributes_translate_independently() {
        let (doc, _) = run(
            r#"<button id=plain aria-label=Copy data-disable-with="Saving…">Save</button>
               <button id=tip class="btn tooltipped tooltipped-s" aria-label=Copy title=Settings
                       data-confirm-text=OK data-confirm-cancel-text=Cancel></button>"#,
            &[],
        );
        let plain = by_id(&doc, "plain");
        assert_eq!(doc.attribute(plain, "aria-label"), Some("Copy"));
        assert_eq!(doc.attribute(plain, "data-disable-with"), Some("保存中…"));
        assert_eq!(doc.text_content(plain), "保存");
        let tip = by_id(&doc, "tip");
        assert_eq!(doc.attribute(tip, "aria-label"), Some("复制"));
        assert_eq!(doc.attribute(tip, "title"), Some("设置"));
        assert_eq!(doc.attribute(tip, "data-confirm-text"), Some("确定"));
        assert_eq!(doc.attribute(tip, "data-confirm-cancel-text"), Some("取消"));
    }

    #[test]
    fn links_optgroups_and_tooltips() {
        let (doc, _) = run(
            r#"<a id=l class=tooltipped title=Profile aria-label=Copy>Star</a>
               <a id=h data-hovercard-type=user title=Profile>Settings</a>
               <select><optgroup id=g label=Filters></optgroup></select>
               <span id=s class=tooltipped aria-label=Copy title=Profile></span>"#,
            &[],
        );
        let l = by_id(&doc, "l");
        assert_eq!(doc.attribute(l, "title"), Some("个人资料"));
        assert_eq!(doc.attribute(l, "aria-label"), Some("Copy"));
        assert_eq!(doc.text_content(l), "星标");
        let h = by_id(&doc, "h");
        assert_eq!(doc.attribute(h, "title"), Some("个人资料"));
        assert_eq!(doc.text_content(h), "Settings");
        assert_eq!(doc.attribute(by_id(&doc, "g"), "label"), Some("筛选器"));
        let s = by_id(&doc, "s");
        assert_eq!(doc.attribute(s, "aria-label"), Some("复制"));
        assert_eq!(doc.attribute(s, "title"), Some("Profile"));
    }

    #[test]
    fn time_elements_use_last_child_and_stop() {
        let (doc, _) = run(
            r#"<relative-time id=r datetime="2015-03-19">on Mar 19, 2015</relative-time>
               <time-ago id=a><span>Settings</span>3 days ago</time-ago>"#,
            &[],
        );
        assert_eq!(doc.text_content(by_id(&doc, "r")), "2015年3月19日");
        // Whole content replaced; the span is gone rather than translated.
        assert_eq!(doc.text_content(by_id(&doc, "a")), "3 天之前");
    }

    #[test]
    fn second_visit_writes_nothing() {
        let html = r#"<body><p>Settings</p><input type=text placeholder=Search>
            <relative-time>3 days ago</relative-time><button title=Settings>Save</button></body>"#;
        let store = RuleStore::from_json(DICT, "zh").unwrap().with_builtins().unwrap();
        let context = core_types::PageContext::new("repository");
        let walker = Walker::new(Resolver::new(&store, Some(&context), true), &[]);
        let mut doc = parse_html(html);
        let root = doc.root();
        assert_eq!(walker.visit(&mut doc, root), 5);
        assert_eq!(walker.visit(&mut doc, root), 0);
    }
}
