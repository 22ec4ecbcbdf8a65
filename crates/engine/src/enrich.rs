//! On-demand translation control for free-text containers.
//!
//! At most one control element (`div#translate-me`) exists in the document
//! at a time. Clicking it hides it and yields the container text to send;
//! the host performs the request and hands the outcome back.

use bus::EnrichOutcome;
use core_types::ControlId;
use dom::{Document, DomError, NodeId, Selector, attr};
use std::collections::HashMap;

pub const CONTROL_ELEMENT_ID: &str = "translate-me";
const CONTROL_LABEL: &str = "翻译";
const PROVIDER_URL: &str = "https://www.iflyrec.com/html/translate.html";
const PROVIDER_NAME: &str = "讯飞听见";

#[derive(Debug)]
struct Control {
    node: NodeId,
    container: NodeId,
    activated: bool,
}

#[derive(Debug, Default)]
pub struct EnrichmentControls {
    next_id: ControlId,
    controls: HashMap<ControlId, Control>,
}

impl EnrichmentControls {
    pub fn new() -> Self {
        Self::default()
    }

    fn control_present(doc: &Document) -> bool {
        doc.descendants(doc.root())
            .any(|n| doc.attribute(n, "id") == Some(CONTROL_ELEMENT_ID))
    }

    /// Insert a control right after the first match of `container`.
    pub fn attach(&mut self, doc: &mut Document, container: &Selector) -> Option<ControlId> {
        if Self::control_present(doc) {
            log::trace!(target: "engine.enrich", "control already present");
            return None;
        }
        let container = doc.query_selector(container)?;
        let node = doc.create_element("div", vec![attr("id", CONTROL_ELEMENT_ID)]);
        let label = doc.create_text(CONTROL_LABEL);
        let inserted = doc
            .append_child(node, label)
            .and_then(|()| doc.insert_after(container, node));
        if let Err(err) = inserted {
            log::debug!(target: "engine.enrich", "cannot attach control: {err}");
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.controls.insert(
            id,
            Control {
                node,
                container,
                activated: false,
            },
        );
        Some(id)
    }

    /// Handle a click on `target`. Returns the control and the text to send
    /// when the click hit a control that has not fired yet and its container
    /// has text.
    pub fn activate(&mut self, doc: &mut Document, target: NodeId) -> Option<(ControlId, String)> {
        let (&id, control) = self
            .controls
            .iter_mut()
            .find(|(_, c)| doc.ancestors(target).any(|a| a == c.node))?;
        if control.activated {
            return None;
        }
        let text = doc.text_content(control.container).trim().to_string();
        if text.is_empty() {
            log::debug!(target: "engine.enrich", "control {id} has an empty container");
            return None;
        }
        control.activated = true;
        if let Err(err) = doc.set_attribute(control.node, "style", "display: none") {
            log::debug!(target: "engine.enrich", "cannot hide control: {err}");
        }
        Some((id, text))
    }

    /// Show `outcome` after the control's container, failures included,
    /// under the provider credit line. Unknown controls are ignored.
    pub fn complete(&mut self, doc: &mut Document, id: ControlId, outcome: &EnrichOutcome) -> bool {
        let Some(control) = self.controls.remove(&id) else {
            log::debug!(target: "engine.enrich", "completion for unknown control {id}");
            return false;
        };
        let text = match outcome {
            EnrichOutcome::Translated(text) | EnrichOutcome::Failed(text) => text,
        };
        match insert_translation(doc, control.container, text) {
            Ok(()) => true,
            Err(err) => {
                log::debug!(target: "engine.enrich", "cannot show outcome of control {id}: {err}");
                false
            }
        }
    }
}

fn insert_translation(doc: &mut Document, container: NodeId, text: &str) -> Result<(), DomError> {
    let credit = doc.create_element("span", vec![attr("style", "font-size: small")]);
    let before = doc.create_text("由 ");
    let link = doc.create_element(
        "a",
        vec![
            attr("target", "_blank"),
            attr("style", "color:rgb(27, 149, 224);"),
            attr("href", PROVIDER_URL),
        ],
    );
    let name = doc.create_text(PROVIDER_NAME);
    let after = doc.create_text(" 翻译👇");
    doc.append_child(link, name)?;
    doc.append_child(credit, before)?;
    doc.append_child(credit, link)?;
    doc.append_child(credit, after)?;

    let br = doc.create_element("br", Vec::new());
    let body = doc.create_text(text);
    doc.insert_after(container, credit)?;
    doc.insert_after(credit, br)?;
    doc.insert_after(br, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::dom_utils::to_html;
    use dom::parse_html;

    fn setup() -> (Document, EnrichmentControls, NodeId, Selector) {
        let doc = parse_html(r#"<body><p class="f4 my-3"> A tiny library. </p></body>"#);
        let sel = Selector::parse(".f4.my-3").unwrap();
        let container = doc.query_selector(&sel).unwrap();
        (doc, EnrichmentControls::new(), container, sel)
    }

    fn control_node(doc: &Document) -> NodeId {
        doc.descendants(doc.root())
            .find(|&n| doc.attribute(n, "id") == Some(CONTROL_ELEMENT_ID))
            .unwrap()
    }

    #[test]
    fn attaches_one_control_after_container() {
        let (mut doc, mut controls, container, sel) = setup();
        assert_eq!(controls.attach(&mut doc, &sel), Some(0));
        assert_eq!(controls.attach(&mut doc, &sel), None);
        let node = control_node(&doc);
        assert_eq!(doc.next_sibling(container), Some(node));
        assert_eq!(doc.text_content(node), "翻译");
    }

    #[test]
    fn missing_container_attaches_nothing() {
        let mut doc = parse_html("<body><p>none</p></body>");
        let sel = Selector::parse(".f4.my-3").unwrap();
        assert_eq!(EnrichmentControls::new().attach(&mut doc, &sel), None);
    }

    #[test]
    fn click_hides_control_and_fires_once() {
        let (mut doc, mut controls, _, sel) = setup();
        let id = controls.attach(&mut doc, &sel).unwrap();
        let node = control_node(&doc);
        let label = doc.children(node)[0];
        assert_eq!(
            controls.activate(&mut doc, label),
            Some((id, "A tiny library.".to_string()))
        );
        assert_eq!(doc.attribute(node, "style"), Some("display: none"));
        assert_eq!(controls.activate(&mut doc, node), None);
    }

    #[test]
    fn clicks_elsewhere_are_ignored() {
        let (mut doc, mut controls, container, sel) = setup();
        controls.attach(&mut doc, &sel).unwrap();
        assert_eq!(controls.activate(&mut doc, container), None);
    }

    #[test]
    fn empty_container_keeps_control_usable() {
        let mut doc = parse_html(r#"<body><p class="f4 my-3">   </p></body>"#);
        let sel = Selector::parse(".f4.my-3").unwrap();
        let container = doc.query_selector(&sel).unwrap();
        let mut controls = EnrichmentControls::new();
        let id = controls.attach(&mut doc, &sel).unwrap();
        let node = control_node(&doc);
        assert_eq!(controls.activate(&mut doc, node), None);
        assert_eq!(doc.attribute(node, "style"), None);

        doc.set_text_content(container, "Filled in later").unwrap();
        assert_eq!(
            controls.activate(&mut doc, node),
            Some((id, "Filled in later".to_string()))
        );
        assert_eq!(doc.attribute(node, "style"), Some("display: none"));
    }

    #[test]
    fn completion_inserts_credit_and_text() {
        let (mut doc, mut controls, container, sel) = setup();
        let id = controls.attach(&mut doc, &sel).unwrap();
        let outcome = EnrichOutcome::Translated("一个小型库。".to_string());
        assert!(controls.complete(&mut doc, id, &outcome));
        let body = doc.body().unwrap();
        let html = to_html(&doc, body);
        assert!(
            html.contains("讯飞听见</a> 翻译👇</span><br>一个小型库。<div id=\"translate-me\">"),
            "unexpected markup: {html}"
        );
        assert!(doc.next_sibling(container).is_some());
        assert!(!controls.complete(&mut doc, id, &outcome), "second completion must be ignored");
    }

    #[test]
    fn failure_shows_fixed_string_under_credit() {
        let (mut doc, mut controls, container, sel) = setup();
        let id = controls.attach(&mut doc, &sel).unwrap();
        assert!(controls.complete(&mut doc, id, &EnrichOutcome::Failed("翻译失败".to_string())));
        let credit = doc.next_sibling(container).unwrap();
        assert!(doc.text_content(credit).contains("讯飞听见"));
        let html = to_html(&doc, doc.body().unwrap());
        assert!(
            html.contains("翻译👇</span><br>翻译失败<div id=\"translate-me\">"),
            "unexpected markup: {html}"
        );
    }
}
