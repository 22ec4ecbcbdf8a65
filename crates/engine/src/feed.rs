//! Change feed consumer: turns one batch of mutation records into the
//! nodes that need a visit.

use crate::state::EngineState;
use crate::walk::ElementRole;
use dom::{Document, MutationRecord, NodeId, ObserverOptions};
use std::collections::HashSet;

/// Attributes whose changes are delivered at all.
pub const WATCHED_ATTRIBUTES: [&str; 4] = ["value", "placeholder", "aria-label", "data-confirm"];

pub fn observer_options() -> ObserverOptions {
    ObserverOptions {
        child_list: true,
        subtree: true,
        character_data: true,
        attribute_filter: Some(WATCHED_ATTRIBUTES.iter().map(|a| a.to_string()).collect()),
    }
}

/// Nodes to visit for `records`, in delivery order and without repeats.
///
/// Inserted nodes, attribute targets and (for text-sensitive contexts)
/// character-data targets are collected. A text node inside a time display
/// is replaced by the time element itself. Nodes that are gone from the
/// document, or that sit inside anything matched by the traversal or
/// mutation ignore lists, are dropped.
pub fn collect_targets(
    doc: &Document,
    records: &[MutationRecord],
    state: &EngineState,
) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        let candidates: &[NodeId] = match record {
            MutationRecord::ChildList { added, .. } => added,
            MutationRecord::Attributes { target, .. } => std::slice::from_ref(target),
            MutationRecord::CharacterData { target } if state.text_sensitive => {
                std::slice::from_ref(target)
            }
            MutationRecord::CharacterData { .. } => &[],
        };
        for &node in candidates {
            if !doc.is_connected(node) {
                log::debug!(target: "engine.feed", "skipping detached node {node:?} in {record:?}");
                continue;
            }
            let node = retarget_time_text(doc, node);
            if is_reactively_ignored(doc, node, state) {
                log::trace!(target: "engine.feed", "ignoring mutation under {node:?}");
                continue;
            }
            if seen.insert(node) {
                out.push(node);
            }
        }
    }
    out
}

fn retarget_time_text(doc: &Document, node: NodeId) -> NodeId {
    if doc.is_element(node) {
        return node;
    }
    match doc.parent(node) {
        Some(parent) if ElementRole::of(doc, parent) == Some(ElementRole::TimeDisplay) => parent,
        _ => node,
    }
}

fn is_reactively_ignored(doc: &Document, node: NodeId, state: &EngineState) -> bool {
    doc.ancestors(node)
        .any(|a| state.reactive_ignores().any(|s| s.matches(doc, a)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{Selector, parse_html};

    fn state(ignore: &[&str], ignore_mutation: &[&str], text_sensitive: bool) -> EngineState {
        let parse = |list: &[&str]| -> Vec<Selector> {
            list.iter().map(|s| Selector::parse(s).unwrap()).collect()
        };
        EngineState {
            ignore: parse(ignore),
            ignore_mutation: parse(ignore_mutation),
            text_sensitive,
            context: Some(core_types::PageContext::new("repository")),
            ..EngineState::default()
        }
    }

    fn observed(html: &str) -> Document {
        let mut doc = parse_html(html);
        if let Some(body) = doc.body() {
            doc.observe(body, observer_options());
        }
        doc
    }

    fn by_id(doc: &Document, id: &str) -> NodeId {
        doc.descendants(doc.root())
            .find(|&n| doc.attribute(n, "id") == Some(id))
            .unwrap()
    }

    #[test]
    fn collects_added_nodes_and_attribute_targets_in_order() {
        let mut doc = observed("<body><div id=list></div><input id=i></body>");
        let list = by_id(&doc, "list");
        let input = by_id(&doc, "i");
        let item = doc.create_element("li", Vec::new());
        doc.append_child(list, item).unwrap();
        doc.set_attribute(input, "placeholder", "Search").unwrap();
        doc.set_attribute(input, "class", "wide").unwrap();
        let records = doc.take_records();
        assert_eq!(collect_targets(&doc, &records, &state(&[], &[], false)), vec![item, input]);
    }

    #[test]
    fn character_data_only_when_text_sensitive() {
        let mut doc = observed("<body><p id=p>Star</p></body>");
        let text = doc.children(by_id(&doc, "p"))[0];
        doc.set_text(text, "Unstar").unwrap();
        let records = doc.take_records();
        assert!(collect_targets(&doc, &records, &state(&[], &[], false)).is_empty());
        assert_eq!(collect_targets(&doc, &records, &state(&[], &[], true)), vec![text]);
    }

    #[test]
    fn drops_nodes_under_either_ignore_list() {
        let mut doc = observed(
            "<body><div class=comment-body id=c></div><pre id=p></pre><div id=ok></div></body>",
        );
        let add = |doc: &mut Document, id: &str| {
            let parent = by_id(doc, id);
            let node = doc.create_text("Settings");
            doc.append_child(parent, node).unwrap();
            node
        };
        add(&mut doc, "c");
        add(&mut doc, "p");
        let ok = add(&mut doc, "ok");
        let records = doc.take_records();
        let targets = collect_targets(&doc, &records, &state(&["pre"], &[".comment-body"], false));
        assert_eq!(targets, vec![ok]);
    }

    #[test]
    fn skips_nodes_removed_later_in_the_batch() {
        let mut doc = observed("<body><div id=d></div></body>");
        let d = by_id(&doc, "d");
        let span = doc.create_element("span", Vec::new());
        doc.append_child(d, span).unwrap();
        doc.remove(span).unwrap();
        let records = doc.take_records();
        assert_eq!(records.len(), 2);
        assert!(collect_targets(&doc, &records, &state(&[], &[], false)).is_empty());
    }

    #[test]
    fn time_text_is_retargeted_to_its_element() {
        let mut doc = observed("<body><relative-time id=t>now</relative-time></body>");
        let t = by_id(&doc, "t");
        doc.set_text_content(t, "3 days ago").unwrap();
        let records = doc.take_records();
        assert_eq!(collect_targets(&doc, &records, &state(&[], &[], false)), vec![t]);
    }
}
