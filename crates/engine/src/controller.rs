//! The controller owns the engine state and reacts to host events.
//!
//! Lifecycle: `Unarmed` until the first `Start`, then `Armed` for good.
//! While armed, every mutation batch first checks for a navigation change;
//! a change re-derives the state, translates the title and schedules a
//! settle timer, and a change of context additionally re-runs the full
//! pass. The batch itself is then dispatched against the current state.

use crate::enrich::EnrichmentControls;
use crate::feed::{collect_targets, observer_options};
use crate::prefs::PreferenceStore;
use crate::state::EngineState;
use crate::walk::Walker;
use bus::{EnrichOutcome, HostCommand, HostEvent};
use core_types::{ControlId, Generation};
use dom::{Document, MutationRecord, NodeId};
use rules::RuleStore;
use std::sync::Arc;
use std::time::Duration;

pub const INITIAL_SETTLE: Duration = Duration::from_millis(100);
pub const NAVIGATION_SETTLE: Duration = Duration::from_millis(500);

pub const MENU_DISABLE: &str = "关闭正则功能";
pub const MENU_ENABLE: &str = "开启正则功能";
pub const NOTICE_ENABLED: &str = "已开启正则功能";
pub const NOTICE_DISABLED: &str = "已关闭正则功能";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Unarmed,
    Armed,
}

pub struct Controller {
    store: Arc<RuleStore>,
    prefs: Box<dyn PreferenceStore + Send>,
    state: EngineState,
    phase: Phase,
    generation: Generation,
    controls: EnrichmentControls,
    full_passes: usize,
}

impl Controller {
    pub fn new(store: Arc<RuleStore>, prefs: Box<dyn PreferenceStore + Send>) -> Self {
        let state = EngineState {
            regex_enabled: prefs.regex_enabled(),
            ..EngineState::default()
        };
        Self {
            store,
            prefs,
            state,
            phase: Phase::Unarmed,
            generation: 0,
            controls: EnrichmentControls::new(),
            full_passes: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Number of full-tree passes run so far.
    pub fn full_passes(&self) -> usize {
        self.full_passes
    }

    pub fn menu_label(&self) -> &'static str {
        if self.state.regex_enabled {
            MENU_DISABLE
        } else {
            MENU_ENABLE
        }
    }

    pub fn handle(&mut self, doc: &mut Document, event: HostEvent) -> Vec<HostCommand> {
        match event {
            HostEvent::Start => self.start(doc),
            HostEvent::Mutations(records) => self.on_mutations(doc, &records),
            HostEvent::SettleElapsed { generation } => {
                self.on_settle(doc, generation);
                Vec::new()
            }
            HostEvent::ToggleRegex => self.toggle_regex(),
            HostEvent::Click { node } => self.on_click(doc, node),
            HostEvent::EnrichmentDone { control, outcome } => {
                self.on_enrichment(doc, control, &outcome);
                Vec::new()
            }
        }
    }

    fn start(&mut self, doc: &mut Document) -> Vec<HostCommand> {
        if self.phase == Phase::Armed {
            log::debug!(target: "engine.controller", "ignoring repeated start");
            return Vec::new();
        }
        let mut commands = vec![HostCommand::RegisterMenu {
            label: self.menu_label().to_string(),
        }];
        self.state = EngineState::derive(&self.store, doc, self.state.regex_enabled);
        self.translate_title(doc);
        if !self.state.is_unknown() {
            self.full_pass(doc);
        }
        // Observed even when unknown, so a later navigation is noticed.
        let target = doc.body().unwrap_or(doc.root());
        doc.observe(target, observer_options());
        self.phase = Phase::Armed;
        commands.push(self.schedule_settle(INITIAL_SETTLE));
        commands
    }

    fn on_mutations(&mut self, doc: &mut Document, records: &[MutationRecord]) -> Vec<HostCommand> {
        if self.phase == Phase::Unarmed {
            return Vec::new();
        }
        let mut commands = Vec::new();
        if doc.location() != self.state.location.as_ref() {
            commands.push(self.on_navigation(doc));
        }
        if self.state.is_unknown() {
            return commands;
        }
        let targets = collect_targets(doc, records, &self.state);
        if !targets.is_empty() {
            let walker = Walker::new(self.state.resolver(&self.store), &self.state.ignore);
            let writes: usize = targets.iter().map(|&node| walker.visit(doc, node)).sum();
            log::trace!(
                target: "engine.feed",
                "batch of {} records: {} targets, {writes} writes",
                records.len(),
                targets.len()
            );
        }
        commands
    }

    fn on_navigation(&mut self, doc: &mut Document) -> HostCommand {
        let previous = self.state.context.clone();
        self.state = EngineState::derive(&self.store, doc, self.state.regex_enabled);
        log::debug!(
            target: "engine.controller",
            "navigation to {:?}: {:?} -> {:?}",
            self.state.location.as_ref().map(|l| l.href()),
            previous,
            self.state.context
        );
        self.translate_title(doc);
        if self.state.context != previous && !self.state.is_unknown() {
            self.full_pass(doc);
        }
        self.schedule_settle(NAVIGATION_SETTLE)
    }

    fn schedule_settle(&mut self, delay: Duration) -> HostCommand {
        self.generation += 1;
        HostCommand::ScheduleSettle {
            delay,
            generation: self.generation,
        }
    }

    fn full_pass(&mut self, doc: &mut Document) {
        let root = doc.body().unwrap_or(doc.root());
        let walker = Walker::new(self.state.resolver(&self.store), &self.state.ignore);
        let writes = walker.visit(doc, root);
        self.full_passes += 1;
        log::debug!(
            target: "engine.controller",
            "full pass for {:?}: {writes} writes",
            self.state.context
        );
    }

    fn translate_title(&self, doc: &mut Document) {
        let title = doc.title();
        let Some(translated) = self.state.resolver(&self.store).resolve_title(&title) else {
            return;
        };
        if let Err(err) = doc.set_title(&translated) {
            log::debug!(target: "engine.controller", "cannot set title: {err}");
        }
    }

    /// Selector replacements and the enrichment control, once the page has
    /// had time to render.
    fn on_settle(&mut self, doc: &mut Document, generation: Generation) {
        if generation != self.generation {
            log::trace!(target: "engine.controller", "stale settle timer {generation}");
            return;
        }
        let Some(context) = self.state.context.clone() else {
            return;
        };
        let scoped = self.store.section(&context).into_iter();
        let rules: Vec<_> = scoped
            .chain(std::iter::once(self.store.public()))
            .flat_map(|section| section.selectors())
            .collect();
        for rule in rules {
            let Some(node) = doc.query_selector(&rule.selector) else {
                continue;
            };
            if doc.text_content(node) == rule.text {
                continue;
            }
            if let Err(err) = doc.set_text_content(node, &rule.text) {
                log::debug!(target: "engine.controller", "selector {}: {err}", rule.selector.as_str());
            }
        }
        if let Some(target) = self.store.conf().translate_target(&context) {
            self.controls.attach(doc, target);
        }
    }

    fn toggle_regex(&mut self) -> Vec<HostCommand> {
        let enabled = !self.state.regex_enabled;
        if let Err(err) = self.prefs.set_regex_enabled(enabled) {
            log::warn!(target: "engine.controller", "regex switch not persisted: {err}");
        }
        self.state.regex_enabled = enabled;
        let notice = if enabled { NOTICE_ENABLED } else { NOTICE_DISABLED };
        let mut commands = vec![
            HostCommand::Notify(notice.to_string()),
            HostCommand::RegisterMenu {
                label: self.menu_label().to_string(),
            },
        ];
        if enabled {
            commands.push(HostCommand::Reload);
        }
        commands
    }

    fn on_click(&mut self, doc: &mut Document, node: NodeId) -> Vec<HostCommand> {
        match self.controls.activate(doc, node) {
            Some((control, text)) => vec![HostCommand::Enrich { control, text }],
            None => Vec::new(),
        }
    }

    fn on_enrichment(&mut self, doc: &mut Document, control: ControlId, outcome: &EnrichOutcome) {
        self.controls.complete(doc, control, outcome);
    }
}
