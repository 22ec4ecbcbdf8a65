//! Host runtime for one page.
//!
//! A `Session` owns the document, the controller and the bus. It plays the
//! part of the page host: it delivers change-feed batches, fires settle
//! timers on a virtual clock, runs enrichment requests on worker threads
//! and records the notices, menu label and reload requests the controller
//! emits.

use bus::{Bus, HostCommand, HostEvent};
use core_types::{Generation, Location};
use dom::{Document, NodeId};
use engine::Controller;
use net::Translator;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

/// How long `run_until_idle` waits for an outstanding enrichment result.
pub const NETWORK_WAIT: Duration = Duration::from_secs(15);

/// Upper bound on feed rounds per drain; reaching it means the page and
/// the engine keep rewriting each other.
const MAX_FEED_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    due: Duration,
    generation: Generation,
}

pub struct Session {
    doc: Document,
    controller: Controller,
    bus: Bus,
    translator: Arc<dyn Translator>,
    clock: Duration,
    timers: VecDeque<Timer>,
    in_flight: usize,
    notices: Vec<String>,
    menu_label: Option<String>,
    reload_requested: bool,
}

impl Session {
    pub fn new(doc: Document, controller: Controller, translator: Arc<dyn Translator>) -> Self {
        Self {
            doc,
            controller,
            bus: Bus::new(),
            translator,
            clock: Duration::ZERO,
            timers: VecDeque::new(),
            in_flight: 0,
            notices: Vec::new(),
            menu_label: None,
            reload_requested: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Direct access for host-side edits; follow with [`Session::flush`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn menu_label(&self) -> Option<&str> {
        self.menu_label.as_deref()
    }

    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    /// Virtual time elapsed since the session started.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn start(&mut self) {
        self.dispatch(HostEvent::Start);
    }

    /// History-style navigation: the location changes, then the host
    /// delivers whatever batch is pending (possibly empty).
    pub fn navigate(&mut self, location: Location) {
        self.doc.navigate(location);
        let records = self.doc.take_records();
        self.dispatch(HostEvent::Mutations(records));
    }

    pub fn click(&mut self, node: NodeId) {
        self.dispatch(HostEvent::Click { node });
    }

    pub fn toggle_regex(&mut self) {
        self.dispatch(HostEvent::ToggleRegex);
    }

    /// Deliver pending records, timers and network results until nothing
    /// is left.
    pub fn flush(&mut self) {
        self.run_until_idle();
    }

    pub fn dispatch(&mut self, event: HostEvent) {
        self.deliver(event);
        self.run_until_idle();
    }

    fn deliver(&mut self, event: HostEvent) {
        if matches!(event, HostEvent::EnrichmentDone { .. }) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        let commands = self.controller.handle(&mut self.doc, event);
        for command in commands {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: HostCommand) {
        match command {
            HostCommand::ScheduleSettle { delay, generation } => {
                let due = self.clock + delay;
                let at = self.timers.partition_point(|t| t.due <= due);
                self.timers.insert(at, Timer { due, generation });
            }
            HostCommand::Notify(text) => {
                log::info!(target: "platform", "notice: {text}");
                self.notices.push(text);
            }
            HostCommand::Reload => {
                log::info!(target: "platform", "reload requested");
                self.reload_requested = true;
            }
            HostCommand::RegisterMenu { label } => {
                self.menu_label = Some(label);
            }
            HostCommand::Enrich { control, text } => {
                self.in_flight += 1;
                net::spawn_translate(
                    Arc::clone(&self.translator),
                    control,
                    text,
                    self.bus.evt_tx.clone(),
                );
            }
        }
    }

    fn drain_feed(&mut self) {
        for _ in 0..MAX_FEED_ROUNDS {
            let records = self.doc.take_records();
            if records.is_empty() {
                return;
            }
            self.deliver(HostEvent::Mutations(records));
        }
        log::warn!(
            target: "platform",
            "change feed still busy after {MAX_FEED_ROUNDS} rounds"
        );
    }

    fn run_until_idle(&mut self) {
        loop {
            self.drain_feed();
            if let Ok(event) = self.bus.evt_rx.try_recv() {
                self.deliver(event);
                continue;
            }
            if let Some(timer) = self.timers.pop_front() {
                self.clock = self.clock.max(timer.due);
                self.deliver(HostEvent::SettleElapsed {
                    generation: timer.generation,
                });
                continue;
            }
            if self.in_flight == 0 {
                return;
            }
            match self.bus.evt_rx.recv_timeout(NETWORK_WAIT) {
                Ok(event) => self.deliver(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    log::warn!(
                        target: "platform",
                        "giving up on {} enrichment request(s)",
                        self.in_flight
                    );
                    self.in_flight = 0;
                }
            }
        }
    }
}
