use core_types::{ControlId, Generation};
use dom::{MutationRecord, NodeId};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Result of one enrichment request, already reduced to display text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrichOutcome {
    Translated(String),
    /// Fixed failure string for the control's container.
    Failed(String),
}

/// Everything the host delivers to the controller.
#[derive(Debug)]
pub enum HostEvent {
    // Lifecycle
    Start,
    // Change feed -> controller: one batch, in delivery order.
    Mutations(Vec<MutationRecord>),
    // Timer -> controller
    SettleElapsed {
        generation: Generation,
    },
    // User -> controller
    ToggleRegex,
    Click {
        node: NodeId,
    },
    // Network -> controller
    EnrichmentDone {
        control: ControlId,
        outcome: EnrichOutcome,
    },
}

/// Side effects the controller asks the host to perform.
#[derive(Debug, PartialEq, Eq)]
pub enum HostCommand {
    ScheduleSettle {
        delay: Duration,
        generation: Generation,
    },
    Notify(String),
    Reload,
    RegisterMenu {
        label: String,
    },
    Enrich {
        control: ControlId,
        text: String,
    },
}

pub struct Bus {
    pub evt_tx: Sender<HostEvent>, // shareable for workers and timers
    pub evt_rx: Receiver<HostEvent>,
}

impl Bus {
    pub fn new() -> Self {
        let (evt_tx, evt_rx) = mpsc::channel();
        Self { evt_tx, evt_rx }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
