//! Localization engine: page classification, tree walking, change-feed
//! handling and the controller that ties them to host events.

pub mod classify;
pub mod controller;
pub mod enrich;
pub mod feed;
pub mod prefs;
pub mod state;
pub mod walk;

pub use classify::{DocumentMarkers, classify, classify_raw};
pub use controller::{Controller, Phase};
pub use enrich::EnrichmentControls;
pub use prefs::{MemoryPreferences, PreferenceStore, PrefsError, TomlPreferences};
pub use state::EngineState;
pub use walk::{ElementRole, Walker};
