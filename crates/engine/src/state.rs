use crate::classify::{DocumentMarkers, classify};
use core_types::{Location, PageContext};
use dom::{Document, Selector};
use rules::{Resolver, RuleStore};

/// Everything scoped to the current navigation.
///
/// Built wholesale by [`EngineState::derive`]; only the regex switch is
/// ever changed in place.
#[derive(Clone, Debug, Default)]
pub struct EngineState {
    pub location: Option<Location>,
    pub context: Option<PageContext>,
    pub regex_enabled: bool,
    pub ignore: Vec<Selector>,
    pub ignore_mutation: Vec<Selector>,
    pub text_sensitive: bool,
}

impl EngineState {
    pub fn derive(store: &RuleStore, doc: &Document, regex_enabled: bool) -> Self {
        let location = doc.location().cloned();
        let context = location.as_ref().and_then(|location| {
            let markers = DocumentMarkers::from_document(doc);
            classify(store, location, &markers)
        });
        let conf = store.conf();
        let (ignore, ignore_mutation, text_sensitive) = match &context {
            Some(context) => (
                conf.ignore_for(context),
                conf.ignore_mutation_for(context),
                conf.is_text_sensitive(context),
            ),
            None => (Vec::new(), Vec::new(), false),
        };
        Self {
            location,
            context,
            regex_enabled,
            ignore,
            ignore_mutation,
            text_sensitive,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.context.is_none()
    }

    pub fn resolver<'a>(&'a self, store: &'a RuleStore) -> Resolver<'a> {
        Resolver::new(store, self.context.as_ref(), self.regex_enabled)
    }

    /// Selectors that keep a node out of reactive re-processing: the
    /// traversal list plus the mutation-only list.
    pub fn reactive_ignores(&self) -> impl Iterator<Item = &Selector> {
        self.ignore.iter().chain(self.ignore_mutation.iter())
    }
}
