//! One participant's editing session: the store plus everything around it.

use crate::accordion::Accordion;
use crate::config::EngineConfig;
use crate::document::{DocumentSink, PlaybookDocument, SaveScheduler, SaveStatus};
use crate::geometry::{RenderSection, layout};
use crate::model::{Panel, Section};
use crate::mutation::CollabMessage;
use crate::placement::{self, DragSession, DropEvent, NodeTemplate, PaletteDrop};
use crate::store::{EntityStore, Outcome};
use crate::sync::CollabSync;
use std::time::Instant;

/// Bundles the entity store with collaboration sync, accordion state and debounced saving.
///
/// Local gestures go through [`Editor::edit`] or the drop helpers so applied changes restart
/// the save quiet period. Inbound messages go through [`Editor::receive`].
#[derive(Debug)]
pub struct Editor {
    config: EngineConfig,
    store: EntityStore,
    sync: CollabSync,
    accordion: Accordion,
    scheduler: SaveScheduler,
}

impl Editor {
    /// An empty session with one scope named `scope_name`.
    pub fn new(config: EngineConfig, scope_name: &str) -> Self {
        let mut store = EntityStore::new(&config.local_actor, &config.local_username);
        store.create_scope(scope_name);
        Self::with_store(config, store)
    }

    /// Opens a persisted document.
    pub fn open(config: EngineConfig, document: PlaybookDocument) -> Self {
        let store = document.into_store(&config.local_actor, &config.local_username);
        Self::with_store(config, store)
    }

    fn with_store(config: EngineConfig, store: EntityStore) -> Self {
        Self {
            sync: CollabSync::new(&config),
            scheduler: SaveScheduler::new(config.save_quiet_period()),
            accordion: Accordion::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn sync(&self) -> &CollabSync {
        &self.sync
    }

    pub fn accordion(&self) -> &Accordion {
        &self.accordion
    }

    /// Runs a local change against the store.
    pub fn edit<F>(&mut self, now: Instant, change: F) -> Outcome
    where
        F: FnOnce(&mut EntityStore) -> Outcome,
    {
        let outcome = change(&mut self.store);
        self.note(now, &outcome);
        outcome
    }

    pub fn drop_node(&mut self, now: Instant, drag: &DragSession, drop: &DropEvent) -> Outcome {
        let outcome = placement::drop_node(&mut self.store, &self.config, drag, drop);
        self.note(now, &outcome);
        outcome
    }

    pub fn drop_from_palette(
        &mut self,
        now: Instant,
        template: &NodeTemplate,
        drag: &DragSession,
        drop: &DropEvent,
    ) -> PaletteDrop {
        let result =
            placement::drop_from_palette(&mut self.store, &self.config, template, drag, drop);
        self.note(now, &result.outcome);
        result
    }

    /// Opens a container sub-section. Not shared with collaborators, but saved.
    pub fn open_sub_section(&mut self, now: Instant, container: &str, section: Section) -> Outcome {
        let outcome = self.store.open_sub_section(container, section);
        self.note(now, &outcome);
        outcome
    }

    pub fn open_section(&mut self, section: Section) -> bool {
        self.accordion.open(section)
    }

    pub fn toggle_panel(&mut self, panel: Panel) -> bool {
        self.accordion.toggle_panel(panel)
    }

    fn note(&mut self, now: Instant, outcome: &Outcome) {
        if outcome.is_applied() {
            self.scheduler.note_change(now);
        }
    }

    /// Applies a collaborator's message.
    pub fn receive(&mut self, message: &CollabMessage, now: Instant) -> Outcome {
        self.sync.apply_remote_update(&mut self.store, message, now)
    }

    /// Outbound messages produced by local changes, oldest first.
    pub fn outbound(&mut self) -> Vec<CollabMessage> {
        self.store.drain_outbox()
    }

    /// Render tree of the active scope.
    pub fn render(&self) -> Vec<RenderSection> {
        self.store
            .active_scope()
            .map(|scope| layout(scope, &self.accordion))
            .unwrap_or_default()
    }

    pub fn document(&self) -> PlaybookDocument {
        PlaybookDocument::from_store(&self.store)
    }

    /// Expires highlights and runs a save if one is due.
    pub fn tick(&mut self, now: Instant, sink: &mut dyn DocumentSink) -> &SaveStatus {
        self.sync.expire_highlights(now);
        self.scheduler.run(now, &self.store, sink)
    }

    pub fn save_status(&self) -> &SaveStatus {
        self.scheduler.status()
    }
}
