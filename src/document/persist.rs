use super::PlaybookDocument;
use crate::error::PersistError;
use crate::store::EntityStore;
use std::time::{Duration, Instant};

/// Where documents are saved. Implementations report failures; they never retry.
pub trait DocumentSink {
    fn save(&mut self, document: &PlaybookDocument) -> Result<(), PersistError>;
}

/// Writes pretty-printed JSON to a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: String,
}

impl JsonFileSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl DocumentSink for JsonFileSink {
    fn save(&mut self, document: &PlaybookDocument) -> Result<(), PersistError> {
        document.save(&self.path)?;
        Ok(())
    }
}

/// Keeps the last saved document in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    last: Option<PlaybookDocument>,
    saves: usize,
    unavailable: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following save fail with `reason`, or succeed again with `None`.
    pub fn set_unavailable(&mut self, reason: Option<&str>) {
        self.unavailable = reason.map(str::to_string);
    }

    pub fn last(&self) -> Option<&PlaybookDocument> {
        self.last.as_ref()
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl DocumentSink for MemorySink {
    fn save(&mut self, document: &PlaybookDocument) -> Result<(), PersistError> {
        if let Some(reason) = &self.unavailable {
            return Err(PersistError::Unavailable(reason.clone()));
        }
        self.last = Some(document.clone());
        self.saves += 1;
        Ok(())
    }
}

/// Persistence state shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing changed since the document was opened.
    Clean,
    /// Changes are waiting for the quiet period to pass.
    Dirty,
    Saved,
    /// The last save failed. The in-memory state is intact.
    Failed(String),
}

/// Debounces saves: a save runs once no local change has happened for the quiet period.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    quiet_period: Duration,
    last_change: Option<Instant>,
    status: SaveStatus,
}

impl SaveScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            last_change: None,
            status: SaveStatus::Clean,
        }
    }

    /// Records a local change and restarts the quiet period.
    pub fn note_change(&mut self, now: Instant) {
        self.last_change = Some(now);
        self.status = SaveStatus::Dirty;
    }

    pub fn due(&self, now: Instant) -> bool {
        self.last_change
            .is_some_and(|changed| now.saturating_duration_since(changed) >= self.quiet_period)
    }

    /// Saves the whole store if the quiet period has passed. A failure is recorded in the
    /// status and waits for the next change.
    pub fn run(
        &mut self,
        now: Instant,
        store: &EntityStore,
        sink: &mut dyn DocumentSink,
    ) -> &SaveStatus {
        if !self.due(now) {
            return &self.status;
        }
        self.last_change = None;
        self.status = match sink.save(&PlaybookDocument::from_store(store)) {
            Ok(()) => {
                tracing::debug!("playbook saved at revision {}", store.revision());
                SaveStatus::Saved
            }
            Err(e) => {
                tracing::warn!("saving the playbook failed: {}", e);
                SaveStatus::Failed(e.to_string())
            }
        };
        &self.status
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }
}
