//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from the playgraph
//! crate. Import this module to get the session, the store and the model types without
//! importing each one individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use playgraph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let document = PlaybookDocument::from_file("path/to/playbook.json")?;
//! let editor = Editor::open(EngineConfig::default(), document);
//!
//! for scope in editor.store().scopes() {
//!     println!("{}: {} orphan(s)", scope.name, orphans(scope).len());
//! }
//! # Ok(())
//! # }
//! ```

// Session and configuration
pub use crate::config::{EngineConfig, EngineConfigBuilder};
pub use crate::editor::Editor;

// Store and mutations
pub use crate::mutation::{CollabMessage, Mutation, UpdateKind};
pub use crate::store::{EntityStore, Origin, Outcome};

// Model
pub use crate::ids::{NodeId, ScopeId, entry_marker_id};
pub use crate::model::{Link, LinkType, Node, NodeKind, Panel, Scope, Section, Variable};

// Engines
pub use crate::geometry::{Point, Size, layout, rendered_size};
pub use crate::links::{chain_length, chain_members, is_orphan, orphans};
pub use crate::placement::{DragSession, DropEvent, DropPlan, DropTarget, NodeTemplate};
pub use crate::sync::CollabSync;

// Persistence
pub use crate::document::{DocumentSink, JsonFileSink, PlaybookDocument, SaveStatus};

// Error types
pub use crate::error::{DocumentError, PersistError, Rejection, SyncError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
