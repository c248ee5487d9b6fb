//! # Playgraph - Playbook Canvas Graph Engine
//!
//! **Playgraph** is the state engine behind a visual playbook editor. It owns the entity model
//! (tasks, containers with `primary`/`fallback`/`final` sub-sections, typed chain links and
//! plays), decides where dropped nodes land, keeps every chain a simple path, and merges
//! collaborators' edits into local state without breaking any of those rules.
//!
//! ## Core Workflow
//!
//! The engine has no process boundary of its own. A host rendering layer drives it:
//!
//! 1.  **Open a session**: Build an [`editor::Editor`] from an [`config::EngineConfig`], either
//!     empty or from a persisted [`document::PlaybookDocument`].
//! 2.  **Feed gestures**: Translate drags into [`placement::DragSession`] and
//!     [`placement::DropEvent`] values, or call the store mutators directly. Every applied
//!     local change queues exactly one outbound collaboration message.
//! 3.  **Feed collaborators**: Pass inbound messages to [`editor::Editor::receive`]. They go
//!     through the same reducer as local changes.
//! 4.  **Render and persist**: Draw [`editor::Editor::render`], ship
//!     [`editor::Editor::outbound`] to the transport, and call [`editor::Editor::tick`]
//!     periodically to expire highlights and run debounced saves.
//!
//! Rejected gestures are ordinary outcomes, not errors: every mutator returns an
//! [`store::Outcome`] and leaves the store untouched unless it applied.
//!
//! ## Quick Start
//!
//! ```rust
//! use playgraph::prelude::*;
//! use std::time::Instant;
//!
//! let config = EngineConfig::builder().grid_snap(true).local_actor("u-1", "amy").build();
//! let mut editor = Editor::new(config, "Web servers");
//! let now = Instant::now();
//!
//! let scope_id = editor.store().active_scope_id().unwrap().to_string();
//! let entry = entry_marker_id(&scope_id, Section::Main);
//!
//! editor.edit(now, |store| store.add_node(Node::task("install", "Install nginx")));
//! let outcome = editor.edit(now, |store| store.add_link(Section::Main, &entry, "install"));
//! assert!(outcome.is_applied());
//!
//! let scope = editor.store().active_scope().unwrap();
//! assert_eq!(chain_length(scope, &entry), 1);
//! assert_eq!(editor.outbound().len(), 2);
//! ```

pub mod accordion;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod links;
pub mod model;
pub mod mutation;
pub mod placement;
pub mod prelude;
pub mod store;
pub mod sync;
