//! Identifier aliases and the derivation rules for synthetic ids.
//!
//! Entry markers are addressed by a deterministic id built from the id of their owner (the
//! scope for scope-level sections, the container for sub-sections) and the section name.
//! Every call site goes through [`entry_marker_id`] and [`parse_entry_marker_id`].

use crate::model::{LinkType, Section};
use std::str::FromStr;
use uuid::Uuid;

pub type NodeId = String;
pub type LinkId = String;
pub type ScopeId = String;

const ENTRY_MARKER_SUFFIX: &str = "-start";

/// Builds the id of the entry marker that starts `section` of `owner`.
pub fn entry_marker_id(owner: &str, section: Section) -> NodeId {
    format!("{}-{}{}", owner, section, ENTRY_MARKER_SUFFIX)
}

/// Splits an entry-marker id back into its owner id and section.
///
/// Returns `None` for ids that do not follow the entry-marker scheme.
pub fn parse_entry_marker_id(id: &str) -> Option<(&str, Section)> {
    let stem = id.strip_suffix(ENTRY_MARKER_SUFFIX)?;
    let (owner, section) = stem.rsplit_once('-')?;
    if owner.is_empty() {
        return None;
    }
    // Only canonical section names take part in the id scheme, never the aliases.
    Section::from_str(section)
        .ok()
        .filter(|s| s.to_string() == section)
        .map(|s| (owner, s))
}

pub fn is_entry_marker_id(id: &str) -> bool {
    parse_entry_marker_id(id).is_some()
}

/// Deterministic link id: one link per `(type, from, to)` triple.
pub fn link_id(link_type: LinkType, from: &str, to: &str) -> LinkId {
    format!("{}-{}-{}", link_type, from, to)
}

pub fn new_node_id() -> NodeId {
    format!("node-{}", Uuid::new_v4())
}

pub fn new_scope_id() -> ScopeId {
    format!("play-{}", Uuid::new_v4())
}
