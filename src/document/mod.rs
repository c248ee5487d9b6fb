//! The persisted form of a playbook.
//!
//! A document is flat: every node and link carries the id of the scope it belongs to, and
//! container collapse state lives in two id lists. Entry markers are never written; they
//! are regenerated from scope and container ids on load.

mod persist;

pub use persist::{DocumentSink, JsonFileSink, MemorySink, SaveScheduler, SaveStatus};

use crate::error::DocumentError;
use crate::ids::{LinkId, NodeId, ScopeId, is_entry_marker_id};
use crate::model::{
    Attributes, BlockState, Link, LinkType, Node, NodeKind, Scope, Section, SourceRef, Variable,
    VariableType,
};
use crate::store::{EntityStore, rebuild_membership};
use ahash::AHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocScope {
    pub id: ScopeId,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Ordered member ids of a container's three sub-sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMembers {
    #[serde(default)]
    pub primary: Vec<NodeId>,
    #[serde(default)]
    pub fallback: Vec<NodeId>,
    #[serde(default, rename = "final")]
    pub finally: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocNode {
    pub scope_id: ScopeId,
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<SourceRef>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default = "default_section")]
    pub parent_section: Section,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<DocMembers>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system: bool,
}

fn default_section() -> Section {
    Section::Main
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocLink {
    pub scope_id: ScopeId,
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocVariable {
    pub scope_id: ScopeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_scope: Option<ScopeId>,
    #[serde(default)]
    pub scopes: Vec<DocScope>,
    #[serde(default)]
    pub nodes: Vec<DocNode>,
    #[serde(default)]
    pub links: Vec<DocLink>,
    #[serde(default)]
    pub variables: Vec<DocVariable>,
    /// Ids of collapsed containers.
    #[serde(default)]
    pub collapsed_blocks: Vec<NodeId>,
    /// `<containerId>:<section>` for every closed container sub-section.
    #[serde(default)]
    pub collapsed_sections: Vec<String>,
}

fn section_key(container: &str, section: Section) -> String {
    format!("{}:{}", container, section)
}

impl PlaybookDocument {
    /// Flattens every scope of `store`. Nodes are written in id order.
    pub fn from_store(store: &EntityStore) -> Self {
        let mut doc = PlaybookDocument {
            active_scope: store.active_scope_id().map(str::to_string),
            ..Self::default()
        };
        for scope in store.scopes() {
            doc.scopes.push(DocScope {
                id: scope.id.clone(),
                name: scope.name.clone(),
                attributes: scope.attributes.clone(),
            });

            let nodes = scope
                .nodes()
                .filter(|n| !n.is_entry_marker())
                .sorted_by(|a, b| a.id.cmp(&b.id));
            for node in nodes {
                if let Some(block) = &node.block {
                    if block.collapsed {
                        doc.collapsed_blocks.push(node.id.clone());
                    }
                    doc.collapsed_sections.extend(
                        Section::BLOCK_LEVEL
                            .into_iter()
                            .filter(|s| *s != block.open_section)
                            .map(|s| section_key(&node.id, s)),
                    );
                }
                doc.nodes.push(DocNode::from_node(&scope.id, node));
            }

            doc.links.extend(scope.links().iter().map(|link| DocLink {
                scope_id: scope.id.clone(),
                id: link.id.clone(),
                from: link.from.clone(),
                to: link.to.clone(),
                link_type: link.link_type,
            }));

            doc.variables.extend(scope.variables.iter().map(|v| DocVariable {
                scope_id: scope.id.clone(),
                name: v.key.clone(),
                value: v.value.clone(),
                var_type: v.var_type,
                required: v.required,
                default: v.default.clone(),
                pattern: v.validation_pattern.clone(),
            }));
        }
        doc
    }

    /// Rebuilds an entity store, normalizing whatever the document got wrong.
    ///
    /// Entry markers are regenerated; nodes of unknown scopes, misplaced parents and
    /// dangling or chain-breaking links are dropped or repaired with a warning.
    pub fn into_store(self, user_id: &str, username: &str) -> EntityStore {
        let mut store = EntityStore::new(user_id, username);
        let collapsed_blocks: AHashSet<&str> =
            self.collapsed_blocks.iter().map(String::as_str).collect();
        let collapsed_sections: AHashSet<&str> =
            self.collapsed_sections.iter().map(String::as_str).collect();

        for doc_scope in &self.scopes {
            let mut scope = Scope::new(doc_scope.id.clone(), doc_scope.name.clone());
            scope.attributes = doc_scope.attributes.clone();
            let scope_id = scope.id.clone();

            for doc_node in self.nodes.iter().filter(|n| n.scope_id == scope_id) {
                if doc_node.kind == NodeKind::EntryMarker || is_entry_marker_id(&doc_node.id) {
                    tracing::debug!("skipping stored entry marker '{}'", doc_node.id);
                    continue;
                }
                let mut node = doc_node.to_node();
                if let Some(block) = node.block.as_mut() {
                    block.collapsed = collapsed_blocks.contains(node.id.as_str());
                    block.open_section = Section::BLOCK_LEVEL
                        .into_iter()
                        .find(|s| !collapsed_sections.contains(section_key(&node.id, *s).as_str()))
                        .unwrap_or(Section::Primary);
                }
                scope.nodes.insert(node.id.clone(), node);
            }

            repair_placements(&mut scope);
            let containers: Vec<NodeId> = scope
                .nodes()
                .filter(|n| n.is_container())
                .map(|n| n.id.clone())
                .sorted()
                .collect();
            for container in &containers {
                rebuild_membership(&mut scope, container);
            }

            for doc_link in self.links.iter().filter(|l| l.scope_id == scope_id) {
                restore_link(&mut scope, doc_link);
            }

            let mut seen = AHashSet::new();
            for doc_var in self.variables.iter().filter(|v| v.scope_id == scope_id) {
                if !seen.insert(doc_var.name.clone()) {
                    tracing::warn!("dropping duplicate variable '{}'", doc_var.name);
                    continue;
                }
                scope.variables.push(doc_var.to_variable());
            }

            store.insert_scope(scope);
        }

        for orphaned in self
            .nodes
            .iter()
            .filter(|n| !self.scopes.iter().any(|s| s.id == n.scope_id))
        {
            tracing::warn!("node '{}' names unknown scope '{}'", orphaned.id, orphaned.scope_id);
        }
        if let Some(active) = &self.active_scope {
            store.set_active_scope(active);
        }
        store
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the document to `path` as pretty-printed JSON.
    pub fn save(&self, path: &str) -> Result<(), DocumentError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| DocumentError::Io {
            path: path.to_string(),
            source,
        })
    }

    /// Loads a document from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, DocumentError> {
        let json = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl DocNode {
    fn from_node(scope_id: &str, node: &Node) -> Self {
        Self {
            scope_id: scope_id.to_string(),
            id: node.id.clone(),
            kind: node.kind,
            display_name: node.display_name.clone(),
            source_ref: node.source_ref.clone(),
            x: node.x,
            y: node.y,
            width: node.width,
            height: node.height,
            parent_id: node.parent_id.clone(),
            parent_section: node.parent_section,
            attributes: node.attributes.clone(),
            members: node.block.as_ref().map(|b| DocMembers {
                primary: b.primary.clone(),
                fallback: b.fallback.clone(),
                finally: b.finally.clone(),
            }),
            system: node.system,
        }
    }

    fn to_node(&self) -> Node {
        let block = match self.kind {
            NodeKind::Container => {
                let members = self.members.clone().unwrap_or_default();
                Some(BlockState {
                    primary: members.primary,
                    fallback: members.fallback,
                    finally: members.finally,
                    ..BlockState::default()
                })
            }
            _ => None,
        };
        Node {
            id: self.id.clone(),
            kind: self.kind,
            display_name: self.display_name.clone(),
            source_ref: self.source_ref.clone(),
            x: if self.x.is_finite() { self.x } else { 0.0 },
            y: if self.y.is_finite() { self.y } else { 0.0 },
            width: self.width.filter(|w| w.is_finite() && *w > 0.0),
            height: self.height.filter(|h| h.is_finite() && *h > 0.0),
            parent_id: self.parent_id.clone(),
            parent_section: self.parent_section,
            attributes: self.attributes.clone(),
            block,
            system: self.system,
        }
    }
}

impl DocVariable {
    fn to_variable(&self) -> Variable {
        let mut variable = Variable {
            key: self.name.clone(),
            value: self.value.clone(),
            var_type: self.var_type,
            required: self.required,
            default: self.default.clone(),
            validation_pattern: self.pattern.clone(),
        };
        if let Err(rejection) = variable.check_pattern() {
            tracing::warn!("dropping pattern: {}", rejection);
            variable.validation_pattern = None;
        }
        variable
    }
}

/// Moves nodes whose parent is missing, not a container, of the wrong section kind or
/// part of a containment cycle to the scope's main section.
fn repair_placements(scope: &mut Scope) {
    let ids: Vec<NodeId> = scope.nodes().map(|n| n.id.clone()).sorted().collect();
    for id in ids {
        let Some(node) = scope.stored_node(&id) else {
            continue;
        };
        let valid = match node.parent_id.as_deref() {
            None => node.parent_section.is_scope_level(),
            Some(parent) => {
                node.parent_section.is_block_level()
                    && scope.stored_node(parent).is_some_and(Node::is_container)
                    && !scope.is_self_or_ancestor(&id, parent)
            }
        };
        if valid {
            continue;
        }
        tracing::warn!(
            "node '{}' had an invalid placement {:?}/{}, moved to the main section",
            id,
            node.parent_id,
            node.parent_section
        );
        if let Some(node) = scope.nodes.get_mut(&id) {
            node.parent_id = None;
            node.parent_section = Section::Main;
        }
    }
}

/// Re-attaches a stored link unless it dangles, is degenerate, or would take a chain slot
/// already claimed by an earlier link. Placement rules are not re-checked: a collaborator's
/// move may legitimately leave a link spanning two sections.
fn restore_link(scope: &mut Scope, doc_link: &DocLink) {
    let link = Link {
        id: doc_link.id.clone(),
        from: doc_link.from.clone(),
        to: doc_link.to.clone(),
        link_type: doc_link.link_type,
    };
    if !scope.contains(&link.from) || !scope.contains(&link.to) {
        tracing::warn!("dropping link '{}': missing endpoint", link.id);
        return;
    }
    if link.from == link.to || is_entry_marker_id(&link.to) {
        tracing::warn!("dropping link '{}': {} -> {} cannot be chained", link.id, link.from, link.to);
        return;
    }
    let taken = scope.links().iter().any(|l| {
        l.id == link.id || (l.link_type == link.link_type && (l.from == link.from || l.to == link.to))
    });
    if taken {
        tracing::warn!("dropping link '{}': chain slot already taken", link.id);
        return;
    }
    scope.links.push(link);
}
