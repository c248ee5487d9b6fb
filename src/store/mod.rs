//! The entity store: canonical scopes, nodes and links, and the single mutation path.
//!
//! Every change, whether it comes from a local gesture or from a collaborator, is a
//! [`Mutation`] passed to [`EntityStore::dispatch`]. Local changes additionally queue exactly
//! one outbound [`CollabMessage`] describing the same logical change.

mod apply;

pub(crate) use apply::{check_placement, rebuild_membership};

use crate::error::Rejection;
use crate::ids::{NodeId, ScopeId, new_scope_id};
use crate::model::{Attributes, Link, LinkType, Node, Scope, Section, Variable};
use crate::mutation::{
    CollabMessage, ContainerCollapse, LinkAdd, LinkDelete, Mutation, NodeAdd, NodeAttrChange,
    NodeDelete, NodeMove, NodeResize, ScopeAttrChange, VariableChange,
};
use std::collections::VecDeque;

/// Where a mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A gesture of the local participant. Gesture guards apply and an outbound message
    /// is queued.
    Local,
    /// A collaborator's change, already validated at its origin.
    Remote,
}

/// Result of a mutation. None of these is an error: rejected and missing-reference
/// mutations are no-ops.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    /// Valid, but the state already matched.
    Unchanged,
    /// Addressed an id or scope that does not exist.
    Missing,
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

/// Owns every scope of the open playbook plus the active-scope selection.
#[derive(Debug, Clone)]
pub struct EntityStore {
    scopes: Vec<Scope>,
    active: Option<ScopeId>,
    user_id: String,
    username: String,
    outbox: VecDeque<CollabMessage>,
    revision: u64,
}

impl EntityStore {
    pub fn new(user_id: &str, username: &str) -> Self {
        Self {
            scopes: Vec::new(),
            active: None,
            user_id: user_id.to_string(),
            username: username.to_string(),
            outbox: VecDeque::new(),
            revision: 0,
        }
    }

    // --- Scopes ---

    /// Creates a scope with its entry markers. The first scope becomes active.
    pub fn create_scope(&mut self, name: &str) -> ScopeId {
        let id = new_scope_id();
        self.insert_scope(Scope::new(id.clone(), name));
        id
    }

    /// Adds a fully built scope, replacing any scope with the same id.
    pub fn insert_scope(&mut self, scope: Scope) {
        if self.active.is_none() {
            self.active = Some(scope.id.clone());
        }
        match self.scopes.iter_mut().find(|s| s.id == scope.id) {
            Some(existing) => *existing = scope,
            None => self.scopes.push(scope),
        }
        self.revision += 1;
    }

    pub fn delete_scope(&mut self, id: &str) -> Outcome {
        let before = self.scopes.len();
        self.scopes.retain(|s| s.id != id);
        if self.scopes.len() == before {
            return Outcome::Missing;
        }
        if self.active.as_deref() == Some(id) {
            self.active = self.scopes.first().map(|s| s.id.clone());
        }
        self.revision += 1;
        Outcome::Applied
    }

    pub fn set_active_scope(&mut self, id: &str) -> Outcome {
        if self.scope(id).is_none() {
            return Outcome::Missing;
        }
        if self.active.as_deref() == Some(id) {
            return Outcome::Unchanged;
        }
        self.active = Some(id.to_string());
        Outcome::Applied
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope(&self, id: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.id == id)
    }

    pub(crate) fn scope_mut(&mut self, id: &str) -> Option<&mut Scope> {
        self.scopes.iter_mut().find(|s| s.id == id)
    }

    pub fn active_scope_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_scope(&self) -> Option<&Scope> {
        self.active.as_deref().and_then(|id| self.scope(id))
    }

    // --- The reducer ---

    /// Applies `mutation` to scope `scope_id`.
    ///
    /// Local mutations that apply queue one outbound message. Rejections and missing
    /// references are logged and leave the store untouched.
    pub fn dispatch(&mut self, scope_id: &str, mutation: Mutation, origin: Origin) -> Outcome {
        let Some(scope) = self.scopes.iter_mut().find(|s| s.id == scope_id) else {
            tracing::debug!("{} for unknown scope '{}' ignored", mutation.kind(), scope_id);
            return Outcome::Missing;
        };
        let outcome = apply::apply(scope, &mutation, origin);

        match &outcome {
            Outcome::Applied => {
                self.revision += 1;
                if origin == Origin::Local {
                    // Announce the node as stored, membership lists included.
                    let announced = match mutation {
                        Mutation::NodeAdd(p) => Mutation::NodeAdd(NodeAdd {
                            node: scope.stored_node(&p.node.id).cloned().unwrap_or(p.node),
                        }),
                        other => other,
                    };
                    self.emit(scope_id, &announced);
                }
            }
            Outcome::Unchanged => {}
            Outcome::Missing => {
                tracing::debug!("{} ({:?}) addressed a missing reference", mutation.kind(), origin);
            }
            Outcome::Rejected(reason) => {
                tracing::debug!("{} ({:?}) rejected: {}", mutation.kind(), origin, reason);
            }
        }
        outcome
    }

    fn emit(&mut self, scope_id: &str, mutation: &Mutation) {
        match CollabMessage::new(mutation, scope_id, &self.user_id, &self.username) {
            Ok(message) => self.outbox.push_back(message),
            Err(e) => tracing::warn!("could not encode outbound {}: {}", mutation.kind(), e),
        }
    }

    fn dispatch_local(&mut self, mutation: Mutation) -> Outcome {
        match self.active.clone() {
            Some(scope_id) => self.dispatch(&scope_id, mutation, Origin::Local),
            None => {
                tracing::debug!("{} without an active scope", mutation.kind());
                Outcome::Rejected(Rejection::NoActiveScope)
            }
        }
    }

    // --- Local mutators on the active scope ---

    pub fn add_node(&mut self, node: Node) -> Outcome {
        self.dispatch_local(Mutation::NodeAdd(NodeAdd { node }))
    }

    /// Moves a node. With `new_parent` set the node is placed into that
    /// `(container, section)` pair, `None` container meaning the scope canvas.
    pub fn move_node(
        &mut self,
        id: &str,
        x: f64,
        y: f64,
        new_parent: Option<(Option<&str>, Section)>,
    ) -> Outcome {
        self.dispatch_local(Mutation::NodeMove(NodeMove {
            node_id: id.to_string(),
            x,
            y,
            parent_id: new_parent.and_then(|(p, _)| p.map(str::to_string)),
            parent_section: new_parent.map(|(_, s)| s),
        }))
    }

    pub fn resize_node(&mut self, id: &str, width: f64, height: f64, x: f64, y: f64) -> Outcome {
        self.dispatch_local(Mutation::NodeResize(NodeResize {
            node_id: id.to_string(),
            width,
            height,
            x,
            y,
        }))
    }

    pub fn delete_node(&mut self, id: &str) -> Outcome {
        self.dispatch_local(Mutation::NodeDelete(NodeDelete {
            node_id: id.to_string(),
        }))
    }

    pub fn add_link(&mut self, link_type: LinkType, from: &str, to: &str) -> Outcome {
        self.dispatch_local(Mutation::LinkAdd(LinkAdd {
            link: Link::new(link_type, from, to),
        }))
    }

    pub fn delete_link(&mut self, id: &str) -> Outcome {
        self.dispatch_local(Mutation::LinkDelete(LinkDelete {
            link_id: id.to_string(),
        }))
    }

    pub fn update_attributes(&mut self, id: &str, patch: Attributes) -> Outcome {
        self.dispatch_local(Mutation::NodeAttrChange(NodeAttrChange {
            node_id: id.to_string(),
            attributes: patch,
        }))
    }

    pub fn update_scope(&mut self, name: Option<&str>, patch: Attributes) -> Outcome {
        self.dispatch_local(Mutation::ScopeAttrChange(ScopeAttrChange {
            name: name.map(str::to_string),
            attributes: patch,
        }))
    }

    pub fn set_variables(&mut self, variables: Vec<Variable>) -> Outcome {
        self.dispatch_local(Mutation::VariableChange(VariableChange { variables }))
    }

    /// Replaces the variable with the same key, or appends it.
    pub fn upsert_variable(&mut self, variable: Variable) -> Outcome {
        let Some(mut variables) = self.active_scope().map(|s| s.variables.clone()) else {
            return Outcome::Rejected(Rejection::NoActiveScope);
        };
        match variables.iter_mut().find(|v| v.key == variable.key) {
            Some(existing) => *existing = variable,
            None => variables.push(variable),
        }
        self.set_variables(variables)
    }

    pub fn remove_variable(&mut self, key: &str) -> Outcome {
        let Some(mut variables) = self.active_scope().map(|s| s.variables.clone()) else {
            return Outcome::Rejected(Rejection::NoActiveScope);
        };
        let before = variables.len();
        variables.retain(|v| v.key != key);
        if variables.len() == before {
            return Outcome::Missing;
        }
        self.set_variables(variables)
    }

    pub fn set_container_collapsed(&mut self, id: &str, collapsed: bool) -> Outcome {
        self.dispatch_local(Mutation::ContainerCollapse(ContainerCollapse {
            node_id: id.to_string(),
            collapsed,
        }))
    }

    /// Opens one sub-section of a container and closes its siblings.
    ///
    /// Accordion state is per participant and is never sent to collaborators.
    pub fn open_sub_section(&mut self, container: &str, section: Section) -> Outcome {
        if !section.is_block_level() {
            return Outcome::Rejected(Rejection::SectionKindMismatch {
                section,
                placement: "a container",
            });
        }
        let Some(scope) = self.active.clone().and_then(|id| self.scope_mut(&id)) else {
            return Outcome::Rejected(Rejection::NoActiveScope);
        };
        let Some(node) = scope.nodes.get_mut(container) else {
            return Outcome::Missing;
        };
        let Some(block) = node.block.as_mut() else {
            return Outcome::Rejected(Rejection::NotAContainer(container.to_string()));
        };
        if block.open_section == section {
            return Outcome::Unchanged;
        }
        block.open_section = section;
        self.revision += 1;
        Outcome::Applied
    }

    // --- Reads on the active scope ---

    pub fn node(&self, id: &str) -> Option<Node> {
        self.active_scope()
            .and_then(|s| s.node(id))
            .map(|n| n.into_owned())
    }

    pub fn children(&self, container: &str, section: Section) -> Vec<NodeId> {
        self.active_scope()
            .map(|s| s.children(container, section).to_vec())
            .unwrap_or_default()
    }

    pub fn links(&self) -> &[Link] {
        self.active_scope().map(|s| s.links()).unwrap_or(&[])
    }

    // --- Outbound messages ---

    /// Takes every queued outbound message, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<CollabMessage> {
        self.outbox.drain(..).collect()
    }

    pub fn pending_outbound(&self) -> usize {
        self.outbox.len()
    }

    /// Increments on every applied change; persistence uses it to detect dirty state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
