//! Mutation commands and their collaboration wire format.
//!
//! Local gestures and inbound collaboration messages are both expressed as a [`Mutation`]
//! and applied by [`crate::store::EntityStore::dispatch`], so the two paths share one
//! implementation. On the wire a mutation travels inside a [`CollabMessage`] envelope whose
//! `update_type` names the kind and whose `data` carries the kind-specific payload.

use crate::ids::{LinkId, NodeId, ScopeId};
use crate::model::{Attributes, Link, Node, Section, Variable};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Every update kind the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateKind {
    NodeAdd,
    NodeMove,
    NodeDelete,
    NodeAttrChange,
    NodeResize,
    LinkAdd,
    LinkDelete,
    ScopeAttrChange,
    VariableChange,
    ContainerCollapse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAdd {
    pub node: Node,
}

/// Moves a node. Without `parent_section` only the coordinates change; with it the node is
/// placed into `(parent_id, parent_section)`, where `parent_id = None` is the scope canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMove {
    pub node_id: NodeId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_section: Option<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDelete {
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttrChange {
    pub node_id: NodeId,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResize {
    pub node_id: NodeId,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAdd {
    pub link: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDelete {
    pub link_id: LinkId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeAttrChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Replaces the whole ordered variable list (last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableChange {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCollapse {
    pub node_id: NodeId,
    pub collapsed: bool,
}

/// One logical change to a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    NodeAdd(NodeAdd),
    NodeMove(NodeMove),
    NodeDelete(NodeDelete),
    NodeAttrChange(NodeAttrChange),
    NodeResize(NodeResize),
    LinkAdd(LinkAdd),
    LinkDelete(LinkDelete),
    ScopeAttrChange(ScopeAttrChange),
    VariableChange(VariableChange),
    ContainerCollapse(ContainerCollapse),
}

impl Mutation {
    pub fn kind(&self) -> UpdateKind {
        match self {
            Mutation::NodeAdd(_) => UpdateKind::NodeAdd,
            Mutation::NodeMove(_) => UpdateKind::NodeMove,
            Mutation::NodeDelete(_) => UpdateKind::NodeDelete,
            Mutation::NodeAttrChange(_) => UpdateKind::NodeAttrChange,
            Mutation::NodeResize(_) => UpdateKind::NodeResize,
            Mutation::LinkAdd(_) => UpdateKind::LinkAdd,
            Mutation::LinkDelete(_) => UpdateKind::LinkDelete,
            Mutation::ScopeAttrChange(_) => UpdateKind::ScopeAttrChange,
            Mutation::VariableChange(_) => UpdateKind::VariableChange,
            Mutation::ContainerCollapse(_) => UpdateKind::ContainerCollapse,
        }
    }

    /// Ids a remote application of this mutation should visibly acknowledge.
    ///
    /// Scope-wide changes (`scope_attr_change`, `variable_change`) return an empty list; the
    /// caller tags the scope itself.
    pub fn targets(&self) -> Vec<String> {
        match self {
            Mutation::NodeAdd(p) => vec![p.node.id.clone()],
            Mutation::NodeMove(p) => vec![p.node_id.clone()],
            Mutation::NodeDelete(p) => vec![p.node_id.clone()],
            Mutation::NodeAttrChange(p) => vec![p.node_id.clone()],
            Mutation::NodeResize(p) => vec![p.node_id.clone()],
            Mutation::LinkAdd(p) => vec![p.link.id.clone(), p.link.from.clone(), p.link.to.clone()],
            Mutation::LinkDelete(p) => vec![p.link_id.clone()],
            Mutation::ContainerCollapse(p) => vec![p.node_id.clone()],
            Mutation::ScopeAttrChange(_) | Mutation::VariableChange(_) => Vec::new(),
        }
    }

    /// Serializes the kind-specific payload.
    pub fn encode(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Mutation::NodeAdd(p) => serde_json::to_value(p),
            Mutation::NodeMove(p) => serde_json::to_value(p),
            Mutation::NodeDelete(p) => serde_json::to_value(p),
            Mutation::NodeAttrChange(p) => serde_json::to_value(p),
            Mutation::NodeResize(p) => serde_json::to_value(p),
            Mutation::LinkAdd(p) => serde_json::to_value(p),
            Mutation::LinkDelete(p) => serde_json::to_value(p),
            Mutation::ScopeAttrChange(p) => serde_json::to_value(p),
            Mutation::VariableChange(p) => serde_json::to_value(p),
            Mutation::ContainerCollapse(p) => serde_json::to_value(p),
        }
    }

    /// Parses the payload of a known kind.
    pub fn decode(kind: UpdateKind, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            UpdateKind::NodeAdd => Mutation::NodeAdd(serde_json::from_value(data)?),
            UpdateKind::NodeMove => Mutation::NodeMove(serde_json::from_value(data)?),
            UpdateKind::NodeDelete => Mutation::NodeDelete(serde_json::from_value(data)?),
            UpdateKind::NodeAttrChange => Mutation::NodeAttrChange(serde_json::from_value(data)?),
            UpdateKind::NodeResize => Mutation::NodeResize(serde_json::from_value(data)?),
            UpdateKind::LinkAdd => Mutation::LinkAdd(serde_json::from_value(data)?),
            UpdateKind::LinkDelete => Mutation::LinkDelete(serde_json::from_value(data)?),
            UpdateKind::ScopeAttrChange => {
                Mutation::ScopeAttrChange(serde_json::from_value(data)?)
            }
            UpdateKind::VariableChange => Mutation::VariableChange(serde_json::from_value(data)?),
            UpdateKind::ContainerCollapse => {
                Mutation::ContainerCollapse(serde_json::from_value(data)?)
            }
        })
    }
}

/// Collaboration message as exchanged with the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollabMessage {
    pub update_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    /// Scope the change applies to; receivers fall back to their active scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<ScopeId>,
}

impl CollabMessage {
    pub fn new(
        mutation: &Mutation,
        scope_id: &str,
        user_id: &str,
        username: &str,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            update_type: mutation.kind().to_string(),
            data: mutation.encode()?,
            user_id: user_id.to_string(),
            username: username.to_string(),
            scope_id: Some(scope_id.to_string()),
        })
    }
}
