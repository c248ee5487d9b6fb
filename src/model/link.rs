use super::LinkType;
use crate::ids::{LinkId, NodeId, link_id};
use serde::{Deserialize, Serialize};

/// A directed edge in the chain namespace of its `link_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

impl Link {
    pub fn new(link_type: LinkType, from: &str, to: &str) -> Self {
        Self {
            id: link_id(link_type, from, to),
            from: from.to_string(),
            to: to.to_string(),
            link_type,
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }

    /// Same type, endpoints and direction, regardless of id.
    pub fn same_edge(&self, other: &Link) -> bool {
        self.link_type == other.link_type && self.from == other.from && self.to == other.to
    }
}
