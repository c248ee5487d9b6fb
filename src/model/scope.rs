use super::{Attributes, Link, Node, Section};
use crate::error::Rejection;
use crate::ids::{NodeId, ScopeId, parse_entry_marker_id};
use ahash::AHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VariableType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    List,
    Dict,
}

/// A play variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_pattern: Option<String>,
}

impl Variable {
    pub fn new(key: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            key: key.into(),
            value: None,
            var_type,
            required: false,
            default: None,
            validation_pattern: None,
        }
    }

    /// Checks that the validation pattern, if any, compiles.
    pub fn check_pattern(&self) -> Result<(), Rejection> {
        match &self.validation_pattern {
            Some(pattern) => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| Rejection::InvalidPattern {
                    key: self.key.clone(),
                    message: e.to_string(),
                }),
            None => Ok(()),
        }
    }

    /// Whether `candidate` satisfies the validation pattern. No pattern accepts everything.
    pub fn validate(&self, candidate: &str) -> bool {
        match &self.validation_pattern {
            Some(pattern) => Regex::new(pattern).is_ok_and(|re| re.is_match(candidate)),
            None => true,
        }
    }
}

/// A play: one node table, one link list and an ordered variable list.
///
/// Nodes live in a flat table keyed by id; containment is expressed through
/// `parent_id`/`parent_section` on the child and the ordered lists in the parent's
/// [`super::BlockState`]. Scope-level entry markers are materialized in the table,
/// container sub-section markers are synthesized on lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub id: ScopeId,
    pub name: String,
    pub attributes: Attributes,
    pub variables: Vec<Variable>,
    pub(crate) nodes: AHashMap<NodeId, Node>,
    pub(crate) links: Vec<Link>,
}

impl Scope {
    /// A scope with its four scope-level entry markers in place.
    pub fn new(id: impl Into<ScopeId>, name: impl Into<String>) -> Self {
        let mut scope = Self {
            id: id.into(),
            name: name.into(),
            attributes: Attributes::new(),
            variables: Vec::new(),
            nodes: AHashMap::new(),
            links: Vec::new(),
        };
        for section in Section::SCOPE_LEVEL {
            let marker = Node::entry_marker(&scope.id, section);
            scope.nodes.insert(marker.id.clone(), marker);
        }
        scope
    }

    /// Looks a node up, synthesizing container sub-section entry markers on demand.
    pub fn node(&self, id: &str) -> Option<Cow<'_, Node>> {
        if let Some(node) = self.nodes.get(id) {
            return Some(Cow::Borrowed(node));
        }
        let (owner, section) = parse_entry_marker_id(id)?;
        if !section.is_block_level() {
            return None;
        }
        self.nodes
            .get(owner)
            .filter(|n| n.is_container())
            .map(|_| Cow::Owned(Node::entry_marker(owner, section)))
    }

    /// Stored nodes only; synthesized markers are not included.
    pub fn stored_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn links_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.from == id)
    }

    pub fn links_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.to == id)
    }

    /// Whether any link, of any type, starts or ends at `id`.
    pub fn has_links(&self, id: &str) -> bool {
        self.links.iter().any(|l| l.touches(id))
    }

    /// Ordered member ids of a container sub-section.
    pub fn children(&self, container: &str, section: Section) -> &[NodeId] {
        self.nodes
            .get(container)
            .and_then(|n| n.block.as_ref())
            .map(|b| b.members(section))
            .unwrap_or(&[])
    }

    /// Ids of the nodes placed directly in a scope-level section, sorted for stable output.
    pub fn section_members(&self, section: Section) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.is_none() && n.parent_section == section)
            .map(|n| n.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Whether `ancestor` is `id` itself or one of the containers enclosing it.
    pub fn is_self_or_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut current = Some(id.to_string());
        let mut hops = 0;
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.nodes.len() + 1 {
                tracing::warn!("containment chain of '{}' loops, stopping", id);
                return false;
            }
            current = self.node(&cur).and_then(|n| n.parent_id.clone());
        }
        false
    }

    /// Human-readable descriptions of every broken membership or chain rule. Empty for a
    /// consistent scope.
    pub fn violations(&self) -> Vec<String> {
        let mut found = Vec::new();
        for node in self.nodes.values() {
            if let Some(block) = &node.block {
                for (section, member) in block.all_members() {
                    match self.nodes.get(member) {
                        Some(child) if child.placement() == (Some(node.id.as_str()), section) => {}
                        _ => found.push(format!(
                            "'{}' is listed in {}/{} but does not live there",
                            member, node.id, section
                        )),
                    }
                }
                let listed = block.all_members().filter(|(_, m)| *m == &node.id).count();
                if listed > 0 {
                    found.push(format!("container '{}' lists itself", node.id));
                }
            }
            if let Some(parent) = node.parent_id.as_deref().filter(|_| !node.is_entry_marker()) {
                let listed = self
                    .nodes
                    .get(parent)
                    .and_then(|p| p.block.as_ref())
                    .map(|b| b.members(node.parent_section).iter().filter(|m| **m == node.id).count())
                    .unwrap_or(0);
                if listed != 1 {
                    found.push(format!(
                        "'{}' lives in {}/{} but is listed {} time(s)",
                        node.id, parent, node.parent_section, listed
                    ));
                }
            }
        }
        let mut slots: AHashMap<(Section, &str, bool), &str> = AHashMap::new();
        for link in &self.links {
            for (endpoint, outgoing) in [(link.from.as_str(), true), (link.to.as_str(), false)] {
                if let Some(previous) = slots.insert((link.link_type, endpoint, outgoing), &link.id) {
                    found.push(format!(
                        "'{}' is the {} of both '{}' and '{}'",
                        endpoint,
                        if outgoing { "source" } else { "target" },
                        previous,
                        link.id
                    ));
                }
            }
        }
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::entry_marker_id;

    #[test]
    fn test_new_scope_materializes_scope_markers() {
        let scope = Scope::new("play-1", "Web servers");
        assert_eq!(scope.node_count(), 4);
        for section in Section::SCOPE_LEVEL {
            let marker = scope.stored_node(&entry_marker_id("play-1", section)).unwrap();
            assert!(marker.is_entry_marker());
            assert_eq!(marker.placement(), (None, section));
        }
    }

    #[test]
    fn test_sub_section_markers_are_synthesized() {
        let mut scope = Scope::new("play-1", "p");
        scope
            .nodes
            .insert("b1".into(), Node::container("b1", "Block"));

        let marker = scope.node("b1-rescue-start");
        assert!(marker.is_none(), "aliases are not part of the id scheme");

        let marker = scope.node("b1-primary-start").unwrap();
        assert!(matches!(marker, Cow::Owned(_)));
        assert_eq!(marker.parent_id.as_deref(), Some("b1"));
        assert!(scope.stored_node("b1-primary-start").is_none());

        assert!(scope.node("missing-primary-start").is_none());
    }

    #[test]
    fn test_variable_pattern_validation() {
        let mut var = Variable::new("port", VariableType::Int);
        assert!(var.validate("anything"));

        var.validation_pattern = Some(r"^\d+$".into());
        assert!(var.check_pattern().is_ok());
        assert!(var.validate("8080"));
        assert!(!var.validate("http"));

        var.validation_pattern = Some("(".into());
        assert!(matches!(
            var.check_pattern(),
            Err(Rejection::InvalidPattern { .. })
        ));
        assert!(!var.validate("8080"));
    }
}
