use super::Section;
use crate::ids::{NodeId, entry_marker_id};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Opaque per-node attribute bag (conditionals, loops, privilege escalation, delegation).
pub type Attributes = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Task,
    Container,
    EntryMarker,
}

/// Namespace and name of the capability a task invokes. Carried, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub namespace: String,
    pub name: String,
}

/// Membership and display state owned by a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    #[serde(default)]
    pub primary: Vec<NodeId>,
    #[serde(default)]
    pub fallback: Vec<NodeId>,
    #[serde(default, rename = "final")]
    pub finally: Vec<NodeId>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default = "default_open_section")]
    pub open_section: Section,
}

fn default_open_section() -> Section {
    Section::Primary
}

impl Default for BlockState {
    fn default() -> Self {
        Self {
            primary: Vec::new(),
            fallback: Vec::new(),
            finally: Vec::new(),
            collapsed: false,
            open_section: Section::Primary,
        }
    }
}

impl BlockState {
    /// Ordered member ids of a sub-section. Scope-level sections have no members here.
    pub fn members(&self, section: Section) -> &[NodeId] {
        match section {
            Section::Primary => &self.primary,
            Section::Fallback => &self.fallback,
            Section::Final => &self.finally,
            _ => &[],
        }
    }

    pub fn members_mut(&mut self, section: Section) -> Option<&mut Vec<NodeId>> {
        match section {
            Section::Primary => Some(&mut self.primary),
            Section::Fallback => Some(&mut self.fallback),
            Section::Final => Some(&mut self.finally),
            _ => None,
        }
    }

    /// Iterates `(section, member)` pairs over all three sub-sections.
    pub fn all_members(&self) -> impl Iterator<Item = (Section, &NodeId)> {
        Section::BLOCK_LEVEL
            .into_iter()
            .flat_map(move |s| self.members(s).iter().map(move |id| (s, id)))
    }

    /// Removes `id` from every sub-section list. Returns whether anything was removed.
    pub fn remove_member(&mut self, id: &str) -> bool {
        let mut removed = false;
        for list in [&mut self.primary, &mut self.fallback, &mut self.finally] {
            let before = list.len();
            list.retain(|m| m != id);
            removed |= list.len() != before;
        }
        removed
    }
}

/// A task, container or entry marker placed on the canvas.
///
/// `x`/`y` are relative to the content area of the section the node lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
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
    pub parent_section: Section,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockState>,
    /// System containers cannot be deleted.
    #[serde(default)]
    pub system: bool,
}

impl Node {
    fn bare(id: impl Into<NodeId>, kind: NodeKind, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: display_name.into(),
            source_ref: None,
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            parent_id: None,
            parent_section: Section::Main,
            attributes: Attributes::new(),
            block: None,
            system: false,
        }
    }

    pub fn task(id: impl Into<NodeId>, display_name: impl Into<String>) -> Self {
        Self::bare(id, NodeKind::Task, display_name)
    }

    pub fn container(id: impl Into<NodeId>, display_name: impl Into<String>) -> Self {
        let mut node = Self::bare(id, NodeKind::Container, display_name);
        node.block = Some(BlockState::default());
        node
    }

    /// The entry marker of `section` owned by `owner`.
    ///
    /// Scope-level markers have no parent; sub-section markers report their container as
    /// parent so they share the `(parentId, parentSection)` pair of the section's members.
    pub fn entry_marker(owner: &str, section: Section) -> Self {
        let mut node = Self::bare(entry_marker_id(owner, section), NodeKind::EntryMarker, "START");
        node.parent_section = section;
        if section.is_block_level() {
            node.parent_id = Some(owner.to_string());
        }
        node.x = crate::geometry::SECTION_PADDING;
        node.y = crate::geometry::SECTION_PADDING;
        node
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn in_section(mut self, parent_id: Option<&str>, section: Section) -> Self {
        self.parent_id = parent_id.map(str::to_string);
        self.parent_section = section;
        self
    }

    pub fn with_source(mut self, namespace: &str, name: &str) -> Self {
        self.source_ref = Some(SourceRef {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    pub fn is_entry_marker(&self) -> bool {
        self.kind == NodeKind::EntryMarker
    }

    pub fn is_collapsed(&self) -> bool {
        self.block.as_ref().is_some_and(|b| b.collapsed)
    }

    /// The `(parentId, parentSection)` pair that identifies the section the node lives in.
    pub fn placement(&self) -> (Option<&str>, Section) {
        (self.parent_id.as_deref(), self.parent_section)
    }
}

/// Applies a per-field patch. A JSON `null` removes the key. Returns whether anything changed.
pub fn merge_attributes(target: &mut Attributes, patch: &Attributes) -> bool {
    let mut changed = false;
    for (key, value) in patch {
        if value.is_null() {
            changed |= target.remove(key).is_some();
        } else if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}
