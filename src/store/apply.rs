use super::{Origin, Outcome};
use crate::error::Rejection;
use crate::ids::{is_entry_marker_id, parse_entry_marker_id};
use crate::links;
use crate::model::{BlockState, Node, NodeKind, Scope, Section, merge_attributes};
use crate::mutation::{
    ContainerCollapse, LinkAdd, Mutation, NodeAttrChange, NodeMove, NodeResize, ScopeAttrChange,
    VariableChange,
};
use ahash::AHashSet;
use itertools::Itertools;

/// Applies one mutation to a scope. Either the whole change lands or nothing does.
pub(super) fn apply(scope: &mut Scope, mutation: &Mutation, origin: Origin) -> Outcome {
    match mutation {
        Mutation::NodeAdd(p) => add_node(scope, &p.node, origin),
        Mutation::NodeMove(p) => move_node(scope, p, origin),
        Mutation::NodeDelete(p) => delete_node(scope, &p.node_id, origin),
        Mutation::NodeAttrChange(p) => change_attributes(scope, p),
        Mutation::NodeResize(p) => resize_node(scope, p),
        Mutation::LinkAdd(p) => add_link(scope, p),
        Mutation::LinkDelete(p) => delete_link(scope, &p.link_id),
        Mutation::ScopeAttrChange(p) => change_scope(scope, p),
        Mutation::VariableChange(p) => change_variables(scope, p),
        Mutation::ContainerCollapse(p) => collapse_container(scope, p),
    }
}

/// Validates that `node_id` may live in `(parent, section)`.
pub(crate) fn check_placement(
    scope: &Scope,
    node_id: &str,
    parent: Option<&str>,
    section: Section,
) -> Result<(), Outcome> {
    match parent {
        None if section.is_scope_level() => Ok(()),
        None => Err(Outcome::Rejected(Rejection::SectionKindMismatch {
            section,
            placement: "the scope canvas",
        })),
        Some(parent_id) => {
            let parent = scope.stored_node(parent_id).ok_or(Outcome::Missing)?;
            if !parent.is_container() {
                return Err(Outcome::Rejected(Rejection::NotAContainer(
                    parent_id.to_string(),
                )));
            }
            if !section.is_block_level() {
                return Err(Outcome::Rejected(Rejection::SectionKindMismatch {
                    section,
                    placement: "a container",
                }));
            }
            if scope.is_self_or_ancestor(node_id, parent_id) {
                return Err(Outcome::Rejected(Rejection::CyclicContainment {
                    node: node_id.to_string(),
                    target: parent_id.to_string(),
                }));
            }
            Ok(())
        }
    }
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Removes `id` from its parent's membership lists.
fn detach(scope: &mut Scope, id: &str) {
    let parent = scope.nodes.get(id).and_then(|n| n.parent_id.clone());
    if let Some(block) = parent
        .and_then(|p| scope.nodes.get_mut(&p))
        .and_then(|p| p.block.as_mut())
    {
        block.remove_member(id);
    }
}

/// Appends `id` to the membership list named by its own `(parent_id, parent_section)`.
fn attach(scope: &mut Scope, id: &str) {
    let Some((parent, section)) = scope
        .nodes
        .get(id)
        .and_then(|n| n.parent_id.clone().map(|p| (p, n.parent_section)))
    else {
        return;
    };
    if let Some(list) = scope
        .nodes
        .get_mut(&parent)
        .and_then(|p| p.block.as_mut())
        .and_then(|b| b.members_mut(section))
    {
        if !list.iter().any(|m| m == id) {
            list.push(id.to_string());
        }
    }
}

/// Rebuilds a container's membership lists from its children's parent fields.
///
/// Ids already listed keep their order; children missing from the lists are appended in
/// id order; ids that do not point back at the container are dropped.
pub(crate) fn rebuild_membership(scope: &mut Scope, container_id: &str) {
    let Some(block) = scope.nodes.get(container_id).and_then(|n| n.block.clone()) else {
        return;
    };
    let mut rebuilt = BlockState {
        collapsed: block.collapsed,
        open_section: block.open_section,
        ..BlockState::default()
    };
    for section in Section::BLOCK_LEVEL {
        let belongs = |id: &str| {
            scope
                .nodes
                .get(id)
                .is_some_and(|n| n.parent_id.as_deref() == Some(container_id) && n.parent_section == section)
        };
        let listed = block.members(section).iter().filter(|id| belongs(id)).unique().cloned();
        let unlisted = scope
            .nodes
            .values()
            .filter(|n| {
                n.parent_id.as_deref() == Some(container_id)
                    && n.parent_section == section
                    && !block.members(section).contains(&n.id)
            })
            .map(|n| n.id.clone())
            .sorted();
        if let Some(list) = rebuilt.members_mut(section) {
            list.extend(listed.chain(unlisted));
        }
    }
    if let Some(node) = scope.nodes.get_mut(container_id) {
        node.block = Some(rebuilt);
    }
}

fn add_node(scope: &mut Scope, incoming: &Node, origin: Origin) -> Outcome {
    if incoming.is_entry_marker() || is_entry_marker_id(&incoming.id) {
        return Outcome::Rejected(Rejection::EntryMarkerAdd(incoming.id.clone()));
    }
    if !finite(&[incoming.x, incoming.y]) {
        tracing::warn!("node_add for '{}' has non-finite coordinates", incoming.id);
        return Outcome::Unchanged;
    }
    let mut node = incoming.clone();
    match node.kind {
        NodeKind::Container => {
            let block = node.block.get_or_insert_with(BlockState::default);
            if !block.open_section.is_block_level() {
                block.open_section = Section::Primary;
            }
        }
        _ => node.block = None,
    }
    if let Some(existing) = scope.nodes.get(&node.id) {
        if existing.kind != node.kind {
            return Outcome::Rejected(Rejection::KindChange(node.id.clone()));
        }
        let relocated = existing.placement() != node.placement();
        if relocated && origin == Origin::Local && scope.has_links(&node.id) {
            return Outcome::Rejected(Rejection::LinkProtected(node.id.clone()));
        }
    }
    if let Err(outcome) = check_placement(scope, &node.id, node.parent_id.as_deref(), node.parent_section) {
        return outcome;
    }

    let moved = match scope.nodes.get(&node.id) {
        Some(existing) => existing.placement() != node.placement(),
        None => true,
    };
    if moved {
        detach(scope, &node.id);
    }
    let id = node.id.clone();
    let previous = scope.nodes.insert(id.clone(), node);
    if scope.nodes[&id].is_container() {
        rebuild_membership(scope, &id);
    }
    attach(scope, &id);

    match previous {
        Some(prev) if prev == scope.nodes[&id] => Outcome::Unchanged,
        _ => Outcome::Applied,
    }
}

fn move_node(scope: &mut Scope, p: &NodeMove, origin: Origin) -> Outcome {
    let Some(node) = scope.nodes.get(&p.node_id) else {
        return Outcome::Missing;
    };
    if !finite(&[p.x, p.y]) {
        tracing::warn!("node_move for '{}' has non-finite coordinates", p.node_id);
        return Outcome::Unchanged;
    }

    let target = p
        .parent_section
        .map(|section| (p.parent_id.as_deref(), section))
        .filter(|target| *target != node.placement());

    let Some((parent, section)) = target else {
        if node.x == p.x && node.y == p.y {
            return Outcome::Unchanged;
        }
        if let Some(node) = scope.nodes.get_mut(&p.node_id) {
            node.x = p.x;
            node.y = p.y;
        }
        return Outcome::Applied;
    };

    if node.is_entry_marker() {
        return Outcome::Rejected(Rejection::EntryMarkerMove(p.node_id.clone()));
    }
    if origin == Origin::Local && scope.has_links(&p.node_id) {
        return Outcome::Rejected(Rejection::LinkProtected(p.node_id.clone()));
    }
    if let Err(outcome) = check_placement(scope, &p.node_id, parent, section) {
        return outcome;
    }

    detach(scope, &p.node_id);
    if let Some(node) = scope.nodes.get_mut(&p.node_id) {
        node.parent_id = parent.map(str::to_string);
        node.parent_section = section;
        node.x = p.x;
        node.y = p.y;
    }
    attach(scope, &p.node_id);
    Outcome::Applied
}

/// Ids of every node enclosed, at any depth, by `container_id`.
pub(crate) fn descendants(scope: &Scope, container_id: &str) -> Vec<String> {
    scope
        .nodes
        .values()
        .filter(|n| n.id != container_id && scope.is_self_or_ancestor(container_id, &n.id))
        .map(|n| n.id.clone())
        .collect()
}

fn delete_node(scope: &mut Scope, id: &str, origin: Origin) -> Outcome {
    let Some(node) = scope.nodes.get(id) else {
        if scope.contains(id) {
            // Synthesized sub-section marker.
            return Outcome::Rejected(Rejection::ProtectedNode(id.to_string()));
        }
        return Outcome::Missing;
    };
    if node.is_entry_marker() || node.system {
        return Outcome::Rejected(Rejection::ProtectedNode(id.to_string()));
    }

    let enclosed = descendants(scope, id);
    if origin == Origin::Local && enclosed.iter().any(|d| scope.has_links(d)) {
        return Outcome::Rejected(Rejection::LinkProtectedMembers(id.to_string()));
    }

    detach(scope, id);
    let removed: AHashSet<String> = enclosed.into_iter().chain([id.to_string()]).collect();
    for gone in &removed {
        scope.nodes.remove(gone);
    }
    let is_removed = |endpoint: &str| {
        removed.contains(endpoint)
            || parse_entry_marker_id(endpoint).is_some_and(|(owner, _)| removed.contains(owner))
    };
    scope
        .links
        .retain(|l| !is_removed(&l.from) && !is_removed(&l.to));
    Outcome::Applied
}

fn change_attributes(scope: &mut Scope, p: &NodeAttrChange) -> Outcome {
    let Some(node) = scope.nodes.get_mut(&p.node_id) else {
        return Outcome::Missing;
    };
    if merge_attributes(&mut node.attributes, &p.attributes) {
        Outcome::Applied
    } else {
        Outcome::Unchanged
    }
}

fn resize_node(scope: &mut Scope, p: &NodeResize) -> Outcome {
    let Some(node) = scope.nodes.get_mut(&p.node_id) else {
        return Outcome::Missing;
    };
    if !finite(&[p.width, p.height, p.x, p.y]) || p.width <= 0.0 || p.height <= 0.0 {
        tracing::warn!("node_resize for '{}' has invalid dimensions", p.node_id);
        return Outcome::Unchanged;
    }
    let resized = (Some(p.width), Some(p.height), p.x, p.y);
    if (node.width, node.height, node.x, node.y) == resized {
        return Outcome::Unchanged;
    }
    (node.width, node.height, node.x, node.y) = resized;
    Outcome::Applied
}

fn add_link(scope: &mut Scope, p: &LinkAdd) -> Outcome {
    if scope.link(&p.link.id) == Some(&p.link) {
        return Outcome::Unchanged;
    }
    if let Err(outcome) = links::check_link(scope, &p.link.from, &p.link.to) {
        return outcome;
    }
    if links::attach(scope, p.link.clone()) {
        Outcome::Applied
    } else {
        Outcome::Unchanged
    }
}

fn delete_link(scope: &mut Scope, link_id: &str) -> Outcome {
    match scope.links.iter().position(|l| l.id == link_id) {
        Some(index) => {
            scope.links.remove(index);
            Outcome::Applied
        }
        None => Outcome::Missing,
    }
}

fn change_scope(scope: &mut Scope, p: &ScopeAttrChange) -> Outcome {
    let mut changed = merge_attributes(&mut scope.attributes, &p.attributes);
    if let Some(name) = &p.name {
        if *name != scope.name {
            scope.name = name.clone();
            changed = true;
        }
    }
    if changed {
        Outcome::Applied
    } else {
        Outcome::Unchanged
    }
}

fn change_variables(scope: &mut Scope, p: &VariableChange) -> Outcome {
    if let Some(dup) = p.variables.iter().map(|v| &v.key).duplicates().next() {
        return Outcome::Rejected(Rejection::DuplicateVariable(dup.clone()));
    }
    if let Some(rejection) = p.variables.iter().find_map(|v| v.check_pattern().err()) {
        return Outcome::Rejected(rejection);
    }
    if scope.variables == p.variables {
        return Outcome::Unchanged;
    }
    scope.variables = p.variables.clone();
    Outcome::Applied
}

fn collapse_container(scope: &mut Scope, p: &ContainerCollapse) -> Outcome {
    let Some(node) = scope.nodes.get_mut(&p.node_id) else {
        return Outcome::Missing;
    };
    let Some(block) = node.block.as_mut() else {
        return Outcome::Rejected(Rejection::NotAContainer(p.node_id.clone()));
    };
    if block.collapsed == p.collapsed {
        return Outcome::Unchanged;
    }
    block.collapsed = p.collapsed;
    Outcome::Applied
}
