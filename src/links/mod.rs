//! Typed, directed links under the single-chain rule.
//!
//! For every link type a node is the `from` of at most one link and the `to` of at most
//! one link, so each type's sub-graph is a disjoint union of simple paths starting at an
//! entry marker. Reachability and orphan status are derived here and never stored.

use crate::error::Rejection;
use crate::ids::NodeId;
use crate::model::{Link, Scope};
use crate::store::Outcome;
use ahash::AHashSet;
use std::collections::VecDeque;

/// Checks whether a link from `from` to `to` may exist.
///
/// Returns `Err(Outcome::Missing)` when either endpoint is unknown and
/// `Err(Outcome::Rejected(_))` when the link would break a chain or containment rule.
pub fn check_link(scope: &Scope, from: &str, to: &str) -> Result<(), Outcome> {
    if from == to {
        return Err(Outcome::Rejected(Rejection::SelfLink(from.to_string())));
    }
    let source = scope.node(from).ok_or(Outcome::Missing)?;
    let target = scope.node(to).ok_or(Outcome::Missing)?;

    if target.is_entry_marker() {
        return Err(Outcome::Rejected(Rejection::EntryMarkerTarget(to.to_string())));
    }
    if scope.is_self_or_ancestor(from, to) || scope.is_self_or_ancestor(to, from) {
        return Err(Outcome::Rejected(Rejection::AncestryLink {
            from: from.to_string(),
            to: to.to_string(),
        }));
    }
    if source.is_entry_marker() && source.placement() != target.placement() {
        return Err(Outcome::Rejected(Rejection::EntryMarkerMismatch {
            marker: from.to_string(),
            target: to.to_string(),
        }));
    }
    if source.placement() != target.placement() {
        return Err(Outcome::Rejected(Rejection::CrossSection {
            from: from.to_string(),
            to: to.to_string(),
        }));
    }
    Ok(())
}

/// Appends `link`, first dropping any link of the same type that shares its `from` or its
/// `to`. Returns `false` if the identical edge is already present.
pub(crate) fn attach(scope: &mut Scope, link: Link) -> bool {
    if scope.links.iter().any(|l| l.same_edge(&link)) {
        return false;
    }
    scope.links.retain(|l| {
        let displaced = l.link_type == link.link_type && (l.from == link.from || l.to == link.to);
        if displaced {
            tracing::debug!("link '{}' displaced by '{}'", l.id, link.id);
        }
        !displaced && l.id != link.id
    });
    scope.links.push(link);
    true
}

/// Nodes reachable from `entry` over outgoing links of any type, in breadth-first order.
/// The entry itself is not included.
pub fn chain_members(scope: &Scope, entry: &str) -> Vec<NodeId> {
    let mut visited: AHashSet<&str> = AHashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::from([entry]);
    visited.insert(entry);

    while let Some(current) = queue.pop_front() {
        for link in scope.links_from(current) {
            if visited.insert(link.to.as_str()) {
                order.push(link.to.clone());
                queue.push_back(link.to.as_str());
            }
        }
    }
    order
}

/// Number of nodes in the chain started by `entry`, excluding the entry itself.
pub fn chain_length(scope: &Scope, entry: &str) -> usize {
    chain_members(scope, entry).len()
}

/// Whether `id` lacks an inbound-link path back to an entry marker.
///
/// Entry markers are never orphans. Unknown ids are not orphans either: nothing is
/// rendered for them.
pub fn is_orphan(scope: &Scope, id: &str) -> bool {
    match scope.node(id) {
        Some(node) if node.is_entry_marker() => false,
        Some(_) => !is_rooted(scope, id, &mut AHashSet::new()),
        None => false,
    }
}

fn is_rooted(scope: &Scope, id: &str, visited: &mut AHashSet<NodeId>) -> bool {
    if !visited.insert(id.to_string()) {
        tracing::trace!("ancestry walk revisited '{}'", id);
        return false;
    }
    match scope.node(id) {
        None => false,
        Some(node) if node.is_entry_marker() => true,
        Some(_) => scope
            .links_to(id)
            .any(|link| is_rooted(scope, &link.from, visited)),
    }
}

/// Every orphaned node in the scope, sorted by id.
pub fn orphans(scope: &Scope) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = scope
        .nodes()
        .filter(|n| !n.is_entry_marker())
        .filter(|n| is_orphan(scope, &n.id))
        .map(|n| n.id.clone())
        .collect();
    ids.sort();
    ids
}

/// All links that start or end at `id`.
pub fn links_of<'a>(scope: &'a Scope, id: &str) -> Vec<&'a Link> {
    scope.links().iter().filter(|l| l.touches(id)).collect()
}
