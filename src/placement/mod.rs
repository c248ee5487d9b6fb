//! Turns drag-and-drop gestures into placement decisions.
//!
//! A drop either repositions a node inside its current section, moves it into another
//! container sub-section or onto the scope canvas, or, when released over another node,
//! becomes a link-creation attempt. Nodes with any link never leave their section: a
//! link's type is the section its source lives in.

use crate::config::EngineConfig;
use crate::error::Rejection;
use crate::geometry::{
    self, BLOCK_HEADER_HEIGHT, MIN_SECTION_CONTENT_HEIGHT, MIN_SECTION_CONTENT_WIDTH, Point,
    SECTION_HEADER_HEIGHT, Size,
};
use crate::ids::{NodeId, new_node_id};
use crate::model::{Attributes, LinkType, Node, NodeKind, Scope, Section, SourceRef};
use crate::store::{EntityStore, Outcome, check_placement};

/// Pointer offset captured when a drag starts, so drops do not snap the node's corner to
/// the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// `None` while dragging a new node out of the palette.
    pub node_id: Option<NodeId>,
    pub offset: Point,
}

impl DragSession {
    /// Grabs an existing node. `pointer` and `node_origin` share one coordinate space.
    pub fn start(node_id: &str, pointer: Point, node_origin: Point) -> Self {
        Self {
            node_id: Some(node_id.to_string()),
            offset: Point::new(pointer.x - node_origin.x, pointer.y - node_origin.y),
        }
    }

    pub fn from_palette(offset: Point) -> Self {
        Self {
            node_id: None,
            offset,
        }
    }
}

/// The section under the pointer and where its content area starts on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub parent_id: Option<NodeId>,
    pub section: Section,
    pub origin: Point,
}

impl DropTarget {
    pub fn scope_section(section: Section, origin: Point) -> Self {
        Self {
            parent_id: None,
            section,
            origin,
        }
    }

    pub fn sub_section(container: &str, section: Section, origin: Point) -> Self {
        Self {
            parent_id: Some(container.to_string()),
            section,
            origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub pointer: Point,
    pub target: DropTarget,
    /// Node the pointer was released over, if any.
    pub over_node: Option<NodeId>,
}

/// What a drop resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum DropPlan {
    /// Same container and section; only the coordinates change.
    Reposition { position: Point },
    /// Into another container sub-section.
    Reparent {
        parent_id: NodeId,
        section: Section,
        position: Point,
    },
    /// Onto a scope-level section.
    ToScope { section: Section, position: Point },
    /// Released over another node: chain the dragged node after it.
    Link {
        link_type: LinkType,
        from: NodeId,
        to: NodeId,
    },
    Rejected(Rejection),
    Missing,
}

/// Where a box of `size` lands: pointer minus section origin minus drag offset, clamped
/// into the target section, then snapped if grid snap is on.
pub fn landing_position(
    scope: &Scope,
    config: &EngineConfig,
    size: Size,
    drag: &DragSession,
    drop: &DropEvent,
) -> Point {
    let local = Point::new(
        drop.pointer.x - drop.target.origin.x - drag.offset.x,
        drop.pointer.y - drop.target.origin.y - drag.offset.y,
    );
    let rect = geometry::section_content_rect(
        scope,
        config,
        drop.target.parent_id.as_deref(),
        drop.target.section,
    );
    let clamped = geometry::clamp_to_rect(local, size, rect);
    if config.grid_snap {
        geometry::snap(clamped, config.grid_unit)
    } else {
        clamped
    }
}

/// Decides what dropping an existing node does, without touching the store.
pub fn plan_drop(
    scope: &Scope,
    config: &EngineConfig,
    drag: &DragSession,
    drop: &DropEvent,
) -> DropPlan {
    let Some(node_id) = drag.node_id.as_deref() else {
        return DropPlan::Missing;
    };
    let Some(node) = scope.stored_node(node_id) else {
        return DropPlan::Missing;
    };

    if let Some(over) = drop.over_node.as_deref().filter(|over| *over != node_id) {
        return match scope.node(over) {
            Some(predecessor) => DropPlan::Link {
                link_type: predecessor.parent_section,
                from: over.to_string(),
                to: node_id.to_string(),
            },
            None => DropPlan::Missing,
        };
    }

    let parent = drop.target.parent_id.as_deref();
    let section = drop.target.section;
    let position = landing_position(
        scope,
        config,
        geometry::rendered_size(scope, node_id),
        drag,
        drop,
    );
    if node.placement() == (parent, section) {
        return DropPlan::Reposition { position };
    }
    if node.is_entry_marker() {
        return DropPlan::Rejected(Rejection::EntryMarkerMove(node_id.to_string()));
    }
    if scope.has_links(node_id) {
        return DropPlan::Rejected(Rejection::LinkProtected(node_id.to_string()));
    }
    match check_placement(scope, node_id, parent, section) {
        Ok(()) => match parent {
            Some(parent_id) => DropPlan::Reparent {
                parent_id: parent_id.to_string(),
                section,
                position,
            },
            None => DropPlan::ToScope { section, position },
        },
        Err(Outcome::Rejected(rejection)) => DropPlan::Rejected(rejection),
        Err(_) => DropPlan::Missing,
    }
}

/// Carries out a plan for `node_id` through the store's local mutators.
pub fn apply_drop(store: &mut EntityStore, node_id: &str, plan: &DropPlan) -> Outcome {
    match plan {
        DropPlan::Reposition { position } => store.move_node(node_id, position.x, position.y, None),
        DropPlan::Reparent {
            parent_id,
            section,
            position,
        } => store.move_node(
            node_id,
            position.x,
            position.y,
            Some((Some(parent_id.as_str()), *section)),
        ),
        DropPlan::ToScope { section, position } => {
            store.move_node(node_id, position.x, position.y, Some((None, *section)))
        }
        DropPlan::Link {
            link_type,
            from,
            to,
        } => store.add_link(*link_type, from, to),
        DropPlan::Rejected(rejection) => {
            tracing::debug!("drop of '{}' rejected: {}", node_id, rejection);
            Outcome::Rejected(rejection.clone())
        }
        DropPlan::Missing => {
            tracing::debug!("drop of '{}' addressed a missing node", node_id);
            Outcome::Missing
        }
    }
}

/// Plans and applies a drop of an existing node on the active scope.
pub fn drop_node(
    store: &mut EntityStore,
    config: &EngineConfig,
    drag: &DragSession,
    drop: &DropEvent,
) -> Outcome {
    let (Some(scope), Some(node_id)) = (store.active_scope(), drag.node_id.clone()) else {
        return Outcome::Missing;
    };
    let plan = plan_drop(scope, config, drag, drop);
    apply_drop(store, &node_id, &plan)
}

/// A palette entry: what a new node looks like before it has an id and a position.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub kind: NodeKind,
    pub display_name: String,
    pub source_ref: Option<SourceRef>,
    pub attributes: Attributes,
}

impl NodeTemplate {
    pub fn task(display_name: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: NodeKind::Task,
            display_name: display_name.to_string(),
            source_ref: Some(SourceRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            attributes: Attributes::new(),
        }
    }

    pub fn container(display_name: &str) -> Self {
        Self {
            kind: NodeKind::Container,
            display_name: display_name.to_string(),
            source_ref: None,
            attributes: Attributes::new(),
        }
    }

    /// Footprint of a freshly created node of this kind.
    fn initial_size(&self) -> Size {
        match self.kind {
            NodeKind::Container => Size {
                width: MIN_SECTION_CONTENT_WIDTH,
                height: BLOCK_HEADER_HEIGHT
                    + 3.0 * SECTION_HEADER_HEIGHT
                    + MIN_SECTION_CONTENT_HEIGHT,
            },
            NodeKind::EntryMarker => Size::ENTRY_MARKER,
            NodeKind::Task => Size::TASK,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteDrop {
    pub outcome: Outcome,
    /// Id of the created node when the drop applied.
    pub node_id: Option<NodeId>,
}

/// Creates a node from the palette at the drop position on the active scope.
pub fn drop_from_palette(
    store: &mut EntityStore,
    config: &EngineConfig,
    template: &NodeTemplate,
    drag: &DragSession,
    drop: &DropEvent,
) -> PaletteDrop {
    let id = new_node_id();
    let rejected = |outcome| PaletteDrop {
        outcome,
        node_id: None,
    };
    let Some(scope) = store.active_scope() else {
        return rejected(Outcome::Rejected(Rejection::NoActiveScope));
    };
    if template.kind == NodeKind::EntryMarker {
        return rejected(Outcome::Rejected(Rejection::EntryMarkerAdd(id)));
    }
    let parent = drop.target.parent_id.as_deref();
    if let Err(outcome) = check_placement(scope, &id, parent, drop.target.section) {
        return rejected(outcome);
    }

    let position = landing_position(scope, config, template.initial_size(), drag, drop);
    let mut node = match template.kind {
        NodeKind::Container => Node::container(id.clone(), template.display_name.clone()),
        _ => Node::task(id.clone(), template.display_name.clone()),
    }
    .in_section(parent, drop.target.section)
    .at(position.x, position.y);
    node.source_ref = template.source_ref.clone();
    node.attributes = template.attributes.clone();

    let outcome = store.add_node(node);
    let node_id = outcome.is_applied().then_some(id);
    PaletteDrop { outcome, node_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::entry_marker_id;

    fn setup(grid_snap: bool) -> (EntityStore, EngineConfig, String) {
        let mut store = EntityStore::new("u-1", "amy");
        let scope_id = store.create_scope("play");
        let config = EngineConfig::builder().grid_snap(grid_snap).build();
        store.add_node(Node::task("t1", "Install").in_section(None, Section::Main));
        store.add_node(Node::container("b1", "Block").in_section(None, Section::Main).at(600.0, 0.0));
        store.drain_outbox();
        (store, config, scope_id)
    }

    fn drop_at(x: f64, y: f64, target: DropTarget) -> DropEvent {
        DropEvent {
            pointer: Point::new(x, y),
            target,
            over_node: None,
        }
    }

    #[test]
    fn test_drop_subtracts_offset() {
        let (mut store, config, _) = setup(false);
        let drag = DragSession::start("t1", Point::new(10.0, 10.0), Point::new(0.0, 0.0));
        let drop = drop_at(120.0, 90.0, DropTarget::scope_section(Section::Main, Point::default()));

        let plan = plan_drop(store.active_scope().unwrap(), &config, &drag, &drop);
        assert_eq!(
            plan,
            DropPlan::Reposition {
                position: Point::new(110.0, 80.0)
            }
        );
        assert_eq!(apply_drop(&mut store, "t1", &plan), Outcome::Applied);
        let node = store.node("t1").unwrap();
        assert_eq!((node.x, node.y), (110.0, 80.0));
    }

    #[test]
    fn test_drop_snaps_to_grid() {
        let (mut store, config, _) = setup(true);
        let drag = DragSession::start("t1", Point::new(10.0, 10.0), Point::new(0.0, 0.0));
        let drop = drop_at(120.0, 90.0, DropTarget::scope_section(Section::Main, Point::default()));
        assert_eq!(drop_node(&mut store, &config, &drag, &drop), Outcome::Applied);
        let node = store.node("t1").unwrap();
        assert_eq!((node.x, node.y), (100.0, 50.0));
    }

    #[test]
    fn test_drop_clamps_inside_section() {
        let (store, config, _) = setup(false);
        let drag = DragSession::start("t1", Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let drop = drop_at(-50.0, 99_999.0, DropTarget::scope_section(Section::Main, Point::default()));
        let plan = plan_drop(store.active_scope().unwrap(), &config, &drag, &drop);
        assert_eq!(
            plan,
            DropPlan::Reposition {
                position: Point::new(0.0, config.section_height - Size::TASK.height)
            }
        );
    }

    #[test]
    fn test_drop_into_container_reparents() {
        let (mut store, config, _) = setup(false);
        let drag = DragSession::start("t1", Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let drop = drop_at(30.0, 30.0, DropTarget::sub_section("b1", Section::Fallback, Point::default()));

        assert_eq!(drop_node(&mut store, &config, &drag, &drop), Outcome::Applied);
        let node = store.node("t1").unwrap();
        assert_eq!(node.placement(), (Some("b1"), Section::Fallback));
        assert_eq!(store.children("b1", Section::Fallback), vec!["t1".to_string()]);
    }

    #[test]
    fn test_linked_node_cannot_change_section() {
        let (mut store, config, scope_id) = setup(false);
        let entry = entry_marker_id(&scope_id, Section::Main);
        assert!(store.add_link(Section::Main, &entry, "t1").is_applied());

        let drag = DragSession::start("t1", Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let drop = drop_at(30.0, 30.0, DropTarget::scope_section(Section::Post, Point::default()));
        let plan = plan_drop(store.active_scope().unwrap(), &config, &drag, &drop);
        assert_eq!(plan, DropPlan::Rejected(Rejection::LinkProtected("t1".into())));
        assert!(apply_drop(&mut store, "t1", &plan).is_rejected());
        assert_eq!(store.node("t1").unwrap().placement(), (None, Section::Main));
    }

    #[test]
    fn test_drop_on_node_is_link_attempt() {
        let (mut store, config, scope_id) = setup(false);
        let entry = entry_marker_id(&scope_id, Section::Main);
        let drag = DragSession::start("t1", Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let mut drop = drop_at(0.0, 0.0, DropTarget::scope_section(Section::Main, Point::default()));
        drop.over_node = Some(entry.clone());

        let plan = plan_drop(store.active_scope().unwrap(), &config, &drag, &drop);
        assert_eq!(
            plan,
            DropPlan::Link {
                link_type: Section::Main,
                from: entry.clone(),
                to: "t1".into()
            }
        );
        assert_eq!(apply_drop(&mut store, "t1", &plan), Outcome::Applied);
        assert_eq!(store.links().len(), 1);
    }

    #[test]
    fn test_container_cannot_drop_into_itself() {
        let (store, config, _) = setup(false);
        let drag = DragSession::start("b1", Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let drop = drop_at(0.0, 0.0, DropTarget::sub_section("b1", Section::Primary, Point::default()));
        let plan = plan_drop(store.active_scope().unwrap(), &config, &drag, &drop);
        assert!(matches!(plan, DropPlan::Rejected(Rejection::CyclicContainment { .. })));
    }

    #[test]
    fn test_palette_drop_creates_node() {
        let (mut store, config, _) = setup(false);
        let drag = DragSession::from_palette(Point::new(5.0, 5.0));
        let drop = drop_at(25.0, 15.0, DropTarget::sub_section("b1", Section::Primary, Point::default()));
        let template = NodeTemplate::task("Restart", "ansible.builtin", "service");

        let result = drop_from_palette(&mut store, &config, &template, &drag, &drop);
        assert_eq!(result.outcome, Outcome::Applied);
        let id = result.node_id.unwrap();
        let node = store.node(&id).unwrap();
        assert_eq!(node.placement(), (Some("b1"), Section::Primary));
        assert_eq!((node.x, node.y), (20.0, 10.0));
        assert_eq!(node.source_ref.unwrap().name, "service");
        assert_eq!(store.drain_outbox().len(), 1);
    }

    #[test]
    fn test_palette_drop_rejects_scope_section_in_container() {
        let (mut store, config, _) = setup(false);
        let drag = DragSession::from_palette(Point::default());
        let drop = drop_at(0.0, 0.0, DropTarget::sub_section("b1", Section::Main, Point::default()));
        let result = drop_from_palette(&mut store, &config, &NodeTemplate::container("Inner"), &drag, &drop);
        assert!(result.outcome.is_rejected());
        assert!(result.node_id.is_none());
    }
}
