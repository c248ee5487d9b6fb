use super::{Point, Size, expanded_size, size_of};
use crate::accordion::Accordion;
use crate::ids::{NodeId, entry_marker_id};
use crate::links;
use crate::model::{Node, NodeKind, Scope, Section};
use ahash::AHashSet;
use serde::Serialize;

/// A positioned entity ready for the host to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub display_name: String,
    pub position: Point,
    pub size: Size,
    pub orphan: bool,
    pub collapsed: bool,
    /// Sub-sections of a container; empty for tasks, entry markers and collapsed containers.
    pub sections: Vec<RenderSection>,
}

/// One section with its members. Closed sections carry no members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSection {
    pub section: Section,
    pub open: bool,
    pub chain_length: usize,
    pub nodes: Vec<RenderNode>,
}

/// Builds the render tree of a scope's four task sections.
pub fn layout(scope: &Scope, accordion: &Accordion) -> Vec<RenderSection> {
    let mut visiting = AHashSet::new();
    Section::SCOPE_LEVEL
        .into_iter()
        .map(|section| {
            let entry = entry_marker_id(&scope.id, section);
            let open = accordion.is_open(section);
            let nodes = if open {
                std::iter::once(entry.clone())
                    .chain(scope.section_members(section).into_iter().filter(|id| *id != entry))
                    .filter_map(|id| scope.stored_node(&id).cloned())
                    .map(|node| render_node(scope, &node, &mut visiting))
                    .collect()
            } else {
                Vec::new()
            };
            RenderSection {
                section,
                open,
                chain_length: links::chain_length(scope, &entry),
                nodes,
            }
        })
        .collect()
}

fn render_node(scope: &Scope, node: &Node, visiting: &mut AHashSet<String>) -> RenderNode {
    let collapsed = node.is_collapsed();
    let sections = match &node.block {
        Some(block) if !collapsed && visiting.insert(node.id.clone()) => {
            let rendered = Section::BLOCK_LEVEL
                .into_iter()
                .map(|section| {
                    let entry = entry_marker_id(&node.id, section);
                    let open = block.open_section == section;
                    let nodes = if open {
                        std::iter::once(Node::entry_marker(&node.id, section))
                            .chain(
                                block
                                    .members(section)
                                    .iter()
                                    .filter_map(|id| scope.stored_node(id).cloned()),
                            )
                            .map(|child| render_node(scope, &child, visiting))
                            .collect()
                    } else {
                        Vec::new()
                    };
                    RenderSection {
                        section,
                        open,
                        chain_length: links::chain_length(scope, &entry),
                        nodes,
                    }
                })
                .collect();
            visiting.remove(&node.id);
            rendered
        }
        _ => Vec::new(),
    };
    let size = if node.is_container() && !collapsed {
        expanded_size(scope, node, &mut AHashSet::new())
    } else {
        size_of(scope, node, &mut AHashSet::new())
    };
    RenderNode {
        id: node.id.clone(),
        kind: node.kind,
        display_name: node.display_name.clone(),
        position: Point::new(node.x, node.y),
        size,
        orphan: links::is_orphan(scope, &node.id),
        collapsed,
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;

    #[test]
    fn test_layout_renders_only_open_sections() {
        let mut scope = Scope::new("p", "play");
        let task = Node::task("t1", "Install").in_section(None, Section::Main).at(300.0, 40.0);
        scope.nodes.insert("t1".into(), task);
        scope.nodes.insert(
            "t2".into(),
            Node::task("t2", "Cleanup").in_section(None, Section::Post),
        );
        scope
            .links
            .push(Link::new(Section::Main, &entry_marker_id("p", Section::Main), "t1"));

        let sections = layout(&scope, &Accordion::new());
        assert_eq!(sections.len(), 4);

        let main = sections.iter().find(|s| s.section == Section::Main).unwrap();
        assert!(main.open);
        assert_eq!(main.chain_length, 1);
        assert_eq!(main.nodes.len(), 2);
        assert_eq!(main.nodes[0].kind, NodeKind::EntryMarker);
        assert_eq!(main.nodes[1].position, Point::new(300.0, 40.0));
        assert!(!main.nodes[1].orphan);

        let post = sections.iter().find(|s| s.section == Section::Post).unwrap();
        assert!(!post.open);
        assert!(post.nodes.is_empty());
    }

    #[test]
    fn test_container_renders_open_sub_section_with_marker() {
        let mut scope = Scope::new("p", "play");
        let mut block = Node::container("b1", "Block").in_section(None, Section::Main);
        block.block.as_mut().unwrap().primary.push("t1".into());
        scope.nodes.insert("b1".into(), block);
        scope.nodes.insert(
            "t1".into(),
            Node::task("t1", "inner").in_section(Some("b1"), Section::Primary),
        );

        let sections = layout(&scope, &Accordion::new());
        let main = sections.iter().find(|s| s.section == Section::Main).unwrap();
        let block = main.nodes.iter().find(|n| n.id == "b1").unwrap();
        assert_eq!(block.sections.len(), 3);
        let primary = &block.sections[0];
        assert!(primary.open);
        assert_eq!(primary.nodes[0].id, "b1-primary-start");
        assert_eq!(primary.nodes[1].id, "t1");
        assert!(primary.nodes[1].orphan);
        assert!(block.sections[1].nodes.is_empty());
    }
}
