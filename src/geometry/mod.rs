//! Rendered sizes of nodes and containers, section content rectangles, and the clamp/snap
//! rules applied to drop coordinates.
//!
//! A container is measured through its *open* sub-section only; closed sub-sections
//! contribute their header height. Nested containers are measured recursively through
//! table lookups, guarded against containment cycles.

mod layout;

pub use layout::{RenderNode, RenderSection, layout};

use crate::config::EngineConfig;
use crate::model::{Node, NodeKind, Scope, Section};
use ahash::AHashSet;
use serde::Serialize;

pub const TASK_WIDTH: f64 = 200.0;
pub const TASK_HEIGHT: f64 = 60.0;
pub const ENTRY_MARKER_WIDTH: f64 = 100.0;
pub const ENTRY_MARKER_HEIGHT: f64 = 40.0;
pub const BLOCK_HEADER_HEIGHT: f64 = 40.0;
pub const SECTION_HEADER_HEIGHT: f64 = 30.0;
pub const SECTION_PADDING: f64 = 20.0;
pub const MIN_SECTION_CONTENT_WIDTH: f64 = 240.0;
pub const MIN_SECTION_CONTENT_HEIGHT: f64 = 80.0;

/// Vertical space taken by the container header plus the three sub-section headers.
const BLOCK_CHROME_HEIGHT: f64 = BLOCK_HEADER_HEIGHT + 3.0 * SECTION_HEADER_HEIGHT;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const TASK: Size = Size {
        width: TASK_WIDTH,
        height: TASK_HEIGHT,
    };
    pub const ENTRY_MARKER: Size = Size {
        width: ENTRY_MARKER_WIDTH,
        height: ENTRY_MARKER_HEIGHT,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The size a node renders at.
pub fn rendered_size(scope: &Scope, id: &str) -> Size {
    match scope.node(id) {
        Some(node) => size_of(scope, &node, &mut AHashSet::new()),
        None => Size::TASK,
    }
}

fn size_of(scope: &Scope, node: &Node, visiting: &mut AHashSet<String>) -> Size {
    match node.kind {
        NodeKind::EntryMarker => Size::ENTRY_MARKER,
        NodeKind::Task => Size {
            width: node.width.unwrap_or(TASK_WIDTH),
            height: node.height.unwrap_or(TASK_HEIGHT),
        },
        NodeKind::Container if node.is_collapsed() => Size::TASK,
        NodeKind::Container => expanded_size(scope, node, visiting),
    }
}

/// Size of a container as if it were expanded, ignoring its collapse flag.
fn expanded_size(scope: &Scope, node: &Node, visiting: &mut AHashSet<String>) -> Size {
    let open = node
        .block
        .as_ref()
        .map(|b| b.open_section)
        .unwrap_or(Section::Primary);
    let content = section_extent(scope, &node.id, open, visiting);
    let computed = Size {
        width: content.width,
        height: BLOCK_CHROME_HEIGHT + content.height,
    };
    Size {
        width: node.width.map_or(computed.width, |w| w.max(computed.width)),
        height: node.height.map_or(computed.height, |h| h.max(computed.height)),
    }
}

/// Minimum content size that fits every member of one sub-section plus its entry marker.
fn section_extent(
    scope: &Scope,
    container: &str,
    section: Section,
    visiting: &mut AHashSet<String>,
) -> Size {
    if !visiting.insert(container.to_string()) {
        tracing::warn!("container '{}' encloses itself, measuring as empty", container);
        return Size {
            width: MIN_SECTION_CONTENT_WIDTH,
            height: MIN_SECTION_CONTENT_HEIGHT,
        };
    }
    let marker = Node::entry_marker(container, section);
    let mut right = marker.x + ENTRY_MARKER_WIDTH;
    let mut bottom = marker.y + ENTRY_MARKER_HEIGHT;
    for child_id in scope.children(container, section) {
        if let Some(child) = scope.stored_node(child_id) {
            let size = size_of(scope, child, visiting);
            right = right.max(child.x + size.width);
            bottom = bottom.max(child.y + size.height);
        }
    }
    visiting.remove(container);
    Size {
        width: (right + SECTION_PADDING).max(MIN_SECTION_CONTENT_WIDTH),
        height: (bottom + SECTION_PADDING).max(MIN_SECTION_CONTENT_HEIGHT),
    }
}

/// Content rectangle of a section, in the coordinate space of its members.
///
/// Scope-level sections use the configured canvas size. A container's open sub-section
/// receives all of the container's height below the headers; a closed one its own
/// minimum extent.
pub fn section_content_rect(
    scope: &Scope,
    config: &EngineConfig,
    parent: Option<&str>,
    section: Section,
) -> Rect {
    let Some(container) = parent.and_then(|id| scope.stored_node(id)) else {
        return Rect {
            x: 0.0,
            y: 0.0,
            width: config.section_width,
            height: config.section_height,
        };
    };
    let mut visiting = AHashSet::new();
    let size = expanded_size(scope, container, &mut visiting);
    let open = container.block.as_ref().map(|b| b.open_section);
    let height = if open == Some(section) {
        size.height - BLOCK_CHROME_HEIGHT
    } else {
        section_extent(scope, &container.id, section, &mut visiting).height
    };
    Rect {
        x: 0.0,
        y: 0.0,
        width: size.width,
        height,
    }
}

/// Keeps a box of `size` at `p` fully inside `rect`. Oversized boxes pin to the top-left.
pub fn clamp_to_rect(p: Point, size: Size, rect: Rect) -> Point {
    let max_x = (rect.x + rect.width - size.width).max(rect.x);
    let max_y = (rect.y + rect.height - size.height).max(rect.y);
    Point {
        x: p.x.max(rect.x).min(max_x),
        y: p.y.max(rect.y).min(max_y),
    }
}

/// Snaps both axes down to a multiple of `unit`.
pub fn snap(p: Point, unit: f64) -> Point {
    if unit <= 0.0 {
        return p;
    }
    Point {
        x: (p.x / unit).floor() * unit,
        y: (p.y / unit).floor() * unit,
    }
}
