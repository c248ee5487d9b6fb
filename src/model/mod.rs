//! Entity model: nodes, links, scopes and the section identifiers that tie them together.

mod link;
mod node;
mod scope;
mod section;

pub use link::Link;
pub use node::{Attributes, BlockState, Node, NodeKind, SourceRef, merge_attributes};
pub use scope::{Scope, Variable, VariableType};
pub use section::{LinkType, Panel, Section};
