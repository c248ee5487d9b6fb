use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A named membership slot.
///
/// The first four variants are the scope-level task sections of a play; the last three are
/// the sub-sections every container owns. Links are typed by the same identifiers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[serde(alias = "pre_tasks")]
    #[strum(to_string = "pre", serialize = "pre_tasks")]
    Pre,
    #[serde(alias = "tasks")]
    #[strum(to_string = "main", serialize = "tasks")]
    Main,
    #[serde(alias = "post_tasks")]
    #[strum(to_string = "post", serialize = "post_tasks")]
    Post,
    #[strum(to_string = "handlers")]
    Handlers,
    #[serde(alias = "block")]
    #[strum(to_string = "primary", serialize = "block")]
    Primary,
    #[serde(alias = "rescue")]
    #[strum(to_string = "fallback", serialize = "rescue")]
    Fallback,
    #[serde(alias = "always")]
    #[strum(to_string = "final", serialize = "always")]
    Final,
}

/// A link's type is the identifier of the section its chain runs in.
pub type LinkType = Section;

impl Section {
    pub const SCOPE_LEVEL: [Section; 4] = [
        Section::Pre,
        Section::Main,
        Section::Post,
        Section::Handlers,
    ];

    pub const BLOCK_LEVEL: [Section; 3] = [Section::Primary, Section::Fallback, Section::Final];

    pub fn is_scope_level(self) -> bool {
        Self::SCOPE_LEVEL.contains(&self)
    }

    pub fn is_block_level(self) -> bool {
        Self::BLOCK_LEVEL.contains(&self)
    }
}

/// Scope-level panels that toggle independently of the task-section accordion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Panel {
    Variables,
    Roles,
}
