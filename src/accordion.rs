//! Which scope-level sections a participant has expanded.
//!
//! The four task sections form an accordion: exactly one is open, opening another closes
//! the rest, and re-opening the open one does nothing. The variables and roles panels
//! toggle on their own. This state is per participant and never leaves the process.
//! Container sub-sections follow the same discipline through
//! [`crate::store::EntityStore::open_sub_section`].

use crate::model::{Panel, Section};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accordion {
    open: Section,
    variables_open: bool,
    roles_open: bool,
}

impl Default for Accordion {
    fn default() -> Self {
        Self {
            open: Section::Main,
            variables_open: false,
            roles_open: false,
        }
    }
}

impl Accordion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `section`, closing the other task sections. Returns whether anything changed.
    pub fn open(&mut self, section: Section) -> bool {
        if !section.is_scope_level() || self.open == section {
            return false;
        }
        self.open = section;
        true
    }

    pub fn open_section(&self) -> Section {
        self.open
    }

    pub fn is_open(&self, section: Section) -> bool {
        self.open == section
    }

    /// Flips a panel and returns its new state.
    pub fn toggle_panel(&mut self, panel: Panel) -> bool {
        let flag = match panel {
            Panel::Variables => &mut self.variables_open,
            Panel::Roles => &mut self.roles_open,
        };
        *flag = !*flag;
        *flag
    }

    pub fn is_panel_open(&self, panel: Panel) -> bool {
        match panel {
            Panel::Variables => self.variables_open,
            Panel::Roles => self.roles_open,
        }
    }
}
