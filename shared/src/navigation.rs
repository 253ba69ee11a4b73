use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::decode_section;
use crate::command::Command;
use crate::model::Section;

/// What the shell should have on screen for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Calendar,
    Composer,
    ChallengeDisk,
    TrashBin,
    Profile,
}

impl From<Section> for Surface {
    fn from(section: Section) -> Self {
        match section {
            Section::Diary => Self::Calendar,
            Section::Write => Self::Composer,
            Section::Disk => Self::ChallengeDisk,
            Section::Trash => Self::TrashBin,
            Section::Profile => Self::Profile,
        }
    }
}

#[derive(Debug, Default)]
pub struct NavigationBridge {
    active: Section,
    last_non_compose: Section,
}

impl NavigationBridge {
    /// Switches the active section. Non-transient sections become the
    /// return target and are persisted when they change.
    pub fn activate(&mut self, section: Section) -> Vec<Command> {
        self.active = section;
        if section.is_transient() {
            return Vec::new();
        }

        let changed = self.last_non_compose != section;
        self.last_non_compose = section;
        if changed {
            debug!(section = section.as_str(), "section activated");
            vec![Command::PersistSection(section)]
        } else {
            Vec::new()
        }
    }

    /// Reads the persisted section. Missing or unreadable values fall back
    /// to the diary.
    pub fn restore(&mut self, stored: Option<&[u8]>) -> Section {
        let section = match stored.map(decode_section) {
            Some(Ok(section)) if !section.is_transient() => section,
            Some(Ok(section)) => {
                warn!(section = section.as_str(), "transient section was persisted");
                Section::Diary
            }
            Some(Err(e)) => {
                warn!(error = %e, "persisted section unreadable");
                Section::Diary
            }
            None => Section::Diary,
        };
        self.active = section;
        self.last_non_compose = section;
        section
    }

    #[must_use]
    pub const fn active(&self) -> Section {
        self.active
    }

    #[must_use]
    pub const fn last_non_compose(&self) -> Section {
        self.last_non_compose
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.active.into()
    }
}
