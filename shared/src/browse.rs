use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::capabilities::{ApiFailure, JournalOperation, JournalOutput};
use crate::command::{LoadMode, TrashAction};
use crate::model::{BrowseScope, Challenge, Record, RecordId};
use crate::timeline::{FetchOutcome, LoadState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseData {
    Calendar { records: Vec<Record> },
    Challenges { challenges: Vec<Challenge> },
    Trash { records: Vec<Record> },
    Profile,
}

impl BrowseData {
    fn empty(scope: BrowseScope) -> Self {
        match scope {
            BrowseScope::Calendar { .. } => Self::Calendar {
                records: Vec::new(),
            },
            BrowseScope::Challenges => Self::Challenges {
                challenges: Vec::new(),
            },
            BrowseScope::Trash => Self::Trash {
                records: Vec::new(),
            },
            BrowseScope::Profile => Self::Profile,
        }
    }
}

/// Data behind `Browse(scope)`: a month of the calendar, the challenge disk
/// or the trash bin.
#[derive(Debug)]
pub struct BrowseView {
    scope: BrowseScope,
    data: BrowseData,
    load: LoadState,
    processing: Option<(RecordId, TrashAction)>,
}

impl BrowseView {
    /// Builds the view and the fetch that fills it, if the scope has one.
    pub fn open(scope: BrowseScope, token: u64) -> (Self, Option<JournalOperation>) {
        let operation = Self::fetch_for(scope);
        let load = if operation.is_some() {
            LoadState::Loading {
                token,
                mode: LoadMode::Foreground,
            }
        } else {
            LoadState::Ready
        };
        let view = Self {
            scope,
            data: BrowseData::empty(scope),
            load,
            processing: None,
        };
        (view, operation)
    }

    /// A view with nothing loaded and nothing requested, used before the
    /// session is known.
    #[must_use]
    pub fn idle(scope: BrowseScope) -> Self {
        Self {
            scope,
            data: BrowseData::empty(scope),
            load: LoadState::Ready,
            processing: None,
        }
    }

    pub fn reload(&mut self, token: u64, mode: LoadMode) -> Option<JournalOperation> {
        let operation = Self::fetch_for(self.scope)?;
        self.load = LoadState::Loading { token, mode };
        Some(operation)
    }

    fn fetch_for(scope: BrowseScope) -> Option<JournalOperation> {
        match scope {
            BrowseScope::Calendar { year, month } => Some(JournalOperation::FetchMonth { year, month }),
            BrowseScope::Challenges => Some(JournalOperation::FetchMyChallenges),
            BrowseScope::Trash => Some(JournalOperation::FetchTrash),
            BrowseScope::Profile => None,
        }
    }

    pub fn apply_fetch(
        &mut self,
        scope: BrowseScope,
        token: u64,
        result: Result<JournalOutput, ApiFailure>,
    ) -> FetchOutcome {
        if self.scope != scope || !self.load.accepts(token) {
            debug!(?scope, token, "stale browse reply dropped");
            return FetchOutcome::Stale;
        }
        let background = matches!(
            self.load,
            LoadState::Loading {
                mode: LoadMode::Background,
                ..
            }
        );

        let result = result.and_then(|output| match (scope, output) {
            (BrowseScope::Calendar { .. }, JournalOutput::Records(records)) => {
                Ok(BrowseData::Calendar { records })
            }
            (BrowseScope::Trash, JournalOutput::Records(records)) => Ok(BrowseData::Trash { records }),
            (BrowseScope::Challenges, JournalOutput::Challenges(challenges)) => {
                Ok(BrowseData::Challenges { challenges })
            }
            (_, other) => Err(ApiFailure::unexpected(&other)),
        });

        match result {
            Ok(data) => {
                self.data = data;
                self.load = LoadState::Ready;
                FetchOutcome::Applied
            }
            Err(failure) if background => {
                warn!(error = %failure, ?scope, "background browse refresh failed");
                self.load = LoadState::Ready;
                FetchOutcome::Dropped(failure)
            }
            Err(failure) => {
                self.load = LoadState::Failed;
                FetchOutcome::Failed(failure)
            }
        }
    }

    /// Records the calendar holds for `date`, oldest first.
    #[must_use]
    pub fn records_on(&self, date: NaiveDate) -> Vec<&Record> {
        match &self.data {
            BrowseData::Calendar { records } => records.iter().filter(|r| r.date == date).collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn find_record(&self, id: &RecordId) -> Option<&Record> {
        match &self.data {
            BrowseData::Calendar { records } | BrowseData::Trash { records } => {
                records.iter().find(|r| &r.id == id)
            }
            BrowseData::Challenges { .. } | BrowseData::Profile => None,
        }
    }

    /// Starts a restore or purge. Only one trash action runs at a time.
    pub fn begin_trash_action(&mut self, id: &RecordId, action: TrashAction) -> Option<JournalOperation> {
        if self.processing.is_some() || !matches!(self.data, BrowseData::Trash { .. }) {
            return None;
        }
        self.find_record(id)?;
        self.processing = Some((id.clone(), action));
        Some(match action {
            TrashAction::Restore => JournalOperation::RestoreRecord { id: id.clone() },
            TrashAction::Purge => JournalOperation::PurgeRecord { id: id.clone() },
        })
    }

    /// Returns false for a reply this view was not waiting on.
    pub fn finish_trash_action(&mut self, id: &RecordId, succeeded: bool) -> bool {
        if self.processing.as_ref().map(|(pending, _)| pending) != Some(id) {
            return false;
        }
        self.processing = None;
        if succeeded {
            if let BrowseData::Trash { records } = &mut self.data {
                records.retain(|r| &r.id != id);
            }
        }
        true
    }

    #[must_use]
    pub const fn scope(&self) -> BrowseScope {
        self.scope
    }

    #[must_use]
    pub const fn data(&self) -> &BrowseData {
        &self.data
    }

    #[must_use]
    pub const fn load(&self) -> LoadState {
        self.load
    }

    #[must_use]
    pub fn processing(&self) -> Option<&RecordId> {
        self.processing.as_ref().map(|(id, _)| id)
    }
}
