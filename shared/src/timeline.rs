use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::{ApiFailure, JournalOperation};
use crate::command::LoadMode;
use crate::model::{Record, RecordId, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Loading { token: u64, mode: LoadMode },
    Ready,
    Failed,
}

impl LoadState {
    #[must_use]
    pub const fn accepts(self, token: u64) -> bool {
        matches!(self, Self::Loading { token: t, .. } if t == token)
    }

    #[must_use]
    pub const fn is_foreground_loading(self) -> bool {
        matches!(
            self,
            Self::Loading {
                mode: LoadMode::Foreground,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// Reply for another scope or an outdated load.
    Stale,
    /// Foreground failure the user should see.
    Failed(ApiFailure),
    /// Background failure; the previous list stays.
    Dropped(ApiFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Remaining,
    Emptied,
    Failed(ApiFailure),
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineIntent {
    Edit(Record),
    Delete(RecordId),
}

/// Records for one date or one challenge. A new view is built on every
/// entry into Detail, so its list is always a complete fetch for the scope.
#[derive(Debug)]
pub struct TimelineView {
    scope: Scope,
    heading: Option<String>,
    records: Vec<Record>,
    load: LoadState,
    just_completed: bool,
    deleting: Option<RecordId>,
}

impl TimelineView {
    pub fn open(scope: Scope, heading: Option<String>, token: u64) -> (Self, JournalOperation) {
        let operation = JournalOperation::FetchRecords {
            scope: scope.clone(),
        };
        let view = Self {
            scope,
            heading,
            records: Vec::new(),
            load: LoadState::Loading {
                token,
                mode: LoadMode::Foreground,
            },
            just_completed: false,
            deleting: None,
        };
        (view, operation)
    }

    /// Flags that this timeline was reached by saving a handed-off draft.
    pub fn mark_just_completed(&mut self) {
        self.just_completed = true;
    }

    pub fn reload(&mut self, token: u64, mode: LoadMode) -> JournalOperation {
        self.load = LoadState::Loading { token, mode };
        JournalOperation::FetchRecords {
            scope: self.scope.clone(),
        }
    }

    pub fn apply_fetch(
        &mut self,
        scope: &Scope,
        token: u64,
        result: Result<Vec<Record>, ApiFailure>,
    ) -> FetchOutcome {
        if &self.scope != scope || !self.load.accepts(token) {
            debug!(?scope, token, "stale timeline reply dropped");
            return FetchOutcome::Stale;
        }

        let mode = match self.load {
            LoadState::Loading { mode, .. } => mode,
            LoadState::Ready | LoadState::Failed => LoadMode::Foreground,
        };

        match result {
            Ok(records) => {
                if self.heading.is_none() {
                    self.heading = records.iter().find_map(|r| r.challenge_title.clone());
                }
                self.records = records;
                self.load = LoadState::Ready;
                FetchOutcome::Applied
            }
            Err(failure) if mode == LoadMode::Background => {
                warn!(error = %failure, scope = ?self.scope, "background timeline refresh failed");
                self.load = LoadState::Ready;
                FetchOutcome::Dropped(failure)
            }
            Err(failure) => {
                self.load = LoadState::Failed;
                FetchOutcome::Failed(failure)
            }
        }
    }

    #[must_use]
    pub fn on_edit(&self, id: &RecordId) -> Option<TimelineIntent> {
        self.find(id).cloned().map(TimelineIntent::Edit)
    }

    /// One delete at a time; a second request while one is pending is
    /// refused.
    pub fn on_delete(&mut self, id: &RecordId) -> Option<TimelineIntent> {
        if self.deleting.is_some() || self.find(id).is_none() {
            return None;
        }
        self.deleting = Some(id.clone());
        Some(TimelineIntent::Delete(id.clone()))
    }

    /// The list only shrinks once the server confirmed the delete.
    pub fn apply_delete(&mut self, id: &RecordId, result: Result<(), ApiFailure>) -> DeleteOutcome {
        if self.deleting.as_ref() != Some(id) {
            return DeleteOutcome::Stale;
        }
        self.deleting = None;

        match result {
            Ok(()) => {
                self.records.retain(|r| &r.id != id);
                if self.records.is_empty() {
                    DeleteOutcome::Emptied
                } else {
                    DeleteOutcome::Remaining
                }
            }
            Err(failure) => DeleteOutcome::Failed(failure),
        }
    }

    #[must_use]
    pub fn find(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub const fn load(&self) -> LoadState {
        self.load
    }

    #[must_use]
    pub const fn just_completed(&self) -> bool {
        self.just_completed
    }

    #[must_use]
    pub fn deleting(&self) -> Option<&RecordId> {
        self.deleting.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChallengeId, Emotion};
    use chrono::{NaiveDate, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()
    }

    fn record(id: &str) -> Record {
        Record {
            id: RecordId::new(id),
            content: format!("entry {id}"),
            emotion: Emotion::Happy,
            images: Vec::new(),
            date: day(),
            created_at: Utc::now(),
            challenge: None,
            challenge_title: None,
        }
    }

    fn loaded(ids: &[&str]) -> TimelineView {
        let scope = Scope::Date(day());
        let (mut view, _) = TimelineView::open(scope.clone(), None, 1);
        let outcome = view.apply_fetch(&scope, 1, Ok(ids.iter().map(|id| record(id)).collect()));
        assert_eq!(outcome, FetchOutcome::Applied);
        view
    }

    #[test]
    fn test_open_requests_its_scope() {
        let scope = Scope::Challenge(ChallengeId::new("5"));
        let (view, operation) = TimelineView::open(scope.clone(), Some("30 days".into()), 3);

        assert_eq!(operation, JournalOperation::FetchRecords { scope });
        assert!(view.load().is_foreground_loading());
        assert_eq!(view.heading(), Some("30 days"));
    }

    #[test]
    fn test_fetch_replaces_list_wholesale() {
        let mut view = loaded(&["1", "2"]);
        let scope = view.scope().clone();
        view.reload(2, LoadMode::Foreground);

        view.apply_fetch(&scope, 2, Ok(vec![record("3")]));

        let ids: Vec<_> = view.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn test_reply_for_other_scope_is_stale() {
        let mut view = loaded(&["1"]);
        view.reload(2, LoadMode::Foreground);

        let other = Scope::Challenge(ChallengeId::new("5"));
        assert_eq!(view.apply_fetch(&other, 2, Ok(Vec::new())), FetchOutcome::Stale);
        assert_eq!(view.records().len(), 1);
    }

    #[test]
    fn test_outdated_token_is_stale() {
        let mut view = loaded(&["1"]);
        let scope = view.scope().clone();
        view.reload(2, LoadMode::Foreground);
        view.reload(3, LoadMode::Foreground);

        assert_eq!(view.apply_fetch(&scope, 2, Ok(Vec::new())), FetchOutcome::Stale);
        assert_eq!(view.apply_fetch(&scope, 3, Ok(Vec::new())), FetchOutcome::Applied);
    }

    #[test]
    fn test_background_failure_keeps_records() {
        let mut view = loaded(&["1"]);
        let scope = view.scope().clone();
        view.reload(2, LoadMode::Background);

        let outcome = view.apply_fetch(&scope, 2, Err(ApiFailure::NotFound));
        assert_eq!(outcome, FetchOutcome::Dropped(ApiFailure::NotFound));
        assert_eq!(view.records().len(), 1);
        assert_eq!(view.load(), LoadState::Ready);
    }

    #[test]
    fn test_foreground_failure_is_reported() {
        let scope = Scope::Date(day());
        let (mut view, _) = TimelineView::open(scope.clone(), None, 1);
        let failure = ApiFailure::Network {
            message: "offline".into(),
        };

        assert_eq!(
            view.apply_fetch(&scope, 1, Err(failure.clone())),
            FetchOutcome::Failed(failure)
        );
        assert_eq!(view.load(), LoadState::Failed);
    }

    #[test]
    fn test_heading_falls_back_to_record_challenge_title() {
        let scope = Scope::Challenge(ChallengeId::new("5"));
        let (mut view, _) = TimelineView::open(scope.clone(), None, 1);
        let mut tied = record("1");
        tied.challenge_title = Some("30 days".into());

        view.apply_fetch(&scope, 1, Ok(vec![tied]));
        assert_eq!(view.heading(), Some("30 days"));
    }

    #[test]
    fn test_edit_intent_carries_the_record() {
        let view = loaded(&["1"]);
        assert_eq!(
            view.on_edit(&RecordId::new("1")),
            Some(TimelineIntent::Edit(record_like(&view, "1")))
        );
        assert_eq!(view.on_edit(&RecordId::new("9")), None);
    }

    fn record_like(view: &TimelineView, id: &str) -> Record {
        view.find(&RecordId::new(id)).cloned().unwrap()
    }

    #[test]
    fn test_delete_last_record_empties_scope() {
        let mut view = loaded(&["1"]);
        let id = RecordId::new("1");

        assert_eq!(view.on_delete(&id), Some(TimelineIntent::Delete(id.clone())));
        assert_eq!(view.apply_delete(&id, Ok(())), DeleteOutcome::Emptied);
        assert!(view.records().is_empty());
    }

    #[test]
    fn test_delete_one_of_several_keeps_remainder() {
        let mut view = loaded(&["1", "2"]);
        let id = RecordId::new("1");

        view.on_delete(&id);
        assert_eq!(view.apply_delete(&id, Ok(())), DeleteOutcome::Remaining);
        assert_eq!(view.records().len(), 1);
        assert_eq!(view.records()[0].id, RecordId::new("2"));
    }

    #[test]
    fn test_failed_delete_leaves_list_untouched() {
        let mut view = loaded(&["1", "2"]);
        let id = RecordId::new("1");

        view.on_delete(&id);
        let outcome = view.apply_delete(
            &id,
            Err(ApiFailure::Network {
                message: "offline".into(),
            }),
        );
        assert!(matches!(outcome, DeleteOutcome::Failed(_)));
        assert_eq!(view.records().len(), 2);
        assert!(view.deleting().is_none());
    }

    #[test]
    fn test_only_one_delete_at_a_time() {
        let mut view = loaded(&["1", "2"]);
        assert!(view.on_delete(&RecordId::new("1")).is_some());
        assert!(view.on_delete(&RecordId::new("2")).is_none());
    }
}
