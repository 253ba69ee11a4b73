use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::browse::BrowseData;
use crate::composer::EntryComposer;
use crate::controller::{ViewController, ViewState};
use crate::model::{
    BrowseScope, Challenge, ChallengeId, ChallengeStatus, Emotion, ImageRef, Record, RecordId,
    Scope, Section,
};
use crate::navigation::Surface;
use crate::notification::{Notification, NotificationKind};
use crate::timeline::{LoadState, TimelineView};
use crate::tracker::Completion;
use crate::{AppError, ErrorSeverity};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationView {
    pub message: String,
    pub kind: NotificationKind,
    pub duration_ms: u64,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            message: n.message.clone(),
            kind: n.kind,
            duration_ms: n.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionView {
    pub challenge_id: String,
    pub title: String,
    pub is_success: bool,
}

impl From<&Completion> for CompletionView {
    fn from(c: &Completion) -> Self {
        Self {
            challenge_id: c.challenge.to_string(),
            title: c.title.clone(),
            is_success: c.is_success,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordView {
    pub id: String,
    pub content: String,
    pub emotion: Emotion,
    pub emotion_label: String,
    pub image_urls: Vec<String>,
    pub date: NaiveDate,
    pub challenge_title: Option<String>,
}

impl From<&Record> for RecordView {
    fn from(r: &Record) -> Self {
        Self {
            id: r.id.to_string(),
            content: r.content.clone(),
            emotion: r.emotion,
            emotion_label: r.emotion.label().to_string(),
            image_urls: r.images.iter().map(|i| i.as_str().to_string()).collect(),
            date: r.date,
            challenge_title: r.challenge_title.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeView {
    pub id: String,
    pub title: String,
    pub status: ChallengeStatus,
    pub progress_days: u32,
    pub duration_days: u32,
}

impl From<&Challenge> for ChallengeView {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id.to_string(),
            title: c.title.clone(),
            status: c.status,
            progress_days: c.progress_days,
            duration_days: c.duration_days,
        }
    }
}

/// One calendar cell with entries; days without entries are omitted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarDay {
    pub day: u32,
    pub emotion: Emotion,
    pub entry_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Screen {
    Calendar {
        year: i32,
        month: u32,
        days: Vec<CalendarDay>,
        is_loading: bool,
    },
    Challenges {
        active: Vec<ChallengeView>,
        finished: Vec<ChallengeView>,
        is_loading: bool,
    },
    Trash {
        items: Vec<RecordView>,
        processing: Option<String>,
        is_loading: bool,
    },
    Profile {
        nickname: Option<String>,
        completed_count: usize,
    },
    Compose {
        content: String,
        emotion: Emotion,
        images: Vec<ImageRef>,
        challenge: Option<String>,
        available_challenges: Vec<ChallengeView>,
        is_editing: bool,
        is_submitting: bool,
        can_submit: bool,
        attach_pending: bool,
    },
    Detail {
        scope: Scope,
        heading: Option<String>,
        records: Vec<RecordView>,
        is_loading: bool,
        load_failed: bool,
        just_completed: bool,
        deleting: Option<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub title: String,
    pub section: Section,
    pub surface: Surface,
    pub is_composing: bool,
    pub is_logged_in: bool,
    pub screen: Screen,
    pub notification: Option<NotificationView>,
    pub error: Option<UserFacingError>,
    pub completion: Option<CompletionView>,
}

impl From<&ViewController> for ViewModel {
    fn from(controller: &ViewController) -> Self {
        let screen = match controller.state() {
            ViewState::Browse(view) => {
                let is_loading = view.load().is_foreground_loading();
                match (view.scope(), view.data()) {
                    (BrowseScope::Calendar { year, month }, BrowseData::Calendar { records }) => {
                        Screen::Calendar {
                            year,
                            month,
                            days: calendar_days(records),
                            is_loading,
                        }
                    }
                    (_, BrowseData::Challenges { challenges }) => {
                        let (finished, active): (Vec<_>, Vec<_>) =
                            challenges.iter().partition(|c| c.status.is_terminal());
                        Screen::Challenges {
                            active: active.into_iter().map(ChallengeView::from).collect(),
                            finished: finished.into_iter().map(ChallengeView::from).collect(),
                            is_loading,
                        }
                    }
                    (_, BrowseData::Trash { records }) => Screen::Trash {
                        items: records.iter().map(RecordView::from).collect(),
                        processing: view.processing().map(RecordId::to_string),
                        is_loading,
                    },
                    (BrowseScope::Calendar { year, month }, _) => Screen::Calendar {
                        year,
                        month,
                        days: Vec::new(),
                        is_loading,
                    },
                    (_, BrowseData::Calendar { .. } | BrowseData::Profile) => Screen::Profile {
                        nickname: controller.nickname().map(str::to_string),
                        completed_count: controller
                            .challenges()
                            .iter()
                            .filter(|c| c.status == ChallengeStatus::Completed)
                            .count(),
                    },
                }
            }
            ViewState::Compose(composer) => compose_screen(composer, controller.challenges()),
            ViewState::Detail(view) => detail_screen(view),
        };

        Self {
            title: controller.current_title(),
            section: controller.section(),
            surface: controller.surface(),
            is_composing: controller.is_composing(),
            is_logged_in: controller.is_logged_in(),
            screen,
            notification: controller.notification().map(NotificationView::from),
            error: controller.error().map(UserFacingError::from),
            completion: controller.completion().map(CompletionView::from),
        }
    }
}

/// Groups a month of records by day. The latest entry of the day sets the
/// cell's emotion.
fn calendar_days(records: &[Record]) -> Vec<CalendarDay> {
    let mut days: Vec<CalendarDay> = Vec::new();
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by_key(|r| (r.date, r.created_at));

    for record in sorted {
        let day = record.date.day();
        match days.last_mut() {
            Some(cell) if cell.day == day => {
                cell.emotion = record.emotion;
                cell.entry_count += 1;
            }
            _ => days.push(CalendarDay {
                day,
                emotion: record.emotion,
                entry_count: 1,
            }),
        }
    }
    days
}

fn compose_screen(composer: &EntryComposer, challenges: &[Challenge]) -> Screen {
    let draft = composer.draft();
    Screen::Compose {
        content: draft.content.clone(),
        emotion: draft.emotion,
        images: draft.images(),
        challenge: draft.challenge.as_ref().map(ChallengeId::to_string),
        available_challenges: challenges
            .iter()
            .filter(|c| c.status == ChallengeStatus::Active)
            .map(ChallengeView::from)
            .collect(),
        is_editing: composer.editing().is_some(),
        is_submitting: composer.is_submitting(),
        can_submit: !composer.is_submitting() && !draft.is_blank(),
        attach_pending: composer.pending_attach().is_some(),
    }
}

fn detail_screen(view: &TimelineView) -> Screen {
    Screen::Detail {
        scope: view.scope().clone(),
        heading: view.heading().map(str::to_string),
        records: view.records().iter().map(RecordView::from).collect(),
        is_loading: view.load().is_foreground_loading(),
        load_failed: view.load() == LoadState::Failed,
        just_completed: view.just_completed(),
        deleting: view.deleting().map(RecordId::to_string),
    }
}
