use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capabilities::{JournalResult, TimerId};
use crate::command::Reply;
use crate::config::EngineConfig;
use crate::model::{ChallengeId, DraftField, LocalImage, RecordId, Section};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub enum Event {
    #[default]
    Noop,

    // --- Lifecycle ---
    AppStarted {
        today: NaiveDate,
    },
    SessionChanged {
        logged_in: bool,
        nickname: Option<String>,
    },
    ConfigUpdated(Box<EngineConfig>),

    // --- Navigation ---
    SectionSelected(Section),
    BackRequested,
    RefreshRequested,

    // --- Browse ---
    MonthChanged {
        year: i32,
        month: u32,
    },
    DateSelected(NaiveDate),
    RecordSelected(RecordId),
    ComposeRequested,
    ChallengeOpened(ChallengeId),
    JoinChallengeRequested(ChallengeId),
    RestoreRequested(RecordId),
    PurgeRequested(RecordId),

    // --- Detail ---
    EditRequested(RecordId),
    DeleteRequested(RecordId),
    CreateInScopeRequested,

    // --- Compose ---
    DraftChanged(DraftField),
    ImagePicked(LocalImage),
    ImageRemoved {
        index: usize,
    },
    ChallengeAttachRequested(ChallengeId),
    ChallengeDetached,
    SubmitRequested,

    // --- Banners ---
    NotificationDismissed,
    ErrorDismissed,
    CompletionAcknowledged,

    // --- Shell responses ---
    #[serde(skip)]
    JournalResponded {
        reply: Reply,
        result: Box<JournalResult>,
    },
    #[serde(skip)]
    TimerFired {
        id: TimerId,
    },
    #[serde(skip)]
    SectionLoaded(Option<Vec<u8>>),
    #[serde(skip)]
    SectionPersisted {
        ok: bool,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted { .. } => "app_started",
            Self::SessionChanged { .. } => "session_changed",
            Self::ConfigUpdated(_) => "config_updated",
            Self::SectionSelected(_) => "section_selected",
            Self::BackRequested => "back_requested",
            Self::RefreshRequested => "refresh_requested",
            Self::MonthChanged { .. } => "month_changed",
            Self::DateSelected(_) => "date_selected",
            Self::RecordSelected(_) => "record_selected",
            Self::ComposeRequested => "compose_requested",
            Self::ChallengeOpened(_) => "challenge_opened",
            Self::JoinChallengeRequested(_) => "join_challenge_requested",
            Self::RestoreRequested(_) => "restore_requested",
            Self::PurgeRequested(_) => "purge_requested",
            Self::EditRequested(_) => "edit_requested",
            Self::DeleteRequested(_) => "delete_requested",
            Self::CreateInScopeRequested => "create_in_scope_requested",
            Self::DraftChanged(_) => "draft_changed",
            Self::ImagePicked(_) => "image_picked",
            Self::ImageRemoved { .. } => "image_removed",
            Self::ChallengeAttachRequested(_) => "challenge_attach_requested",
            Self::ChallengeDetached => "challenge_detached",
            Self::SubmitRequested => "submit_requested",
            Self::NotificationDismissed => "notification_dismissed",
            Self::ErrorDismissed => "error_dismissed",
            Self::CompletionAcknowledged => "completion_acknowledged",
            Self::JournalResponded { .. } => "journal_responded",
            Self::TimerFired { .. } => "timer_fired",
            Self::SectionLoaded(_) => "section_loaded",
            Self::SectionPersisted { .. } => "section_persisted",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Noop
                | Self::JournalResponded { .. }
                | Self::TimerFired { .. }
                | Self::SectionLoaded(_)
                | Self::SectionPersisted { .. }
        )
    }
}
