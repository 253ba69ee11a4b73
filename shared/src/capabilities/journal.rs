use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    Challenge, ChallengeId, Emotion, LocalImage, Record, RecordId, RemoteImage, Scope,
};

/// Persistence API, performed by the shell against the journal backend.
pub struct Journal<Ev> {
    context: CapabilityContext<JournalOperation, Ev>,
}

impl<Ev> Capability<Ev> for Journal<Ev> {
    type Operation = JournalOperation;
    type MappedSelf<MappedEv> = Journal<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Journal::new(self.context.map_event(f))
    }
}

impl<Ev> Journal<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<JournalOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn request<F>(&self, operation: JournalOperation, make_event: F)
    where
        F: FnOnce(JournalResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRecord {
    pub submission: Uuid,
    pub content: String,
    pub emotion: Emotion,
    pub images: Vec<LocalImage>,
    pub challenge: Option<ChallengeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordChanges {
    pub submission: Uuid,
    pub id: RecordId,
    pub content: String,
    pub emotion: Emotion,
    pub new_images: Vec<LocalImage>,
    pub removed_images: Vec<RemoteImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum JournalOperation {
    CreateRecord(NewRecord),
    UpdateRecord(RecordChanges),
    /// Moves the record to the trash bin.
    DeleteRecord { id: RecordId },
    FetchRecords { scope: Scope },
    FetchRecord { id: RecordId },
    FetchMonth { year: i32, month: u32 },
    FetchChallenge { id: ChallengeId },
    FetchMyChallenges,
    JoinChallenge { id: ChallengeId },
    FetchTrash,
    RestoreRecord { id: RecordId },
    PurgeRecord { id: RecordId },
}

impl JournalOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateRecord(_) => "create_record",
            Self::UpdateRecord(_) => "update_record",
            Self::DeleteRecord { .. } => "delete_record",
            Self::FetchRecords { .. } => "fetch_records",
            Self::FetchRecord { .. } => "fetch_record",
            Self::FetchMonth { .. } => "fetch_month",
            Self::FetchChallenge { .. } => "fetch_challenge",
            Self::FetchMyChallenges => "fetch_my_challenges",
            Self::JoinChallenge { .. } => "join_challenge",
            Self::FetchTrash => "fetch_trash",
            Self::RestoreRecord { .. } => "restore_record",
            Self::PurgeRecord { .. } => "purge_record",
        }
    }

    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateRecord(_)
                | Self::UpdateRecord(_)
                | Self::DeleteRecord { .. }
                | Self::JoinChallenge { .. }
                | Self::RestoreRecord { .. }
                | Self::PurgeRecord { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum JournalOutput {
    Record(Record),
    Records(Vec<Record>),
    Challenge(Challenge),
    Challenges(Vec<Challenge>),
    Done,
}

impl JournalOutput {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Records(_) => "records",
            Self::Challenge(_) => "challenge",
            Self::Challenges(_) => "challenges",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiFailure {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("not found")]
    NotFound,

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("session is no longer valid")]
    Unauthorized,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

impl ApiFailure {
    /// Maps a raw HTTP status from the shell's client onto the failure kinds
    /// the engine distinguishes.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::Validation { message },
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            409 => Self::Conflict { message },
            _ => Self::Server { status, message },
        }
    }

    /// The shell answered with an output of the wrong shape.
    #[must_use]
    pub fn unexpected(output: &JournalOutput) -> Self {
        Self::Server {
            status: 0,
            message: format!("unexpected {} response", output.kind()),
        }
    }
}

pub type JournalResult = Result<JournalOutput, ApiFailure>;

impl Operation for JournalOperation {
    type Output = JournalResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_known_codes() {
        assert_eq!(
            ApiFailure::from_status(400, "bad"),
            ApiFailure::Validation {
                message: "bad".into()
            }
        );
        assert_eq!(ApiFailure::from_status(401, ""), ApiFailure::Unauthorized);
        assert_eq!(ApiFailure::from_status(404, ""), ApiFailure::NotFound);
        assert!(matches!(
            ApiFailure::from_status(409, "taken"),
            ApiFailure::Conflict { .. }
        ));
        assert!(matches!(
            ApiFailure::from_status(503, "down"),
            ApiFailure::Server { status: 503, .. }
        ));
    }

    #[test]
    fn test_mutations_are_flagged() {
        assert!(JournalOperation::DeleteRecord {
            id: RecordId::new("1")
        }
        .is_mutation());
        assert!(!JournalOperation::FetchTrash.is_mutation());
        assert_eq!(JournalOperation::FetchMyChallenges.name(), "fetch_my_challenges");
    }

    #[test]
    fn test_failure_wire_format_is_tagged() {
        let json = serde_json::to_value(ApiFailure::NotFound).unwrap();
        assert_eq!(json["kind"], "not_found");
    }
}
