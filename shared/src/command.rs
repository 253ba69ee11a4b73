//! Commands are what the engine asks the outside world to do. The Crux app
//! turns each one into a capability request; tests inspect them directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capabilities::{JournalOperation, TimerId};
use crate::model::{BrowseScope, ChallengeId, RecordId, Scope, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadMode {
    /// The user is waiting on it; failures are surfaced.
    Foreground,
    /// Refresh after a mutation; failures are logged and dropped.
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusPurpose {
    /// User asked to tie the draft to this challenge.
    Attach,
    /// Draft arrived with the challenge preset; remember where it started.
    Baseline,
    /// Delayed check after a submission.
    Recheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrashAction {
    Restore,
    Purge,
}

/// Routing tag carried through a journal request and handed back with its
/// result, so the reply reaches the component that asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Submitted { submission: Uuid },
    Hydrated { record: RecordId },
    Timeline { scope: Scope, token: u64, mode: LoadMode },
    Deleted { record: RecordId, scope: Scope },
    ChallengeStatus { challenge: ChallengeId, purpose: StatusPurpose },
    Browse { scope: BrowseScope, token: u64, mode: LoadMode },
    Challenges { mode: LoadMode },
    Joined { challenge: ChallengeId },
    Trash { record: RecordId, action: TrashAction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Api {
        operation: JournalOperation,
        reply: Reply,
    },
    StartTimer {
        id: TimerId,
        after_ms: u64,
    },
    CancelTimer {
        id: TimerId,
    },
    LoadSection,
    PersistSection(Section),
    Render,
}

impl Command {
    #[must_use]
    pub fn api(operation: JournalOperation, reply: Reply) -> Self {
        Self::Api { operation, reply }
    }
}
