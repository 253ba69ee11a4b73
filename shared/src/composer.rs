use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::capabilities::{JournalOperation, NewRecord, RecordChanges};
use crate::config::EngineConfig;
use crate::model::{
    BrowseScope, ChallengeId, ChallengeStatus, Draft, DraftField, LocalImage, Record, RecordId,
    Scope, ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("This challenge has already ended.")]
    ChallengeClosed {
        challenge: ChallengeId,
        status: ChallengeStatus,
    },

    #[error("A saved entry cannot be moved to a challenge.")]
    ChallengeLocked,
}

/// Where cancel returns to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameFrom {
    Browse(BrowseScope),
    Detail {
        scope: Scope,
        heading: Option<String>,
    },
}

/// Set only for the "write with challenge" handoff from a challenge
/// timeline; a successful save lands back on this timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub scope: Scope,
    pub heading: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: Uuid,
    pub operation: JournalOperation,
}

#[derive(Debug)]
pub struct EntryComposer {
    draft: Draft,
    editing: Option<RecordId>,
    came_from: CameFrom,
    origin: Option<Origin>,
    in_flight: Option<Uuid>,
    pending_attach: Option<ChallengeId>,
}

impl EntryComposer {
    #[must_use]
    pub fn new(came_from: CameFrom) -> Self {
        Self {
            draft: Draft::blank(),
            editing: None,
            came_from,
            origin: None,
            in_flight: None,
            pending_attach: None,
        }
    }

    /// Blank draft already tied to `challenge`, returning to `origin` on save.
    #[must_use]
    pub fn for_challenge(came_from: CameFrom, origin: Origin, challenge: ChallengeId) -> Self {
        let mut composer = Self::new(came_from);
        composer.draft.challenge = Some(challenge);
        composer.origin = Some(origin);
        composer
    }

    #[must_use]
    pub fn for_edit(record: &Record, came_from: CameFrom) -> Self {
        let mut composer = Self::new(came_from);
        composer.draft = Draft::from_record(record);
        composer.editing = Some(record.id.clone());
        composer
    }

    pub fn set_field(&mut self, field: DraftField) {
        self.draft.apply(field);
    }

    pub fn add_image(&mut self, image: LocalImage, config: &EngineConfig) -> Result<(), ComposeError> {
        let count = self.draft.image_count() + 1;
        if count > config.max_images {
            return Err(ValidationError::TooManyImages {
                count,
                max: config.max_images,
            }
            .into());
        }
        self.draft.add_image(image);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> bool {
        self.draft.remove_image(index)
    }

    /// Marks `challenge` as awaiting a status check before it can be tied to
    /// the draft.
    pub fn request_attach(&mut self, challenge: ChallengeId) -> Result<(), ComposeError> {
        if self.editing.is_some() {
            return Err(ComposeError::ChallengeLocked);
        }
        self.pending_attach = Some(challenge);
        Ok(())
    }

    /// Resolves a pending attach. `Ok(false)` means the answer was for a
    /// challenge the user is no longer attaching. A terminal challenge is
    /// refused and the draft left as it was.
    pub fn resolve_attach(
        &mut self,
        challenge: &ChallengeId,
        status: ChallengeStatus,
    ) -> Result<bool, ComposeError> {
        if self.pending_attach.as_ref() != Some(challenge) {
            return Ok(false);
        }
        self.pending_attach = None;

        if status.is_terminal() {
            return Err(ComposeError::ChallengeClosed {
                challenge: challenge.clone(),
                status,
            });
        }
        self.draft.challenge = Some(challenge.clone());
        Ok(true)
    }

    pub fn abandon_attach(&mut self, challenge: &ChallengeId) {
        if self.pending_attach.as_ref() == Some(challenge) {
            self.pending_attach = None;
        }
    }

    pub fn detach_challenge(&mut self) {
        self.pending_attach = None;
        self.draft.challenge = None;
    }

    /// Single-flight entry point. Returns `Ok(None)` when a submission is
    /// already in flight or the content is blank; nothing changes then.
    pub fn begin_submit(&mut self, config: &EngineConfig) -> Result<Option<Submission>, ComposeError> {
        if let Some(in_flight) = self.in_flight {
            debug!(submission = %in_flight, "submit ignored, one already in flight");
            return Ok(None);
        }
        if self.draft.is_blank() {
            debug!("submit ignored, content is blank");
            return Ok(None);
        }
        self.validate(config)?;

        let id = Uuid::new_v4();
        self.in_flight = Some(id);

        let operation = match &self.editing {
            Some(record) => JournalOperation::UpdateRecord(RecordChanges {
                submission: id,
                id: record.clone(),
                content: self.draft.content.clone(),
                emotion: self.draft.emotion,
                new_images: self.draft.new_images.clone(),
                removed_images: self.draft.removed_images.clone(),
            }),
            None => JournalOperation::CreateRecord(NewRecord {
                submission: id,
                content: self.draft.content.clone(),
                emotion: self.draft.emotion,
                images: self.draft.new_images.clone(),
                challenge: self.draft.challenge.clone(),
            }),
        };

        info!(submission = %id, op = operation.name(), "submitting entry");
        Ok(Some(Submission { id, operation }))
    }

    /// Clears the in-flight guard if `submission` is the one in flight.
    pub fn settle(&mut self, submission: Uuid) -> bool {
        if self.in_flight != Some(submission) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// After a successful save: the challenge tie and image staging go away.
    /// Returns the challenge the submission was tied to.
    pub fn finish(&mut self) -> Option<ChallengeId> {
        let challenge = self.draft.challenge.clone();
        self.draft.clear_staging();
        self.pending_attach = None;
        challenge
    }

    /// Background hydration for an edit. Only applied while the user has
    /// not touched the draft.
    pub fn apply_hydration(&mut self, record: &Record) -> bool {
        if self.editing.as_ref() != Some(&record.id) || self.draft.is_dirty() {
            return false;
        }
        self.draft = Draft::from_record(record);
        true
    }

    #[must_use]
    pub const fn draft(&self) -> &Draft {
        &self.draft
    }

    #[must_use]
    pub fn editing(&self) -> Option<&RecordId> {
        self.editing.as_ref()
    }

    #[must_use]
    pub const fn came_from(&self) -> &CameFrom {
        &self.came_from
    }

    #[must_use]
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    #[must_use]
    pub fn pending_attach(&self) -> Option<&ChallengeId> {
        self.pending_attach.as_ref()
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    fn validate(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        let len = self.draft.content.chars().count();
        if len > config.max_content_chars {
            return Err(ValidationError::ContentTooLong {
                len,
                max: config.max_content_chars,
            });
        }

        let count = self.draft.image_count();
        if count > config.max_images {
            return Err(ValidationError::TooManyImages {
                count,
                max: config.max_images,
            });
        }

        if let Some(image) = self
            .draft
            .new_images
            .iter()
            .find(|image| image.size_bytes > config.max_image_bytes)
        {
            return Err(ValidationError::ImageTooLarge {
                handle: image.handle.clone(),
                size: image.size_bytes,
                max: config.max_image_bytes,
            });
        }
        Ok(())
    }
}
