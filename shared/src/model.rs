use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::controller::ViewController;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(RecordId);
typed_id!(ChallengeId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Entries are limited to {max} characters ({len} written).")]
    ContentTooLong { len: usize, max: usize },
    #[error("You can attach at most {max} images.")]
    TooManyImages { count: usize, max: usize },
    #[error("Each image must be smaller than {} MB.", max / (1024 * 1024))]
    ImageTooLarge { handle: String, size: u64, max: u64 },
    #[error("invalid image url: {0}")]
    InvalidImageUrl(String),
}

// --- Emotion ---

/// Mood tag on a record. The wire format is the 1-based index the server
/// stores; unknown indices decode as `Happy`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(from = "u8", into = "u8")]
pub enum Emotion {
    #[default]
    Happy,
    Proud,
    Peaceful,
    Depressed,
    Annoyed,
    Furious,
}

impl Emotion {
    pub const ALL: [Self; 6] = [
        Self::Happy,
        Self::Proud,
        Self::Peaceful,
        Self::Depressed,
        Self::Annoyed,
        Self::Furious,
    ];

    #[must_use]
    pub const fn idx(self) -> u8 {
        match self {
            Self::Happy => 1,
            Self::Proud => 2,
            Self::Peaceful => 3,
            Self::Depressed => 4,
            Self::Annoyed => 5,
            Self::Furious => 6,
        }
    }

    #[must_use]
    pub const fn from_idx(idx: u8) -> Self {
        match idx {
            2 => Self::Proud,
            3 => Self::Peaceful,
            4 => Self::Depressed,
            5 => Self::Annoyed,
            6 => Self::Furious,
            _ => Self::Happy,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Proud => "proud",
            Self::Peaceful => "peaceful",
            Self::Depressed => "depressed",
            Self::Annoyed => "annoyed",
            Self::Furious => "furious",
        }
    }
}

impl From<u8> for Emotion {
    fn from(idx: u8) -> Self {
        Self::from_idx(idx)
    }
}

impl From<Emotion> for u8 {
    fn from(emotion: Emotion) -> Self {
        emotion.idx()
    }
}

// --- Images ---

/// An already-uploaded image. Only absolute http(s) URLs are accepted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteImage(String);

impl RemoteImage {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let parsed = Url::parse(&raw).map_err(|_| ValidationError::InvalidImageUrl(raw.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidImageUrl(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RemoteImage {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RemoteImage> for String {
    fn from(image: RemoteImage) -> Self {
        image.0
    }
}

/// A file the user picked on the device but that has not been uploaded yet.
/// The shell owns the bytes; the core only sees a handle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LocalImage {
    pub handle: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    Remote { url: RemoteImage },
    Local { file: LocalImage },
}

// --- Records and challenges ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub content: String,
    pub emotion: Emotion,
    #[serde(default)]
    pub images: Vec<RemoteImage>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub challenge: Option<ChallengeId>,
    #[serde(default)]
    pub challenge_title: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    Active,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ChallengeStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub status: ChallengeStatus,
    pub duration_days: u32,
    pub progress_days: u32,
    pub start_date: NaiveDate,
}

// --- Scopes and sections ---

/// What a Detail timeline shows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scope {
    Date(NaiveDate),
    Challenge(ChallengeId),
}

impl Scope {
    /// The browse scope a back press from this timeline lands on.
    #[must_use]
    pub fn parent(&self) -> BrowseScope {
        match self {
            Self::Date(date) => BrowseScope::month_of(*date),
            Self::Challenge(_) => BrowseScope::Challenges,
        }
    }

    #[must_use]
    pub fn section(&self) -> Section {
        match self {
            Self::Date(_) => Section::Diary,
            Self::Challenge(_) => Section::Disk,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowseScope {
    Calendar { year: i32, month: u32 },
    Challenges,
    Trash,
    Profile,
}

impl BrowseScope {
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        Self::Calendar {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn section(self) -> Section {
        match self {
            Self::Calendar { .. } => Section::Diary,
            Self::Challenges => Section::Disk,
            Self::Trash => Section::Trash,
            Self::Profile => Section::Profile,
        }
    }
}

/// Top-level tab. `Write` is the only transient one: it is never persisted
/// and never becomes the "last section" to return to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    Diary,
    Write,
    Disk,
    Trash,
    #[serde(rename = "mypage")]
    Profile,
}

impl Section {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Diary => "diary",
            Self::Write => "write",
            Self::Disk => "disk",
            Self::Trash => "trash",
            Self::Profile => "mypage",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "diary" => Some(Self::Diary),
            "write" => Some(Self::Write),
            "disk" => Some(Self::Disk),
            "trash" => Some(Self::Trash),
            "mypage" => Some(Self::Profile),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Write)
    }

    /// Landing scope when the tab is selected. `Write` has no browse scope of
    /// its own and falls back to the calendar.
    #[must_use]
    pub fn default_browse(self, today: NaiveDate) -> BrowseScope {
        match self {
            Self::Diary | Self::Write => BrowseScope::month_of(today),
            Self::Disk => BrowseScope::Challenges,
            Self::Trash => BrowseScope::Trash,
            Self::Profile => BrowseScope::Profile,
        }
    }
}

// --- Draft ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum DraftField {
    Content(String),
    Emotion(Emotion),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Draft {
    pub content: String,
    pub emotion: Emotion,
    pub kept_images: Vec<RemoteImage>,
    pub new_images: Vec<LocalImage>,
    pub removed_images: Vec<RemoteImage>,
    pub challenge: Option<ChallengeId>,
    dirty: bool,
}

impl Draft {
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Seeds a draft for editing. The challenge tie is not carried over:
    /// updates never change which challenge a record belongs to.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            content: record.content.clone(),
            emotion: record.emotion,
            kept_images: record.images.clone(),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, field: DraftField) {
        match field {
            DraftField::Content(content) => self.content = content,
            DraftField::Emotion(emotion) => self.emotion = emotion,
        }
        self.dirty = true;
    }

    pub fn add_image(&mut self, image: LocalImage) {
        self.new_images.push(image);
        self.dirty = true;
    }

    /// Removes the image at `index` in display order: kept remote images
    /// first, then newly picked files. Returns false if out of range.
    pub fn remove_image(&mut self, index: usize) -> bool {
        if index < self.kept_images.len() {
            let removed = self.kept_images.remove(index);
            self.removed_images.push(removed);
        } else if index - self.kept_images.len() < self.new_images.len() {
            self.new_images.remove(index - self.kept_images.len());
        } else {
            return false;
        }
        self.dirty = true;
        true
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.kept_images.len() + self.new_images.len()
    }

    #[must_use]
    pub fn images(&self) -> Vec<ImageRef> {
        self.kept_images
            .iter()
            .cloned()
            .map(|url| ImageRef::Remote { url })
            .chain(
                self.new_images
                    .iter()
                    .cloned()
                    .map(|file| ImageRef::Local { file }),
            )
            .collect()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_staging(&mut self) {
        self.challenge = None;
        self.new_images.clear();
        self.removed_images.clear();
    }
}

// --- Titles ---

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

#[must_use]
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `OCT 19th.`
#[must_use]
pub fn format_date_title(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    let day = date.day();
    format!("{month} {day}{}.", ordinal_suffix(day))
}

// --- Crux model ---

#[derive(Debug, Default)]
pub struct Model {
    pub controller: ViewController,
}
