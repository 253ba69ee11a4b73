#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod browse;
pub mod capabilities;
pub mod command;
pub mod composer;
pub mod config;
pub mod controller;
pub mod event;
pub mod model;
pub mod navigation;
pub mod notification;
pub mod timeline;
pub mod tracker;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::EngineConfig;
pub use controller::ViewController;
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

pub const DEFAULT_RECHECK_DELAY_MS: u64 = 1_000;
pub const MIN_RECHECK_DELAY_MS: u64 = 250;
pub const MAX_RECHECK_DELAY_MS: u64 = 10_000;
pub const MAX_IMAGES_PER_RECORD: usize = 3;
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_CONTENT_CHARS: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Network,
    NotFound,
    Conflict,
    Authentication,
    Server,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Authentication => "AUTH_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Server => ErrorSeverity::Transient,
            Self::Validation
            | Self::NotFound
            | Self::Conflict
            | Self::Authentication
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: BTreeMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && matches!(self.severity, ErrorSeverity::Transient)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Conflict => self.message.clone(),
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::NotFound => "The requested entry could not be found.".into(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Server => "The server had a problem. Please try again shortly.".into(),
            ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<capabilities::ApiFailure> for AppError {
    fn from(e: capabilities::ApiFailure) -> Self {
        use capabilities::ApiFailure;

        let internal = e.to_string();
        let error = match e {
            ApiFailure::Validation { message } => AppError::new(ErrorKind::Validation, message),
            ApiFailure::Network { .. } => AppError::new(ErrorKind::Network, "Network error"),
            ApiFailure::NotFound => AppError::new(ErrorKind::NotFound, "Not found"),
            ApiFailure::Conflict { message } => AppError::new(ErrorKind::Conflict, message),
            ApiFailure::Unauthorized => {
                AppError::new(ErrorKind::Authentication, "Session expired")
            }
            ApiFailure::Server { status, .. } => AppError::new(ErrorKind::Server, "Server error")
                .with_context("http_status", status.to_string()),
        };
        error.with_internal(internal)
    }
}

impl From<model::ValidationError> for AppError {
    fn from(e: model::ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<composer::ComposeError> for AppError {
    fn from(e: composer::ComposeError) -> Self {
        use composer::ComposeError;

        let message = e.to_string();
        match e {
            ComposeError::Invalid(inner) => inner.into(),
            ComposeError::ChallengeClosed { challenge, .. } => {
                AppError::new(ErrorKind::Conflict, message)
                    .with_context("challenge", challenge.to_string())
            }
            ComposeError::ChallengeLocked => AppError::new(ErrorKind::Validation, message),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, "Invalid engine configuration")
            .with_internal(e.to_string())
    }
}
