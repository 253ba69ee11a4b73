use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capabilities::{TimerId, TimerIds};
use crate::command::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info | Self::Success => 3000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub duration_ms: u64,
}

/// Single-slot banner. At most one notification is visible and at most one
/// dismiss timer is outstanding; the queue owns that timer.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    current: Option<Notification>,
    timer: Option<TimerId>,
}

impl NotificationQueue {
    /// Replaces whatever is showing. The old dismiss timer is cancelled
    /// before the new one starts.
    pub fn show(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration_override_ms: Option<u64>,
        timers: &mut TimerIds,
    ) -> Vec<Command> {
        let mut commands = self.cancel_timer();

        let duration_ms = duration_override_ms.unwrap_or_else(|| kind.default_duration_ms());
        let id = timers.next();
        self.timer = Some(id);
        self.current = Some(Notification {
            message: message.into(),
            kind,
            duration_ms,
        });

        commands.push(Command::StartTimer {
            id,
            after_ms: duration_ms,
        });
        commands
    }

    /// Explicit dismissal; also used on teardown.
    pub fn dismiss(&mut self) -> Vec<Command> {
        self.current = None;
        self.cancel_timer()
    }

    /// Returns true if the timer belonged to this queue, in which case the
    /// banner is gone.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.timer != Some(id) {
            return false;
        }
        debug!(timer = %id, "notification auto-dismissed");
        self.timer = None;
        self.current = None;
        true
    }

    #[must_use]
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    fn cancel_timer(&mut self) -> Vec<Command> {
        self.timer
            .take()
            .map(|id| Command::CancelTimer { id })
            .into_iter()
            .collect()
    }
}
