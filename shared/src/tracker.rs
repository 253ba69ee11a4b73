use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capabilities::{TimerId, TimerIds};
use crate::command::Command;
use crate::model::{ChallengeId, ChallengeStatus};

/// A challenge reached a terminal status while being watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub challenge: ChallengeId,
    pub title: String,
    pub is_success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRecheck {
    timer: TimerId,
    challenge: ChallengeId,
}

/// Remembers the last status seen for one challenge and reports the
/// transition into a terminal status exactly once.
#[derive(Debug, Default)]
pub struct TaskAssociationTracker {
    watched: Option<ChallengeId>,
    baseline: Option<ChallengeStatus>,
    pending: Option<PendingRecheck>,
}

impl TaskAssociationTracker {
    /// Starts watching `challenge`. Watching the same id again is a no-op;
    /// a new id discards the old baseline and cancels any pending re-check.
    /// Returns whether a fresh baseline is needed along with the commands.
    pub fn watch(&mut self, challenge: &ChallengeId) -> (bool, Vec<Command>) {
        if self.watched.as_ref() == Some(challenge) {
            return (false, Vec::new());
        }

        let commands = self.cancel_pending();
        debug!(challenge = %challenge, previous = ?self.watched, "watching challenge");
        self.watched = Some(challenge.clone());
        self.baseline = None;
        (true, commands)
    }

    /// Stores the first status seen for the watched challenge. A baseline
    /// reply that lands after a re-check already advanced it is stale.
    pub fn record_baseline(&mut self, challenge: &ChallengeId, status: ChallengeStatus) {
        if self.watched.as_ref() != Some(challenge) {
            debug!(challenge = %challenge, "baseline for unwatched challenge dropped");
            return;
        }
        if let Some(current) = self.baseline {
            debug!(challenge = %challenge, ?current, ?status, "late baseline dropped");
            return;
        }
        self.baseline = Some(status);
    }

    /// Schedules the single delayed re-check after a submission tied to
    /// `challenge`. Any earlier pending re-check is cancelled first.
    pub fn on_submitted(
        &mut self,
        challenge: &ChallengeId,
        delay_ms: u64,
        timers: &mut TimerIds,
    ) -> Vec<Command> {
        let (_, mut commands) = self.watch(challenge);
        commands.extend(self.cancel_pending());

        let timer = timers.next();
        self.pending = Some(PendingRecheck {
            timer,
            challenge: challenge.clone(),
        });
        debug!(challenge = %challenge, timer = %timer, delay_ms, "re-check scheduled");

        commands.push(Command::StartTimer {
            id: timer,
            after_ms: delay_ms,
        });
        commands
    }

    /// Claims a fired timer. Returns the challenge to re-check, or `None` if
    /// the timer is not the pending one.
    pub fn on_timer(&mut self, timer: TimerId) -> Option<ChallengeId> {
        if self.pending_timer() != Some(timer) {
            return None;
        }
        self.pending.take().map(|p| p.challenge)
    }

    /// Compares a fresh status against the baseline. A change into a
    /// terminal status yields a completion; the baseline always advances.
    pub fn on_recheck(
        &mut self,
        challenge: &ChallengeId,
        title: &str,
        status: ChallengeStatus,
    ) -> Option<Completion> {
        if self.watched.as_ref() != Some(challenge) {
            debug!(challenge = %challenge, "re-check for unwatched challenge dropped");
            return None;
        }

        let changed = self.baseline != Some(status);
        self.baseline = Some(status);

        if changed && status.is_terminal() {
            info!(challenge = %challenge, ?status, "challenge reached terminal status");
            Some(Completion {
                challenge: challenge.clone(),
                title: title.to_string(),
                is_success: status == ChallengeStatus::Completed,
            })
        } else {
            None
        }
    }

    /// Session teardown.
    pub fn reset(&mut self) -> Vec<Command> {
        let commands = self.cancel_pending();
        self.watched = None;
        self.baseline = None;
        commands
    }

    #[must_use]
    pub fn watched(&self) -> Option<&ChallengeId> {
        self.watched.as_ref()
    }

    #[must_use]
    pub const fn baseline(&self) -> Option<ChallengeStatus> {
        self.baseline
    }

    #[must_use]
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending.as_ref().map(|p| p.timer)
    }

    fn cancel_pending(&mut self) -> Vec<Command> {
        self.pending
            .take()
            .map(|p| Command::CancelTimer { id: p.timer })
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> ChallengeId {
        ChallengeId::new("5")
    }

    #[test]
    fn test_completed_fires_once() {
        let mut timers = TimerIds::default();
        let mut tracker = TaskAssociationTracker::default();

        let (needs_baseline, _) = tracker.watch(&five());
        assert!(needs_baseline);
        tracker.record_baseline(&five(), ChallengeStatus::Active);

        let commands = tracker.on_submitted(&five(), 1000, &mut timers);
        assert_eq!(
            commands,
            vec![Command::StartTimer {
                id: TimerId(1),
                after_ms: 1000
            }]
        );
        assert_eq!(tracker.on_timer(TimerId(1)), Some(five()));

        let first = tracker.on_recheck(&five(), "30 days", ChallengeStatus::Completed);
        assert_eq!(
            first,
            Some(Completion {
                challenge: five(),
                title: "30 days".into(),
                is_success: true
            })
        );
        assert_eq!(
            tracker.on_recheck(&five(), "30 days", ChallengeStatus::Completed),
            None
        );
    }

    #[test]
    fn test_failed_is_not_a_success() {
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        tracker.record_baseline(&five(), ChallengeStatus::Active);

        let completion = tracker
            .on_recheck(&five(), "t", ChallengeStatus::Failed)
            .unwrap();
        assert!(!completion.is_success);
    }

    #[test]
    fn test_unchanged_active_status_is_silent() {
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        tracker.record_baseline(&five(), ChallengeStatus::Active);

        assert_eq!(tracker.on_recheck(&five(), "t", ChallengeStatus::Active), None);
    }

    #[test]
    fn test_already_terminal_baseline_does_not_fire() {
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        tracker.record_baseline(&five(), ChallengeStatus::Completed);

        assert_eq!(
            tracker.on_recheck(&five(), "t", ChallengeStatus::Completed),
            None
        );
    }

    #[test]
    fn test_watching_new_challenge_resets_baseline_and_cancels_timer() {
        let mut timers = TimerIds::default();
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        tracker.record_baseline(&five(), ChallengeStatus::Active);
        tracker.on_submitted(&five(), 1000, &mut timers);

        let (needs_baseline, commands) = tracker.watch(&ChallengeId::new("9"));

        assert!(needs_baseline);
        assert_eq!(commands, vec![Command::CancelTimer { id: TimerId(1) }]);
        assert_eq!(tracker.baseline(), None);
        assert_eq!(tracker.on_timer(TimerId(1)), None);
    }

    #[test]
    fn test_rewatching_same_challenge_keeps_state() {
        let mut timers = TimerIds::default();
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        tracker.record_baseline(&five(), ChallengeStatus::Active);
        tracker.on_submitted(&five(), 1000, &mut timers);

        let (needs_baseline, commands) = tracker.watch(&five());

        assert!(!needs_baseline);
        assert!(commands.is_empty());
        assert_eq!(tracker.baseline(), Some(ChallengeStatus::Active));
        assert_eq!(tracker.pending_timer(), Some(TimerId(1)));
    }

    #[test]
    fn test_second_submission_replaces_pending_recheck() {
        let mut timers = TimerIds::default();
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());

        tracker.on_submitted(&five(), 1000, &mut timers);
        let commands = tracker.on_submitted(&five(), 1000, &mut timers);

        assert_eq!(
            commands,
            vec![
                Command::CancelTimer { id: TimerId(1) },
                Command::StartTimer {
                    id: TimerId(2),
                    after_ms: 1000
                },
            ]
        );
        assert_eq!(tracker.on_timer(TimerId(1)), None);
        assert_eq!(tracker.on_timer(TimerId(2)), Some(five()));
    }

    #[test]
    fn test_stale_baseline_is_ignored() {
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        tracker.record_baseline(&ChallengeId::new("9"), ChallengeStatus::Completed);
        assert_eq!(tracker.baseline(), None);
    }

    #[test]
    fn test_baseline_arriving_after_recheck_is_dropped() {
        let mut tracker = TaskAssociationTracker::default();
        tracker.watch(&five());
        assert!(tracker
            .on_recheck(&five(), "t", ChallengeStatus::Completed)
            .is_some());

        tracker.record_baseline(&five(), ChallengeStatus::Active);

        assert_eq!(tracker.baseline(), Some(ChallengeStatus::Completed));
        assert_eq!(
            tracker.on_recheck(&five(), "t", ChallengeStatus::Completed),
            None
        );
    }

    #[test]
    fn test_reset_cancels_pending_timer() {
        let mut timers = TimerIds::default();
        let mut tracker = TaskAssociationTracker::default();
        tracker.on_submitted(&five(), 1000, &mut timers);

        let commands = tracker.reset();

        assert_eq!(commands, vec![Command::CancelTimer { id: TimerId(1) }]);
        assert!(tracker.watched().is_none());
        assert!(tracker.pending_timer().is_none());
    }
}
