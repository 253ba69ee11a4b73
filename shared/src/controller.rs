//! The navigation engine. `ViewController::handle` takes one event, moves
//! the view state machine and returns the commands the shell must perform.
//! It never performs I/O itself.

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::browse::{BrowseData, BrowseView};
use crate::capabilities::{ApiFailure, JournalOperation, JournalOutput, JournalResult, TimerId, TimerIds};
use crate::command::{Command, LoadMode, Reply, StatusPurpose, TrashAction};
use crate::composer::{CameFrom, EntryComposer, Origin};
use crate::config::EngineConfig;
use crate::event::Event;
use crate::model::{
    format_date_title, BrowseScope, Challenge, ChallengeId, ChallengeStatus, RecordId, Scope,
    Section,
};
use crate::navigation::{NavigationBridge, Surface};
use crate::notification::{Notification, NotificationKind, NotificationQueue};
use crate::timeline::{DeleteOutcome, FetchOutcome, TimelineIntent, TimelineView};
use crate::tracker::{Completion, TaskAssociationTracker};
use crate::{AppError, ErrorKind};

#[derive(Debug)]
pub enum ViewState {
    Browse(BrowseView),
    Compose(Box<EntryComposer>),
    Detail(TimelineView),
}

#[derive(Debug, Default)]
struct Session {
    logged_in: bool,
    nickname: Option<String>,
}

#[derive(Debug)]
pub struct ViewController {
    state: ViewState,
    nav: NavigationBridge,
    tracker: TaskAssociationTracker,
    notifications: NotificationQueue,
    challenges: Vec<Challenge>,
    session: Session,
    config: EngineConfig,
    timers: TimerIds,
    next_token: u64,
    today: NaiveDate,
    error: Option<AppError>,
    completion: Option<Completion>,
}

impl Default for ViewController {
    fn default() -> Self {
        let today = NaiveDate::default();
        Self {
            state: ViewState::Browse(BrowseView::idle(BrowseScope::month_of(today))),
            nav: NavigationBridge::default(),
            tracker: TaskAssociationTracker::default(),
            notifications: NotificationQueue::default(),
            challenges: Vec::new(),
            session: Session::default(),
            config: EngineConfig::default(),
            timers: TimerIds::default(),
            next_token: 0,
            today,
            error: None,
            completion: None,
        }
    }
}

impl ViewController {
    #[instrument(level = "debug", skip(self, event), fields(event = event.name()))]
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        let mut commands = match event {
            Event::Noop => return Vec::new(),

            Event::AppStarted { today } => {
                self.today = today;
                self.state = ViewState::Browse(BrowseView::idle(BrowseScope::month_of(today)));
                vec![Command::LoadSection]
            }
            Event::SessionChanged {
                logged_in,
                nickname,
            } => self.on_session(logged_in, nickname),
            Event::ConfigUpdated(config) => {
                match config.validate() {
                    Ok(()) => {
                        info!(?config, "engine config replaced");
                        self.config = *config;
                    }
                    Err(e) => self.set_error(e.into()),
                }
                Vec::new()
            }

            Event::SectionSelected(section) => self.select_section(section),
            Event::BackRequested => self.back(),
            Event::RefreshRequested => self.refresh(LoadMode::Foreground),

            Event::MonthChanged { year, month } => self.change_month(year, month),
            Event::DateSelected(date) => self.select_date(date),
            Event::RecordSelected(id) => self.select_record(&id),
            Event::ComposeRequested => self.compose(),
            Event::ChallengeOpened(id) => self.enter_detail(Scope::Challenge(id), None),
            Event::JoinChallengeRequested(id) => self
                .api(
                    JournalOperation::JoinChallenge { id: id.clone() },
                    Reply::Joined { challenge: id },
                )
                .into_iter()
                .collect(),
            Event::RestoreRequested(id) => self.trash_action(&id, TrashAction::Restore),
            Event::PurgeRequested(id) => self.trash_action(&id, TrashAction::Purge),

            Event::EditRequested(id) => self.edit(&id),
            Event::DeleteRequested(id) => self.delete(&id),
            Event::CreateInScopeRequested => self.create_in_scope(),

            Event::DraftChanged(field) => {
                if let ViewState::Compose(composer) = &mut self.state {
                    composer.set_field(field);
                }
                Vec::new()
            }
            Event::ImagePicked(image) => {
                if let ViewState::Compose(composer) = &mut self.state {
                    if let Err(e) = composer.add_image(image, &self.config) {
                        self.set_error(e.into());
                    }
                }
                Vec::new()
            }
            Event::ImageRemoved { index } => {
                if let ViewState::Compose(composer) = &mut self.state {
                    composer.remove_image(index);
                }
                Vec::new()
            }
            Event::ChallengeAttachRequested(id) => self.attach(id),
            Event::ChallengeDetached => {
                if let ViewState::Compose(composer) = &mut self.state {
                    composer.detach_challenge();
                }
                Vec::new()
            }
            Event::SubmitRequested => self.submit(),

            Event::NotificationDismissed => self.notifications.dismiss(),
            Event::ErrorDismissed => {
                self.error = None;
                Vec::new()
            }
            Event::CompletionAcknowledged => {
                self.completion = None;
                Vec::new()
            }

            Event::JournalResponded { reply, result } => self.on_reply(reply, *result),
            Event::TimerFired { id } => self.on_timer(id),
            Event::SectionLoaded(stored) => self.on_section_loaded(stored.as_deref()),
            Event::SectionPersisted { ok } => {
                if !ok {
                    warn!("active section could not be persisted");
                }
                return Vec::new();
            }
        };
        commands.push(Command::Render);
        commands
    }

    // --- Transitions ---

    fn enter_browse(&mut self, scope: BrowseScope) -> Vec<Command> {
        let mut commands = self.nav.activate(scope.section());
        let token = self.token();
        let (view, operation) = BrowseView::open(scope, token);
        self.state = ViewState::Browse(view);
        info!(?scope, "browse");

        if let Some(operation) = operation {
            commands.extend(self.api(
                operation,
                Reply::Browse {
                    scope,
                    token,
                    mode: LoadMode::Foreground,
                },
            ));
        }
        commands
    }

    fn enter_detail(&mut self, scope: Scope, heading: Option<String>) -> Vec<Command> {
        let heading = heading.or_else(|| self.challenge_title(&scope));
        let mut commands = self.nav.activate(scope.section());
        let token = self.token();
        let (view, operation) = TimelineView::open(scope.clone(), heading, token);
        self.state = ViewState::Detail(view);
        info!(?scope, "detail");

        commands.extend(self.api(
            operation,
            Reply::Timeline {
                scope,
                token,
                mode: LoadMode::Foreground,
            },
        ));
        commands
    }

    fn enter_compose(&mut self, composer: EntryComposer) -> Vec<Command> {
        let commands = self.nav.activate(Section::Write);
        info!(came_from = ?composer.came_from(), editing = ?composer.editing(), "compose");
        self.state = ViewState::Compose(Box::new(composer));
        commands
    }

    fn location(&self) -> CameFrom {
        match &self.state {
            ViewState::Browse(view) => CameFrom::Browse(view.scope()),
            ViewState::Detail(view) => CameFrom::Detail {
                scope: view.scope().clone(),
                heading: view.heading().map(str::to_string),
            },
            ViewState::Compose(composer) => composer.came_from().clone(),
        }
    }

    fn return_to(&mut self, came_from: CameFrom) -> Vec<Command> {
        match came_from {
            CameFrom::Browse(scope) => self.enter_browse(scope),
            CameFrom::Detail { scope, heading } => self.enter_detail(scope, heading),
        }
    }

    fn select_section(&mut self, section: Section) -> Vec<Command> {
        if section.is_transient() {
            return self.compose();
        }
        if let ViewState::Compose(composer) = &self.state {
            if composer.draft().is_dirty() {
                info!(to = section.as_str(), "draft discarded by section switch");
            }
        }
        self.enter_browse(section.default_browse(self.today))
    }

    fn back(&mut self) -> Vec<Command> {
        match &self.state {
            ViewState::Compose(composer) => {
                let came_from = composer.came_from().clone();
                debug!(?came_from, "compose cancelled");
                self.return_to(came_from)
            }
            ViewState::Detail(view) => {
                let parent = view.scope().parent();
                self.enter_browse(parent)
            }
            ViewState::Browse(_) => {
                debug!("back at browse root ignored");
                Vec::new()
            }
        }
    }

    fn change_month(&mut self, year: i32, month: u32) -> Vec<Command> {
        let on_calendar = matches!(
            &self.state,
            ViewState::Browse(view) if matches!(view.scope(), BrowseScope::Calendar { .. })
        );
        if !on_calendar || !(1..=12).contains(&month) {
            warn!(year, month, "month change ignored");
            return Vec::new();
        }
        self.enter_browse(BrowseScope::Calendar { year, month })
    }

    fn select_date(&mut self, date: NaiveDate) -> Vec<Command> {
        let ViewState::Browse(view) = &self.state else {
            return Vec::new();
        };
        if view.records_on(date).is_empty() {
            let came_from = CameFrom::Browse(view.scope());
            self.enter_compose(EntryComposer::new(came_from))
        } else {
            self.enter_detail(Scope::Date(date), None)
        }
    }

    fn select_record(&mut self, id: &RecordId) -> Vec<Command> {
        let date = match &self.state {
            ViewState::Browse(view) if matches!(view.scope(), BrowseScope::Calendar { .. }) => {
                view.find_record(id).map(|record| record.date)
            }
            _ => None,
        };
        match date {
            Some(date) => self.enter_detail(Scope::Date(date), None),
            None => {
                debug!(record = %id, "selected record not on the calendar");
                Vec::new()
            }
        }
    }

    fn compose(&mut self) -> Vec<Command> {
        if self.is_composing() {
            return Vec::new();
        }
        let came_from = self.location();
        self.enter_compose(EntryComposer::new(came_from))
    }

    fn create_in_scope(&mut self) -> Vec<Command> {
        let ViewState::Detail(view) = &self.state else {
            debug!("create in scope outside a timeline ignored");
            return Vec::new();
        };
        let scope = view.scope().clone();
        let heading = view.heading().map(str::to_string);
        let came_from = CameFrom::Detail {
            scope: scope.clone(),
            heading: heading.clone(),
        };

        match scope {
            Scope::Date(_) => self.enter_compose(EntryComposer::new(came_from)),
            Scope::Challenge(ref challenge) => {
                let origin = Origin {
                    scope: scope.clone(),
                    heading,
                };
                let mut commands = self.enter_compose(EntryComposer::for_challenge(
                    came_from,
                    origin,
                    challenge.clone(),
                ));
                commands.extend(self.watch(challenge, StatusPurpose::Baseline));
                commands
            }
        }
    }

    fn edit(&mut self, id: &RecordId) -> Vec<Command> {
        let ViewState::Detail(view) = &self.state else {
            return Vec::new();
        };
        let Some(TimelineIntent::Edit(record)) = view.on_edit(id) else {
            debug!(record = %id, "edit for record not in timeline ignored");
            return Vec::new();
        };

        let came_from = self.location();
        let mut commands = self.enter_compose(EntryComposer::for_edit(&record, came_from));
        commands.extend(self.api(
            JournalOperation::FetchRecord { id: id.clone() },
            Reply::Hydrated { record: id.clone() },
        ));
        commands
    }

    fn delete(&mut self, id: &RecordId) -> Vec<Command> {
        let ViewState::Detail(view) = &mut self.state else {
            return Vec::new();
        };
        let Some(TimelineIntent::Delete(record)) = view.on_delete(id) else {
            debug!(record = %id, "delete ignored");
            return Vec::new();
        };
        let scope = view.scope().clone();

        self.api(
            JournalOperation::DeleteRecord { id: record.clone() },
            Reply::Deleted { record, scope },
        )
        .into_iter()
        .collect()
    }

    fn trash_action(&mut self, id: &RecordId, action: TrashAction) -> Vec<Command> {
        let ViewState::Browse(view) = &mut self.state else {
            return Vec::new();
        };
        let Some(operation) = view.begin_trash_action(id, action) else {
            debug!(record = %id, ?action, "trash action ignored");
            return Vec::new();
        };

        self.api(
            operation,
            Reply::Trash {
                record: id.clone(),
                action,
            },
        )
        .into_iter()
        .collect()
    }

    fn attach(&mut self, challenge: ChallengeId) -> Vec<Command> {
        let ViewState::Compose(composer) = &mut self.state else {
            return Vec::new();
        };
        if let Err(e) = composer.request_attach(challenge.clone()) {
            self.set_error(e.into());
            return Vec::new();
        }

        self.api(
            JournalOperation::FetchChallenge {
                id: challenge.clone(),
            },
            Reply::ChallengeStatus {
                challenge,
                purpose: StatusPurpose::Attach,
            },
        )
        .into_iter()
        .collect()
    }

    fn submit(&mut self) -> Vec<Command> {
        if !self.session.logged_in {
            if self.is_composing() {
                self.set_error(AppError::new(
                    ErrorKind::Authentication,
                    "Sign in to save entries.",
                ));
            }
            return Vec::new();
        }
        let ViewState::Compose(composer) = &mut self.state else {
            return Vec::new();
        };

        match composer.begin_submit(&self.config) {
            Ok(Some(submission)) => self
                .api(
                    submission.operation,
                    Reply::Submitted {
                        submission: submission.id,
                    },
                )
                .into_iter()
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                self.set_error(e.into());
                Vec::new()
            }
        }
    }

    fn refresh(&mut self, mode: LoadMode) -> Vec<Command> {
        let token = self.token();
        let request = match &mut self.state {
            ViewState::Browse(view) => view.reload(token, mode).map(|operation| {
                (
                    operation,
                    Reply::Browse {
                        scope: view.scope(),
                        token,
                        mode,
                    },
                )
            }),
            ViewState::Detail(view) => {
                let operation = view.reload(token, mode);
                Some((
                    operation,
                    Reply::Timeline {
                        scope: view.scope().clone(),
                        token,
                        mode,
                    },
                ))
            }
            ViewState::Compose(_) => None,
        };

        request
            .and_then(|(operation, reply)| self.api(operation, reply))
            .into_iter()
            .collect()
    }

    /// Refreshes the cached challenge list, through the visible list when
    /// the user is looking at it.
    fn refresh_challenges(&mut self, mode: LoadMode) -> Vec<Command> {
        let showing_challenges = matches!(
            &self.state,
            ViewState::Browse(view) if view.scope() == BrowseScope::Challenges
        );
        if showing_challenges {
            return self.refresh(mode);
        }
        self.api(JournalOperation::FetchMyChallenges, Reply::Challenges { mode })
            .into_iter()
            .collect()
    }

    fn watch(&mut self, challenge: &ChallengeId, purpose: StatusPurpose) -> Vec<Command> {
        let (needs_baseline, mut commands) = self.tracker.watch(challenge);
        if needs_baseline {
            commands.extend(self.api(
                JournalOperation::FetchChallenge {
                    id: challenge.clone(),
                },
                Reply::ChallengeStatus {
                    challenge: challenge.clone(),
                    purpose,
                },
            ));
        }
        commands
    }

    // --- Session ---

    fn on_session(&mut self, logged_in: bool, nickname: Option<String>) -> Vec<Command> {
        if !logged_in {
            info!("session ended");
            return self.teardown();
        }

        let was_logged_in = self.session.logged_in;
        self.session = Session {
            logged_in: true,
            nickname,
        };
        if was_logged_in {
            return Vec::new();
        }

        info!("session started");
        let mut commands = self.refresh(LoadMode::Foreground);
        if !matches!(&self.state, ViewState::Browse(view) if view.scope() == BrowseScope::Challenges)
        {
            commands.extend(self.refresh_challenges(LoadMode::Background));
        }
        commands
    }

    fn teardown(&mut self) -> Vec<Command> {
        let mut commands = self.end_session();
        let section = self.nav.last_non_compose();
        commands.extend(self.nav.activate(section));
        self.state = ViewState::Browse(BrowseView::idle(section.default_browse(self.today)));
        commands
    }

    /// Drops everything tied to the signed-in user but leaves the screen.
    fn end_session(&mut self) -> Vec<Command> {
        let mut commands = self.tracker.reset();
        commands.extend(self.notifications.dismiss());
        self.session = Session::default();
        self.error = None;
        self.completion = None;
        self.challenges.clear();
        commands
    }

    fn on_section_loaded(&mut self, stored: Option<&[u8]>) -> Vec<Command> {
        if !matches!(self.state, ViewState::Browse(_)) {
            debug!("restored section arrived after navigation, ignored");
            return Vec::new();
        }
        let section = self.nav.restore(stored);
        self.enter_browse(section.default_browse(self.today))
    }

    // --- Replies ---

    fn on_reply(&mut self, reply: Reply, result: JournalResult) -> Vec<Command> {
        match reply {
            Reply::Submitted { submission } => self.on_submitted(submission, result),
            Reply::Hydrated { record } => {
                self.on_hydrated(&record, result);
                Vec::new()
            }
            Reply::Timeline { scope, token, .. } => self.on_timeline(&scope, token, result),
            Reply::Deleted { record, scope } => self.on_deleted(&record, &scope, result),
            Reply::ChallengeStatus { challenge, purpose } => {
                self.on_challenge_status(&challenge, purpose, result)
            }
            Reply::Browse { scope, token, .. } => self.on_browse(scope, token, result),
            Reply::Challenges { mode } => match result {
                Ok(JournalOutput::Challenges(challenges)) => {
                    self.challenges = challenges;
                    Vec::new()
                }
                Ok(other) => self.fail_in(mode, ApiFailure::unexpected(&other)),
                Err(failure) => self.fail_in(mode, failure),
            },
            Reply::Joined { challenge } => match result {
                Ok(_) => {
                    info!(challenge = %challenge, "joined challenge");
                    let mut commands = self.notify("You joined the challenge.", NotificationKind::Success);
                    commands.extend(self.refresh_challenges(LoadMode::Background));
                    commands
                }
                Err(failure) => self.fail(failure),
            },
            Reply::Trash { record, action } => self.on_trash(&record, action, result),
        }
    }

    fn on_submitted(&mut self, submission: Uuid, result: JournalResult) -> Vec<Command> {
        let ViewState::Compose(composer) = &mut self.state else {
            warn!(submission = %submission, "late submission reply after leaving compose");
            return Vec::new();
        };
        if !composer.settle(submission) {
            warn!(submission = %submission, "submission reply does not match the one in flight");
            return Vec::new();
        }

        let record = match result {
            Ok(JournalOutput::Record(record)) => record,
            Ok(other) => return self.fail(ApiFailure::unexpected(&other)),
            Err(failure) => return self.fail(failure),
        };

        let challenge = composer.finish();
        let origin = composer.origin().cloned();
        let edited = composer.editing().is_some();
        info!(record = %record.id, edited, challenge = ?challenge, "entry saved");

        let mut commands = Vec::new();
        if let Some(challenge) = &challenge {
            let delay = self.config.effective_recheck_delay_ms();
            commands.extend(self.tracker.on_submitted(challenge, delay, &mut self.timers));
        }

        match origin {
            Some(origin) => {
                commands.extend(self.enter_detail(origin.scope, origin.heading));
                if let ViewState::Detail(view) = &mut self.state {
                    view.mark_just_completed();
                }
            }
            None => {
                commands.extend(self.enter_detail(Scope::Date(record.date), None));
                let message = if edited { "Entry updated." } else { "Entry saved." };
                commands.extend(self.notify(message, NotificationKind::Success));
            }
        }

        if challenge.is_some() {
            commands.extend(self.refresh_challenges(LoadMode::Background));
        }
        commands
    }

    fn on_hydrated(&mut self, record: &RecordId, result: JournalResult) {
        let ViewState::Compose(composer) = &mut self.state else {
            debug!(record = %record, "hydration after leaving compose dropped");
            return;
        };
        match result {
            Ok(JournalOutput::Record(fresh)) => {
                if composer.apply_hydration(&fresh) {
                    debug!(record = %record, "draft hydrated from server copy");
                }
            }
            Ok(other) => warn!(record = %record, output = other.kind(), "unexpected hydration reply"),
            Err(failure) => {
                warn!(record = %record, error = %failure, "hydration failed, keeping local copy");
            }
        }
    }

    fn on_timeline(&mut self, scope: &Scope, token: u64, result: JournalResult) -> Vec<Command> {
        let ViewState::Detail(view) = &mut self.state else {
            debug!(?scope, "timeline reply outside detail dropped");
            return Vec::new();
        };
        let records = match result {
            Ok(JournalOutput::Records(records)) => Ok(records),
            Ok(other) => Err(ApiFailure::unexpected(&other)),
            Err(failure) => Err(failure),
        };
        match view.apply_fetch(scope, token, records) {
            FetchOutcome::Failed(failure) => self.fail(failure),
            FetchOutcome::Applied | FetchOutcome::Stale | FetchOutcome::Dropped(_) => Vec::new(),
        }
    }

    fn on_deleted(&mut self, record: &RecordId, scope: &Scope, result: JournalResult) -> Vec<Command> {
        let outcome = match &mut self.state {
            ViewState::Detail(view) if view.scope() == scope => {
                view.apply_delete(record, result.map(|_| ()))
            }
            _ => match result {
                Ok(_) => {
                    debug!(record = %record, "delete confirmed after leaving timeline");
                    return Vec::new();
                }
                Err(failure) => DeleteOutcome::Failed(failure),
            },
        };

        match outcome {
            DeleteOutcome::Emptied => {
                info!(record = %record, "last entry in scope deleted");
                let mut commands = self.enter_browse(scope.parent());
                commands.extend(self.notify("Moved to trash.", NotificationKind::Info));
                commands
            }
            DeleteOutcome::Remaining => {
                info!(record = %record, "entry deleted");
                let mut commands = self.notify("Moved to trash.", NotificationKind::Info);
                commands.extend(self.refresh(LoadMode::Background));
                commands
            }
            DeleteOutcome::Failed(failure) => self.fail(failure),
            DeleteOutcome::Stale => Vec::new(),
        }
    }

    fn on_challenge_status(
        &mut self,
        challenge: &ChallengeId,
        purpose: StatusPurpose,
        result: JournalResult,
    ) -> Vec<Command> {
        let fetched = match result {
            Ok(JournalOutput::Challenge(fetched)) => Ok(fetched),
            Ok(other) => Err(ApiFailure::unexpected(&other)),
            Err(failure) => Err(failure),
        };

        match (purpose, fetched) {
            (StatusPurpose::Attach, Ok(fetched)) => {
                let status = fetched.status;
                self.remember_challenge(fetched);
                self.resolve_attach(challenge, status)
            }
            (StatusPurpose::Attach, Err(failure)) => {
                if let ViewState::Compose(composer) = &mut self.state {
                    composer.abandon_attach(challenge);
                }
                self.fail(failure)
            }
            (StatusPurpose::Baseline, Ok(fetched)) => {
                self.tracker.record_baseline(challenge, fetched.status);
                self.remember_challenge(fetched);
                Vec::new()
            }
            (StatusPurpose::Baseline, Err(failure)) => {
                warn!(challenge = %challenge, error = %failure, "baseline status unavailable");
                Vec::new()
            }
            (StatusPurpose::Recheck, Ok(fetched)) => {
                let completion = self
                    .tracker
                    .on_recheck(challenge, &fetched.title, fetched.status);
                self.remember_challenge(fetched);
                completion.map_or_else(Vec::new, |completion| self.complete(completion))
            }
            (StatusPurpose::Recheck, Err(failure)) => {
                warn!(challenge = %challenge, error = %failure, "challenge re-check failed");
                Vec::new()
            }
        }
    }

    fn resolve_attach(&mut self, challenge: &ChallengeId, status: ChallengeStatus) -> Vec<Command> {
        let ViewState::Compose(composer) = &mut self.state else {
            debug!(challenge = %challenge, "attach reply after leaving compose dropped");
            return Vec::new();
        };
        match composer.resolve_attach(challenge, status) {
            Ok(true) => {
                let (_, commands) = self.tracker.watch(challenge);
                self.tracker.record_baseline(challenge, status);
                commands
            }
            Ok(false) => Vec::new(),
            Err(e) => {
                self.set_error(e.into());
                Vec::new()
            }
        }
    }

    fn complete(&mut self, completion: Completion) -> Vec<Command> {
        let (message, kind) = if completion.is_success {
            (
                format!("Challenge \"{}\" completed!", completion.title),
                NotificationKind::Success,
            )
        } else {
            (
                format!("Challenge \"{}\" has ended.", completion.title),
                NotificationKind::Warning,
            )
        };
        self.completion = Some(completion);
        self.notify(message, kind)
    }

    fn on_browse(&mut self, scope: BrowseScope, token: u64, result: JournalResult) -> Vec<Command> {
        let ViewState::Browse(view) = &mut self.state else {
            debug!(?scope, "browse reply outside browse dropped");
            return Vec::new();
        };
        match view.apply_fetch(scope, token, result) {
            FetchOutcome::Applied => {
                if let BrowseData::Challenges { challenges } = view.data() {
                    self.challenges = challenges.clone();
                }
                Vec::new()
            }
            FetchOutcome::Failed(failure) => self.fail(failure),
            FetchOutcome::Stale | FetchOutcome::Dropped(_) => Vec::new(),
        }
    }

    fn on_trash(&mut self, record: &RecordId, action: TrashAction, result: JournalResult) -> Vec<Command> {
        if let ViewState::Browse(view) = &mut self.state {
            if !view.finish_trash_action(record, result.is_ok()) {
                debug!(record = %record, "trash reply for another view");
            }
        }

        match result {
            Ok(_) => {
                info!(record = %record, ?action, "trash action done");
                let (message, kind) = match action {
                    TrashAction::Restore => ("Entry restored.", NotificationKind::Success),
                    TrashAction::Purge => ("Entry permanently deleted.", NotificationKind::Warning),
                };
                let mut commands = self.notify(message, kind);
                if matches!(&self.state, ViewState::Browse(view) if view.scope() == BrowseScope::Trash) {
                    commands.extend(self.refresh(LoadMode::Background));
                }
                commands
            }
            Err(failure) => self.fail(failure),
        }
    }

    fn on_timer(&mut self, id: TimerId) -> Vec<Command> {
        if self.notifications.on_timer(id) {
            return Vec::new();
        }
        match self.tracker.on_timer(id) {
            Some(challenge) => self
                .api(
                    JournalOperation::FetchChallenge {
                        id: challenge.clone(),
                    },
                    Reply::ChallengeStatus {
                        challenge,
                        purpose: StatusPurpose::Recheck,
                    },
                )
                .into_iter()
                .collect(),
            None => {
                debug!(timer = %id, "stale timer ignored");
                Vec::new()
            }
        }
    }

    // --- Helpers ---

    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Every journal request goes through here; nothing is sent without a
    /// valid session.
    fn api(&self, operation: JournalOperation, reply: Reply) -> Option<Command> {
        if !self.session.logged_in {
            debug!(op = operation.name(), "request skipped, no session");
            return None;
        }
        Some(Command::api(operation, reply))
    }

    fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) -> Vec<Command> {
        self.notifications.show(
            message,
            kind,
            self.config.notification_duration_ms,
            &mut self.timers,
        )
    }

    fn set_error(&mut self, error: AppError) {
        warn!(code = error.code(), error = %error, "surfacing error");
        self.error = Some(error);
    }

    fn fail(&mut self, failure: ApiFailure) -> Vec<Command> {
        let unauthorized = failure == ApiFailure::Unauthorized;
        let commands = if unauthorized && self.is_composing() {
            warn!("session rejected by server, draft kept for resubmission");
            self.end_session()
        } else if unauthorized {
            warn!("session rejected by server");
            self.teardown()
        } else {
            Vec::new()
        };
        self.set_error(failure.into());
        commands
    }

    fn fail_in(&mut self, mode: LoadMode, failure: ApiFailure) -> Vec<Command> {
        match mode {
            LoadMode::Foreground => self.fail(failure),
            LoadMode::Background => {
                warn!(error = %failure, "background refresh failed");
                Vec::new()
            }
        }
    }

    fn remember_challenge(&mut self, challenge: Challenge) {
        match self.challenges.iter_mut().find(|c| c.id == challenge.id) {
            Some(existing) => *existing = challenge,
            None => self.challenges.push(challenge),
        }
    }

    fn challenge_title(&self, scope: &Scope) -> Option<String> {
        let Scope::Challenge(id) = scope else {
            return None;
        };
        self.challenges
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.title.clone())
    }

    // --- Accessors ---

    #[must_use]
    pub fn current_title(&self) -> String {
        match &self.state {
            ViewState::Browse(view) => match view.scope() {
                BrowseScope::Calendar { .. } => self
                    .session
                    .nickname
                    .as_deref()
                    .map_or_else(|| "diary".to_string(), |name| format!("{name}.disk")),
                BrowseScope::Challenges => "disk".into(),
                BrowseScope::Trash => "trash".into(),
                BrowseScope::Profile => "my page".into(),
            },
            ViewState::Compose(composer) => {
                let date = match composer.came_from() {
                    CameFrom::Detail {
                        scope: Scope::Date(date),
                        ..
                    } => *date,
                    _ => self.today,
                };
                format!("{} disk", format_date_title(date))
            }
            ViewState::Detail(view) => match view.scope() {
                Scope::Date(date) => format!("{} disk", format_date_title(*date)),
                Scope::Challenge(_) => view.heading().unwrap_or("disk").to_string(),
            },
        }
    }

    #[must_use]
    pub const fn is_composing(&self) -> bool {
        matches!(self.state, ViewState::Compose(_))
    }

    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub const fn section(&self) -> Section {
        self.nav.active()
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.nav.surface()
    }

    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    #[must_use]
    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        self.session.nickname.as_deref()
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.session.logged_in
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn tracker(&self) -> &TaskAssociationTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DraftField, Emotion, LocalImage, Record};
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn record(id: &str, date: NaiveDate) -> Record {
        Record {
            id: RecordId::new(id),
            content: format!("entry {id}"),
            emotion: Emotion::Peaceful,
            images: Vec::new(),
            date,
            created_at: Utc::now(),
            challenge: None,
            challenge_title: None,
        }
    }

    fn challenge(id: &str, status: ChallengeStatus) -> Challenge {
        Challenge {
            id: ChallengeId::new(id),
            title: "30 days".into(),
            status,
            duration_days: 30,
            progress_days: 3,
            start_date: day(1),
        }
    }

    fn api_calls(commands: &[Command]) -> Vec<(JournalOperation, Reply)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Api { operation, reply } => Some((operation.clone(), reply.clone())),
                _ => None,
            })
            .collect()
    }

    fn single_api(commands: &[Command]) -> (JournalOperation, Reply) {
        let calls = api_calls(commands);
        assert_eq!(calls.len(), 1, "expected one request, got {calls:?}");
        calls.into_iter().next().unwrap()
    }

    fn respond(c: &mut ViewController, reply: Reply, result: JournalResult) -> Vec<Command> {
        c.handle(Event::JournalResponded {
            reply,
            result: Box::new(result),
        })
    }

    fn started_timer(commands: &[Command]) -> TimerId {
        commands
            .iter()
            .find_map(|c| match c {
                Command::StartTimer { id, .. } => Some(*id),
                _ => None,
            })
            .expect("a timer was started")
    }

    /// Logged in, on the October calendar with `records` loaded.
    fn on_calendar(records: Vec<Record>) -> ViewController {
        let mut c = ViewController::default();
        c.handle(Event::AppStarted { today: day(19) });
        c.handle(Event::SessionChanged {
            logged_in: true,
            nickname: Some("mina".into()),
        });
        let commands = c.handle(Event::SectionLoaded(None));
        let (_, reply) = single_api(&commands);
        respond(&mut c, reply, Ok(JournalOutput::Records(records)));
        c
    }

    /// Opens the timeline for `date` with `records` loaded.
    fn on_day(records: Vec<Record>, date: NaiveDate) -> ViewController {
        let mut c = on_calendar(records.clone());
        let commands = c.handle(Event::DateSelected(date));
        let (_, reply) = single_api(&commands);
        respond(&mut c, reply, Ok(JournalOutput::Records(records)));
        c
    }

    /// Opens challenge 5's timeline with one entry in it.
    fn on_challenge() -> ViewController {
        let mut c = on_calendar(Vec::new());
        let commands = c.handle(Event::ChallengeOpened(ChallengeId::new("5")));
        let (operation, reply) = single_api(&commands);
        assert_eq!(
            operation,
            JournalOperation::FetchRecords {
                scope: Scope::Challenge(ChallengeId::new("5"))
            }
        );
        let mut entry = record("40", day(18));
        entry.challenge = Some(ChallengeId::new("5"));
        entry.challenge_title = Some("30 days".into());
        respond(&mut c, reply, Ok(JournalOutput::Records(vec![entry])));
        c
    }

    fn composer(c: &ViewController) -> &EntryComposer {
        match c.state() {
            ViewState::Compose(composer) => &**composer,
            other => panic!("expected compose, got {other:?}"),
        }
    }

    fn timeline(c: &ViewController) -> &TimelineView {
        match c.state() {
            ViewState::Detail(view) => view,
            other => panic!("expected detail, got {other:?}"),
        }
    }

    fn browse_scope(c: &ViewController) -> BrowseScope {
        match c.state() {
            ViewState::Browse(view) => view.scope(),
            other => panic!("expected browse, got {other:?}"),
        }
    }

    mod startup_tests {
        use super::*;

        #[test]
        fn test_start_asks_for_persisted_section() {
            let mut c = ViewController::default();
            let commands = c.handle(Event::AppStarted { today: day(19) });
            assert_eq!(commands, vec![Command::LoadSection, Command::Render]);
        }

        #[test]
        fn test_restored_section_opens_its_browse_scope() {
            let mut c = ViewController::default();
            c.handle(Event::AppStarted { today: day(19) });
            c.handle(Event::SessionChanged {
                logged_in: true,
                nickname: None,
            });

            let commands = c.handle(Event::SectionLoaded(Some(b"\"disk\"".to_vec())));

            assert_eq!(browse_scope(&c), BrowseScope::Challenges);
            assert_eq!(c.section(), Section::Disk);
            assert_eq!(
                single_api(&commands).0,
                JournalOperation::FetchMyChallenges
            );
            assert!(!commands
                .iter()
                .any(|cmd| matches!(cmd, Command::PersistSection(_))));
        }

        #[test]
        fn test_no_requests_without_session() {
            let mut c = ViewController::default();
            c.handle(Event::AppStarted { today: day(19) });
            let commands = c.handle(Event::SectionLoaded(None));

            assert!(api_calls(&commands).is_empty());
            assert_eq!(
                browse_scope(&c),
                BrowseScope::Calendar {
                    year: 2025,
                    month: 10
                }
            );
        }

        #[test]
        fn test_calendar_title_uses_nickname() {
            let c = on_calendar(Vec::new());
            assert_eq!(c.current_title(), "mina.disk");
        }
    }

    mod navigation_tests {
        use super::*;

        #[test]
        fn test_section_switch_is_persisted_and_fetched() {
            let mut c = on_calendar(Vec::new());
            let commands = c.handle(Event::SectionSelected(Section::Trash));

            assert!(commands.contains(&Command::PersistSection(Section::Trash)));
            assert_eq!(single_api(&commands).0, JournalOperation::FetchTrash);
            assert_eq!(c.current_title(), "trash");
        }

        #[test]
        fn test_write_section_is_transient() {
            let mut c = on_calendar(Vec::new());
            let commands = c.handle(Event::SectionSelected(Section::Write));

            assert!(c.is_composing());
            assert_eq!(c.surface(), Surface::Composer);
            assert!(!commands
                .iter()
                .any(|cmd| matches!(cmd, Command::PersistSection(_))));

            c.handle(Event::BackRequested);
            assert_eq!(c.section(), Section::Diary);
        }

        #[test]
        fn test_back_from_detail_lands_on_parent() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            c.handle(Event::BackRequested);
            assert_eq!(
                browse_scope(&c),
                BrowseScope::Calendar {
                    year: 2025,
                    month: 10
                }
            );

            let mut c = on_challenge();
            c.handle(Event::BackRequested);
            assert_eq!(browse_scope(&c), BrowseScope::Challenges);
        }

        #[test]
        fn test_invalid_month_is_ignored() {
            let mut c = on_calendar(Vec::new());
            let commands = c.handle(Event::MonthChanged {
                year: 2025,
                month: 13,
            });
            assert_eq!(commands, vec![Command::Render]);
        }

        #[test]
        fn test_stale_month_reply_is_dropped() {
            let mut c = on_calendar(Vec::new());
            let november = c.handle(Event::MonthChanged {
                year: 2025,
                month: 11,
            });
            c.handle(Event::MonthChanged {
                year: 2025,
                month: 12,
            });

            let (_, reply) = single_api(&november);
            respond(
                &mut c,
                reply,
                Ok(JournalOutput::Records(vec![record("1", day(1))])),
            );

            let ViewState::Browse(view) = c.state() else {
                panic!("expected browse");
            };
            assert_eq!(
                view.scope(),
                BrowseScope::Calendar {
                    year: 2025,
                    month: 12
                }
            );
            assert!(view.find_record(&RecordId::new("1")).is_none());
        }

        #[test]
        fn test_selecting_a_day_with_entries_opens_timeline() {
            let mut c = on_calendar(vec![record("1", day(19))]);
            let commands = c.handle(Event::DateSelected(day(19)));

            assert_eq!(timeline(&c).scope(), &Scope::Date(day(19)));
            assert_eq!(c.current_title(), "OCT 19th. disk");
            assert_eq!(
                single_api(&commands).0,
                JournalOperation::FetchRecords {
                    scope: Scope::Date(day(19))
                }
            );
        }

        #[test]
        fn test_challenge_title_comes_from_records() {
            let c = on_challenge();
            assert_eq!(c.current_title(), "30 days");
        }
    }

    mod compose_tests {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn test_hello_flow() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::DateSelected(day(20)));
            assert!(c.is_composing());
            assert_eq!(composer(&c).came_from(), &CameFrom::Browse(BrowseScope::month_of(day(19))));

            c.handle(Event::DraftChanged(DraftField::Content("hello".into())));
            let commands = c.handle(Event::SubmitRequested);
            let (operation, reply) = single_api(&commands);
            let JournalOperation::CreateRecord(new) = operation else {
                panic!("expected create");
            };
            assert_eq!(new.content, "hello");
            assert_eq!(new.challenge, None);

            let mut saved = record("9", day(19));
            saved.content = "hello".into();
            let commands = respond(&mut c, reply, Ok(JournalOutput::Record(saved)));

            assert_eq!(timeline(&c).scope(), &Scope::Date(day(19)));
            assert_eq!(c.notification().unwrap().message, "Entry saved.");
            assert!(!timeline(&c).just_completed());
            assert_eq!(
                single_api(&commands).0,
                JournalOperation::FetchRecords {
                    scope: Scope::Date(day(19))
                }
            );
        }

        #[test]
        fn test_cancel_discards_draft_and_returns() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("draft".into())));

            c.handle(Event::BackRequested);
            assert!(!c.is_composing());

            c.handle(Event::ComposeRequested);
            assert!(composer(&c).draft().is_blank());
        }

        #[test]
        fn test_blank_submit_is_silent() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("   ".into())));

            let commands = c.handle(Event::SubmitRequested);

            assert!(api_calls(&commands).is_empty());
            assert!(c.error().is_none());
        }

        #[test]
        fn test_failed_submit_keeps_draft_and_allows_retry() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("keep me".into())));
            let (_, reply) = single_api(&c.handle(Event::SubmitRequested));

            respond(
                &mut c,
                reply.clone(),
                Err(ApiFailure::Network {
                    message: "offline".into(),
                }),
            );

            assert!(c.is_composing());
            assert_eq!(composer(&c).draft().content, "keep me");
            assert!(!composer(&c).is_submitting());
            assert_eq!(c.error().unwrap().kind, ErrorKind::Network);

            let (_, retry) = single_api(&c.handle(Event::SubmitRequested));
            assert_ne!(retry, reply);
        }

        #[test]
        fn test_late_reply_after_cancel_is_ignored() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("x".into())));
            let (_, reply) = single_api(&c.handle(Event::SubmitRequested));
            c.handle(Event::BackRequested);

            let commands = respond(
                &mut c,
                reply,
                Ok(JournalOutput::Record(record("1", day(19)))),
            );

            assert_eq!(commands, vec![Command::Render]);
            assert!(matches!(c.state(), ViewState::Browse(_)));
            assert!(c.notification().is_none());
        }

        #[test]
        fn test_submit_without_session_is_an_auth_error() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("x".into())));
            c.session.logged_in = false;

            let commands = c.handle(Event::SubmitRequested);

            assert!(api_calls(&commands).is_empty());
            assert_eq!(c.error().unwrap().kind, ErrorKind::Authentication);
        }

        #[test]
        fn test_image_limit() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            for i in 0..4 {
                c.handle(Event::ImagePicked(LocalImage {
                    handle: format!("img-{i}"),
                    size_bytes: 1024,
                    mime_type: "image/jpeg".into(),
                }));
            }

            assert_eq!(composer(&c).draft().image_count(), 3);
            assert_eq!(c.error().unwrap().kind, ErrorKind::Validation);
        }

        #[test]
        fn test_edit_then_cancel_leaves_record_untouched() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            let commands = c.handle(Event::EditRequested(RecordId::new("1")));

            assert_eq!(
                single_api(&commands).0,
                JournalOperation::FetchRecord {
                    id: RecordId::new("1")
                }
            );
            assert_eq!(composer(&c).draft().content, "entry 1");

            c.handle(Event::DraftChanged(DraftField::Content("rewritten".into())));
            let commands = c.handle(Event::BackRequested);

            assert!(api_calls(&commands)
                .iter()
                .all(|(op, _)| !op.is_mutation()));
            assert_eq!(timeline(&c).scope(), &Scope::Date(day(3)));
        }

        #[test]
        fn test_edit_submits_update() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            c.handle(Event::EditRequested(RecordId::new("1")));
            c.handle(Event::DraftChanged(DraftField::Emotion(Emotion::Proud)));

            let (operation, reply) = single_api(&c.handle(Event::SubmitRequested));
            let JournalOperation::UpdateRecord(changes) = operation else {
                panic!("expected update");
            };
            assert_eq!(changes.id, RecordId::new("1"));
            assert_eq!(changes.emotion, Emotion::Proud);

            respond(&mut c, reply, Ok(JournalOutput::Record(record("1", day(3)))));
            assert_eq!(c.notification().unwrap().message, "Entry updated.");
        }

        #[test]
        fn test_hydration_skips_dirty_draft() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            let (_, reply) = single_api(&c.handle(Event::EditRequested(RecordId::new("1"))));
            c.handle(Event::DraftChanged(DraftField::Content("mine".into())));

            let mut fresh = record("1", day(3));
            fresh.content = "server".into();
            respond(&mut c, reply, Ok(JournalOutput::Record(fresh)));

            assert_eq!(composer(&c).draft().content, "mine");
        }

        #[test]
        fn test_attaching_closed_challenge_is_refused() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            let commands = c.handle(Event::ChallengeAttachRequested(ChallengeId::new("7")));
            let (_, reply) = single_api(&commands);

            respond(
                &mut c,
                reply,
                Ok(JournalOutput::Challenge(challenge("7", ChallengeStatus::Completed))),
            );

            assert_eq!(composer(&c).draft().challenge, None);
            assert_eq!(c.error().unwrap().kind, ErrorKind::Conflict);
        }

        #[test]
        fn test_attaching_active_challenge_sets_baseline() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            let (_, reply) =
                single_api(&c.handle(Event::ChallengeAttachRequested(ChallengeId::new("7"))));

            let commands = respond(
                &mut c,
                reply,
                Ok(JournalOutput::Challenge(challenge("7", ChallengeStatus::Active))),
            );

            assert!(api_calls(&commands).is_empty());
            assert_eq!(composer(&c).draft().challenge, Some(ChallengeId::new("7")));
            assert_eq!(c.tracker().baseline(), Some(ChallengeStatus::Active));
        }

        proptest! {
            #[test]
            fn rapid_submits_send_exactly_one_request(presses in 1usize..25) {
                let mut c = on_calendar(Vec::new());
                c.handle(Event::ComposeRequested);
                c.handle(Event::DraftChanged(DraftField::Content("once".into())));

                let requests: usize = (0..presses)
                    .map(|_| api_calls(&c.handle(Event::SubmitRequested)).len())
                    .sum();

                prop_assert_eq!(requests, 1);
                prop_assert!(composer(&c).is_submitting());
            }
        }
    }

    mod timeline_tests {
        use super::*;

        #[test]
        fn test_deleting_last_entry_returns_to_calendar() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            let commands = c.handle(Event::DeleteRequested(RecordId::new("1")));
            let (operation, reply) = single_api(&commands);
            assert_eq!(
                operation,
                JournalOperation::DeleteRecord {
                    id: RecordId::new("1")
                }
            );

            respond(&mut c, reply, Ok(JournalOutput::Done));

            assert_eq!(browse_scope(&c), BrowseScope::month_of(day(3)));
            assert_eq!(c.notification().unwrap().message, "Moved to trash.");
        }

        #[test]
        fn test_deleting_one_of_several_stays() {
            let mut c = on_day(vec![record("1", day(3)), record("2", day(3))], day(3));
            let (_, reply) = single_api(&c.handle(Event::DeleteRequested(RecordId::new("1"))));

            let commands = respond(&mut c, reply, Ok(JournalOutput::Done));

            assert_eq!(timeline(&c).records().len(), 1);
            assert!(timeline(&c).find(&RecordId::new("2")).is_some());
            assert_eq!(
                single_api(&commands).0,
                JournalOperation::FetchRecords {
                    scope: Scope::Date(day(3))
                }
            );
        }

        #[test]
        fn test_failed_delete_keeps_entry() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            let (_, reply) = single_api(&c.handle(Event::DeleteRequested(RecordId::new("1"))));

            respond(&mut c, reply, Err(ApiFailure::NotFound));

            assert_eq!(timeline(&c).records().len(), 1);
            assert_eq!(c.error().unwrap().kind, ErrorKind::NotFound);
        }

        #[test]
        fn test_create_in_date_scope_returns_to_timeline() {
            let mut c = on_day(vec![record("1", day(3))], day(3));
            c.handle(Event::CreateInScopeRequested);

            assert_eq!(c.current_title(), "OCT 3rd. disk");
            assert!(composer(&c).origin().is_none());

            c.handle(Event::BackRequested);
            assert_eq!(timeline(&c).scope(), &Scope::Date(day(3)));
        }
    }

    mod challenge_tests {
        use super::*;

        /// Writes "day 4" into challenge 5 from its timeline and returns the
        /// timer the re-check is scheduled on.
        fn submit_into_challenge(c: &mut ViewController) -> TimerId {
            let commands = c.handle(Event::CreateInScopeRequested);
            let (operation, reply) = single_api(&commands);
            assert_eq!(
                operation,
                JournalOperation::FetchChallenge {
                    id: ChallengeId::new("5")
                }
            );
            respond(
                c,
                reply,
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Active))),
            );

            c.handle(Event::DraftChanged(DraftField::Content("day 4".into())));
            let (operation, reply) = single_api(&c.handle(Event::SubmitRequested));
            let JournalOperation::CreateRecord(new) = &operation else {
                panic!("expected create");
            };
            assert_eq!(new.challenge, Some(ChallengeId::new("5")));

            let mut saved = record("41", day(19));
            saved.challenge = Some(ChallengeId::new("5"));
            let commands = respond(c, reply, Ok(JournalOutput::Record(saved)));

            assert!(api_calls(&commands)
                .iter()
                .any(|(op, _)| op == &JournalOperation::FetchMyChallenges));
            started_timer(&commands)
        }

        #[test]
        fn test_handoff_lands_back_on_origin() {
            let mut c = on_challenge();
            submit_into_challenge(&mut c);

            let view = timeline(&c);
            assert_eq!(view.scope(), &Scope::Challenge(ChallengeId::new("5")));
            assert!(view.just_completed());
            assert_eq!(c.current_title(), "30 days");
        }

        #[test]
        fn test_completion_fires_once() {
            let mut c = on_challenge();
            let timer = submit_into_challenge(&mut c);

            let commands = c.handle(Event::TimerFired { id: timer });
            let (operation, reply) = single_api(&commands);
            assert_eq!(
                operation,
                JournalOperation::FetchChallenge {
                    id: ChallengeId::new("5")
                }
            );

            respond(
                &mut c,
                reply.clone(),
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Completed))),
            );
            assert!(c.completion().unwrap().is_success);
            assert_eq!(
                c.notification().unwrap().message,
                "Challenge \"30 days\" completed!"
            );

            c.handle(Event::CompletionAcknowledged);
            respond(
                &mut c,
                reply,
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Completed))),
            );
            assert!(c.completion().is_none());
        }

        #[test]
        fn test_late_baseline_does_not_refire_completion() {
            let mut c = on_challenge();
            let (_, baseline) = single_api(&c.handle(Event::CreateInScopeRequested));

            c.handle(Event::DraftChanged(DraftField::Content("day 30".into())));
            let (_, reply) = single_api(&c.handle(Event::SubmitRequested));
            let mut saved = record("41", day(19));
            saved.challenge = Some(ChallengeId::new("5"));
            let timer = started_timer(&respond(&mut c, reply, Ok(JournalOutput::Record(saved))));

            let (_, recheck) = single_api(&c.handle(Event::TimerFired { id: timer }));
            respond(
                &mut c,
                recheck,
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Completed))),
            );
            assert!(c.completion().is_some());
            c.handle(Event::CompletionAcknowledged);

            respond(
                &mut c,
                baseline,
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Active))),
            );
            assert_eq!(c.tracker().baseline(), Some(ChallengeStatus::Completed));

            c.handle(Event::CreateInScopeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("day 31".into())));
            let (_, reply) = single_api(&c.handle(Event::SubmitRequested));
            let mut saved = record("42", day(19));
            saved.challenge = Some(ChallengeId::new("5"));
            let timer = started_timer(&respond(&mut c, reply, Ok(JournalOutput::Record(saved))));
            let (_, recheck) = single_api(&c.handle(Event::TimerFired { id: timer }));
            respond(
                &mut c,
                recheck,
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Completed))),
            );

            assert!(c.completion().is_none());
        }

        #[test]
        fn test_still_active_challenge_is_silent() {
            let mut c = on_challenge();
            let timer = submit_into_challenge(&mut c);
            let (_, reply) = single_api(&c.handle(Event::TimerFired { id: timer }));

            respond(
                &mut c,
                reply,
                Ok(JournalOutput::Challenge(challenge("5", ChallengeStatus::Active))),
            );

            assert!(c.completion().is_none());
        }

        #[test]
        fn test_stale_timer_is_ignored() {
            let mut c = on_challenge();
            let commands = c.handle(Event::TimerFired { id: TimerId(999) });
            assert_eq!(commands, vec![Command::Render]);
        }

        #[test]
        fn test_join_refreshes_challenges() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::SectionSelected(Section::Disk));
            let (_, reply) =
                single_api(&c.handle(Event::JoinChallengeRequested(ChallengeId::new("8"))));

            let commands = respond(&mut c, reply, Ok(JournalOutput::Done));

            assert_eq!(
                single_api(&commands).0,
                JournalOperation::FetchMyChallenges
            );
            assert_eq!(
                c.notification().unwrap().kind,
                NotificationKind::Success
            );
        }
    }

    mod trash_tests {
        use super::*;

        fn on_trash() -> ViewController {
            let mut c = on_calendar(Vec::new());
            let (_, reply) = single_api(&c.handle(Event::SectionSelected(Section::Trash)));
            respond(
                &mut c,
                reply,
                Ok(JournalOutput::Records(vec![
                    record("1", day(1)),
                    record("2", day(2)),
                ])),
            );
            c
        }

        #[test]
        fn test_restore_is_single_flight() {
            let mut c = on_trash();
            let (operation, reply) =
                single_api(&c.handle(Event::RestoreRequested(RecordId::new("1"))));
            assert_eq!(
                operation,
                JournalOperation::RestoreRecord {
                    id: RecordId::new("1")
                }
            );
            assert!(api_calls(&c.handle(Event::PurgeRequested(RecordId::new("2")))).is_empty());

            let commands = respond(&mut c, reply, Ok(JournalOutput::Done));

            assert_eq!(c.notification().unwrap().message, "Entry restored.");
            assert_eq!(single_api(&commands).0, JournalOperation::FetchTrash);
        }

        #[test]
        fn test_purge_warns() {
            let mut c = on_trash();
            let (_, reply) = single_api(&c.handle(Event::PurgeRequested(RecordId::new("2"))));
            respond(&mut c, reply, Ok(JournalOutput::Done));

            let notification = c.notification().unwrap();
            assert_eq!(notification.message, "Entry permanently deleted.");
            assert_eq!(notification.kind, NotificationKind::Warning);
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_logout_cancels_timers_and_clears_state() {
            let mut c = on_challenge();
            let timer = submit_with_pending_recheck(&mut c);

            let commands = c.handle(Event::SessionChanged {
                logged_in: false,
                nickname: None,
            });

            assert!(commands.contains(&Command::CancelTimer { id: timer }));
            assert!(!c.is_logged_in());
            assert!(c.tracker().watched().is_none());
            assert!(c.challenges().is_empty());
            assert!(matches!(c.state(), ViewState::Browse(_)));
        }

        fn submit_with_pending_recheck(c: &mut ViewController) -> TimerId {
            c.handle(Event::CreateInScopeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("x".into())));
            let (_, reply) = single_api(&c.handle(Event::SubmitRequested));
            let mut saved = record("41", day(19));
            saved.challenge = Some(ChallengeId::new("5"));
            started_timer(&respond(c, reply, Ok(JournalOutput::Record(saved))))
        }

        #[test]
        fn test_unauthorized_reply_ends_session() {
            let mut c = on_calendar(Vec::new());
            let (_, reply) = single_api(&c.handle(Event::RefreshRequested));

            respond(&mut c, reply, Err(ApiFailure::Unauthorized));

            assert!(!c.is_logged_in());
            assert_eq!(c.error().unwrap().kind, ErrorKind::Authentication);
        }

        #[test]
        fn test_unauthorized_submit_keeps_draft() {
            let mut c = on_calendar(Vec::new());
            c.handle(Event::ComposeRequested);
            c.handle(Event::DraftChanged(DraftField::Content("keep me".into())));
            let (_, reply) = single_api(&c.handle(Event::SubmitRequested));

            respond(&mut c, reply, Err(ApiFailure::Unauthorized));

            assert!(!c.is_logged_in());
            assert_eq!(c.error().unwrap().kind, ErrorKind::Authentication);
            let composer = composer(&c);
            assert_eq!(composer.draft().content, "keep me");
            assert!(!composer.is_submitting());

            c.handle(Event::SessionChanged {
                logged_in: true,
                nickname: None,
            });
            let (operation, _) = single_api(&c.handle(Event::SubmitRequested));
            assert!(matches!(operation, JournalOperation::CreateRecord(new) if new.content == "keep me"));
        }

        #[test]
        fn test_invalid_config_is_rejected() {
            let mut c = ViewController::default();
            let config = EngineConfig {
                max_images: 0,
                ..EngineConfig::default()
            };

            c.handle(Event::ConfigUpdated(Box::new(config)));

            assert_eq!(c.config(), &EngineConfig::default());
            assert_eq!(c.error().unwrap().kind, ErrorKind::Validation);
        }

        #[test]
        fn test_config_duration_applies_to_notifications() {
            let mut c = on_day(vec![record("1", day(3)), record("2", day(3))], day(3));
            c.handle(Event::ConfigUpdated(Box::new(EngineConfig {
                notification_duration_ms: Some(1500),
                ..EngineConfig::default()
            })));
            let (_, reply) = single_api(&c.handle(Event::DeleteRequested(RecordId::new("1"))));

            let commands = respond(&mut c, reply, Ok(JournalOutput::Done));

            assert!(commands
                .iter()
                .any(|cmd| matches!(cmd, Command::StartTimer { after_ms: 1500, .. })));
        }
    }
}
