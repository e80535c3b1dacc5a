//! Top-level controller: owns the document, the store, the scheduler and the
//! translator, routes input to the current screen and turns screen intents
//! into job lifecycle calls and screen transitions.
//!
//! Every mutation of the document is followed by a whole-document save.
//! Failures never stop the app; they end up as a [`Notice`] on screen and in
//! the log.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::i18n::{I18nError, Translator};
use crate::scheduler::{JobError, Scheduler};
use crate::storage::{schema, ActiveJob, Document, Store, StoreError};
use crate::ui::{
    self, ActiveScreen, ConfirmScreen, HistoryScreen, HomeScreen, Intent, Notice, Screen,
    ScreenKind, SettingsScreen, View,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to initialize translations: {0}")]
    I18n(#[from] I18nError),
}

/// Input delivered by the terminal loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick(Instant),
}

/// What the terminal loop should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Leave the UI. `warning` is shown after the terminal is restored.
    Quit { warning: Option<String> },
}

pub struct App {
    doc: Document,
    store: Box<dyn Store>,
    scheduler: Scheduler,
    translator: Translator,
    screen: Screen,
    viewport: (u16, u16),
    notice: Option<Notice>,
}

impl App {
    /// Load and recover the document, then pick the first screen: Active if
    /// a job is still pending, Home otherwise.
    ///
    /// An unreadable document degrades to the default one.
    pub fn new(store: Box<dyn Store>, scheduler: Scheduler) -> Result<Self, AppError> {
        let mut notice = None;
        let mut doc = match store.load() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(location = %store.location(), error = %e, "state unreadable, starting from defaults");
                notice = Some(Notice::warning(e.to_string()));
                Document::default()
            }
        };

        let mut changed = schema::migrate(&mut doc);
        changed |= scheduler.expire_stale(&mut doc);

        let translator = Translator::new(&doc.settings.language)?;
        let screen = if doc.active_job.is_some() {
            Screen::Active(ActiveScreen::new())
        } else {
            Screen::Home(HomeScreen::new())
        };

        let mut app = Self {
            doc,
            store,
            scheduler,
            translator,
            screen,
            viewport: (80, 24),
            notice,
        };
        if changed {
            shown(app.persist());
        }
        debug!(
            location = %app.store.location(),
            screen = ?app.screen.kind(),
            active = app.doc.active_job.is_some(),
            "app ready"
        );
        Ok(app)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn store_location(&self) -> String {
        self.store.location()
    }

    pub fn os(&self) -> &'static str {
        self.scheduler.os()
    }

    pub fn handle(&mut self, event: AppEvent) -> Control {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Resize(width, height) => {
                self.viewport = (width, height);
                self.screen.resize(width, height);
                Control::Continue
            }
            AppEvent::Tick(now) => {
                self.screen.on_tick(now);
                Control::Continue
            }
        }
    }

    /// When the current screen next wants a redraw without input.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.screen.next_deadline()
    }

    pub fn draw(&self, frame: &mut Frame) {
        let view = View {
            doc: &self.doc,
            t: &self.translator,
            now: self.scheduler.now(),
            notice: self.notice.as_ref(),
        };
        ui::draw(frame, &self.screen, &view);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Control {
        if key.kind != KeyEventKind::Press {
            return Control::Continue;
        }

        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        let q = key.code == KeyCode::Char('q') && !self.screen.captures_text();
        if ctrl_c || q {
            return self.quit();
        }

        self.notice = None;
        if let Some(intent) = self.screen.handle_key(key, &mut self.doc) {
            self.apply(intent);
        }
        Control::Continue
    }

    fn quit(&self) -> Control {
        let warning = match (&self.doc.active_job, self.screen.kind()) {
            (Some(job), kind) if kind != ScreenKind::Active => {
                warn!(command = %job.command, "quitting with a shutdown still scheduled");
                Some(self.translator.get("messages.quit_warning").to_string())
            }
            _ => None,
        };
        info!("leaving interactive mode");
        Control::Quit { warning }
    }

    fn apply(&mut self, intent: Intent) {
        debug!(?intent, screen = ?self.screen.kind(), "screen intent");
        match intent {
            Intent::Start { minutes } => {
                let settings = &self.doc.settings;
                if settings.confirm {
                    self.screen = Screen::Confirm(ConfirmScreen::new(minutes, settings.dry_run_default));
                } else {
                    let dry_run = settings.dry_run_default;
                    shown(self.start_job(minutes, dry_run));
                }
            }
            Intent::Confirmed { minutes, dry_run } => {
                shown(self.start_job(minutes, dry_run));
            }
            Intent::Dismiss => self.go(ScreenKind::Home),
            Intent::CancelJob | Intent::EditJob => {
                shown(self.cancel_job());
                self.go(ScreenKind::Home);
            }
            Intent::Open(kind) => self.go(kind),
            Intent::Back => match self.screen.kind() {
                ScreenKind::History if self.doc.active_job.is_some() => self.go(ScreenKind::Active),
                _ => self.go(ScreenKind::Home),
            },
            Intent::DeleteHistory(id) => {
                if self.doc.delete_history(&id) {
                    info!(%id, "history entry deleted");
                    if self.persist().is_ok() {
                        self.notice = Some(Notice::info(self.translator.get("messages.history_deleted")));
                    }
                }
                if let Screen::History(history) = &mut self.screen {
                    history.refresh(&self.doc);
                }
            }
            Intent::SettingsChanged => {
                self.sync_language();
                shown(self.persist());
            }
        }
    }

    /// Start a job and move to the Active screen. On failure the Home screen
    /// shows the error; the failed attempt is in history either way.
    pub fn start_job(&mut self, minutes: u32, dry_run: bool) -> Result<ActiveJob, AppError> {
        let result = self.scheduler.start_job(&mut self.doc, minutes, dry_run);
        let saved = self.persist();

        match result {
            Ok(job) => {
                self.screen = Screen::Active(ActiveScreen::new());
                if saved.is_ok() {
                    self.notice = Some(Notice::info(self.translator.get("messages.job_started")));
                }
                saved?;
                Ok(job)
            }
            Err(e) => {
                self.screen = Screen::Home(HomeScreen::new());
                self.notice = Some(Notice::error(format!(
                    "{}: {e}",
                    self.translator.get("messages.schedule_failed")
                )));
                Err(e.into())
            }
        }
    }

    /// Cancel the active job. Returns `Ok(false)` when there was none.
    pub fn cancel_job(&mut self) -> Result<bool, AppError> {
        let result = self.scheduler.cancel_job(&mut self.doc);
        let saved = match result {
            Ok(false) => Ok(()),
            _ => self.persist(),
        };

        match result {
            Ok(cancelled) => {
                if cancelled && saved.is_ok() {
                    self.notice = Some(Notice::info(self.translator.get("messages.job_cancelled")));
                }
                saved?;
                Ok(cancelled)
            }
            Err(e) => {
                self.notice = Some(Notice::error(format!(
                    "{}: {e}",
                    self.translator.get("messages.cancel_failed")
                )));
                Err(e.into())
            }
        }
    }

    /// Controlled termination: drop an expired job before the process exits.
    /// A pending job is left running.
    pub fn on_terminate(&mut self) -> Result<bool, AppError> {
        if self.scheduler.expire_stale(&mut self.doc) {
            self.persist()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn go(&mut self, kind: ScreenKind) {
        if self.screen.kind() == ScreenKind::Settings && kind != ScreenKind::Settings {
            shown(self.persist());
        }
        self.screen = match kind {
            ScreenKind::Active if self.doc.active_job.is_some() => Screen::Active(ActiveScreen::new()),
            ScreenKind::History => Screen::History(HistoryScreen::new(self.viewport.1)),
            ScreenKind::Settings => Screen::Settings(SettingsScreen::new()),
            ScreenKind::Home | ScreenKind::Active | ScreenKind::Confirm => Screen::Home(HomeScreen::new()),
        };
    }

    fn sync_language(&mut self) {
        let wanted = self.doc.settings.language.clone();
        if wanted == self.translator.language() {
            return;
        }
        match Translator::new(&wanted) {
            Ok(translator) => {
                info!(language = %translator.language(), "language switched");
                self.translator = translator;
            }
            Err(e) => warn!(language = %wanted, error = %e, "could not switch language"),
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        match self.store.save(&self.doc) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(location = %self.store.location(), error = %e, "failed to save state");
                self.notice = Some(Notice::error(format!(
                    "{}: {e}",
                    self.translator.get("messages.save_failed")
                )));
                Err(e)
            }
        }
    }
}

/// Failures of interactive actions already sit on the notice line.
fn shown<T, E: std::fmt::Display>(result: Result<T, E>) {
    if let Err(e) = result {
        debug!(error = %e, "action failed, shown as notice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::clock::FixedClock;
    use crate::scheduler::history::JobStatus;
    use crate::shutdown::runner::RecordingRunner;
    use crate::shutdown::LinuxExecutor;
    use crate::storage::{JsonFileStore, MemoryStore};
    use crate::ui::NoticeLevel;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap()
    }

    struct Harness {
        app: App,
        store: MemoryStore,
        runner: RecordingRunner,
        clock: Arc<FixedClock>,
    }

    fn harness_with(doc: Document, runner: RecordingRunner) -> Harness {
        let store = MemoryStore::with(doc);
        let clock = Arc::new(FixedClock::new(start()));
        let exec = LinuxExecutor::with_runner(Box::new(runner.clone()));
        let scheduler = Scheduler::new(Box::new(exec), clock.clone());
        let app = App::new(Box::new(store.clone()), scheduler).unwrap();
        Harness {
            app,
            store,
            runner,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(Document::default(), RecordingRunner::new())
    }

    fn press(app: &mut App, code: KeyCode) -> Control {
        app.handle(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ch(app: &mut App, c: char) -> Control {
        press(app, KeyCode::Char(c))
    }

    fn pending_job(minutes: i64, offset: Duration) -> ActiveJob {
        let start_time = start() + offset;
        ActiveJob {
            start_time,
            end_time: start_time + Duration::minutes(minutes),
            duration_sec: minutes as u64 * 60,
            command: format!("shutdown -h +{minutes}"),
            dry_run: false,
            history_id: None,
        }
    }

    #[test]
    fn test_startup_without_job_shows_home() {
        let h = harness();
        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        assert_eq!(h.store.save_count(), 0);
    }

    #[test]
    fn test_startup_with_pending_job_shows_active() {
        let mut doc = Document::default();
        doc.active_job = Some(pending_job(30, Duration::minutes(-10)));
        let h = harness_with(doc, RecordingRunner::new());
        assert_eq!(h.app.screen().kind(), ScreenKind::Active);
    }

    #[test]
    fn test_startup_clears_expired_job_and_saves() {
        let mut doc = Document::default();
        doc.active_job = Some(pending_job(30, Duration::hours(-2)));
        let h = harness_with(doc, RecordingRunner::new());

        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        assert!(h.app.document().active_job.is_none());
        assert!(h.store.saved().unwrap().active_job.is_none());
        assert!(h.runner.calls().is_empty());
    }

    #[test]
    fn test_unreadable_state_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::new(start()));
        let exec = LinuxExecutor::with_runner(Box::new(RecordingRunner::new()));
        let store = JsonFileStore::new(dir.path());
        let app = App::new(Box::new(store), Scheduler::new(Box::new(exec), clock)).unwrap();

        assert_eq!(app.document(), &Document::default());
        assert_eq!(app.notice().map(|n| n.level), Some(NoticeLevel::Warning));
    }

    #[test]
    fn test_preset_with_confirmation_then_dry_run() {
        let mut h = harness();
        ch(&mut h.app, '2');
        press(&mut h.app, KeyCode::Enter);
        assert_eq!(h.app.screen().kind(), ScreenKind::Confirm);
        assert!(h.app.document().active_job.is_none());

        ch(&mut h.app, 'd');
        ch(&mut h.app, 'y');
        assert_eq!(h.app.screen().kind(), ScreenKind::Active);

        let saved = h.store.saved().unwrap();
        let job = saved.active_job.unwrap();
        assert!(job.dry_run);
        assert_eq!(job.duration_sec, 30 * 60);
        assert_eq!(saved.history[0].status, JobStatus::DryRun);
        assert!(h.runner.calls().is_empty());
    }

    #[test]
    fn test_confirm_dismiss_returns_home_without_job() {
        let mut h = harness();
        ch(&mut h.app, '1');
        press(&mut h.app, KeyCode::Enter);
        ch(&mut h.app, 'n');
        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        assert!(h.app.document().history.is_empty());
    }

    #[test]
    fn test_start_without_confirmation_goes_active() {
        let mut doc = Document::default();
        doc.settings.confirm = false;
        let mut h = harness_with(doc, RecordingRunner::new());

        press(&mut h.app, KeyCode::Tab);
        for c in "1:20".chars() {
            ch(&mut h.app, c);
        }
        press(&mut h.app, KeyCode::Enter);

        assert_eq!(h.app.screen().kind(), ScreenKind::Active);
        assert_eq!(h.runner.calls(), ["shutdown -h +80"]);
        assert_eq!(h.store.saved().unwrap().history[0].status, JobStatus::Ok);
    }

    #[test]
    fn test_schedule_failure_stays_home_with_error() {
        let mut doc = Document::default();
        doc.settings.confirm = false;
        let mut h = harness_with(doc, RecordingRunner::new().failing("shutdown -h +15"));

        ch(&mut h.app, '1');
        press(&mut h.app, KeyCode::Enter);

        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        assert_eq!(h.app.notice().map(|n| n.level), Some(NoticeLevel::Error));
        let saved = h.store.saved().unwrap();
        assert!(saved.active_job.is_none());
        assert_eq!(saved.history[0].status, JobStatus::Failed);
    }

    #[test]
    fn test_cancel_from_active_screen() {
        let mut h = harness();
        h.app.start_job(45, false).unwrap();
        assert_eq!(h.app.screen().kind(), ScreenKind::Active);

        ch(&mut h.app, 'c');
        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        let saved = h.store.saved().unwrap();
        assert!(saved.active_job.is_none());
        assert_eq!(saved.history[0].status, JobStatus::Cancelled);
        assert_eq!(h.runner.calls(), ["shutdown -h +45", "shutdown -c"]);
    }

    #[test]
    fn test_cancel_failure_is_reported_and_job_cleared() {
        let mut h = harness_with(Document::default(), RecordingRunner::new().failing("shutdown -c"));
        h.app.start_job(45, false).unwrap();
        ch(&mut h.app, 'e');

        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        assert_eq!(h.app.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert_eq!(h.store.saved().unwrap().history[0].status, JobStatus::Failed);
        assert!(h.app.document().active_job.is_none());
    }

    #[test]
    fn test_quit_warns_only_away_from_active_screen() {
        let mut h = harness();
        assert_eq!(ch(&mut h.app, 'q'), Control::Quit { warning: None });

        h.app.start_job(10, true).unwrap();
        assert_eq!(ch(&mut h.app, 'q'), Control::Quit { warning: None });

        press(&mut h.app, KeyCode::Esc);
        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        match ch(&mut h.app, 'q') {
            Control::Quit { warning: Some(text) } => assert!(text.contains("keeps running")),
            other => panic!("expected warning, got {other:?}"),
        }
    }

    #[test]
    fn test_q_types_into_focused_input_but_ctrl_c_quits() {
        let mut h = harness();
        press(&mut h.app, KeyCode::Tab);
        assert_eq!(ch(&mut h.app, 'q'), Control::Continue);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(h.app.handle(AppEvent::Key(ctrl_c)), Control::Quit { .. }));
    }

    #[test]
    fn test_history_back_depends_on_active_job() {
        let mut h = harness();
        ch(&mut h.app, 'h');
        assert_eq!(h.app.screen().kind(), ScreenKind::History);
        press(&mut h.app, KeyCode::Esc);
        assert_eq!(h.app.screen().kind(), ScreenKind::Home);

        h.app.start_job(10, true).unwrap();
        ch(&mut h.app, 'h');
        press(&mut h.app, KeyCode::Esc);
        assert_eq!(h.app.screen().kind(), ScreenKind::Active);
    }

    #[test]
    fn test_history_replay_and_delete() {
        let mut doc = Document::default();
        doc.settings.confirm = false;
        doc.settings.dry_run_default = true;
        let mut h = harness_with(doc, RecordingRunner::new());

        h.app.start_job(20, true).unwrap();
        h.app.cancel_job().unwrap();
        h.clock.advance(Duration::minutes(1));

        ch(&mut h.app, 'h');
        press(&mut h.app, KeyCode::Enter);
        assert_eq!(h.app.screen().kind(), ScreenKind::Active);
        assert_eq!(h.app.document().active_job.as_ref().unwrap().duration_sec, 1200);
        assert_eq!(h.app.document().history.len(), 2);

        ch(&mut h.app, 'h');
        ch(&mut h.app, 'j');
        let doomed = h.app.document().history[1].id.clone();
        ch(&mut h.app, 'd');
        let saved = h.store.saved().unwrap();
        assert_eq!(saved.history.len(), 1);
        assert!(saved.history_entry(&doomed).is_none());
    }

    #[test]
    fn test_settings_language_switch_and_persist_on_leave() {
        let mut h = harness();
        ch(&mut h.app, 's');
        ch(&mut h.app, 'j');
        ch(&mut h.app, 'j');
        press(&mut h.app, KeyCode::Enter);
        assert_eq!(h.app.translator().language(), "tr");
        assert_eq!(h.store.saved().unwrap().settings.language, "tr");

        let saves = h.store.save_count();
        press(&mut h.app, KeyCode::Esc);
        assert_eq!(h.app.screen().kind(), ScreenKind::Home);
        assert_eq!(h.store.save_count(), saves + 1);
    }

    #[test]
    fn test_save_failure_becomes_notice() {
        let mut h = harness();
        h.store.fail_saves(true);
        let err = h.app.start_job(5, true).unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(h.app.document().active_job.is_some());
        assert_eq!(h.app.notice().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_settings_save_failure_becomes_notice() {
        let mut h = harness();
        ch(&mut h.app, 's');
        h.store.fail_saves(true);
        press(&mut h.app, KeyCode::Enter);

        assert!(!h.app.document().settings.confirm);
        assert_eq!(h.app.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert_eq!(h.app.screen().kind(), ScreenKind::Settings);
    }

    #[test]
    fn test_terminate_expires_job_only_when_due() {
        let mut h = harness();
        h.app.start_job(10, false).unwrap();
        assert!(!h.app.on_terminate().unwrap());
        assert!(h.app.document().active_job.is_some());

        h.clock.advance(Duration::minutes(11));
        assert!(h.app.on_terminate().unwrap());
        assert!(h.store.saved().unwrap().active_job.is_none());
        assert_eq!(h.runner.calls(), ["shutdown -h +10"]);
    }

    #[test]
    fn test_resize_reaches_history_screen() {
        let mut h = harness();
        h.app.handle(AppEvent::Resize(100, 40));
        ch(&mut h.app, 'h');
        h.app.handle(AppEvent::Resize(60, 10));
        assert_eq!(h.app.screen().kind(), ScreenKind::History);
    }
}
