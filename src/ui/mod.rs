//! Terminal screens.
//!
//! Each screen owns only its transient state (selection, text buffers,
//! scroll offset) and reads the shared [`Document`] when it handles a key or
//! draws. Anything that touches jobs or history comes back to the app as an
//! [`Intent`]. Only the current screen exists; the app builds a fresh one on
//! every transition.

pub mod active;
pub mod confirm;
pub mod history;
pub mod home;
pub mod input;
pub mod settings;
pub mod theme;

use std::time::Instant;

use chrono::{DateTime, Utc};
use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::i18n::Translator;
use crate::storage::Document;

pub use self::active::{ActiveScreen, Ticker};
pub use self::confirm::ConfirmScreen;
pub use self::history::HistoryScreen;
pub use self::home::HomeScreen;
pub use self::settings::SettingsScreen;

/// What a screen asks the app to do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Start a job for `minutes`, through the confirm step if enabled.
    Start { minutes: u32 },
    /// Start a job now with an explicit dry-run choice.
    Confirmed { minutes: u32, dry_run: bool },
    /// Drop the pending confirmation.
    Dismiss,
    /// Cancel the active job and return home.
    CancelJob,
    /// Cancel the active job so a new duration can be entered.
    EditJob,
    /// Switch screens without touching any job.
    Open(ScreenKind),
    /// Leave the current screen.
    Back,
    DeleteHistory(String),
    /// The document was edited in place and should be saved.
    SettingsChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Home,
    Confirm,
    Active,
    History,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One-line transient message shown under the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Read-only inputs for drawing a frame.
pub struct View<'a> {
    pub doc: &'a Document,
    pub t: &'a Translator,
    pub now: DateTime<Utc>,
    pub notice: Option<&'a Notice>,
}

/// The current screen and its local state.
#[derive(Debug)]
pub enum Screen {
    Home(HomeScreen),
    Confirm(ConfirmScreen),
    Active(ActiveScreen),
    History(HistoryScreen),
    Settings(SettingsScreen),
}

impl Screen {
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Home(_) => ScreenKind::Home,
            Screen::Confirm(_) => ScreenKind::Confirm,
            Screen::Active(_) => ScreenKind::Active,
            Screen::History(_) => ScreenKind::History,
            Screen::Settings(_) => ScreenKind::Settings,
        }
    }

    /// Whether plain character keys are going into a text field.
    pub fn captures_text(&self) -> bool {
        match self {
            Screen::Home(s) => s.captures_text(),
            Screen::Settings(s) => s.captures_text(),
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, doc: &mut Document) -> Option<Intent> {
        match self {
            Screen::Home(s) => s.handle_key(key, doc),
            Screen::Confirm(s) => s.handle_key(key),
            Screen::Active(s) => s.handle_key(key),
            Screen::History(s) => s.handle_key(key, doc),
            Screen::Settings(s) => s.handle_key(key, doc),
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        if let Screen::History(s) = self {
            s.resize(width, height);
        }
    }

    /// When the screen next wants a redraw without input.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self {
            Screen::Active(s) => Some(s.ticker().deadline()),
            _ => None,
        }
    }

    /// Advance timers. Returns whether a redraw is due.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        match self {
            Screen::Active(s) => s.on_tick(now),
            _ => false,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect, view: &View) {
        match self {
            Screen::Home(s) => s.render(frame, area, view),
            Screen::Confirm(s) => s.render(frame, area, view),
            Screen::Active(s) => s.render(frame, area, view),
            Screen::History(s) => s.render(frame, area, view),
            Screen::Settings(s) => s.render(frame, area, view),
        }
    }

    fn hints<'a>(&self, view: &View<'a>) -> Vec<(&'a str, &'a str)> {
        match self {
            Screen::Home(s) => s.hints(view),
            Screen::Confirm(s) => s.hints(view),
            Screen::Active(s) => s.hints(view),
            Screen::History(s) => s.hints(view),
            Screen::Settings(s) => s.hints(view),
        }
    }
}

/// Draw the current screen with the notice line and key hints below it.
pub fn draw(frame: &mut Frame, screen: &Screen, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    screen.render(frame, chunks[0], view);

    if let Some(notice) = view.notice {
        let style = match notice.level {
            NoticeLevel::Info => theme::active(),
            NoticeLevel::Warning => theme::warning(),
            NoticeLevel::Error => theme::error(),
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(format!(" {}", notice.text), style))),
            chunks[1],
        );
    }

    let hints = screen.hints(view);
    frame.render_widget(Paragraph::new(theme::hints(&hints)), chunks[2]);
}
