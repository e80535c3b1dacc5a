use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::input::TextField;
use super::{theme, Intent, ScreenKind, View};
use crate::duration::{self, DurationError};
use crate::storage::Document;

const INPUT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
enum HomeError {
    NoDuration,
    Parse(DurationError),
}

/// Preset picker and free-form duration entry.
#[derive(Debug)]
pub struct HomeScreen {
    selected: Option<usize>,
    input: TextField,
    error: Option<HomeError>,
}

impl Default for HomeScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeScreen {
    pub fn new() -> Self {
        Self {
            selected: None,
            input: TextField::new(INPUT_LIMIT),
            error: None,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub(crate) fn captures_text(&self) -> bool {
        self.input.is_focused()
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, doc: &Document) -> Option<Intent> {
        if self.input.is_focused() {
            return match key.code {
                KeyCode::Tab => {
                    self.input.blur();
                    None
                }
                KeyCode::Enter => self.commit(doc),
                KeyCode::Esc => {
                    self.input.clear();
                    self.error = None;
                    None
                }
                _ => {
                    if self.input.handle_key(key) {
                        self.error = None;
                    }
                    None
                }
            };
        }

        match key.code {
            KeyCode::Tab => {
                self.input.focus();
                self.selected = None;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < doc.presets.len() {
                    self.selected = Some(index);
                    self.error = None;
                }
            }
            KeyCode::Left | KeyCode::Right if !doc.presets.is_empty() => {
                let last = doc.presets.len() - 1;
                self.selected = Some(match (self.selected, key.code) {
                    (None, KeyCode::Left) => last,
                    (None, _) => 0,
                    (Some(i), KeyCode::Left) => i.checked_sub(1).unwrap_or(last),
                    (Some(i), _) => if i >= last { 0 } else { i + 1 },
                });
                self.error = None;
            }
            KeyCode::Enter => return self.commit(doc),
            KeyCode::Esc => {
                self.selected = None;
                self.error = None;
            }
            KeyCode::Char('h') => return Some(Intent::Open(ScreenKind::History)),
            KeyCode::Char('s') => return Some(Intent::Open(ScreenKind::Settings)),
            KeyCode::Char('a') if doc.active_job.is_some() => {
                return Some(Intent::Open(ScreenKind::Active))
            }
            _ => {}
        }
        None
    }

    /// The chosen preset wins over typed text.
    fn commit(&mut self, doc: &Document) -> Option<Intent> {
        if let Some(preset) = self.selected.and_then(|i| doc.presets.get(i)) {
            return Some(Intent::Start {
                minutes: preset.minutes,
            });
        }
        if self.input.is_empty() {
            self.error = Some(HomeError::NoDuration);
            return None;
        }
        match duration::parse_minutes(&self.input.value()) {
            Ok(minutes) => Some(Intent::Start { minutes }),
            Err(e) => {
                self.error = Some(HomeError::Parse(e));
                None
            }
        }
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, view: &View) {
        let t = view.t;
        let outer = theme::frame(t.get("home.title"));
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(2),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(inner);

        let mut status = vec![Span::raw(format!("{}: ", t.get("home.status")))];
        match &view.doc.active_job {
            Some(job) => {
                status.push(Span::styled(t.get("home.status_active"), theme::active()));
                status.push(Span::styled(
                    format!(" ({})", duration::format_countdown(job.remaining_secs(view.now))),
                    theme::muted(),
                ));
            }
            None => status.push(Span::styled(t.get("home.status_inactive"), theme::muted())),
        }
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[0]);

        frame.render_widget(
            Paragraph::new(Span::styled(format!("{}:", t.get("home.quick_presets")), theme::title())),
            chunks[1],
        );
        let mut presets = Vec::new();
        for (i, preset) in view.doc.presets.iter().enumerate() {
            if i < 9 {
                presets.push(Span::styled(format!("[{}]", i + 1), theme::key()));
            }
            let style = if self.selected == Some(i) {
                theme::selected()
            } else {
                Style::default()
            };
            presets.push(Span::styled(format!(" {} ", preset.label), style));
            presets.push(Span::raw(" "));
        }
        frame.render_widget(
            Paragraph::new(Line::from(presets)).wrap(Wrap { trim: true }),
            chunks[2],
        );

        let border = if self.input.is_focused() {
            theme::key()
        } else {
            Style::default().fg(theme::BORDER)
        };
        let field = Paragraph::new(self.input.line(t.get("home.placeholder"))).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border)
                .title(format!(" {} ", t.get("home.duration"))),
        );
        frame.render_widget(field, chunks[3]);

        if let Some(error) = &self.error {
            let text = match error {
                HomeError::NoDuration => t.get("home.error_no_duration").to_string(),
                HomeError::Parse(e) => e.to_string(),
            };
            frame.render_widget(
                Paragraph::new(Span::styled(format!("{}: {text}", t.get("home.error")), theme::error())),
                chunks[4],
            );
        }
    }

    pub(crate) fn hints<'a>(&self, view: &View<'a>) -> Vec<(&'a str, &'a str)> {
        let t = view.t;
        let mut hints = vec![
            (t.get("keys.enter"), t.get("actions.start")),
            (t.get("keys.tab"), t.get("actions.toggle_input")),
        ];
        if !self.input.is_focused() {
            hints.push((t.get("keys.history"), t.get("actions.history")));
            hints.push((t.get("keys.settings"), t.get("actions.settings")));
            if view.doc.active_job.is_some() {
                hints.push((t.get("keys.active"), t.get("actions.active")));
            }
            hints.push((t.get("keys.quit"), t.get("actions.quit")));
        }
        hints
    }
}
