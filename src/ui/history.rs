use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::{theme, Intent, View};
use crate::duration::format_minutes;
use crate::scheduler::history::JobStatus;
use crate::storage::Document;

/// Rows taken by the frame, notice line and hint bar around the list.
const CHROME_ROWS: u16 = 6;

/// Scrollable list of past jobs.
#[derive(Debug)]
pub struct HistoryScreen {
    selected: usize,
    offset: usize,
    height: u16,
}

impl HistoryScreen {
    pub fn new(height: u16) -> Self {
        Self {
            selected: 0,
            offset: 0,
            height,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn visible_rows(&self) -> usize {
        usize::from(self.height.saturating_sub(CHROME_ROWS)).max(1)
    }

    pub(crate) fn resize(&mut self, _width: u16, height: u16) {
        self.height = height;
        self.scroll_to_selection();
    }

    /// Clamp selection and scroll after the history changed.
    pub fn refresh(&mut self, doc: &Document) {
        let len = doc.history.len();
        if len == 0 {
            self.selected = 0;
            self.offset = 0;
            return;
        }
        self.selected = self.selected.min(len - 1);
        self.offset = self.offset.min(len - 1);
        self.scroll_to_selection();
    }

    fn scroll_to_selection(&mut self) {
        let rows = self.visible_rows();
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + rows {
            self.offset = self.selected + 1 - rows;
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, doc: &Document) -> Option<Intent> {
        if key.code == KeyCode::Esc {
            return Some(Intent::Back);
        }
        let len = doc.history.len();
        if len == 0 {
            return None;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected = (self.selected + 1).min(len - 1),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = len - 1,
            KeyCode::Enter => {
                let entry = doc.history.get(self.selected)?;
                return Some(Intent::Start {
                    minutes: entry.minutes(),
                });
            }
            KeyCode::Char('d') => {
                let entry = doc.history.get(self.selected)?;
                return Some(Intent::DeleteHistory(entry.id.clone()));
            }
            _ => return None,
        }
        self.scroll_to_selection();
        None
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, view: &View) {
        let t = view.t;
        let outer = theme::frame(t.get("history.title"));
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let history = &view.doc.history;
        if history.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(t.get("history.empty"), theme::muted())),
                inner,
            );
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let rows = self.visible_rows();
        let lines: Vec<Line> = history
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(rows)
            .map(|(i, entry)| {
                let status = match entry.status {
                    JobStatus::Ok => t.get("history.status_ok"),
                    JobStatus::Cancelled => t.get("history.status_cancelled"),
                    JobStatus::Failed => t.get("history.status_failed"),
                    JobStatus::DryRun => t.get("history.status_dry_run"),
                };
                let marker = if i == self.selected { "▶ " } else { "  " };
                let line = Line::from(vec![
                    Span::raw(marker),
                    Span::raw(
                        entry
                            .created_at
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M  ")
                            .to_string(),
                    ),
                    Span::styled(format!("{:>6}", format_minutes(entry.minutes())), theme::title()),
                    Span::raw(format!(
                        "  → {}  ",
                        entry.scheduled_for.with_timezone(&Local).format("%H:%M")
                    )),
                    Span::styled(status, theme::status(entry.status)),
                ]);
                if i == self.selected {
                    line.style(theme::selected())
                } else {
                    line.style(Style::default())
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[0]);

        if history.len() > rows {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(
                        "{} ({}/{})",
                        t.get("history.scroll_indicator"),
                        self.selected + 1,
                        history.len()
                    ),
                    theme::muted(),
                )),
                chunks[1],
            );
        }
    }

    pub(crate) fn hints<'a>(&self, view: &View<'a>) -> Vec<(&'a str, &'a str)> {
        let t = view.t;
        let mut hints = Vec::new();
        if !view.doc.history.is_empty() {
            hints.push((t.get("keys.enter"), t.get("actions.restart")));
            hints.push(("d", t.get("actions.delete")));
        }
        hints.push((t.get("keys.esc"), t.get("actions.back")));
        hints
    }
}
