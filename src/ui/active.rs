use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph};
use ratatui::Frame;

use super::{theme, Intent, ScreenKind, View};
use crate::duration::format_countdown;

const TICK: Duration = Duration::from_secs(1);

/// Periodic redraw deadline. Owned by the screen that needs it; dropping
/// the screen stops it.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    pub fn starting_at(start: Instant, period: Duration) -> Self {
        Self {
            period,
            next: start + period,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Whether the deadline has passed. Missed periods collapse into one.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        while self.next <= now {
            self.next += self.period;
        }
        true
    }
}

/// Countdown for the active job.
#[derive(Debug)]
pub struct ActiveScreen {
    ticker: Ticker,
}

impl Default for ActiveScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveScreen {
    pub fn new() -> Self {
        Self {
            ticker: Ticker::new(TICK),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub(crate) fn on_tick(&mut self, now: Instant) -> bool {
        self.ticker.poll(now)
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Option<Intent> {
        match key.code {
            KeyCode::Char('c') => Some(Intent::CancelJob),
            KeyCode::Char('e') => Some(Intent::EditJob),
            KeyCode::Char('h') => Some(Intent::Open(ScreenKind::History)),
            KeyCode::Esc => Some(Intent::Open(ScreenKind::Home)),
            _ => None,
        }
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, view: &View) {
        let t = view.t;
        let outer = theme::frame(t.get("active.title"));
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let Some(job) = &view.doc.active_job else {
            frame.render_widget(
                Paragraph::new(Span::styled(t.get("active.none"), theme::muted()))
                    .alignment(Alignment::Center),
                inner,
            );
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(20),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new(Span::styled(
                format_countdown(job.remaining_secs(view.now)),
                theme::active().add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            chunks[1],
        );

        let progress = job.progress(view.now);
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(theme::muted()),
            )
            .gauge_style(theme::active())
            .ratio(progress)
            .label(format!("{:.0}%", progress * 100.0));
        frame.render_widget(gauge, chunks[3]);

        let start = job.start_time.with_timezone(&Local).format("%H:%M:%S");
        let end = job.end_time.with_timezone(&Local).format("%H:%M:%S");
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(
                    "{}: {start}  →  {}: {end}",
                    t.get("active.started"),
                    t.get("active.scheduled")
                ),
                theme::muted(),
            ))
            .alignment(Alignment::Center),
            chunks[5],
        );
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{}: ", t.get("active.command")), theme::muted()),
                Span::raw(job.command.as_str()),
            ]))
            .alignment(Alignment::Center),
            chunks[6],
        );
        if job.dry_run {
            frame.render_widget(
                Paragraph::new(Span::styled(t.get("active.dry_run"), theme::warning()))
                    .alignment(Alignment::Center),
                chunks[7],
            );
        }
    }

    pub(crate) fn hints<'a>(&self, view: &View<'a>) -> Vec<(&'a str, &'a str)> {
        let t = view.t;
        vec![
            ("c", t.get("actions.cancel")),
            ("e", t.get("actions.edit")),
            (t.get("keys.history"), t.get("actions.history")),
            (t.get("keys.esc"), t.get("actions.back")),
        ]
    }
}
