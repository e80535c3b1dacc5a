//! Colors and shared widget builders.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders};

use crate::scheduler::history::JobStatus;

pub const PRIMARY: Color = Color::Rgb(125, 86, 244);
pub const SUCCESS: Color = Color::Rgb(4, 181, 117);
pub const ERROR: Color = Color::Rgb(255, 107, 107);
pub const WARNING: Color = Color::Rgb(255, 217, 61);
pub const DIM: Color = Color::Rgb(125, 125, 125);
pub const BORDER: Color = Color::Rgb(88, 88, 88);

pub fn title() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn key() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(DIM)
}

pub fn error() -> Style {
    Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
}

pub fn warning() -> Style {
    Style::default().fg(WARNING)
}

pub fn active() -> Style {
    Style::default().fg(SUCCESS).add_modifier(Modifier::BOLD)
}

pub fn selected() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn status(status: JobStatus) -> Style {
    let color = match status {
        JobStatus::Ok => SUCCESS,
        JobStatus::Cancelled => WARNING,
        JobStatus::Failed => ERROR,
        JobStatus::DryRun => DIM,
    };
    Style::default().fg(color)
}

/// Rounded frame used by every screen.
pub fn frame(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(format!(" {title} "), self::title()))
}

/// `on`/`off` value styled for toggles.
pub fn toggle(value: bool, on: &str, off: &str) -> Span<'static> {
    if value {
        Span::styled(format!("✓ {on}"), active())
    } else {
        Span::styled(format!("✗ {off}"), muted())
    }
}

/// Key hint bar: `key action   key action`.
pub fn hints<'a>(pairs: &[(&'a str, &'a str)]) -> Line<'a> {
    let mut spans = Vec::with_capacity(pairs.len() * 3);
    for (i, (key, action)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(*key, self::key()));
        spans.push(Span::styled(format!(" {action}"), muted()));
    }
    Line::from(spans)
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
