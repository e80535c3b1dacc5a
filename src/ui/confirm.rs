use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use super::{theme, Intent, View};
use crate::duration::format_minutes;

/// Yes/no prompt before a job starts, with a dry-run toggle.
#[derive(Debug, Clone)]
pub struct ConfirmScreen {
    minutes: u32,
    dry_run: bool,
}

impl ConfirmScreen {
    pub fn new(minutes: u32, dry_run: bool) -> Self {
        Self { minutes, dry_run }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Option<Intent> {
        match key.code {
            KeyCode::Char('y' | 'Y') => Some(Intent::Confirmed {
                minutes: self.minutes,
                dry_run: self.dry_run,
            }),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(Intent::Dismiss),
            KeyCode::Char('d' | 'D') => {
                self.dry_run = !self.dry_run;
                None
            }
            _ => None,
        }
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, view: &View) {
        let t = view.t;
        let popup = theme::centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);

        let mut lines = vec![
            Line::from(Span::styled(
                format!("{} {}?", t.get("confirm.message"), format_minutes(self.minutes)),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("[Y]", theme::key()),
                Span::raw(format!(" {}   ", t.get("confirm.yes"))),
                Span::styled("[N]", theme::key()),
                Span::raw(format!(" {}", t.get("confirm.no"))),
            ]),
            Line::default(),
            Line::from(vec![
                Span::raw(format!("{}: ", t.get("confirm.dry_run"))),
                theme::toggle(self.dry_run, t.get("settings.on"), t.get("settings.off")),
                Span::raw("  "),
                Span::styled("[D]", theme::key()),
                Span::raw(format!(" {}", t.get("actions.toggle"))),
            ]),
        ];
        if self.dry_run {
            lines.push(Line::from(Span::styled(t.get("confirm.dry_run_help"), theme::warning())));
        }

        frame.render_widget(
            Paragraph::new(lines).block(theme::frame(t.get("confirm.title"))),
            popup,
        );
    }

    pub(crate) fn hints<'a>(&self, view: &View<'a>) -> Vec<(&'a str, &'a str)> {
        let t = view.t;
        vec![
            ("y", t.get("confirm.yes")),
            ("n", t.get("confirm.no")),
            ("d", t.get("confirm.dry_run")),
            (t.get("keys.esc"), t.get("actions.cancel")),
        ]
    }
}
