//! Single-line text entry.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use super::theme;

#[derive(Debug, Clone)]
pub struct TextField {
    chars: Vec<char>,
    cursor: usize,
    limit: usize,
    focused: bool,
}

impl TextField {
    pub fn new(limit: usize) -> Self {
        Self {
            chars: Vec::new(),
            cursor: 0,
            limit,
            focused: false,
        }
    }

    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn set_value(&mut self, value: &str) {
        self.chars = value.chars().take(self.limit).collect();
        self.cursor = self.chars.len();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Apply an editing key. Returns whether the value changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if !self.focused {
            return false;
        }
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.chars.len() >= self.limit {
                    return false;
                }
                self.chars.insert(self.cursor, c);
                self.cursor += 1;
                true
            }
            KeyCode::Char('u') => {
                let changed = self.cursor > 0;
                self.chars.drain(..self.cursor);
                self.cursor = 0;
                changed
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.chars.remove(self.cursor);
                true
            }
            KeyCode::Delete if self.cursor < self.chars.len() => {
                self.chars.remove(self.cursor);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.chars.len());
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.chars.len();
                false
            }
            _ => false,
        }
    }

    /// Render the value, or `placeholder` when empty. The cursor is drawn as
    /// a reversed cell while focused.
    pub fn line<'a>(&self, placeholder: &'a str) -> Line<'a> {
        if self.chars.is_empty() && !self.focused {
            return Line::from(Span::styled(placeholder, theme::muted()));
        }
        if self.chars.is_empty() {
            return Line::from(vec![
                Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)),
                Span::styled(placeholder, theme::muted()),
            ]);
        }

        let before: String = self.chars[..self.cursor].iter().collect();
        let mut spans = vec![Span::raw(before)];
        if self.focused {
            let at = self.chars.get(self.cursor).copied().unwrap_or(' ');
            spans.push(Span::styled(
                at.to_string(),
                Style::default().add_modifier(Modifier::REVERSED),
            ));
            let rest = self.cursor + 1;
            if rest <= self.chars.len() {
                spans.push(Span::raw(self.chars[rest..].iter().collect::<String>()));
            }
        } else {
            spans.push(Span::raw(self.chars[self.cursor..].iter().collect::<String>()));
        }
        Line::from(spans)
    }
}
