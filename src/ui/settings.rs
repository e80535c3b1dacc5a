use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::input::TextField;
use super::{theme, Intent, View};
use crate::i18n;
use crate::scheduler::profiles::Preset;
use crate::storage::Document;

const LABEL_LIMIT: usize = 20;
const MINUTES_LIMIT: usize = 5;

/// Rows before the preset list: confirm, dry-run default, language.
const FIXED_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsError {
    LabelEmpty,
    MinutesInvalid,
    LastPreset,
}

impl SettingsError {
    fn key(self) -> &'static str {
        match self {
            SettingsError::LabelEmpty => "settings.error_label_empty",
            SettingsError::MinutesInvalid => "settings.error_minutes_invalid",
            SettingsError::LastPreset => "settings.error_last_preset",
        }
    }
}

/// In-progress preset edit. `index == presets.len()` means a new preset.
#[derive(Debug)]
struct PresetEdit {
    index: usize,
    label: TextField,
    minutes: TextField,
}

impl PresetEdit {
    fn on_label(&self) -> bool {
        self.label.is_focused()
    }
}

/// Toggles, language and preset management. Toggles write straight into
/// the document and report [`Intent::SettingsChanged`].
#[derive(Debug, Default)]
pub struct SettingsScreen {
    selected: usize,
    edit: Option<PresetEdit>,
    error: Option<SettingsError>,
}

impl SettingsScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    pub(crate) fn captures_text(&self) -> bool {
        self.edit.is_some()
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, doc: &mut Document) -> Option<Intent> {
        if self.edit.is_some() {
            return self.handle_edit_key(key, doc);
        }

        let rows = FIXED_ROWS + doc.presets.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                self.error = None;
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(rows - 1);
                self.error = None;
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.error = None;
                match self.selected {
                    0 => {
                        doc.settings.confirm = !doc.settings.confirm;
                        Some(Intent::SettingsChanged)
                    }
                    1 => {
                        doc.settings.dry_run_default = !doc.settings.dry_run_default;
                        Some(Intent::SettingsChanged)
                    }
                    2 => {
                        doc.settings.language = i18n::next_language(&doc.settings.language).to_string();
                        Some(Intent::SettingsChanged)
                    }
                    row => {
                        let index = row - FIXED_ROWS;
                        if let Some(preset) = doc.presets.get(index) {
                            self.edit = Some(begin_edit(index, &preset.label));
                        }
                        None
                    }
                }
            }
            KeyCode::Char('n') => {
                self.error = None;
                self.edit = Some(begin_edit(doc.presets.len(), ""));
                None
            }
            KeyCode::Char('x') if self.selected >= FIXED_ROWS => {
                if doc.presets.len() <= 1 {
                    self.error = Some(SettingsError::LastPreset);
                    return None;
                }
                doc.presets.remove(self.selected - FIXED_ROWS);
                self.selected = self.selected.min(FIXED_ROWS + doc.presets.len() - 1);
                self.error = None;
                Some(Intent::SettingsChanged)
            }
            KeyCode::Esc => Some(Intent::Back),
            _ => None,
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent, doc: &mut Document) -> Option<Intent> {
        let edit = self.edit.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.edit = None;
                self.error = None;
                None
            }
            KeyCode::Tab if !edit.on_label() => {
                edit.minutes.blur();
                edit.label.focus();
                None
            }
            KeyCode::Enter if edit.on_label() => {
                if edit.label.value().trim().is_empty() {
                    self.error = Some(SettingsError::LabelEmpty);
                    return None;
                }
                edit.label.blur();
                edit.minutes.focus();
                self.error = None;
                None
            }
            KeyCode::Enter => {
                let minutes = match edit.minutes.value().trim().parse::<u32>() {
                    Ok(m) if m > 0 => m,
                    _ => {
                        self.error = Some(SettingsError::MinutesInvalid);
                        return None;
                    }
                };
                let preset = Preset::new(edit.label.value().trim(), minutes);
                let index = edit.index;
                match doc.presets.get_mut(index) {
                    Some(slot) => *slot = preset,
                    None => {
                        doc.presets.push(preset);
                        self.selected = FIXED_ROWS + doc.presets.len() - 1;
                    }
                }
                self.edit = None;
                self.error = None;
                Some(Intent::SettingsChanged)
            }
            _ => {
                let field = if edit.on_label() {
                    &mut edit.label
                } else {
                    &mut edit.minutes
                };
                if field.handle_key(key) {
                    self.error = None;
                }
                None
            }
        }
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, view: &View) {
        let t = view.t;
        let settings = &view.doc.settings;
        let (on, off) = (t.get("settings.on"), t.get("settings.off"));

        let row = |index: usize, spans: Vec<Span<'static>>| -> Line<'static> {
            let chosen = index == self.selected && self.edit.is_none();
            let mut all = vec![Span::raw(if chosen { "▶ " } else { "  " })];
            all.extend(spans);
            let line = Line::from(all);
            if chosen {
                line.style(theme::selected())
            } else {
                line.style(Style::default())
            }
        };

        let mut lines = vec![
            row(
                0,
                vec![
                    Span::raw(format!("{}: ", t.get("settings.confirm_label"))),
                    theme::toggle(settings.confirm, on, off),
                ],
            ),
            row(
                1,
                vec![
                    Span::raw(format!("{}: ", t.get("settings.dry_run_label"))),
                    theme::toggle(settings.dry_run_default, on, off),
                ],
            ),
            row(
                2,
                vec![
                    Span::raw(format!("{}: ", t.get("settings.language"))),
                    Span::styled(i18n::display_name(&settings.language).to_string(), theme::title()),
                ],
            ),
            Line::default(),
            Line::from(Span::styled(t.get("settings.presets_title"), theme::title())),
        ];
        for (i, preset) in view.doc.presets.iter().enumerate() {
            lines.push(row(
                FIXED_ROWS + i,
                vec![Span::raw(format!("{} → {} min", preset.label, preset.minutes))],
            ));
        }

        if let Some(edit) = &self.edit {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(t.get("settings.edit_preset"), theme::title())));
            for (field, name, focused) in [
                (&edit.label, t.get("settings.preset_label_placeholder"), edit.on_label()),
                (&edit.minutes, t.get("settings.preset_minutes_placeholder"), !edit.on_label()),
            ] {
                let mut spans = vec![
                    Span::raw(if focused { "▶ " } else { "  " }),
                    Span::raw(format!("{name}: ")),
                ];
                spans.extend(field.line(name).spans);
                lines.push(Line::from(spans));
            }
        }

        if let Some(error) = self.error {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!("{}: {}", t.get("home.error"), t.get(error.key())),
                theme::error(),
            )));
        }

        frame.render_widget(
            Paragraph::new(lines).block(theme::frame(t.get("settings.title"))),
            area,
        );
    }

    pub(crate) fn hints<'a>(&self, view: &View<'a>) -> Vec<(&'a str, &'a str)> {
        let t = view.t;
        match &self.edit {
            Some(edit) if edit.on_label() => vec![
                (t.get("keys.enter"), t.get("actions.next")),
                (t.get("keys.esc"), t.get("actions.cancel")),
            ],
            Some(_) => vec![
                (t.get("keys.enter"), t.get("actions.save")),
                (t.get("keys.tab"), t.get("actions.back")),
                (t.get("keys.esc"), t.get("actions.cancel")),
            ],
            None => vec![
                ("↑↓", t.get("actions.navigate")),
                (t.get("keys.enter"), t.get("actions.edit")),
                (t.get("keys.space"), t.get("actions.toggle")),
                ("n", t.get("actions.new")),
                ("x", t.get("actions.remove")),
                (t.get("keys.esc"), t.get("actions.back")),
            ],
        }
    }
}

fn begin_edit(index: usize, label: &str) -> PresetEdit {
    let mut label_field = TextField::new(LABEL_LIMIT);
    label_field.set_value(label);
    label_field.focus();
    PresetEdit {
        index,
        label: label_field,
        minutes: TextField::new(MINUTES_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Translator;
    use crate::ui::testing::render;
    use crate::ui::Screen;
    use chrono::Utc;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(screen: &mut SettingsScreen, doc: &mut Document, text: &str) {
        for c in text.chars() {
            screen.handle_key(key(KeyCode::Char(c)), doc);
        }
    }

    #[test]
    fn test_toggles_write_through() {
        let mut doc = Document::default();
        let mut screen = SettingsScreen::new();

        assert_eq!(screen.handle_key(key(KeyCode::Enter), &mut doc), Some(Intent::SettingsChanged));
        assert!(!doc.settings.confirm);

        screen.handle_key(key(KeyCode::Down), &mut doc);
        screen.handle_key(key(KeyCode::Char(' ')), &mut doc);
        assert!(doc.settings.dry_run_default);

        screen.handle_key(key(KeyCode::Down), &mut doc);
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        assert_eq!(doc.settings.language, "tr");
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        assert_eq!(doc.settings.language, "en");
    }

    #[test]
    fn test_edit_preset_label_then_minutes() {
        let mut doc = Document::default();
        let mut screen = SettingsScreen::new();
        for _ in 0..FIXED_ROWS {
            screen.handle_key(key(KeyCode::Down), &mut doc);
        }
        assert_eq!(screen.handle_key(key(KeyCode::Enter), &mut doc), None);
        assert!(screen.captures_text());

        screen.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL), &mut doc);
        type_text(&mut screen, &mut doc, "nap");
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        type_text(&mut screen, &mut doc, "20");
        assert_eq!(screen.handle_key(key(KeyCode::Enter), &mut doc), Some(Intent::SettingsChanged));

        assert!(!screen.is_editing());
        assert_eq!(doc.presets[0], Preset::new("nap", 20));
    }

    #[test]
    fn test_edit_rejects_empty_label_and_bad_minutes() {
        let mut doc = Document::default();
        let before = doc.presets.clone();
        let mut screen = SettingsScreen::new();

        screen.handle_key(key(KeyCode::Char('n')), &mut doc);
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        assert_eq!(screen.error, Some(SettingsError::LabelEmpty));

        type_text(&mut screen, &mut doc, "late");
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        type_text(&mut screen, &mut doc, "0");
        assert_eq!(screen.handle_key(key(KeyCode::Enter), &mut doc), None);
        assert_eq!(screen.error, Some(SettingsError::MinutesInvalid));

        screen.handle_key(key(KeyCode::Esc), &mut doc);
        assert!(!screen.is_editing());
        assert_eq!(doc.presets, before);
    }

    #[test]
    fn test_new_preset_appends() {
        let mut doc = Document::default();
        let count = doc.presets.len();
        let mut screen = SettingsScreen::new();

        screen.handle_key(key(KeyCode::Char('n')), &mut doc);
        type_text(&mut screen, &mut doc, "movie");
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        type_text(&mut screen, &mut doc, "150");
        screen.handle_key(key(KeyCode::Enter), &mut doc);

        assert_eq!(doc.presets.len(), count + 1);
        assert_eq!(doc.presets[count], Preset::new("movie", 150));
        assert_eq!(screen.selected(), FIXED_ROWS + count);
    }

    #[test]
    fn test_remove_keeps_last_preset() {
        let mut doc = Document::default();
        doc.presets = vec![Preset::new("a", 1), Preset::new("b", 2)];
        let mut screen = SettingsScreen::new();
        for _ in 0..10 {
            screen.handle_key(key(KeyCode::Down), &mut doc);
        }
        assert_eq!(screen.selected(), FIXED_ROWS + 1);

        assert_eq!(screen.handle_key(key(KeyCode::Char('x')), &mut doc), Some(Intent::SettingsChanged));
        assert_eq!(doc.presets, vec![Preset::new("a", 1)]);
        assert_eq!(screen.selected(), FIXED_ROWS);

        assert_eq!(screen.handle_key(key(KeyCode::Char('x')), &mut doc), None);
        assert_eq!(screen.error, Some(SettingsError::LastPreset));
        assert_eq!(doc.presets.len(), 1);
    }

    #[test]
    fn test_tab_returns_to_label() {
        let mut doc = Document::default();
        let mut screen = SettingsScreen::new();
        screen.handle_key(key(KeyCode::Char('n')), &mut doc);
        type_text(&mut screen, &mut doc, "x");
        screen.handle_key(key(KeyCode::Enter), &mut doc);
        screen.handle_key(key(KeyCode::Tab), &mut doc);
        type_text(&mut screen, &mut doc, "y");
        assert_eq!(screen.edit.as_ref().unwrap().label.value(), "xy");
    }

    #[test]
    fn test_render_settings() {
        let doc = Document::default();
        let t = Translator::load("tr").unwrap();
        let view = View {
            doc: &doc,
            t: &t,
            now: Utc::now(),
            notice: None,
        };
        let text = render(&Screen::Settings(SettingsScreen::new()), &view, 80, 24);
        assert!(text.contains("Ayarlar"));
        assert!(text.contains("English"));
        assert!(text.contains("15m → 15 min"));
    }
}
