//! Translation lookup over embedded JSON locale files.
//!
//! Keys are dotted paths into the locale document (`home.title`). A missing
//! key renders as the key itself. The translator is a plain value owned by
//! the app; switching language replaces it.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Supported languages: code and display name, in cycling order.
pub const LANGUAGES: &[(&str, &str)] = &[("en", "English"), ("tr", "Türkçe")];

const EN: &str = include_str!("../../locales/en.json");
const TR: &str = include_str!("../../locales/tr.json");

#[derive(Debug, Error)]
pub enum I18nError {
    #[error("unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("failed to parse {language} translations: {source}")]
    Parse {
        language: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Translator {
    language: String,
    messages: Value,
}

impl Translator {
    /// Load exactly `language`.
    pub fn load(language: &str) -> Result<Self, I18nError> {
        let source = match language {
            "en" => EN,
            "tr" => TR,
            other => return Err(I18nError::UnknownLanguage(other.to_string())),
        };
        let messages = serde_json::from_str(source).map_err(|source| I18nError::Parse {
            language: language.to_string(),
            source,
        })?;
        Ok(Self {
            language: language.to_string(),
            messages,
        })
    }

    /// Load `language`, falling back to English. Fails only if English
    /// itself cannot be loaded.
    pub fn new(language: &str) -> Result<Self, I18nError> {
        match Self::load(language) {
            Ok(t) => Ok(t),
            Err(e) => {
                warn!(%language, error = %e, "falling back to {DEFAULT_LANGUAGE}");
                Self::load(DEFAULT_LANGUAGE)
            }
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Look up a dotted key; unknown keys come back unchanged.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        key.split('.')
            .try_fold(&self.messages, |node, part| node.get(part))
            .and_then(Value::as_str)
            .unwrap_or(key)
    }
}

/// Display name for a language code, or the code itself.
pub fn display_name(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// The language after `code` in [`LANGUAGES`], wrapping around.
pub fn next_language(code: &str) -> &'static str {
    let index = LANGUAGES.iter().position(|(c, _)| *c == code);
    match index {
        Some(i) => LANGUAGES[(i + 1) % LANGUAGES.len()].0,
        None => DEFAULT_LANGUAGE,
    }
}
