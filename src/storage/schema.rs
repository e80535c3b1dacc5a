//! Document schema version and load-time normalization.

use tracing::warn;

use super::Document;
use crate::duration::format_minutes;
use crate::i18n::DEFAULT_LANGUAGE;
use crate::scheduler::profiles::{self, DEFAULT_HISTORY_LIMIT};

/// Current document schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Bring a freshly loaded document in line with the invariants the rest of
/// the crate relies on. Returns whether anything changed.
pub fn migrate(doc: &mut Document) -> bool {
    let mut changed = false;

    if doc.version == 0 {
        doc.version = SCHEMA_VERSION;
        changed = true;
    } else if doc.version > SCHEMA_VERSION {
        warn!(
            version = doc.version,
            supported = SCHEMA_VERSION,
            "state file was written by a newer version; unknown fields are dropped"
        );
    }

    if doc.history_limit == 0 {
        doc.history_limit = DEFAULT_HISTORY_LIMIT;
        changed = true;
    }

    let before = doc.presets.len();
    doc.presets.retain(|p| p.minutes > 0);
    changed |= doc.presets.len() != before;
    for preset in &mut doc.presets {
        if preset.label.trim().is_empty() {
            preset.label = format_minutes(preset.minutes);
            changed = true;
        }
    }
    if doc.presets.is_empty() {
        doc.presets = profiles::defaults();
        changed = true;
    }

    if doc.history.len() > doc.history_limit {
        doc.history.truncate(doc.history_limit);
        changed = true;
    }

    if doc.settings.language.trim().is_empty() {
        doc.settings.language = DEFAULT_LANGUAGE.to_string();
        changed = true;
    }

    changed
}
