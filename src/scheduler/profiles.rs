//! Out-of-box presets and document defaults.

use serde::{Deserialize, Serialize};

/// Default cap on retained history entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// A quick-pick duration shown on the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub label: String,
    pub minutes: u32,
}

impl Preset {
    pub fn new(label: impl Into<String>, minutes: u32) -> Self {
        Self {
            label: label.into(),
            minutes,
        }
    }
}

/// Return the default presets.
pub fn defaults() -> Vec<Preset> {
    [15, 30, 45, 60, 90, 120]
        .into_iter()
        .map(|minutes| Preset::new(format!("{minutes}m"), minutes))
        .collect()
}
