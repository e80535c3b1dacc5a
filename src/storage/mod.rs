//! The persisted state document and the stores that load and save it.
//!
//! The document is one JSON file holding presets, settings, the history ring
//! buffer and at most one active job. Saves replace the whole file: the new
//! content goes to `<file>.tmp`, the previous file is kept as `<file>.bak`,
//! then the temp file is renamed into place. A file that no longer parses is
//! quarantined as `<file>.corrupt-<unix-ms>` and the backup is tried instead.

pub mod schema;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::i18n::DEFAULT_LANGUAGE;
use crate::scheduler::history::{self, HistoryEntry};
use crate::scheduler::profiles::{self, Preset, DEFAULT_HISTORY_LIMIT};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write state file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to quarantine corrupt state file {}: {source}", .path.display())]
    Quarantine { path: PathBuf, source: io::Error },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Everything the application persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "profiles::defaults")]
    pub presets: Vec<Preset>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub active_job: Option<ActiveJob>,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: schema::SCHEMA_VERSION,
            presets: profiles::defaults(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            history: Vec::new(),
            settings: Settings::default(),
            active_job: None,
        }
    }
}

impl Document {
    /// Add a history entry at the head, honoring `history_limit`.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        history::push(&mut self.history, entry, self.history_limit.max(1));
    }

    /// Remove a history entry by id.
    pub fn delete_history(&mut self, id: &str) -> bool {
        history::remove(&mut self.history, id)
    }

    pub fn history_entry(&self, id: &str) -> Option<&HistoryEntry> {
        self.history.iter().find(|h| h.id == id)
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ask before starting a job.
    pub confirm: bool,
    /// Initial dry-run toggle for new jobs.
    pub dry_run_default: bool,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confirm: true,
            dry_run_default: false,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// The one job currently scheduled with the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_sec: u64,
    pub command: String,
    #[serde(default)]
    pub dry_run: bool,
    /// Id of the history entry created with this job. Absent in documents
    /// written before jobs tracked their entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

impl ActiveJob {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.end_time - now).num_seconds().max(0)
    }

    /// Elapsed fraction in `0.0..=1.0`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let total = (self.end_time - self.start_time).num_milliseconds();
        if total <= 0 {
            return 1.0;
        }
        let elapsed = (now - self.start_time).num_milliseconds().max(0);
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Parse a stored document. The root must be a JSON object; serde would
/// otherwise accept an array as a struct in sequence form.
fn parse_document(content: &str) -> Result<Document, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("state root is not a JSON object"));
    }
    serde_json::from_value(value)
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Load/save port for the document.
pub trait Store: Send {
    /// Load the document. A missing document yields the default one.
    fn load(&self) -> Result<Document, StoreError>;

    /// Replace the stored document.
    fn save(&self, doc: &Document) -> Result<(), StoreError>;

    /// Human-readable location, for logs and status output.
    fn location(&self) -> String;
}

/// Stores the document as pretty-printed JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn companion(&self, suffix: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("state.json");
        self.path.with_file_name(format!("{name}{suffix}"))
    }

    fn backup_path(&self) -> PathBuf {
        self.companion(".bak")
    }

    fn next_corrupt_path(&self) -> PathBuf {
        let base = format!(".corrupt-{}", Utc::now().timestamp_millis());
        let mut candidate = self.companion(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = self.companion(&format!("{base}-{n}"));
            n += 1;
        }
        candidate
    }

    fn read_backup(&self) -> Option<Document> {
        let backup = self.backup_path();
        let content = fs::read_to_string(&backup).ok()?;
        match parse_document(&content) {
            Ok(doc) => {
                info!(path = %backup.display(), "restored state from backup");
                Some(doc)
            }
            Err(e) => {
                warn!(path = %backup.display(), error = %e, "backup state file does not parse either");
                None
            }
        }
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Document, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file yet, using defaults");
                return Ok(Document::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match parse_document(&content) {
            Ok(doc) => {
                debug!(path = %self.path.display(), entries = doc.history.len(), "state loaded");
                Ok(doc)
            }
            Err(parse_error) => {
                let quarantine = self.next_corrupt_path();
                fs::rename(&self.path, &quarantine).map_err(|source| StoreError::Quarantine {
                    path: self.path.clone(),
                    source,
                })?;
                warn!(
                    path = %self.path.display(),
                    quarantined = %quarantine.display(),
                    error = %parse_error,
                    "state file is corrupt"
                );
                Ok(self.read_backup().unwrap_or_default())
            }
        }
    }

    fn save(&self, doc: &Document) -> Result<(), StoreError> {
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Write { path, source }
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err(parent))?;
            }
        }

        let serialized = serde_json::to_string_pretty(doc)?;
        let temp = self.companion(".tmp");
        let backup = self.backup_path();

        fs::write(&temp, serialized).map_err(write_err(&temp))?;
        if let Ok(file) = fs::OpenOptions::new().write(true).open(&temp) {
            let _ = file.sync_all();
        }

        let had_previous = self.path.exists();
        if had_previous {
            if backup.exists() {
                fs::remove_file(&backup).map_err(write_err(&backup))?;
            }
            fs::rename(&self.path, &backup).map_err(write_err(&backup))?;
        }

        if let Err(source) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            if had_previous && !self.path.exists() {
                let _ = fs::rename(&backup, &self.path);
            }
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }

        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
pub(crate) use self::memory::MemoryStore;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::history::JobStatus;
    use chrono::TimeZone;

    fn sample() -> Document {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap();
        let mut doc = Document::default();
        doc.presets.push(Preset::new("nap", 20));
        doc.history_limit = 5;
        doc.settings = Settings {
            confirm: false,
            dry_run_default: true,
            language: "tr".to_string(),
        };
        doc.push_history(HistoryEntry {
            id: "a".to_string(),
            created_at: start,
            duration_seconds: 1800,
            scheduled_for: start + chrono::Duration::minutes(30),
            status: JobStatus::DryRun,
            os: "linux".to_string(),
            command: "shutdown -h +30".to_string(),
        });
        doc.active_job = Some(ActiveJob {
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            duration_sec: 1800,
            command: "shutdown -h +30".to_string(),
            dry_run: true,
            history_id: Some("a".to_string()),
        });
        doc
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        let doc = sample();
        store.save(&doc).unwrap();
        assert_eq!(store.load().unwrap(), doc);
    }

    #[test]
    fn test_json_keys_match_document_format() {
        let value = serde_json::to_value(sample()).unwrap();
        for key in ["version", "presets", "history_limit", "history", "settings", "active_job"] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["settings"]["dry_run_default"], true);
        assert_eq!(value["history"][0]["status"], "dry-run");
        assert_eq!(value["active_job"]["duration_sec"], 1800);

        let empty = serde_json::to_value(Document::default()).unwrap();
        assert!(empty["active_job"].is_null());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("state.json"));
        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_second_save_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::new(&path);
        let first = Document::default();
        store.save(&first).unwrap();
        store.save(&sample()).unwrap();

        let backup: Document =
            serde_json::from_str(&fs::read_to_string(dir.path().join("state.json.bak")).unwrap())
                .unwrap();
        assert_eq!(backup, first);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_quarantined_and_backup_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample()).unwrap();
        store.save(&sample()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc, sample());
        assert!(!path.exists());
        let quarantined = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with("state.json.corrupt-"));
        assert!(quarantined);
    }

    fn quarantined_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("state.json.corrupt-"))
            .count()
    }

    #[test]
    fn test_corrupt_file_without_backup_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let doc = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(doc, Document::default());
        assert!(!path.exists());
        assert_eq!(quarantined_files(dir.path()), 1);
    }

    #[test]
    fn test_non_object_root_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[]").unwrap();

        let doc = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(doc, Document::default());
        assert_eq!(quarantined_files(dir.path()), 1);
        assert!(parse_document("[1, 2]").is_err());
        assert!(parse_document("{}").is_ok());
    }

    #[test]
    fn test_document_without_job_tracking_fields_parses() {
        let json = r#"{
            "version": 1,
            "presets": [{"label": "15m", "minutes": 15}],
            "history_limit": 20,
            "history": [],
            "settings": {"confirm": true, "dry_run_default": false},
            "active_job": {
                "start_time": "2025-06-01T23:00:00Z",
                "end_time": "2025-06-01T23:15:00Z",
                "duration_sec": 900,
                "command": "shutdown -h +15"
            }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let job = doc.active_job.unwrap();
        assert!(!job.dry_run);
        assert!(job.history_id.is_none());
        assert_eq!(doc.settings.language, "en");
    }

    #[test]
    fn test_active_job_progress_and_remaining() {
        let job = sample().active_job.unwrap();
        let halfway = job.start_time + chrono::Duration::minutes(15);
        assert!((job.progress(halfway) - 0.5).abs() < 1e-9);
        assert_eq!(job.remaining_secs(halfway), 900);
        assert!(!job.is_expired(halfway));
        assert!(job.is_expired(job.end_time));
        assert_eq!(job.remaining_secs(job.end_time + chrono::Duration::minutes(1)), 0);
    }
}
