//! Job history: one entry per schedule attempt, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record of one schedule attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub scheduled_for: DateTime<Utc>,
    pub status: JobStatus,
    pub os: String,
    pub command: String,
}

impl HistoryEntry {
    /// Whole minutes requested by this entry, at least one.
    pub fn minutes(&self) -> u32 {
        u32::try_from(self.duration_seconds / 60).unwrap_or(u32::MAX).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Ok,
    Cancelled,
    Failed,
    DryRun,
}

impl JobStatus {
    /// Whether the entry still belongs to a job that has not ended.
    pub fn is_open(self) -> bool {
        matches!(self, JobStatus::Ok | JobStatus::DryRun)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Ok => write!(f, "ok"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::DryRun => write!(f, "dry-run"),
        }
    }
}

/// Insert at the head and drop the oldest entries beyond `limit`.
pub fn push(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    history.insert(0, entry);
    history.truncate(limit);
}

/// Remove the entry with `id`. Returns whether anything was removed.
pub fn remove(history: &mut Vec<HistoryEntry>, id: &str) -> bool {
    match history.iter().position(|h| h.id == id) {
        Some(index) => {
            history.remove(index);
            true
        }
        None => false,
    }
}

/// Close an open entry with a final status. An entry transitions once;
/// returns false if it is missing or already closed.
pub fn close(history: &mut [HistoryEntry], id: &str, status: JobStatus) -> bool {
    match history.iter_mut().find(|h| h.id == id) {
        Some(entry) if entry.status.is_open() => {
            entry.status = status;
            true
        }
        _ => false,
    }
}
