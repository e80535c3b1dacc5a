//! Shutdown job lifecycle: start, cancel, supersede and lazy expiry of the
//! single active job.
//!
//! The scheduler mutates a [`Document`] in place and leaves persistence to
//! the caller, which saves after every call whatever the outcome.

pub mod clock;
pub mod history;
pub mod profiles;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use self::clock::Clock;
use self::history::{HistoryEntry, JobStatus};
use crate::shutdown::{ExecError, Executor};
use crate::storage::{ActiveJob, Document};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("a shutdown needs at least one minute")]
    ZeroMinutes,

    #[error("failed to schedule shutdown: {0}")]
    Schedule(ExecError),

    #[error("failed to cancel shutdown: {0}")]
    Cancel(ExecError),
}

pub struct Scheduler {
    executor: Box<dyn Executor>,
    clock: Arc<dyn Clock>,
    force_dry_run: bool,
}

impl Scheduler {
    pub fn new(executor: Box<dyn Executor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            executor,
            clock,
            force_dry_run: false,
        }
    }

    /// Treat every schedule and cancel as dry-run.
    pub fn with_forced_dry_run(mut self, force: bool) -> Self {
        self.force_dry_run = force;
        self
    }

    pub fn forced_dry_run(&self) -> bool {
        self.force_dry_run
    }

    pub fn os(&self) -> &'static str {
        self.executor.os()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Schedule a shutdown `minutes` from now, replacing any active job.
    ///
    /// A schedule failure still records a `Failed` history entry and leaves
    /// no active job behind.
    pub fn start_job(
        &self,
        doc: &mut Document,
        minutes: u32,
        dry_run: bool,
    ) -> Result<ActiveJob, JobError> {
        if minutes == 0 {
            return Err(JobError::ZeroMinutes);
        }
        let dry_run = dry_run || self.force_dry_run;

        // A job whose halt time has passed is dropped, not cancelled.
        self.expire_stale(doc);
        if doc.active_job.is_some() {
            self.supersede(doc);
        }

        let timing = clock::compute(self.clock.as_ref(), minutes);
        let id = Uuid::new_v4().to_string();

        let (command, outcome) = match self.executor.schedule(minutes, dry_run) {
            Ok(command) => (command, Ok(())),
            Err(e) => (e.command().to_string(), Err(e)),
        };

        let status = match (&outcome, dry_run) {
            (Err(_), _) => JobStatus::Failed,
            (Ok(()), true) => JobStatus::DryRun,
            (Ok(()), false) => JobStatus::Ok,
        };
        doc.push_history(HistoryEntry {
            id: id.clone(),
            created_at: timing.start_time,
            duration_seconds: timing.duration_sec,
            scheduled_for: timing.end_time,
            status,
            os: self.executor.os().to_string(),
            command: command.clone(),
        });

        if let Err(e) = outcome {
            warn!(minutes, %command, error = %e, "shutdown could not be scheduled");
            return Err(JobError::Schedule(e));
        }

        let job = ActiveJob {
            start_time: timing.start_time,
            end_time: timing.end_time,
            duration_sec: timing.duration_sec,
            command,
            dry_run,
            history_id: Some(id),
        };
        info!(
            minutes,
            dry_run,
            command = %job.command,
            end_time = %job.end_time.to_rfc3339(),
            "shutdown scheduled"
        );
        doc.active_job = Some(job.clone());
        Ok(job)
    }

    /// Cancel the active job. Returns `Ok(false)` when there was none.
    ///
    /// The job is forgotten locally even if the OS cancel fails; the error is
    /// returned after the document has been updated.
    pub fn cancel_job(&self, doc: &mut Document) -> Result<bool, JobError> {
        let Some(job) = doc.active_job.take() else {
            return Ok(false);
        };
        let (dry_run, entry) = job_mode(doc, &job);
        let dry_run = dry_run || self.force_dry_run;

        let result = self.executor.cancel(dry_run);
        let status = if result.is_ok() {
            JobStatus::Cancelled
        } else {
            JobStatus::Failed
        };
        if let Some(id) = entry {
            history::close(&mut doc.history, &id, status);
        }

        match result {
            Ok(()) => {
                info!(command = %job.command, dry_run, "shutdown cancelled");
                Ok(true)
            }
            Err(e) => {
                warn!(command = %job.command, error = %e, "shutdown cancel failed");
                Err(JobError::Cancel(e))
            }
        }
    }

    /// Drop the active job if its end time has passed. Returns whether the
    /// document changed.
    pub fn expire_stale(&self, doc: &mut Document) -> bool {
        let now = self.clock.now();
        match &doc.active_job {
            Some(job) if job.is_expired(now) => {
                info!(
                    end_time = %job.end_time.to_rfc3339(),
                    command = %job.command,
                    "active job expired"
                );
                doc.active_job = None;
                true
            }
            _ => false,
        }
    }

    /// Best-effort cancel of the job being replaced. Errors are logged and
    /// recorded on its history entry only.
    fn supersede(&self, doc: &mut Document) {
        let Some(old) = doc.active_job.take() else {
            return;
        };
        let (dry_run, entry) = job_mode(doc, &old);
        let status = match self.executor.cancel(dry_run || self.force_dry_run) {
            Ok(()) => JobStatus::Cancelled,
            Err(e) => {
                warn!(command = %old.command, error = %e, "could not cancel superseded job");
                JobStatus::Failed
            }
        };
        if let Some(id) = entry {
            history::close(&mut doc.history, &id, status);
        }
        info!(command = %old.command, %status, "active job superseded");
    }
}

/// Dry-run flag and history entry id for `job`. Jobs written without their
/// entry id fall back to the head of history.
fn job_mode(doc: &Document, job: &ActiveJob) -> (bool, Option<String>) {
    match &job.history_id {
        Some(id) => (job.dry_run, Some(id.clone())),
        None => match doc.history.first() {
            Some(head) => (job.dry_run || head.status == JobStatus::DryRun, Some(head.id.clone())),
            None => (job.dry_run, None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::clock::FixedClock;
    use super::*;
    use crate::shutdown::runner::RecordingRunner;
    use crate::shutdown::LinuxExecutor;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap()
    }

    fn scheduler(runner: &RecordingRunner) -> (Scheduler, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start()));
        let exec = LinuxExecutor::with_runner(Box::new(runner.clone()));
        (Scheduler::new(Box::new(exec), clock.clone()), clock)
    }

    #[test]
    fn test_start_records_job_and_history() {
        let runner = RecordingRunner::new();
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();

        let job = sched.start_job(&mut doc, 30, false).unwrap();
        assert_eq!(job.duration_sec, 1800);
        assert_eq!(job.end_time - job.start_time, Duration::minutes(30));
        assert_eq!(doc.active_job.as_ref(), Some(&job));

        let head = &doc.history[0];
        assert_eq!(head.status, JobStatus::Ok);
        assert_eq!(head.command, "shutdown -h +30");
        assert_eq!(head.os, "linux");
        assert_eq!(head.scheduled_for, job.end_time);
        assert_eq!(job.history_id.as_deref(), Some(head.id.as_str()));
        assert_eq!(runner.calls(), ["shutdown -h +30"]);
    }

    #[test]
    fn test_dry_run_start_and_cancel_never_touch_the_os() {
        let runner = RecordingRunner::new();
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();

        sched.start_job(&mut doc, 15, true).unwrap();
        assert_eq!(doc.history[0].status, JobStatus::DryRun);
        assert!(sched.cancel_job(&mut doc).unwrap());

        assert!(runner.calls().is_empty());
        assert!(doc.active_job.is_none());
        assert_eq!(doc.history[0].status, JobStatus::Cancelled);
    }

    #[test]
    fn test_forced_dry_run_overrides_request() {
        let runner = RecordingRunner::new();
        let (sched, _) = scheduler(&runner);
        let sched = sched.with_forced_dry_run(true);
        let mut doc = Document::default();

        let job = sched.start_job(&mut doc, 10, false).unwrap();
        assert!(job.dry_run);
        sched.cancel_job(&mut doc).unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_schedule_failure_leaves_no_active_job() {
        let runner = RecordingRunner::new().failing("shutdown -h +45");
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();

        let err = sched.start_job(&mut doc, 45, false).unwrap_err();
        assert!(matches!(err, JobError::Schedule(_)));
        assert!(doc.active_job.is_none());

        let head = &doc.history[0];
        assert_eq!(head.status, JobStatus::Failed);
        assert_eq!(head.duration_seconds, 45 * 60);
        assert_eq!(head.scheduled_for, start() + Duration::minutes(45));
        assert_eq!(head.command, "shutdown -h +45");
    }

    #[test]
    fn test_cancel_failure_still_clears_job() {
        let runner = RecordingRunner::new().failing("shutdown -c");
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();

        sched.start_job(&mut doc, 20, false).unwrap();
        let err = sched.cancel_job(&mut doc).unwrap_err();
        assert!(matches!(err, JobError::Cancel(_)));
        assert!(doc.active_job.is_none());
        assert_eq!(doc.history[0].status, JobStatus::Failed);
    }

    #[test]
    fn test_cancel_without_job_is_noop() {
        let runner = RecordingRunner::new();
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();
        assert!(!sched.cancel_job(&mut doc).unwrap());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_new_job_supersedes_previous() {
        let runner = RecordingRunner::new();
        let (sched, clock) = scheduler(&runner);
        let mut doc = Document::default();

        let first = sched.start_job(&mut doc, 60, false).unwrap();
        clock.advance(Duration::minutes(5));
        let second = sched.start_job(&mut doc, 10, false).unwrap();

        assert_eq!(doc.active_job.as_ref(), Some(&second));
        assert_eq!(doc.history.len(), 2);
        assert_eq!(doc.history[0].status, JobStatus::Ok);
        let old = doc.history_entry(first.history_id.as_deref().unwrap()).unwrap();
        assert_eq!(old.status, JobStatus::Cancelled);
        assert_eq!(runner.calls(), ["shutdown -h +60", "shutdown -c", "shutdown -h +10"]);
    }

    #[test]
    fn test_supersede_cancel_failure_does_not_block_new_job() {
        let runner = RecordingRunner::new().failing("shutdown -c");
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();

        let first = sched.start_job(&mut doc, 60, false).unwrap();
        sched.start_job(&mut doc, 10, false).unwrap();

        let old = doc.history_entry(first.history_id.as_deref().unwrap()).unwrap();
        assert_eq!(old.status, JobStatus::Failed);
        assert_eq!(doc.active_job.as_ref().unwrap().duration_sec, 600);
    }

    #[test]
    fn test_start_after_expiry_drops_fired_job_without_cancel() {
        let runner = RecordingRunner::new();
        let (sched, clock) = scheduler(&runner);
        let mut doc = Document::default();

        let first = sched.start_job(&mut doc, 10, false).unwrap();
        clock.advance(Duration::minutes(11));
        sched.start_job(&mut doc, 20, false).unwrap();

        assert_eq!(runner.calls(), ["shutdown -h +10", "shutdown -h +20"]);
        let old = doc.history_entry(first.history_id.as_deref().unwrap()).unwrap();
        assert_eq!(old.status, JobStatus::Ok);
        assert_eq!(doc.active_job.as_ref().unwrap().duration_sec, 1200);
    }

    #[test]
    fn test_at_most_one_open_job_after_any_sequence() {
        let runner = RecordingRunner::new();
        let (sched, clock) = scheduler(&runner);
        let mut doc = Document::default();

        for (i, minutes) in [5u32, 10, 15, 20, 25, 30, 35].into_iter().enumerate() {
            if i % 3 == 2 {
                let _ = sched.cancel_job(&mut doc);
            } else {
                sched.start_job(&mut doc, minutes, i % 2 == 0).unwrap();
            }
            clock.advance(Duration::seconds(30));
            let open = doc.history.iter().filter(|h| h.status.is_open()).count();
            assert!(open <= 1, "{open} open entries after step {i}");
            assert_eq!(open == 1, doc.active_job.is_some());
        }
    }

    #[test]
    fn test_legacy_job_cancel_infers_dry_run_from_head() {
        let runner = RecordingRunner::new();
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();

        sched.start_job(&mut doc, 15, true).unwrap();
        if let Some(job) = doc.active_job.as_mut() {
            job.dry_run = false;
            job.history_id = None;
        }

        sched.cancel_job(&mut doc).unwrap();
        assert!(runner.calls().is_empty());
        assert_eq!(doc.history[0].status, JobStatus::Cancelled);
    }

    #[test]
    fn test_expire_stale_clears_past_job_only() {
        let runner = RecordingRunner::new();
        let (sched, clock) = scheduler(&runner);
        let mut doc = Document::default();

        sched.start_job(&mut doc, 10, true).unwrap();
        clock.advance(Duration::minutes(9));
        assert!(!sched.expire_stale(&mut doc));
        assert!(doc.active_job.is_some());

        clock.advance(Duration::minutes(1));
        assert!(sched.expire_stale(&mut doc));
        assert!(doc.active_job.is_none());
        assert!(!sched.expire_stale(&mut doc));
    }

    #[test]
    fn test_zero_minutes_rejected() {
        let runner = RecordingRunner::new();
        let (sched, _) = scheduler(&runner);
        let mut doc = Document::default();
        assert!(matches!(sched.start_job(&mut doc, 0, false), Err(JobError::ZeroMinutes)));
        assert!(doc.history.is_empty());
    }
}
