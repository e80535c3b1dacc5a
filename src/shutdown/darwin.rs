use tracing::warn;

use super::{command_line, invoke, CommandRunner, ExecError, Executor, SystemRunner};

/// macOS: `sudo shutdown -h +N`. Cancelling tries `shutdown -c` and falls
/// back to killing the pending `shutdown` process.
pub struct DarwinExecutor {
    runner: Box<dyn CommandRunner>,
}

impl DarwinExecutor {
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemRunner))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Default for DarwinExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Executor for DarwinExecutor {
    fn schedule(&self, minutes: u32, dry_run: bool) -> Result<String, ExecError> {
        let delay = format!("+{minutes}");
        let args = owned(&["shutdown", "-h", delay.as_str()]);
        let command = command_line("sudo", &args);
        if dry_run {
            return Ok(command);
        }
        invoke(self.runner.as_ref(), "sudo", &args)?;
        Ok(command)
    }

    fn cancel(&self, dry_run: bool) -> Result<(), ExecError> {
        if dry_run {
            return Ok(());
        }

        let primary = match invoke(self.runner.as_ref(), "sudo", &owned(&["shutdown", "-c"])) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!(error = %primary, "shutdown -c failed, killing the pending shutdown process");

        invoke(self.runner.as_ref(), "sudo", &owned(&["killall", "shutdown"])).map_err(|fallback| {
            ExecError::CancelFallbackFailed {
                primary: Box::new(primary),
                fallback: Box::new(fallback),
            }
        })
    }

    fn os(&self) -> &'static str {
        "darwin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::runner::RecordingRunner;

    #[test]
    fn test_schedule_uses_sudo() {
        let exec = DarwinExecutor::with_runner(Box::new(RecordingRunner::new()));
        assert_eq!(exec.schedule(30, true).unwrap(), "sudo shutdown -h +30");
    }

    #[test]
    fn test_cancel_falls_back_to_killall() {
        let runner = RecordingRunner::new().failing("sudo shutdown -c");
        let exec = DarwinExecutor::with_runner(Box::new(runner.clone()));
        exec.cancel(false).unwrap();
        assert_eq!(runner.calls(), ["sudo shutdown -c", "sudo killall shutdown"]);
    }

    #[test]
    fn test_cancel_fails_only_when_both_fail() {
        let runner = RecordingRunner::new()
            .failing("sudo shutdown -c")
            .failing("sudo killall shutdown");
        let exec = DarwinExecutor::with_runner(Box::new(runner));
        let err = exec.cancel(false).unwrap_err();
        assert!(matches!(err, ExecError::CancelFallbackFailed { .. }));
        assert_eq!(err.command(), "sudo shutdown -c");
    }

    #[test]
    fn test_primary_cancel_success_skips_fallback() {
        let runner = RecordingRunner::new();
        let exec = DarwinExecutor::with_runner(Box::new(runner.clone()));
        exec.cancel(false).unwrap();
        assert_eq!(runner.calls(), ["sudo shutdown -c"]);
    }
}
