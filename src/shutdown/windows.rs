use super::{command_line, invoke, CommandRunner, ExecError, Executor, SystemRunner};

/// `shutdown.exe /s /t <seconds>` / `shutdown.exe /a`.
pub struct WindowsExecutor {
    runner: Box<dyn CommandRunner>,
}

impl WindowsExecutor {
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemRunner))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Default for WindowsExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for WindowsExecutor {
    fn schedule(&self, minutes: u32, dry_run: bool) -> Result<String, ExecError> {
        let seconds = u64::from(minutes) * 60;
        let args = vec!["/s".to_string(), "/t".to_string(), seconds.to_string()];
        let command = command_line("shutdown.exe", &args);
        if dry_run {
            return Ok(command);
        }
        invoke(self.runner.as_ref(), "shutdown.exe", &args)?;
        Ok(command)
    }

    fn cancel(&self, dry_run: bool) -> Result<(), ExecError> {
        if dry_run {
            return Ok(());
        }
        invoke(self.runner.as_ref(), "shutdown.exe", &["/a".to_string()])
    }

    fn os(&self) -> &'static str {
        "windows"
    }
}
