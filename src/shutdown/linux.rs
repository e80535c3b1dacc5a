use super::{command_line, invoke, CommandRunner, ExecError, Executor, SystemRunner};

/// `shutdown -h +N` / `shutdown -c` (systemd or sysvinit).
pub struct LinuxExecutor {
    runner: Box<dyn CommandRunner>,
}

impl LinuxExecutor {
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemRunner))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Default for LinuxExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for LinuxExecutor {
    fn schedule(&self, minutes: u32, dry_run: bool) -> Result<String, ExecError> {
        let args = vec!["-h".to_string(), format!("+{minutes}")];
        let command = command_line("shutdown", &args);
        if dry_run {
            return Ok(command);
        }
        invoke(self.runner.as_ref(), "shutdown", &args)?;
        Ok(command)
    }

    fn cancel(&self, dry_run: bool) -> Result<(), ExecError> {
        if dry_run {
            return Ok(());
        }
        invoke(self.runner.as_ref(), "shutdown", &["-c".to_string()])
    }

    fn os(&self) -> &'static str {
        "linux"
    }
}
