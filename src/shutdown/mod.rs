//! OS shutdown executors: one implementation per platform behind a common
//! trait, chosen once at startup.

pub mod darwin;
pub mod linux;
pub mod runner;
pub mod windows;

use thiserror::Error;
use tracing::{debug, warn};

pub use self::darwin::DarwinExecutor;
pub use self::linux::LinuxExecutor;
pub use self::runner::{CommandOutput, CommandRunner, SystemRunner};
pub use self::windows::WindowsExecutor;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}){}", output_suffix(.output))]
    Failed {
        command: String,
        status: String,
        output: String,
    },

    #[error("{primary}; fallback also failed: {fallback}")]
    CancelFallbackFailed {
        primary: Box<ExecError>,
        fallback: Box<ExecError>,
    },
}

fn output_suffix(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(": {output}")
    }
}

impl ExecError {
    /// The command line that was attempted.
    pub fn command(&self) -> &str {
        match self {
            ExecError::Spawn { command, .. } | ExecError::Failed { command, .. } => command,
            ExecError::CancelFallbackFailed { primary, .. } => primary.command(),
        }
    }
}

/// Schedules and cancels a delayed OS shutdown.
pub trait Executor: Send + Sync {
    /// Schedule a halt `minutes` from now. Returns the command line that ran,
    /// or would have run on dry-run. On failure the command line is carried
    /// by the error.
    fn schedule(&self, minutes: u32, dry_run: bool) -> Result<String, ExecError>;

    /// Cancel the pending halt. Dry-run is a no-op.
    fn cancel(&self, dry_run: bool) -> Result<(), ExecError>;

    /// Short OS tag recorded in history (`linux`, `darwin`, `windows`).
    fn os(&self) -> &'static str;
}

/// Pick the executor for the host OS.
pub fn for_host() -> Box<dyn Executor> {
    for_os(std::env::consts::OS, Box::new(SystemRunner))
}

/// Pick the executor for `os` (a `std::env::consts::OS` value). Unknown
/// systems get the Windows executor.
pub fn for_os(os: &str, runner: Box<dyn CommandRunner>) -> Box<dyn Executor> {
    match os {
        "linux" => Box::new(LinuxExecutor::with_runner(runner)),
        "macos" => Box::new(DarwinExecutor::with_runner(runner)),
        "windows" => Box::new(WindowsExecutor::with_runner(runner)),
        other => {
            warn!(os = %other, "unrecognized host OS, using the windows executor");
            Box::new(WindowsExecutor::with_runner(runner))
        }
    }
}

pub(crate) fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command and turn a spawn failure or non-zero exit into an error.
pub(crate) fn invoke(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
) -> Result<(), ExecError> {
    let command = command_line(program, args);
    debug!(%command, "running shutdown command");

    let out = runner.run(program, args).map_err(|source| ExecError::Spawn {
        command: command.clone(),
        source,
    })?;

    if out.success {
        Ok(())
    } else {
        Err(ExecError::Failed {
            command,
            status: out.status,
            output: out.output,
        })
    }
}
