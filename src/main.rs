use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};

use gotosleep::app::App;
use gotosleep::config::{self, AppConfig};
use gotosleep::duration::{format_countdown, format_minutes, parse_minutes};
use gotosleep::logging::{self, LogTarget};
use gotosleep::scheduler::clock::SystemClock;
use gotosleep::scheduler::Scheduler;
use gotosleep::shutdown;
use gotosleep::storage::JsonFileStore;

#[derive(Parser)]
#[command(
    name = "gotosleep",
    about = "Terminal shutdown timer: schedule, track and cancel a one-shot OS shutdown",
    version,
    long_about = None
)]
struct Cli {
    /// State file (defaults to the platform config directory)
    #[arg(long, global = true, env = "GOTOSLEEP_STATE")]
    state: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Without a subcommand the interactive UI starts
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active shutdown, if any
    Status {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Schedule a shutdown, replacing any active one
    Start {
        /// Delay: minutes (`45`), units (`1h30m`, `90s`) or clock form (`1:30`)
        duration: String,

        /// Record the job without sending anything to the OS
        #[arg(long)]
        dry_run: bool,
    },

    /// Cancel the active shutdown
    Cancel,

    /// List past shutdown jobs, newest first
    History {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_problems) = AppConfig::load_or_default(cli.config.as_deref());
    let target = if cli.command.is_none() {
        LogTarget::File(config.log_file()?)
    } else {
        LogTarget::Stderr
    };
    logging::init(&config.logging, target)?;
    for problem in &config_problems {
        tracing::warn!("{problem}");
    }

    let state_path = config.state_path(cli.state.as_deref())?;
    let scheduler = Scheduler::new(shutdown::for_host(), Arc::new(SystemClock))
        .with_forced_dry_run(config::force_dry_run_from_env());
    if scheduler.forced_dry_run() {
        tracing::info!("dry-run forced by {}", config::FORCE_DRY_RUN_ENV);
    }
    let mut app = App::new(Box::new(JsonFileStore::new(&state_path)), scheduler)?;

    match cli.command {
        None => {
            tracing::info!(state = %state_path.display(), "starting interactive mode");
            if let Some(warning) = gotosleep::tui::run(app).await? {
                eprintln!("{warning}");
            }
        }
        Some(Commands::Status { json }) => {
            let job = &app.document().active_job;
            if json {
                println!("{}", serde_json::to_string_pretty(job)?);
            } else if let Some(job) = job {
                println!("Shutdown at:  {}", job.end_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
                println!("Remaining:    {}", format_countdown(job.remaining_secs(Utc::now())));
                println!("Command:      {}", job.command);
                if job.dry_run {
                    println!("Mode:         dry run");
                }
            } else {
                println!("No active shutdown.");
            }
        }
        Some(Commands::Start { duration, dry_run }) => {
            let minutes = parse_minutes(&duration)
                .with_context(|| format!("invalid duration `{duration}`"))?;
            let dry_run = dry_run || app.document().settings.dry_run_default;
            let job = app.start_job(minutes, dry_run)?;
            println!(
                "Shutdown scheduled in {} at {} ({})",
                format_minutes(minutes),
                job.end_time.with_timezone(&Local).format("%H:%M:%S"),
                job.command
            );
            if job.dry_run {
                println!("Dry run: nothing was sent to the OS.");
            }
        }
        Some(Commands::Cancel) => {
            if app.cancel_job()? {
                println!("Shutdown cancelled.");
            } else {
                println!("No active shutdown.");
            }
        }
        Some(Commands::History { json }) => {
            let history = &app.document().history;
            if json {
                println!("{}", serde_json::to_string_pretty(history)?);
            } else if history.is_empty() {
                println!("No history yet.");
            } else {
                println!(
                    "{:<16} | {:<8} | {:<16} | {:<9} | Command",
                    "Created", "Duration", "Scheduled for", "Status"
                );
                println!("{:-<16}-|-{:-<8}-|-{:-<16}-|-{:-<9}-|-{:-<20}", "", "", "", "", "");
                for entry in history {
                    println!(
                        "{:<16} | {:<8} | {:<16} | {:<9} | {}",
                        entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                        format_minutes(entry.minutes()),
                        entry.scheduled_for.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                        entry.status.to_string(),
                        entry.command
                    );
                }
            }
        }
    }

    Ok(())
}
