//! Terminal session: raw mode and alternate screen, the input/redraw loop,
//! and the termination listener.
//!
//! The loop runs on a blocking thread and the listener on the runtime; both
//! share the [`App`] behind a mutex. The lock is never held while waiting
//! for input.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{error, info, warn};

use crate::app::{App, AppEvent, Control};

/// Longest wait for input when no screen asked for an earlier redraw.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Puts the terminal back when dropped, including on early return.
struct TuiGuard;

impl TuiGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let guard = TuiGuard;
        execute!(io::stdout(), EnterAlternateScreen, crossterm::cursor::Hide)
            .context("failed to enter the alternate screen")?;
        Ok(guard)
    }
}

impl Drop for TuiGuard {
    fn drop(&mut self) {
        restore();
    }
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        default_hook(info);
    }));
}

fn lock(app: &Mutex<App>) -> MutexGuard<'_, App> {
    app.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run the interactive UI until the user quits. Returns the warning to print
/// once the terminal is back to normal, if any.
pub async fn run(app: App) -> Result<Option<String>> {
    let app = Arc::new(Mutex::new(app));
    install_panic_hook();
    let guard = TuiGuard::enter()?;

    let listener = tokio::spawn(listen_for_termination(Arc::clone(&app)));
    let loop_app = Arc::clone(&app);
    let outcome = tokio::task::spawn_blocking(move || event_loop(&loop_app))
        .await
        .context("terminal loop panicked")?;

    listener.abort();
    drop(guard);
    outcome
}

fn event_loop(app: &Mutex<App>) -> Result<Option<String>> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let size = terminal.size()?;
    lock(app).handle(AppEvent::Resize(size.width, size.height));

    loop {
        let deadline = {
            let app = lock(app);
            terminal.draw(|frame| app.draw(frame))?;
            app.next_deadline()
        };

        let timeout = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));
        let input = if event::poll(timeout)? {
            Some(event::read()?)
        } else {
            None
        };

        let control = {
            let mut app = lock(app);
            match input {
                Some(Event::Key(key)) => app.handle(AppEvent::Key(key)),
                Some(Event::Resize(width, height)) => app.handle(AppEvent::Resize(width, height)),
                Some(_) => Control::Continue,
                None => app.handle(AppEvent::Tick(Instant::now())),
            }
        };

        if let Control::Quit { warning } = control {
            return Ok(warning);
        }
    }
}

/// On SIGTERM (or a console shutdown on Windows): clear an expired job,
/// restore the terminal and exit cleanly. A pending job stays scheduled.
async fn listen_for_termination(app: Arc<Mutex<App>>) {
    if let Err(e) = wait_for_termination().await {
        warn!(error = %e, "could not install termination handler");
        return;
    }

    info!("termination requested");
    if let Err(e) = lock(&app).on_terminate() {
        error!(error = %e, "failed to save state on termination");
    }
    restore();
    std::process::exit(0);
}

#[cfg(unix)]
async fn wait_for_termination() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(windows)]
async fn wait_for_termination() -> io::Result<()> {
    let mut shutdown = tokio::signal::windows::ctrl_shutdown()?;
    shutdown.recv().await;
    Ok(())
}
