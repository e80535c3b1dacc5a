//! TOML application configuration.
//!
//! Resolution order: an explicit `--config` path, the `GOTOSLEEP_CONFIG`
//! environment variable, `<config dir>/gotosleep/config.toml`, then the
//! compiled-in defaults. A file that cannot be loaded is reported and the
//! next source is tried.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory name under the platform config and data directories.
pub const APP_DIR: &str = "gotosleep";

pub const CONFIG_ENV: &str = "GOTOSLEEP_CONFIG";

/// Forces every schedule and cancel into dry-run mode when set to `1`/`true`.
pub const FORCE_DRY_RUN_ENV: &str = "GOTOSLEEP_FORCE_DRY_RUN";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration. Sources that exist but fail to load are
    /// skipped and described in the returned list, so they can be reported
    /// once logging is up.
    pub fn load_or_default(explicit: Option<&Path>) -> (Self, Vec<String>) {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let default = default_config_path();
        Self::resolve(explicit, env.as_deref(), default.as_deref())
    }

    fn resolve(
        explicit: Option<&Path>,
        env: Option<&Path>,
        default: Option<&Path>,
    ) -> (Self, Vec<String>) {
        let mut problems = Vec::new();
        for (source, path) in [("--config", explicit), (CONFIG_ENV, env)] {
            let Some(path) = path else { continue };
            match Self::load(path) {
                Ok(cfg) => return (cfg, problems),
                Err(e) => problems.push(format!(
                    "config file {} ({source}) could not be loaded, trying fallback: {e:#}",
                    path.display()
                )),
            }
        }

        if let Some(path) = default.filter(|p| p.exists()) {
            match Self::load(path) {
                Ok(cfg) => return (cfg, problems),
                Err(e) => problems.push(format!(
                    "config file {} could not be loaded, using defaults: {e:#}",
                    path.display()
                )),
            }
        }

        (Self::default(), problems)
    }

    /// Where the state document lives: `override_path`, then `[state] path`,
    /// then `<config dir>/gotosleep/state.json`.
    pub fn state_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = override_path.or(self.state.path.as_deref()) {
            return Ok(path.to_path_buf());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join("state.json"))
            .context("cannot determine a location for the state file; pass --state")
    }

    /// Log file for interactive mode: `[logging] file`, then
    /// `<data dir>/gotosleep/gotosleep.log`.
    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.logging.file {
            return Ok(path.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR).join("gotosleep.log"))
            .context("cannot determine a location for the log file")
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Whether [`FORCE_DRY_RUN_ENV`] asks for forced dry-run.
pub fn force_dry_run_from_env() -> bool {
    std::env::var(FORCE_DRY_RUN_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// State document location.
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence.
    pub level: String,
    /// Log file used while the terminal UI is running.
    pub file: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
