//! Application settings loaded from a TOML file and `HAGGLE_*` variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::DEFAULT_TICK_INTERVAL;

/// Directory under the platform config dir that holds our files.
pub const CONFIG_DIR_NAME: &str = "haggle";
/// Name of the settings file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# Haggle settings. Any key can also be set through HAGGLE_<KEY>.

# Where save files and exports are written.
# save_dir = "/path/to/saves"

# Milliseconds between clock ticks; each tick spends that much day time.
tick_interval_ms = 100

# Fixed seed for reproducible shops. Leave unset for a random run.
# seed = 42

debug_mode = false
"#;

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for save files and exports.
    pub save_dir: PathBuf,
    /// Milliseconds between clock ticks.
    pub tick_interval_ms: u64,
    /// Seed for the game's random source.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Start with debug information visible.
    pub debug_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_dir: config_root().join("saves"),
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            seed: None,
            debug_mode: false,
        }
    }
}

impl AppConfig {
    /// Load settings from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load settings from `path` (optional) layered under `HAGGLE_*`
    /// environment variables.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = Config::builder()
            .set_default("save_dir", defaults.save_dir.to_string_lossy().to_string())?
            .set_default("tick_interval_ms", defaults.tick_interval_ms as i64)?
            .set_default("debug_mode", defaults.debug_mode)?
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("HAGGLE"))
            .build()
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid settings")?;
        Ok(config.sanitised())
    }

    /// Interval between clock ticks, never zero.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    fn sanitised(mut self) -> Self {
        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = DEFAULT_TICK_INTERVAL.as_millis() as u64;
        }
        self
    }
}

/// Root directory for settings and saves.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Location of the settings file.
pub fn config_path() -> PathBuf {
    config_root().join(CONFIG_FILE_NAME)
}

/// Write a commented default settings file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default settings");
    Ok(())
}
