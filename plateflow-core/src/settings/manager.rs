use crate::settings::config::Settings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

const SETTINGS_DIR: &str = ".plateflow";
const SETTINGS_FILE: &str = "settings.toml";

/// Loads workflow settings from a TOML file and keeps an editable copy.
/// Edits stay in memory until [`SettingsManager::save`].
#[derive(Clone)]
pub struct SettingsManager {
    path: PathBuf,
    current: Arc<RwLock<Settings>>,
}

impl SettingsManager {
    /// Opens `~/.plateflow/settings.toml`.
    pub fn new() -> Result<Self> {
        Self::from_path(Self::default_settings_path()?)
    }

    /// Opens the file at `path`. A missing file is created with defaults; a
    /// file that does not parse is kept as `<name>.toml.backup` and replaced
    /// with defaults.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let settings = match fs::read_to_string(&path) {
            Ok(contents) => Self::parse_or_recover(&path, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "No settings file, writing defaults");
                let defaults = Settings::default();
                write_toml(&path, &defaults)?;
                defaults
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read settings from {path:?}"))
            }
        };

        Ok(Self {
            path,
            current: Arc::new(RwLock::new(settings)),
        })
    }

    pub fn default_settings_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    fn parse_or_recover(path: &Path, contents: &str) -> Result<Settings> {
        let err = match toml::from_str::<Settings>(contents) {
            Ok(settings) => return Ok(settings),
            Err(e) => e,
        };

        let backup = path.with_extension("toml.backup");
        warn!(error = %err, ?backup, "Unreadable settings file, falling back to defaults");
        fs::rename(path, &backup)
            .with_context(|| format!("Failed to move unreadable settings to {backup:?}"))?;

        let defaults = Settings::default();
        write_toml(path, &defaults)?;
        Ok(defaults)
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.current.read().unwrap().clone()
    }

    /// Edits the in-memory settings. Nothing is written to disk.
    pub fn update_setting<F>(&self, updater: F)
    where
        F: FnOnce(&mut Settings),
    {
        updater(&mut *self.current.write().unwrap());
    }

    /// Replaces the settings and writes them out.
    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        write_toml(&self.path, &settings)?;
        *self.current.write().unwrap() = settings;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_settings(self.settings())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_toml(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {dir:?}"))?;
    }
    let text = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, text).with_context(|| format!("Failed to write settings to {path:?}"))
}
