pub mod schema;

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::error::Result;

use schema::Settings;

const SAVE_DEBOUNCE_MS: u64 = 500;
const APP_DIR: &str = "Lorpaper";
const PORTABLE_MARKER: &str = "lorpaper.ini";

pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
    pending_write: bool,
    last_change_at: Option<Instant>,
    debounce: Duration,
}

impl SettingsStore {
    pub fn load() -> Self {
        Self::with_path(settings_path())
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = load_settings_from(path.as_path());
        Self {
            path,
            settings,
            pending_write: false,
            last_change_at: None,
            debounce: Duration::from_millis(SAVE_DEBOUNCE_MS),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update<F>(&mut self, mutator: F)
    where
        F: FnOnce(&mut Settings),
    {
        mutator(&mut self.settings);
        self.pending_write = true;
        self.last_change_at = Some(Instant::now());
    }

    pub fn is_dirty(&self) -> bool {
        self.pending_write
    }

    pub fn flush_if_due(&mut self) -> Result<bool> {
        let Some(last_change) = self.last_change_at else {
            return Ok(false);
        };
        if !self.pending_write || last_change.elapsed() < self.debounce {
            return Ok(false);
        }

        save_settings_to(self.path.as_path(), &self.settings)?;
        self.pending_write = false;
        self.last_change_at = None;
        Ok(true)
    }

    pub fn force_flush(&mut self) -> Result<()> {
        if self.pending_write {
            save_settings_to(self.path.as_path(), &self.settings)?;
            self.pending_write = false;
            self.last_change_at = None;
        }
        Ok(())
    }
}

pub fn settings_path() -> PathBuf {
    if let Some(root) = portable_root() {
        return root.join("settings.json");
    }

    if let Some(base) = dirs::config_dir() {
        base.join(APP_DIR).join("settings.json")
    } else {
        PathBuf::from("settings.json")
    }
}

/// Directory holding user data such as templates: the portable folder or the
/// platform data dir.
pub fn data_root() -> PathBuf {
    if let Some(root) = portable_root() {
        return root;
    }
    dirs::data_dir()
        .map(|base| base.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn portable_root() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.to_path_buf();
    if dir.join(PORTABLE_MARKER).exists() {
        Some(dir)
    } else {
        None
    }
}

/// Reads settings, falling back to defaults when the file is missing or corrupt.
pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(data) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&data) {
        Ok(settings) => settings.migrate(),
        Err(err) => {
            log::warn!("ignoring unreadable settings at {}: {err}", path.display());
            Settings::default()
        }
    }
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(&settings.clone().migrate())?;
    fs::write(path, data)?;
    Ok(())
}
