// Application settings loaded from TOML

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "actionbind";
const SETTINGS_FILE: &str = "settings.toml";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub rebind: RebindSettings,
}

/// Where the profile store lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Folder under the platform data directory
    pub folder: String,
    pub file_name: String,
    pub extension: String,

    /// Full path override; when set the other fields are ignored
    pub path: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            folder: "ExtraBindings".to_string(),
            file_name: "EnabledBindings".to_string(),
            extension: "json".to_string(),
            path: None,
        }
    }
}

impl StoreSettings {
    /// Resolved location of the profile store file
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.folder)
            .join(format!("{}.{}", self.file_name, self.extension))
    }
}

/// Interactive rebind policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebindSettings {
    /// Action whose bound paths abort a rebind
    pub menu_action: String,

    /// Actions whose bound paths can never be captured by a rebind
    pub exclusive_actions: Vec<String>,

    /// Ticks to wait for another simultaneous input before accepting a candidate
    pub grace_ticks: u32,

    /// Treat keyboard and mouse as the same device while capturing
    pub allow_keyboard_mouse: bool,
}

impl Default for RebindSettings {
    fn default() -> Self {
        Self {
            menu_action: "MenuTrigger".to_string(),
            exclusive_actions: vec!["Movement".to_string()],
            grace_ticks: 0,
            allow_keyboard_mouse: true,
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load settings from a file; a missing file gives defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// Load from the default location, or defaults when there is none
    pub fn load_default() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.store_path()
    }
}
