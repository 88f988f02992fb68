//! Manager settings

use anyhow::Result;
use deck_assets_core::{Color, COLOR_SAVE_KEY, ICON_SAVE_KEY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for an `AssetManager`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// JSON document holding user overrides
    #[serde(default = "default_overrides_path")]
    pub overrides_path: PathBuf,
    /// Render every icon as soon as it is registered
    #[serde(default)]
    pub pre_render_all_icons: bool,
    /// Returned by `get_color` for unknown names
    #[serde(default = "default_fallback_color")]
    pub fallback_color: Color,
    /// Upper bound on one notification batch (None = wait for all subscribers)
    #[serde(default)]
    pub notify_timeout_ms: Option<u64>,
    /// Document key for color overrides
    #[serde(default = "default_color_save_key")]
    pub color_save_key: String,
    /// Document key for icon overrides
    #[serde(default = "default_icon_save_key")]
    pub icon_save_key: String,
}

fn default_overrides_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("asset_overrides.json"),
        None => PathBuf::from("asset_overrides.json"),
    }
}

fn default_fallback_color() -> Color {
    Color::TRANSPARENT
}

fn default_color_save_key() -> String {
    COLOR_SAVE_KEY.to_string()
}

fn default_icon_save_key() -> String {
    ICON_SAVE_KEY.to_string()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "deck-assets", "deck-assets")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overrides_path: default_overrides_path(),
            pre_render_all_icons: false,
            fallback_color: default_fallback_color(),
            notify_timeout_ms: None,
            color_save_key: default_color_save_key(),
            icon_save_key: default_icon_save_key(),
        }
    }
}

impl Settings {
    /// Load settings from the user config directory
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Get the settings file path
    fn config_path() -> Result<PathBuf> {
        let dirs = project_dirs()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("settings.json"))
    }

    /// Load settings from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_overrides_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides_path = path.into();
        self
    }

    pub fn notify_timeout(&self) -> Option<Duration> {
        self.notify_timeout_ms.map(Duration::from_millis)
    }
}
