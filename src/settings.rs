use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RekapError, Result};
use crate::reconciler::{default_palette, ColorStrategy, CyclingPalette, RandomPalette};

pub const DB_FILE: &str = "rekap.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Colours handed to categories created during import.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    /// Fixes the colour sequence when set.
    #[serde(default)]
    pub color_seed: Option<u64>,
    /// Walk the palette in order instead of picking at random.
    #[serde(default)]
    pub cycle_colors: bool,
}

fn default_user_id() -> i64 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_id: default_user_id(),
            palette: default_palette(),
            color_seed: None,
            cycle_colors: false,
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }

    pub fn color_strategy(&self) -> Box<dyn ColorStrategy> {
        let palette = if self.palette.is_empty() {
            default_palette()
        } else {
            self.palette.clone()
        };
        if self.cycle_colors {
            return Box::new(CyclingPalette::new(palette));
        }
        match self.color_seed {
            Some(seed) => Box::new(RandomPalette::seeded(palette, seed)),
            None => Box::new(RandomPalette::new(palette)),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("rekap")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("rekap")
}

fn load_from(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RekapError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn load_settings() -> Settings {
    load_from(&settings_path())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_to(&settings_path(), settings)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
