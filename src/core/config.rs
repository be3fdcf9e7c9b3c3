use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::system_monitor::DEFAULT_SMOOTHING_WINDOW;
use crate::error::{MonitorError, Result};

const CONFIG_DIR: &str = "systatus";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of GPU readings averaged together (1 = latest only)
    #[serde(default = "default_smoothing_window")]
    pub gpu_smoothing_window: usize,
    /// Volume whose usage is reported; the system volume when unset
    #[serde(default)]
    pub system_volume: Option<PathBuf>,
}

fn default_smoothing_window() -> usize {
    DEFAULT_SMOOTHING_WINDOW
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            gpu_smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            system_volume: None,
        }
    }
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Missing, empty or unreadable-as-JSON files fall back to defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read(path)?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {}: {}", path.display(), e);
            Self::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| MonitorError::config("Could not determine config directory"))?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn smoothing_window(&self) -> usize {
        self.gpu_smoothing_window.max(1)
    }

    pub fn set_smoothing_window(&mut self, window: usize) -> Result<()> {
        if window == 0 {
            return Err(MonitorError::config("smoothing window must be at least 1"));
        }
        self.gpu_smoothing_window = window;
        Ok(())
    }

    pub fn set_system_volume(&mut self, volume: PathBuf) {
        self.system_volume = Some(volume);
    }

    /// Configured volume, else the host's boot volume
    pub fn resolve_system_volume(&self) -> PathBuf {
        self.system_volume
            .clone()
            .unwrap_or_else(default_system_volume)
    }
}

#[cfg(windows)]
fn default_system_volume() -> PathBuf {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    PathBuf::from(format!("{}\\", drive.trim_end_matches('\\')))
}

#[cfg(not(windows))]
fn default_system_volume() -> PathBuf {
    PathBuf::from("/")
}
