//! Configuration types for the solver.
//!
//! Loads settings from config.json at startup. Each solve run works on an
//! immutable snapshot; calibration writes go through the [`ConfigStore`]
//! setters, which persist immediately.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

use crate::capture::rect::{ClientPoint, PixelRect};

/// A rectangle in relative coordinates (0.0 to 1.0) of the client area.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of client width
    pub width: f32,
    /// Height as fraction of client height
    pub height: f32,
}

impl Default for RelativeRect {
    fn default() -> Self {
        Self {
            x: 0.4,
            y: 0.45,
            width: 0.2,
            height: 0.1,
        }
    }
}

/// User-drawn capture area in screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualArea {
    pub enabled: bool,
    pub rect: PixelRect,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoDetect {
    pub enabled: bool,
}

/// Absolute screen edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteCoords {
    pub enabled: bool,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeCoords {
    pub enabled: bool,
    pub rect: RelativeRect,
}

/// Capture strategies, tried in field order by the region resolver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub manual_area: ManualArea,
    #[serde(default)]
    pub auto_detect: AutoDetect,
    #[serde(default)]
    pub absolute_coords: AbsoluteCoords,
    #[serde(default)]
    pub relative_coords: RelativeCoords,
    /// Client-space fallback, always available.
    #[serde(default = "default_fixed_coords")]
    pub fixed_coords: PixelRect,
}

fn default_fixed_coords() -> PixelRect {
    PixelRect::new(300, 250, 200, 60)
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            manual_area: ManualArea::default(),
            auto_detect: AutoDetect::default(),
            absolute_coords: AbsoluteCoords::default(),
            relative_coords: RelativeCoords::default(),
            fixed_coords: default_fixed_coords(),
        }
    }
}

/// OCR engine construction parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// Explicit path to the tesseract executable
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            tesseract_path: None,
            tessdata_dir: None,
        }
    }
}

/// Complete solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Executable name of the application showing the captcha
    #[serde(default = "default_target_process")]
    pub target_process: String,
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Where to click before typing the answer (client coordinates)
    #[serde(default)]
    pub input_point: ClientPoint,
    /// Where to click to submit the answer (client coordinates)
    #[serde(default)]
    pub confirm_point: ClientPoint,
    /// Recognition attempts per solve run
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause between failed attempts (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Wall-clock budget for a whole solve run (milliseconds)
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Pause between typing the answer and clicking confirm (milliseconds)
    #[serde(default = "default_type_delay_ms")]
    pub type_delay_ms: u64,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Write every OCR input image to the debug directory
    #[serde(default)]
    pub save_debug_images: bool,
}

fn default_target_process() -> String {
    "game.exe".to_string()
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_attempt_timeout_ms() -> u64 {
    30000
}

fn default_type_delay_ms() -> u64 {
    300
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            target_process: default_target_process(),
            capture: CaptureConfig::default(),
            input_point: ClientPoint::default(),
            confirm_point: ClientPoint::default(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            type_delay_ms: default_type_delay_ms(),
            ocr: OcrConfig::default(),
            save_debug_images: false,
        }
    }
}

/// Loads configuration from `path` or returns defaults.
pub fn load_config(path: &Path) -> SolverConfig {
    info!("Looking for config at: {}", path.display());

    if !path.exists() {
        info!("config.json not found. Using default config.");
        return SolverConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                SolverConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
            SolverConfig::default()
        }
    }
}

/// Writes configuration as pretty-printed JSON.
pub fn save_config(path: &Path, config: &SolverConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Owns the loaded configuration and its backing file.
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<SolverConfig>,
}

impl ConfigStore {
    /// Loads from `path`, falling back to defaults.
    pub fn open(path: PathBuf) -> Self {
        let config = load_config(&path);
        Self {
            path,
            config: RwLock::new(config),
        }
    }

    /// Returns a copy of the current configuration for one solve run.
    pub fn snapshot(&self) -> SolverConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stores a user-drawn screen-space capture area and enables manual capture.
    pub fn set_manual_area(&self, rect: PixelRect) -> Result<()> {
        self.update(|config| {
            config.capture.manual_area = ManualArea { enabled: true, rect };
        })
    }

    pub fn set_input_point(&self, point: ClientPoint) -> Result<()> {
        self.update(|config| config.input_point = point)
    }

    pub fn set_confirm_point(&self, point: ClientPoint) -> Result<()> {
        self.update(|config| config.confirm_point = point)
    }

    /// Persists the current configuration.
    pub fn save(&self) -> Result<()> {
        save_config(&self.path, &self.snapshot())
    }

    fn update(&self, apply: impl FnOnce(&mut SolverConfig)) -> Result<()> {
        {
            let mut guard = match self.config.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            apply(&mut guard);
        }
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config, SolverConfig::default());
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "max_retries": 4, "capture": { "auto_detect": { "enabled": true } } }"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.max_retries, 4);
        assert!(config.capture.auto_detect.enabled);
        assert_eq!(config.capture.fixed_coords, default_fixed_coords());
        assert_eq!(config.ocr.language, "eng");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_config(&path), SolverConfig::default());
    }

    #[test]
    fn test_setters_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open(path.clone());

        store.set_manual_area(PixelRect::new(10, 20, 150, 40)).unwrap();
        store.set_input_point(ClientPoint::new(320, 400)).unwrap();
        store.set_confirm_point(ClientPoint::new(420, 460)).unwrap();

        let reloaded = load_config(&path);
        assert!(reloaded.capture.manual_area.enabled);
        assert_eq!(reloaded.capture.manual_area.rect, PixelRect::new(10, 20, 150, 40));
        assert_eq!(reloaded.input_point, ClientPoint::new(320, 400));
        assert_eq!(reloaded.confirm_point, ClientPoint::new(420, 460));
        assert_eq!(store.snapshot(), reloaded);
    }
}
