use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::debounce::DEFAULT_ADVANCE_INTERVAL_MS;
use crate::focus::{FocusOrientation, FocusTuning};
use crate::gesture::DEFAULT_SHAKE_SPEED_THRESHOLD;
use crate::training::DEFAULT_SHAKE_DURATION_SECS;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("`{field}` must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{field}` must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("`advance_debounce_ms` of {0} ms would swallow deliberate clicks (max 2000)")]
    DebounceTooLong(u64),
}

/// Smoothing and placement of one trackable object
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ObjectTuning {
    pub move_rate: f32,
    pub rotate_rate: f32,
    pub focus_distance: f32,
    /// When set, the object faces the viewer tilted by this many degrees
    /// instead of copying the camera orientation
    #[serde(default)]
    pub tilt_degrees: Option<f32>,
}

impl ObjectTuning {
    pub fn inhaler() -> Self {
        Self {
            move_rate: 12.0,
            rotate_rate: 12.0,
            focus_distance: 0.45,
            tilt_degrees: None,
        }
    }

    pub fn clipboard() -> Self {
        Self {
            move_rate: 12.0,
            rotate_rate: 12.0,
            focus_distance: 0.5,
            tilt_degrees: Some(-10.0),
        }
    }

    pub fn focus_tuning(&self) -> FocusTuning {
        FocusTuning {
            move_rate: self.move_rate,
            rotate_rate: self.rotate_rate,
            focus_distance: self.focus_distance,
            orientation: match self.tilt_degrees {
                None => FocusOrientation::MatchCamera,
                Some(deg) => FocusOrientation::FaceViewer {
                    tilt_radians: deg.to_radians(),
                },
            },
        }
    }

    /// `fields` names move_rate, rotate_rate, focus_distance and tilt_degrees
    /// as they appear in the config file
    fn validate(&self, fields: &'static [&'static str; 4]) -> Result<(), ConfigError> {
        positive(fields[0], self.move_rate)?;
        positive(fields[1], self.rotate_rate)?;
        positive(fields[2], self.focus_distance)?;
        if let Some(deg) = self.tilt_degrees {
            if !deg.is_finite() {
                return Err(ConfigError::NotFinite {
                    field: fields[3],
                    value: deg,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub shake_speed_threshold: f32,
    pub shake_duration_secs: f32,
    pub advance_debounce_ms: u64,
    /// Focusing one object returns the other to rest
    pub exclusive_focus: bool,
    pub inhaler: ObjectTuning,
    pub clipboard: ObjectTuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shake_speed_threshold: DEFAULT_SHAKE_SPEED_THRESHOLD,
            shake_duration_secs: DEFAULT_SHAKE_DURATION_SECS,
            advance_debounce_ms: DEFAULT_ADVANCE_INTERVAL_MS,
            exclusive_focus: true,
            inhaler: ObjectTuning::inhaler(),
            clipboard: ObjectTuning::clipboard(),
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("shake_speed_threshold", self.shake_speed_threshold)?;
        positive("shake_duration_secs", self.shake_duration_secs)?;
        if self.advance_debounce_ms > 2000 {
            return Err(ConfigError::DebounceTooLong(self.advance_debounce_ms));
        }
        self.inhaler.validate(&[
            "inhaler.move_rate",
            "inhaler.rotate_rate",
            "inhaler.focus_distance",
            "inhaler.tilt_degrees",
        ])?;
        self.clipboard.validate(&[
            "clipboard.move_rate",
            "clipboard.rotate_rate",
            "clipboard.focus_distance",
            "clipboard.tilt_degrees",
        ])
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Falls back to defaults when the file is missing, unreadable or invalid
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        let cfg = match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "unparseable config, using defaults");
                return Config::default();
            }
        };
        match cfg.validate() {
            Ok(()) => cfg,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "invalid config, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            shake_duration_secs: 0.8,
            exclusive_focus: false,
            ..Config::default()
        };
        store.save(&cfg).unwrap();
        assert!(path.exists());
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "shake_speed_threshold": 2.5 }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.shake_speed_threshold, 2.5);
        assert_eq!(cfg.inhaler, ObjectTuning::inhaler());
    }

    #[test]
    fn corrupt_or_invalid_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());

        fs::write(&path, r#"{ "shake_duration_secs": -1.0 }"#).unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn validate_reports_offending_field() {
        let mut cfg = Config::default();
        cfg.clipboard.move_rate = 0.0;
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive { field: "clipboard.move_rate", .. })
        );

        let mut cfg = Config::default();
        cfg.inhaler.tilt_degrees = Some(f32::NAN);
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::NotFinite { field: "inhaler.tilt_degrees", .. })
        );

        let cfg = Config {
            advance_debounce_ms: 5000,
            ..Config::default()
        };
        assert_matches!(cfg.validate(), Err(ConfigError::DebounceTooLong(5000)));
    }

    #[test]
    fn tilt_error_names_the_object() {
        let mut cfg = Config::default();
        cfg.clipboard.tilt_degrees = Some(f32::INFINITY);
        let err = cfg.validate().unwrap_err();
        assert_matches!(
            err,
            ConfigError::NotFinite { field: "clipboard.tilt_degrees", .. }
        );
        assert!(err.to_string().contains("clipboard.tilt_degrees"));
    }

    #[test]
    fn tilt_selects_face_viewer_orientation() {
        assert_eq!(
            ObjectTuning::inhaler().focus_tuning().orientation,
            FocusOrientation::MatchCamera
        );
        assert_matches!(
            ObjectTuning::clipboard().focus_tuning().orientation,
            FocusOrientation::FaceViewer { tilt_radians } if tilt_radians < 0.0
        );
    }
}
