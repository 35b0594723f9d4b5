// src/config.rs
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::game::GameRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub pose: PoseConfig,
    pub tracking: TrackingConfig,
    pub rules: GameRules,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sidecar,
    Simulated,
}

/// Where keypoint frames come from and what we ask the estimator for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub source: SourceKind,
    /// Estimator executable; it must print one JSON message per line.
    pub command: String,
    pub extra_args: Vec<String>,
    pub camera_index: u32,
    pub max_poses: u32,
    pub score_threshold: f32,
    pub nms_radius: u32,
    pub flip_horizontal: bool,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Simulated,
            command: "posenet-sidecar".to_string(),
            extra_args: Vec::new(),
            camera_index: 0,
            max_poses: 1,
            score_threshold: 0.2,
            nms_radius: 20,
            flip_horizontal: true,
        }
    }
}

impl PoseConfig {
    /// Command-line arguments passed to the estimator process.
    pub fn sidecar_args(&self) -> Vec<String> {
        let mut args = vec![
            "--camera".to_string(),
            self.camera_index.to_string(),
            "--max-poses".to_string(),
            self.max_poses.to_string(),
            "--score-threshold".to_string(),
            self.score_threshold.to_string(),
            "--nms-radius".to_string(),
            self.nms_radius.to_string(),
        ];
        if self.flip_horizontal {
            args.push("--flip-horizontal".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Per-frame easing toward a detected keypoint.
    pub follow_rate: f32,
    /// Per-frame easing toward the rest pose when nobody is in view.
    pub rest_rate: f32,
    pub min_score: f32,
    pub wrist_min_score: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    pub hold_frames: u32,
    pub cooldown_ms: f64,
    pub sip_zone_base: f32,
    pub sip_zone_growth: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            follow_rate: 0.18,
            rest_rate: 0.04,
            min_score: 0.15,
            wrist_min_score: 0.10,
            margin_x: 0.15,
            margin_y: 0.10,
            hold_frames: 8,
            cooldown_ms: 2000.0,
            sip_zone_base: 110.0,
            sip_zone_growth: 40.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    /// Defaults to `<Documents>/DrinkUp` when unset.
    pub directory: Option<PathBuf>,
}

impl ExportConfig {
    pub fn output_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("DrinkUp")))
                .unwrap_or_else(|| PathBuf::from("./output"))
        })
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Missing or broken config files fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.pose.source, SourceKind::Simulated);
        assert_eq!(config.tracking.hold_frames, 8);
        assert_eq!(config.rules.attempts_per_turn, 2);
        assert!(!config.export.enabled);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [pose]
            source = "sidecar"
            command = "movenet"
            camera_index = 2

            [tracking]
            cooldown_ms = 1500.0
            "#,
        )
        .unwrap();
        assert_eq!(config.pose.source, SourceKind::Sidecar);
        assert_eq!(config.pose.command, "movenet");
        assert_eq!(config.pose.max_poses, 1);
        assert_eq!(config.tracking.cooldown_ms, 1500.0);
        assert_eq!(config.tracking.hold_frames, 8);
    }

    #[test]
    fn test_sidecar_args_request_single_pose() {
        let pose = PoseConfig::default();
        let args = pose.sidecar_args();
        let pos = args.iter().position(|a| a == "--max-poses").unwrap();
        assert_eq!(args[pos + 1], "1");
        let pos = args.iter().position(|a| a == "--score-threshold").unwrap();
        assert_eq!(args[pos + 1], "0.2");
        assert!(args.contains(&"--flip-horizontal".to_string()));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(Config::parse("[tracking]\nhold_frames = \"many\"").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::load_or_default("/definitely/not/here/drink_up.toml");
        assert_eq!(config.tracking.follow_rate, 0.18);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::parse(include_str!("../drink_up.toml")).unwrap();
        assert_eq!(config.pose.source, SourceKind::Simulated);
        assert_eq!(config.window.width, 1280.0);
        assert_eq!(config.rules.max_drinks, 8);
        assert_eq!(config.rules.accept_turn_end_ms, 2200.0);
    }
}
