use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{CanvasError, Result};

/// Top-level configuration structure for the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub placement: PlacementConfig,
    pub playback: PlaybackConfig,
}

impl EditorConfig {
    /// Reads a JSON configuration file. Missing sections fall back to
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Canvas and placement box must both have a finite, positive size.
    pub fn validate(&self) -> Result<()> {
        positive_size(self.canvas.width, self.canvas.height)?;
        positive_size(self.placement.max_width, self.placement.max_height)
    }
}

fn positive_size(width: f64, height: f64) -> Result<()> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(CanvasError::InvalidGeometry { width, height })
    }
}

/// Size of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Defaults applied to freshly uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Uploads larger than this box are shrunk to fit, keeping aspect ratio.
    pub max_width: f64,
    pub max_height: f64,
    pub default_start: f64,
    pub default_end: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_width: 400.0,
            max_height: 300.0,
            default_start: 0.0,
            default_end: 10.0,
        }
    }
}

/// Configuration of the playback cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_interval_ms: u64,
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_layout() {
        let config = EditorConfig::default();
        assert_eq!(config.canvas.width, 800.0);
        assert_eq!(config.placement.max_height, 300.0);
        assert_eq!(config.placement.default_end, 10.0);
        assert_eq!(config.playback.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config =
            EditorConfig::from_json(r#"{ "playback": { "tick_interval_ms": 250 } }"#).unwrap();
        assert_eq!(config.playback.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.canvas, CanvasConfig::default());
    }

    #[test]
    fn rejects_non_positive_boxes() {
        let err = EditorConfig::from_json(r#"{ "placement": { "max_width": -100 } }"#).unwrap_err();
        assert!(matches!(err, CanvasError::InvalidGeometry { .. }));
        assert!(EditorConfig::from_json(r#"{ "placement": { "max_height": 0 } }"#).is_err());
        assert!(EditorConfig::from_json(r#"{ "canvas": { "width": 0 } }"#).is_err());
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(EditorConfig::from_json("{ canvas: ").is_err());
    }
}
