//! Configuration management for label-unwrap

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::Point;
use crate::grid::GridSettings;
use crate::landmarks::{CoordinateMode, Landmarks};

/// Landmark points as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkConfig {
    /// Whether `points` are pixels or fractions of the image size
    #[serde(default)]
    pub mode: CoordinateMode,

    /// Six points ordered A..F: top-left, top apex, top-right,
    /// bottom-right, bottom apex, bottom-left
    pub points: Vec<Point>,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            mode: CoordinateMode::Percent,
            points: vec![
                Point::new(0.1, 0.1),   // A top-left
                Point::new(0.5, 0.05),  // B top apex
                Point::new(0.9, 0.1),   // C top-right
                Point::new(0.9, 0.9),   // D bottom-right
                Point::new(0.5, 0.95),  // E bottom apex
                Point::new(0.1, 0.9),   // F bottom-left
            ],
        }
    }
}

impl LandmarkConfig {
    /// Resolve to pixel landmarks for an image of the given size
    pub fn resolve(&self, width: u32, height: u32) -> crate::Result<Landmarks> {
        Landmarks::from_mode(self.mode, &self.points, width, height)
    }
}

/// Output and debug drawing colors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// RGBA fill for canvas pixels that map outside the photograph
    #[serde(default = "default_border")]
    pub border: [u8; 4],

    /// Mesh and polygon overlay color
    #[serde(default = "default_overlay_color")]
    pub overlay_color: [u8; 3],

    /// Contour color
    #[serde(default = "default_mask_color")]
    pub mask_color: [u8; 3],
}

fn default_border() -> [u8; 4] {
    [0, 0, 0, 0]
}

fn default_overlay_color() -> [u8; 3] {
    [255, 0, 0]
}

fn default_mask_color() -> [u8; 3] {
    [255, 255, 255]
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            border: default_border(),
            overlay_color: default_overlay_color(),
            mask_color: default_mask_color(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub landmarks: LandmarkConfig,

    #[serde(default)]
    pub grid: GridSettings,

    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration if a path is given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("No configuration file given, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.landmarks.points.len(), 6);
        assert_eq!(config.landmarks.mode, CoordinateMode::Percent);
        assert_eq!(config.grid, GridSettings::new(30, 20));
        assert_eq!(config.render.border, [0, 0, 0, 0]);
    }

    #[test]
    fn test_resolve_default_landmarks() {
        let landmarks = Config::default().landmarks.resolve(400, 300).unwrap();
        assert_eq!(landmarks.b(), Point::new(200.0, 15.0));
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [grid]
            columns = 12

            [landmarks]
            mode = "pixel"
            points = [
                { x = 10.0, y = 10.0 },
                { x = 50.0, y = 5.0 },
                { x = 90.0, y = 10.0 },
                { x = 90.0, y = 90.0 },
                { x = 50.0, y = 95.0 },
                { x = 10.0, y = 90.0 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.grid, GridSettings::new(12, 20));
        assert_eq!(config.landmarks.mode, CoordinateMode::Pixel);
        assert_eq!(config.render.overlay_color, [255, 0, 0]);

        let landmarks = config.landmarks.resolve(1000, 1000).unwrap();
        assert_eq!(landmarks.e(), Point::new(50.0, 95.0));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("label-unwrap-{}", std::process::id()))
            .join("config.toml");

        let mut config = Config::default();
        config.grid = GridSettings::new(16, 9);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.grid, GridSettings::new(16, 9));
        assert_eq!(loaded.landmarks.points, config.landmarks.points);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("label-unwrap-does-not-exist.toml");
        assert!(Config::load(&path).is_err());
        assert!(Config::load_or_default(None).is_ok());
    }
}
