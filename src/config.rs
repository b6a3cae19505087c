use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::color::Palette;
use crate::layout::LayoutEngine;
use crate::measure::TextMetrics;
use crate::routing::RoutingEngine;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    MissingFile(PathBuf),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Tunables for layout, routing, text measurement and colors.
///
/// Every section is optional; missing values fall back to the defaults.
///
/// ```toml
/// palette = ["#f00", "#0f0"]
///
/// [layout]
/// gap = 96
///
/// [routing]
/// padding = 24
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub layout: LayoutEngine,
    pub routing: RoutingEngine,
    pub metrics: TextMetrics,
    pub palette: Palette,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path:? = path; "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml_str(
            r##"
palette = ["#123", "#456", "#789"]

[layout]
gap = 96

[routing]
padding = 24
default_color = "#000"
"##,
        )
        .unwrap();

        assert_approx_eq!(f64, config.layout.gap, 96.0);
        assert_approx_eq!(f64, config.layout.margin_x, 64.0);
        assert_approx_eq!(f64, config.routing.padding, 24.0);
        assert_approx_eq!(f64, config.routing.marker_height, 10.0);
        assert_eq!(config.routing.default_color, "#000");
        assert_eq!(config.palette.colors().len(), 3);
        assert_eq!(config.metrics, TextMetrics::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::from_toml_str("[layout]\ngap = \"wide\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::MissingFile(p)) if p == path
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("erdlink.toml");
        fs::write(&path, "[metrics]\nchar_width = 7.5\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_approx_eq!(f64, config.metrics.char_width, 7.5);
    }
}
