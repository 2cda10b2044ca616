//! Application configuration loaded from TOML.
//!
//! Every field has a default, so an empty or partial file is valid.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub diagnostics: DiagnosticsSettings,
    pub render: RenderConfig,
}

/// `[window]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "vkchain".to_string(),
            resizable: true,
        }
    }
}

/// `[diagnostics]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsSettings {
    /// Request the Khronos validation layer.
    pub validation: bool,
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
        }
    }
}

/// `[render]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// RGBA clear color for the color attachment.
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.02, 0.02, 0.04, 1.0],
        }
    }
}

impl AppConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, using default configuration", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self
            .render
            .clear_color
            .iter()
            .any(|c| !(0.0..=1.0).contains(c))
        {
            return Err(Error::Config(format!(
                "clear_color components must lie in [0, 1], got {:?}",
                self.render.clear_color
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [window]
            width = 1280
            title = "demo"

            [diagnostics]
            validation = false
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "demo");
        assert!(config.window.resizable);
        assert!(!config.diagnostics.validation);
        assert_eq!(config.render, RenderConfig::default());
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let err = AppConfig::from_toml_str("[window]\nheight = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_clear_color_out_of_range_rejected() {
        let err =
            AppConfig::from_toml_str("[render]\nclear_color = [0.0, 2.0, 0.0, 1.0]\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AppConfig::from_toml_str("[window]\nfullscreen = true\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = Path::new("definitely/not/here/vkchain.toml");
        let config = AppConfig::load_or_default(path).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
