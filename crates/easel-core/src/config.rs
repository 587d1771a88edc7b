//! Editor configuration.

use crate::plugins::copy::CopyOptions;
use crate::plugins::ruler::RulerOptions;
use crate::plugins::workspace::WorkspaceOptions;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Options for the editor and the built-in plugins. Missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Size of the element hosting the canvas.
    pub container: Size,
    pub workspace: WorkspaceOptions,
    pub copy: CopyOptions,
    pub ruler: RulerOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            container: Size::new(1280.0, 800.0),
            workspace: WorkspaceOptions::default(),
            copy: CopyOptions::default(),
            ruler: RulerOptions::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::debug!("loaded config from {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::ruler::Units;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EditorConfig::from_json(
            r#"{ "workspace": { "dpi": 300, "width": 2480 }, "ruler": { "units": "inches" } }"#,
        )
        .unwrap();
        assert_eq!(config.workspace.dpi, 300.0);
        assert_eq!(config.workspace.width, 2480.0);
        assert_eq!(config.workspace.height, WorkspaceOptions::default().height);
        assert_eq!(config.ruler.units, Units::Inches);
        assert_eq!(config.container, EditorConfig::default().container);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "workspace": 3 }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EditorConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
