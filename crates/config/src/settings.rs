// Session settings
// Loaded from ~/.config/celldsl/settings.toml (or .json)

use std::fs;
use std::path::{Path, PathBuf};

use celldsl_core::{presets, Coord, Style};
use celldsl_engine::SessionOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write TOML settings: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported settings file extension: {0}")]
    UnsupportedFormat(String),

    #[error("start cell ({row}, {col}) is outside the grid")]
    StartOutOfBounds { row: u32, col: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Row the cursor starts on.
    pub initial_row: u32,

    /// Column the cursor starts on.
    pub initial_col: u32,

    /// Allow different content to land on the same cell.
    pub overwrites_ok: bool,

    /// Worksheet name for file output.
    pub sheet_name: String,

    /// Base style every content style is layered on. Kept last so it
    /// serializes as a trailing TOML table.
    pub default_style: Style,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_row: 0,
            initial_col: 0,
            overwrites_ok: false,
            sheet_name: "Sheet1".to_string(),
            default_style: presets::default_font(),
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse JSON settings. Lines starting with `//` are comments.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cleaned: String = text
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&cleaned)?)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&text)?,
            Some("json") => Self::from_json(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string())),
        };
        tracing::debug!(target: "celldsl.config", path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Load the user's settings file, or defaults when there is none.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if !path.exists() {
            tracing::debug!(target: "celldsl.config", path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Get the settings file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("celldsl")
            .join("settings.toml")
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write TOML settings, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        fs::write(path, self.to_toml()?).map_err(io)
    }

    pub fn start(&self) -> Result<Coord, ConfigError> {
        Coord::checked(i64::from(self.initial_row), i64::from(self.initial_col)).ok_or(
            ConfigError::StartOutOfBounds {
                row: self.initial_row,
                col: self.initial_col,
            },
        )
    }

    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        Ok(SessionOptions {
            start: self.start()?,
            overwrites_ok: self.overwrites_ok,
            default_style: self.default_style.clone(),
        })
    }
}

impl TryFrom<&Settings> for SessionOptions {
    type Error = ConfigError;

    fn try_from(settings: &Settings) -> Result<Self, Self::Error> {
        settings.session_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celldsl_core::StyleValue;

    #[test]
    fn test_defaults_match_session_defaults() {
        let options = Settings::default().session_options().unwrap();
        assert_eq!(options, SessionOptions::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
initial_row = 4
sheet_name = "Report"

[default_style]
font_name = "Arial"
font_size = 11
"#,
        )
        .unwrap();
        assert_eq!(settings.initial_row, 4);
        assert_eq!(settings.initial_col, 0);
        assert!(!settings.overwrites_ok);
        assert_eq!(settings.sheet_name, "Report");
        assert_eq!(settings.default_style.get("font_size"), Some(&StyleValue::Int(11)));
        assert_eq!(settings.start().unwrap(), Coord::new(4, 0));
    }

    #[test]
    fn test_json_with_comments() {
        let settings = Settings::from_json(
            r#"{
    // cursor
    "initial_col": 3,
    "overwrites_ok": true
}"#,
        )
        .unwrap();
        assert_eq!(settings.initial_col, 3);
        assert!(settings.overwrites_ok);
        assert_eq!(settings.default_style, presets::default_font());
    }

    #[test]
    fn test_start_out_of_bounds() {
        let settings = Settings {
            initial_col: 20_000,
            ..Settings::default()
        };
        assert!(matches!(
            settings.session_options(),
            Err(ConfigError::StartOutOfBounds { col: 20_000, .. })
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            initial_row: 2,
            sheet_name: "Out".into(),
            ..Settings::default()
        };
        let path = dir.path().join("nested").join("settings.toml");
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);

        let yaml = dir.path().join("settings.yaml");
        fs::write(&yaml, "initial_row: 1").unwrap();
        assert!(matches!(Settings::load(&yaml), Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Settings::load(&missing), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_bad_toml_is_reported() {
        let err = Settings::from_toml("initial_row = \"two\"").unwrap_err();
        assert!(err.to_string().starts_with("invalid TOML settings"));
    }
}
