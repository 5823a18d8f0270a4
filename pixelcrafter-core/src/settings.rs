//! # Settings
//!
//! User defaults, kept as TOML in the platform preferences directory. Missing keys take their
//! default values, and a file that can't be read or parsed falls back to defaults entirely.

use crate::{color::Color, tools::brush::BrushSettings};

const DOCUMENTATION: &str = r##"# PixelCrafter settings. You may edit this file, but be aware that formatting and comments will
# not be preserved. Keys left out take their default values.

# [canvas]       size and background color of new documents, colors as "#RRGGBB" or "#RRGGBBAA".
# [brush]        size (pixels), hardness, opacity and spacing (0 to 1), color, angle (degrees)
#                and roundness (0 to 1, 1 is a circle).
# [history]      max_undo_steps, how many edits can be undone.
# [export]       format (file extension) of flattened images, and whether the document name
#                and metadata are written into them.

"##;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push("pixelcrafter");
    Some(base_dir)
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("no preferences directory found")]
    NoPreferencesDir,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    pub background: Color,
}
impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            background: Color::rgb(0x80, 0x80, 0x80),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_undo_steps: usize,
}
impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_undo_steps: crate::history::DEFAULT_MAX_STATES,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// File extension of the default export format.
    pub format: String,
    /// Carry the document name and metadata into exported files.
    pub preserve_metadata: bool,
}
impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: "png".to_owned(),
            preserve_metadata: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub canvas: CanvasSettings,
    pub brush: BrushSettings,
    pub history: HistorySettings,
    pub export: ExportSettings,
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";

    /// Path of the user's settings file, if the platform has a preferences directory.
    #[must_use]
    pub fn path() -> Option<std::path::PathBuf> {
        let mut path = preferences_dir()?;
        path.push(Self::FILENAME);
        Some(path)
    }
    /// The user's settings, or defaults if unavailable for any reason.
    #[must_use]
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                log::warn!("No preferences directory, using default settings.");
                Self::default()
            }
        }
    }
    /// Settings from `path`. A missing file is silently defaulted, other failures are logged.
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match Self::read(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults.", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("Failed to load settings from {}: {err}", path.display());
                Self::default()
            }
        }
    }
    pub fn read(path: &std::path::Path) -> Result<Self, SettingsError> {
        let string = std::fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(string)?)
    }
    /// TOML with a documentation header.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?)
    }
    /// Write to the user's settings file. Returns where it was written.
    pub fn save(&self) -> Result<std::path::PathBuf, SettingsError> {
        let preferences = preferences_dir().ok_or(SettingsError::NoPreferencesDir)?;
        // Not recursive. If the parent is missing, the user probably has a good reason.
        // Errors here (such as already existing) surface from the write below.
        let _ = std::fs::DirBuilder::new().create(&preferences);
        let path = preferences.join(Self::FILENAME);
        self.write(&path)?;
        Ok(path)
    }
    pub fn write(&self, path: &std::path::Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
