mod loader;
pub mod template;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;

pub use loader::{config_dir, config_path, load, symbol_cache_dir, try_load};

/// Longest custom icon path accepted, in UTF-16 code units (`MAX_PATH - 1`).
pub const MAX_CUSTOM_PATH: usize = 259;

/// Top-level configuration for static-icon.
///
/// Loaded from `~/.config/static-icon/config.toml`. Missing sections
/// fall back to defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which icon is forced onto explorer windows.
    pub icon: IconConfig,
    /// Debug symbol lookup for `taskbar.dll`.
    pub symbols: SymbolConfig,
    /// File logging.
    pub log: LogConfig,
    /// Problems corrected while loading, logged once logging is set up.
    #[serde(skip)]
    pub notices: Vec<String>,
}

/// The `[icon]` section as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    /// `"explorer"`, `"shell32"` or `"custom"`. Anything else means explorer.
    pub source: String,
    /// Path to a `.ico` file, used when `source = "custom"`.
    pub custom_path: String,
}

/// The `[symbols]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    /// DbgHelp search path. Empty means the Microsoft symbol server
    /// with a cache under the config directory.
    pub search_path: String,
}

/// Where the forced icon comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IconSource {
    /// Icon index 0 of `%WINDIR%\explorer.exe`.
    #[default]
    Explorer,
    /// Icon index 4 of `%SYSTEM32%\shell32.dll`.
    Shell32,
    /// A user supplied `.ico` file.
    Custom,
}

impl IconSource {
    /// Parses a setting value. Unknown or empty values fall back to
    /// [`IconSource::Explorer`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "shell32" => Self::Shell32,
            "custom" => Self::Custom,
            _ => Self::Explorer,
        }
    }

    /// Numeric source code used in log lines (0 explorer, 1 shell32, 2 custom).
    pub fn code(self) -> u8 {
        match self {
            Self::Explorer => 0,
            Self::Shell32 => 1,
            Self::Custom => 2,
        }
    }

    /// Icon resource index extracted from the system file.
    pub fn resource_index(self) -> i32 {
        match self {
            Self::Shell32 => 4,
            Self::Explorer | Self::Custom => 0,
        }
    }
}

/// Immutable snapshot consumed by the icon store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSettings {
    pub source: IconSource,
    pub custom_path: String,
}

impl Config {
    /// Normalizes values after parsing.
    ///
    /// Unknown icon sources become `"explorer"` and custom paths that
    /// would not fit a `MAX_PATH` buffer are dropped, with a notice.
    pub fn validate(&mut self) {
        let source = IconSource::parse(&self.icon.source);
        self.icon.source = match source {
            IconSource::Explorer => "explorer",
            IconSource::Shell32 => "shell32",
            IconSource::Custom => "custom",
        }
        .into();

        self.icon.custom_path = self.icon.custom_path.trim().to_string();
        if self.icon.custom_path.encode_utf16().count() > MAX_CUSTOM_PATH {
            self.notices.push(format!(
                "custom_path is longer than {MAX_CUSTOM_PATH} characters, ignoring it"
            ));
            self.icon.custom_path.clear();
        }

        self.log.max_file_mb = self.log.max_file_mb.clamp(1, 100);
    }

    /// Returns the icon settings snapshot for the store.
    pub fn icon_settings(&self) -> IconSettings {
        IconSettings {
            source: IconSource::parse(&self.icon.source),
            custom_path: self.icon.custom_path.clone(),
        }
    }
}
