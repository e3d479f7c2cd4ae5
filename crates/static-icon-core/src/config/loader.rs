use std::path::PathBuf;

use super::Config;

/// Returns the config directory: `~/.config/static-icon/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("static-icon"))
}

/// Returns the config file path: `~/.config/static-icon/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Returns the local PDB cache used by the default symbol search path.
pub fn symbol_cache_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("symbols"))
}

/// Tries to load and parse `config.toml`.
///
/// Returns `Ok(Config)` on success, or an error string describing
/// what went wrong (IO error, parse error, etc.).
pub fn try_load() -> Result<Config, String> {
    let path = config_path().ok_or("could not determine config path")?;
    let content = std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    parse(&content).map_err(|e| format!("{}: {e}", path.display()))
}

/// Parses and validates config text.
pub(crate) fn parse(content: &str) -> Result<Config, String> {
    let mut config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
    config.validate();
    Ok(config)
}

/// Loads the configuration from disk, falling back to defaults.
///
/// A missing file silently yields defaults; any other failure also
/// yields defaults, with the error kept in [`Config::notices`] so the
/// icon source is never left undetermined.
pub fn load() -> Config {
    match try_load() {
        Ok(config) => config,
        Err(e) if is_file_not_found(&e) => default_config(),
        Err(e) => {
            let mut config = default_config();
            config.notices.push(format!("{e}, using defaults"));
            config
        }
    }
}

fn default_config() -> Config {
    let mut config = Config::default();
    config.validate();
    config
}

/// Returns true if the error message indicates a missing file.
fn is_file_not_found(e: &str) -> bool {
    e.contains("cannot find the path")
        || e.contains("The system cannot find")
        || e.contains("No such file")
}
