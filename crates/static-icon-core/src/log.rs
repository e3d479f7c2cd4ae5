//! File-based logger with size-based rotation.
//!
//! Logs are written to `~/.config/static-icon/logs/static-icon.log`.
//! When the file exceeds the configured max size it is rotated to
//! `static-icon.log.1` (one backup kept).
//!
//! The logger lives inside a host process, so it can be reconfigured
//! on every settings reload and closed on unload. Every line carries
//! the id of the writing thread since the hooks run on shell threads.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

const LOG_FILE_NAME: &str = "static-icon.log";
const BACKUP_FILE_NAME: &str = "static-icon.log.1";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether file logging is enabled. Defaults to `false`.
    pub enabled: bool,
    /// Minimum log level: "debug", "info", "warn", or "error".
    pub level: String,
    /// Maximum log file size in megabytes before rotation.
    pub max_file_mb: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".into(),
            max_file_mb: 10,
        }
    }
}

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

struct Logger {
    file: File,
    dir: PathBuf,
    min_level: Level,
    max_bytes: u64,
    written: u64,
}

/// (Re)configures the global logger from `config`.
///
/// Disabling logging closes the current file. Safe to call on every
/// settings reload.
pub fn init(config: &LogConfig) {
    let logger = if config.enabled {
        crate::config::config_dir().and_then(|dir| Logger::open(&dir.join("logs"), config))
    } else {
        None
    };
    if let Ok(mut slot) = LOGGER.lock() {
        *slot = logger;
    }
}

/// Flushes and closes the log file. Called when the module unloads.
pub fn shutdown() {
    if let Ok(mut slot) = LOGGER.lock()
        && let Some(mut logger) = slot.take()
    {
        let _ = logger.file.flush();
    }
}

/// Writes a log line if the level is at or above the configured minimum.
pub fn write(level: Level, args: fmt::Arguments<'_>) {
    let Ok(mut slot) = LOGGER.lock() else {
        return;
    };
    let Some(logger) = slot.as_mut() else {
        return;
    };
    if level < logger.min_level {
        return;
    }
    let line = format_line(&timestamp(), level, args);
    let bytes = line.len() as u64;

    let _ = logger.file.write_all(line.as_bytes());
    logger.written += bytes;

    if logger.max_bytes > 0 && logger.written >= logger.max_bytes {
        logger.rotate();
    }
}

fn format_line(now: &str, level: Level, args: fmt::Arguments<'_>) -> String {
    let thread = std::thread::current().id();
    format!("{now} [{lvl}] {thread:?} {args}\n", lvl = level.as_str())
}

impl Logger {
    fn open(dir: &Path, config: &LogConfig) -> Option<Self> {
        fs::create_dir_all(dir).ok()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE_NAME))
            .ok()?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Some(Self {
            file,
            dir: dir.to_path_buf(),
            min_level: Level::parse(&config.level),
            max_bytes: config.max_file_mb * 1024 * 1024,
            written,
        })
    }

    fn rotate(&mut self) {
        let path = self.dir.join(LOG_FILE_NAME);
        let _ = fs::rename(&path, self.dir.join(BACKUP_FILE_NAME));
        if let Ok(f) = OpenOptions::new().create(true).append(true).open(&path) {
            self.file = f;
        }
        self.written = 0;
    }
}

fn timestamp() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let millis = dur.subsec_millis();
    let (h, m, s) = (secs / 3600 % 24, secs / 60 % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}.{millis:03}")
}

/// Logs at DEBUG level.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Debug, format_args!($($arg)*)) };
}

/// Logs at INFO level.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Info, format_args!($($arg)*)) };
}

/// Logs at WARN level.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Warn, format_args!($($arg)*)) };
}

/// Logs at ERROR level.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Error, format_args!($($arg)*)) };
}
