//! File-based diagnostics log
//!
//! Appends one line per record to a file. Useful because the bridge runs as a
//! child process of the MCP client and its stderr is often invisible.
//! Write failures are swallowed: diagnostics must never break the bridge.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

use super::traits::Logger;

/// Environment variable selecting the minimum level written to the file
pub const LOG_LEVEL_ENV: &str = "CODEX_NVIM_LOG_LEVEL";

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// Parse a level name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn from_env() -> Self {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(LogLevel::Info)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only file logger
///
/// The file (and its parent directory) is created on first write. If opening
/// fails, the next write tries again.
pub struct FileLogger {
    path: PathBuf,
    min_level: LogLevel,
    file: Mutex<Option<File>>,
}

impl FileLogger {
    /// Create a logger for `path`, taking the level from `CODEX_NVIM_LOG_LEVEL`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_level(path, LogLevel::from_env())
    }

    /// Create a logger with an explicit minimum level
    pub fn with_level(path: impl Into<PathBuf>, min_level: LogLevel) -> Self {
        Self {
            path: path.into(),
            min_level,
            file: Mutex::new(None),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Option<File> {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .ok()
    }

    /// Write a record at the given level
    pub fn write(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut guard = self.file.lock();
        if guard.is_none() {
            *guard = self.open();
        }
        if let Some(file) = guard.as_mut() {
            let written = writeln!(file, "{} [{}] {}", timestamp, level, message)
                .and_then(|_| file.flush());
            if written.is_err() {
                // Drop the handle so the next record reopens the file
                *guard = None;
            }
        }
    }
}

impl std::fmt::Debug for FileLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogger")
            .field("path", &self.path)
            .field("min_level", &self.min_level)
            .finish()
    }
}

impl Logger for FileLogger {
    fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }
}
