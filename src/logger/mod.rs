//!
//! Centralized logging setup:
//! - console logging to stderr (stdout stays clean for program output)
//! - optional daily-rolling file logging when a log directory is configured
//! - retention sweep for old rolled files
//!

use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::{DEFAULT_LOG_RETENTION_DAYS, LOG_FILE_NAME};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Initialize the global subscriber.
///
/// # Arguments
/// * `level` - base log level (overridable via `SHELFDB_LOG`)
/// * `quiet` - suppress console output (file-only when a dir is given)
/// * `log_dir` - when set, also log to a daily-rolling file in this dir
pub fn init(level: LogLevel, quiet: bool, log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("SHELFDB_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("shelfdb={}", level.as_str())));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            cleanup_old_logs(dir, DEFAULT_LOG_RETENTION_DAYS)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);

            if quiet {
                registry
                    .with(fmt::layer().with_writer(file_appender).with_ansi(false))
                    .try_init()?;
            } else {
                registry
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(file_appender).with_ansi(false))
                    .try_init()?;
            }
        }
        None if quiet => {
            registry.try_init()?;
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

/// Remove rolled log files older than the retention period.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }
    let cutoff = Utc::now() - Duration::days(retention_days as i64);

    let mut removed = 0;
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_NAME) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let modified: chrono::DateTime<Utc> = modified.into();
        if modified < cutoff {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
    }

    if removed > 0 {
        tracing::debug!("removed {} expired log files", removed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("Debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("nope"), None);
    }

    #[test]
    fn test_log_level_as_str_roundtrip() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(LogLevel::parse(level.as_str()), Some(level));
        }
    }

    #[test]
    fn test_cleanup_keeps_recent_files() {
        let dir = TempDir::new().unwrap();

        let recent = dir.path().join(format!("{}.2099-01-01", LOG_FILE_NAME));
        let mut file = File::create(&recent).unwrap();
        writeln!(file, "recent").unwrap();

        let unrelated = dir.path().join("other.txt");
        let mut file = File::create(&unrelated).unwrap();
        writeln!(file, "unrelated").unwrap();

        cleanup_old_logs(dir.path(), 7).unwrap();

        // Freshly created files survive a 7-day retention sweep.
        assert!(recent.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(cleanup_old_logs(&missing, 7).is_ok());
    }
}
