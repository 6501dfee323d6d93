//! Logger module
//!
//! Logging utilities for the file server:
//! - Server lifecycle logging
//! - Access logging in several formats
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Most verbose level currently written
static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Severity filter for `[INFO]` and `[WARN]` lines
///
/// Errors, the startup banner and access logs are always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
}

impl LogLevel {
    /// `debug` and `trace` have nothing extra to show and behave like `info`
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" | "debug" | "trace" => Some(Self::Info),
            _ => None,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Error,
            1 => Self::Warn,
            _ => Self::Info,
        }
    }
}

pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

fn enabled(level: LogLevel) -> bool {
    level <= max_level()
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup. Until then every line goes
/// to stdout/stderr at `info` level.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )?;
    match LogLevel::parse(&config.logging.level) {
        Some(level) => set_max_level(level),
        None => log_warning(&format!(
            "Unknown log level '{}', using info",
            config.logging.level
        )),
    }
    Ok(())
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info(&format!("Server running at http://localhost:{}", addr.port()));
    write_info(&format!("[CONFIG] Listening on: {addr}"));
    write_info(&format!("[CONFIG] Log level: {}", config.logging.level));
    write_info(&format!(
        "[CONFIG] Upload directory: {} (served at '{}')",
        config.storage.upload_dir,
        if config.storage.public_prefix.is_empty() {
            "/"
        } else {
            &config.storage.public_prefix
        }
    ));
    write_info(&format!(
        "[CONFIG] Settings file: {}",
        config.storage.settings_file
    ));
    for mount in &config.static_mounts {
        write_info(&format!("[CONFIG] Static: {} -> {}", mount.prefix, mount.dir));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("[CONFIG] Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("[CONFIG] Error log: {path}"));
    }
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    if enabled(LogLevel::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_info(message: &str) {
    if enabled(LogLevel::Info) {
        write_info(&format!("[INFO] {message}"));
    }
}

/// Log an error together with its `source()` chain
pub fn log_error_chain(context: &str, err: &(dyn std::error::Error + 'static)) {
    let mut message = format!("{context}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n    caused by: {cause}"));
        source = cause.source();
    }
    log_error(&message);
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    match writer::get() {
        Some(w) => w.write_access(&entry.format(format)),
        None => println!("{}", entry.format(format)),
    }
}

pub fn log_shutdown(signal: &str) {
    write_info(&format!("[SIGNAL] {signal} received, shutting down"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_level_ordering_filters_less_severe() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        for level in [LogLevel::Error, LogLevel::Warn, LogLevel::Info] {
            assert_eq!(LogLevel::from_u8(level as u8), level);
        }
    }
}
