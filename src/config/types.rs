// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    /// Static mounts, matched in order
    #[serde(default = "default_static_mounts")]
    pub static_mounts: Vec<StaticMount>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Upper bound on handling one request, body included, in seconds
    pub request_timeout: u64,
    /// Seconds to wait for the next request's headers on an open connection
    #[serde(default = "default_keep_alive_timeout")]
    pub keep_alive_timeout: u64,
}

const fn default_keep_alive_timeout() -> u64 {
    5
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Largest JSON body accepted by `/save-settings`
    pub json_limit: u64,
    /// Optional cap on any request body, checked against `Content-Length`
    #[serde(default)]
    pub max_body_size: Option<u64>,
}

/// Where uploaded models and the settings document live
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub upload_dir: String,
    /// URL prefix under which uploads are reachable, empty for the site root
    #[serde(default)]
    pub public_prefix: String,
    pub settings_file: String,
    /// Write through a temporary sibling and rename into place
    #[serde(default = "default_atomic_writes")]
    pub atomic_writes: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_atomic_writes() -> bool {
    true
}

/// A directory served under a URL prefix
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StaticMount {
    pub prefix: String,
    pub dir: String,
}

impl StaticMount {
    pub fn new(prefix: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            dir: dir.into(),
        }
    }

    /// Strip the mount prefix from `path`, or `None` if the mount does not apply
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(prefix) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

fn default_static_mounts() -> Vec<StaticMount> {
    vec![StaticMount::new("/", ".")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_mount_matches_everything() {
        let mount = StaticMount::new("/", ".");
        assert_eq!(mount.strip("/index.html"), Some("/index.html"));
        assert_eq!(mount.strip("/"), Some("/"));
    }

    #[test]
    fn test_prefix_mount() {
        let mount = StaticMount::new("/models", "backend");
        assert_eq!(mount.strip("/models/a.bin"), Some("/a.bin"));
        assert_eq!(mount.strip("/models"), Some("/"));
        assert_eq!(mount.strip("/models/"), Some("/"));
        assert_eq!(mount.strip("/modelsx/a.bin"), None);
        assert_eq!(mount.strip("/other"), None);
    }

    #[test]
    fn test_trailing_slash_prefix() {
        let mount = StaticMount::new("/models/", "backend");
        assert_eq!(mount.strip("/models/a.bin"), Some("/a.bin"));
    }
}
