// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StaticMount,
    StorageConfig,
};

/// Default config file (extension resolved by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Prefix for environment overrides, e.g. `MODEL_SERVER__SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "MODEL_SERVER";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; environment variables override it and built-in
    /// defaults fill the rest.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.request_timeout", 300)?
            .set_default("performance.keep_alive_timeout", 5)?
            .set_default("http.json_limit", 102_400)? // 100KB
            .set_default("storage.upload_dir", ".")?
            .set_default("storage.public_prefix", "")?
            .set_default("storage.settings_file", "settings.json")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                workers: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: true,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                request_timeout: 300,
                keep_alive_timeout: 5,
            },
            http: HttpConfig {
                json_limit: 102_400,
                max_body_size: None,
            },
            storage: StorageConfig {
                upload_dir: ".".to_string(),
                public_prefix: String::new(),
                settings_file: "settings.json".to_string(),
                atomic_writes: true,
            },
            static_mounts: vec![StaticMount::new("/", ".")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.storage.settings_file, "settings.json");
        assert_eq!(cfg.storage.public_prefix, "");
        assert!(cfg.storage.atomic_writes);
        assert_eq!(cfg.static_mounts, vec![StaticMount::new("/", ".")]);
        assert_eq!(cfg.http.json_limit, 102_400);
        assert_eq!(cfg.http.max_body_size, None);
        assert_eq!(cfg.performance.request_timeout, 300);
        assert_eq!(cfg.performance.keep_alive_timeout, 5);
    }

    #[test]
    fn test_backend_layout_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[storage]
upload_dir = "backend"
public_prefix = "/models"
settings_file = "backend/model-info.json"

[[static_mounts]]
prefix = "/"
dir = "frontend"

[[static_mounts]]
prefix = "/models"
dir = "backend"
"#
        )
        .unwrap();

        let stem = dir.path().join("server");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.storage.public_prefix, "/models");
        assert_eq!(cfg.storage.settings_file, "backend/model-info.json");
        assert_eq!(cfg.static_mounts.len(), 2);
        assert_eq!(cfg.static_mounts[1], StaticMount::new("/models", "backend"));
        // Untouched sections keep their defaults
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::default();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 3000);

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(bad.get_socket_addr().is_err());
    }
}
