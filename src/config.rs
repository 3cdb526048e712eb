//! Configuration management for session-relay.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::datasource::SeedUser;
use crate::shutdown::{ShutdownConfig, DEFAULT_FAILURE_EXIT_DELAY};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Logging configuration.
    pub logging: LoggingSection,
    /// Shutdown coordinator settings.
    pub shutdown: ShutdownSection,
    /// In-memory data source contents.
    pub datasource: DataSourceSection,
}

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
    /// Close sessions with no heartbeat for this many seconds. Unset (the
    /// default) keeps sessions until their transport closes them.
    pub idle_session_secs: Option<u64>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
            idle_session_secs: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive (`info`, `session_relay=debug`, ...). Unset falls
    /// back to `RUST_LOG` and then to `session_relay=info`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Shutdown configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownSection {
    /// Milliseconds to wait before exiting with a failure code.
    pub failure_exit_delay_ms: u64,
    /// Per-job time limit in seconds; unset means no limit.
    pub job_timeout_secs: Option<u64>,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            failure_exit_delay_ms: DEFAULT_FAILURE_EXIT_DELAY.as_millis() as u64,
            job_timeout_secs: None,
        }
    }
}

/// Data source configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceSection {
    /// Users registered at startup.
    pub users: Vec<SeedUser>,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SESSION_RELAY_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("SESSION_RELAY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Some(level) = var("SESSION_RELAY_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = Some(level);
        }

        if let Some(secs) = var("SESSION_RELAY_IDLE_SESSION_SECS") {
            if let Ok(secs) = secs.parse() {
                self.server.idle_session_secs = Some(secs);
            }
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if args.no_graceful_shutdown {
            self.server.graceful_shutdown = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = Some(level.clone());
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let server_config = ServerConfig::new(host.to_string(), self.server.port);
        if self.server.graceful_shutdown {
            Ok(server_config)
        } else {
            Ok(server_config.without_graceful_shutdown())
        }
    }

    pub fn to_shutdown_config(&self) -> ShutdownConfig {
        ShutdownConfig {
            failure_exit_delay: Duration::from_millis(self.shutdown.failure_exit_delay_ms),
            job_timeout: self.shutdown.job_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Users to seed the in-memory data source with.
    pub fn seed_users(&self) -> Vec<SeedUser> {
        self.datasource.users.clone()
    }

    /// Get the log filter directive, if one was configured.
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.level.as_deref()
    }

    /// Idle limit after which sessions are reaped, if enabled.
    pub fn idle_session_limit(&self) -> Option<Duration> {
        self.server
            .idle_session_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.graceful_shutdown);
        assert_eq!(config.shutdown.failure_exit_delay_ms, 100);
        assert!(config.shutdown.job_timeout_secs.is_none());
        assert!(config.datasource.users.is_empty());
        assert!(config.idle_session_limit().is_none());
    }

    #[test]
    fn test_log_level_unset_by_default() {
        let mut config = Config::default();
        assert_eq!(config.log_filter(), None);

        config.apply_env_from(|_| None);
        config.apply_args(&Args::default());
        assert_eq!(config.log_filter(), None);

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("\"level\""));
    }

    #[test]
    fn test_idle_session_limit() {
        let file = write_config(r#"{ "server": { "idle_session_secs": 90 } }"#);
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.idle_session_limit(), Some(Duration::from_secs(90)));

        let mut config = Config::default();
        config.apply_env_from(|k| match k {
            "SESSION_RELAY_IDLE_SESSION_SECS" => Some("30".into()),
            _ => None,
        });
        assert_eq!(config.idle_session_limit(), Some(Duration::from_secs(30)));

        config.server.idle_session_secs = Some(0);
        assert!(config.idle_session_limit().is_none());
    }

    #[test]
    fn test_config_from_json() {
        let file = write_config(
            r#"{
                "server": { "host": "0.0.0.0", "port": 8080 },
                "shutdown": { "job_timeout_secs": 5 },
                "datasource": {
                    "users": [
                        { "id": "alice", "password": "pw", "permissions": "admin" },
                        { "id": "bob", "password": "pw2" }
                    ]
                }
            }"#,
        );

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.shutdown.job_timeout_secs, Some(5));
        assert_eq!(config.shutdown.failure_exit_delay_ms, 100);

        let users = config.seed_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].permissions, "admin");
        assert_eq!(users[1].permissions, "");
    }

    #[test]
    fn test_config_partial_json() {
        let file = write_config(r#"{ "server": { "port": 9000 } }"#);

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1"); // Default
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_config_bad_json() {
        let file = write_config("{ server: ");
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/session-relay.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("SESSION_RELAY_HOST", "10.0.0.1"),
            ("SESSION_RELAY_PORT", "not-a-port"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.log_filter(), Some("debug"));
    }

    #[test]
    fn test_relay_log_level_beats_rust_log() {
        let mut config = Config::default();
        config.apply_env_from(|k| match k {
            "SESSION_RELAY_LOG_LEVEL" => Some("warn".into()),
            "RUST_LOG" => Some("trace".into()),
            _ => None,
        });
        assert_eq!(config.log_filter(), Some("warn"));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.server.port = 4000;

        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            no_graceful_shutdown: true,
            log_level: Some("trace".into()),
            ..Args::default()
        };
        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000); // untouched
        assert!(!config.server.graceful_shutdown);
        assert_eq!(config.log_filter(), Some("trace"));
    }

    #[test]
    fn test_load_args_override_file() {
        let file = write_config(r#"{ "server": { "port": 9000 } }"#);
        let args = Args {
            config: Some(file.path().to_path_buf()),
            port: Some(9100),
            ..Args::default()
        };

        let config = Config::load(&args).unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_to_server_config() {
        let config = Config::default();
        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 3000);
        assert!(server_config.graceful_shutdown);
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();

        let result = config.to_server_config();
        assert!(matches!(result, Err(ConfigError::InvalidHost(h)) if h == "not-an-ip"));
    }

    #[test]
    fn test_to_shutdown_config() {
        let mut config = Config::default();
        assert_eq!(config.to_shutdown_config(), ShutdownConfig::default());

        config.shutdown.failure_exit_delay_ms = 0;
        config.shutdown.job_timeout_secs = Some(3);
        let shutdown = config.to_shutdown_config();
        assert_eq!(shutdown.failure_exit_delay, Duration::ZERO);
        assert_eq!(shutdown.job_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"host\""));
        assert!(json.contains("\"failure_exit_delay_ms\""));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
