#![deny(unsafe_code)]

//! Configuration loading and validation for tincinfo.
//!
//! Loads TOML configuration files describing which tinc network to query and
//! how the control channel behaves. [`AppConfig`] is the central structure;
//! it also derives the daemon's pid file and control socket paths from the
//! network name and run directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which daemon instance to talk to.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Control channel behaviour.
    #[serde(default)]
    pub control: ControlConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Location of the daemon's runtime files.
///
/// The pid file and control socket live at
/// `<rundir>/<binary>.<netname>.pid` and `<rundir>/<binary>.<netname>.socket`
/// unless overridden explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// tinc network name (the `-n` argument the daemon was started with).
    #[serde(default = "default_netname")]
    pub netname: String,

    /// Directory holding the daemon's pid file and control socket.
    #[serde(default = "default_rundir")]
    pub rundir: PathBuf,

    /// Daemon binary name used as the file name prefix.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Explicit pid file path, bypassing the naming convention.
    #[serde(default)]
    pub pid_file: Option<PathBuf>,

    /// Explicit control socket path, bypassing the naming convention.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            netname: default_netname(),
            rundir: default_rundir(),
            binary: default_binary(),
            pid_file: None,
            socket_path: None,
        }
    }
}

fn default_netname() -> String {
    "vpn".to_string()
}

fn default_rundir() -> PathBuf {
    PathBuf::from("/var/run")
}

fn default_binary() -> String {
    "tinc".to_string()
}

/// Control channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Socket read timeout in milliseconds. A read that times out ends the
    /// current response, so this is also the minimum latency of every request.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Size of each chunk read from the socket.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Reconnect and retry once when a request hits a transport error.
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,

    /// Attempts per reconnect before giving up.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            buffer_size: default_buffer_size(),
            reconnect: default_reconnect(),
            reconnect_attempts: default_reconnect_attempts(),
        }
    }
}

impl ControlConfig {
    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn default_read_timeout_ms() -> u64 {
    600
}

fn default_buffer_size() -> usize {
    16
}

fn default_reconnect() -> bool {
    true
}

fn default_reconnect_attempts() -> u32 {
    3
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = content.len(), "Loaded config file");
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.netname.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.netname must not be empty".to_string(),
            ));
        }
        if self.daemon.netname.contains('/') {
            return Err(ConfigError::Validation(format!(
                "daemon.netname must not contain '/', got {:?}",
                self.daemon.netname
            )));
        }
        if self.daemon.binary.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.binary must not be empty".to_string(),
            ));
        }
        if self.daemon.rundir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "daemon.rundir must not be empty".to_string(),
            ));
        }

        if self.control.read_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "control.read_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.control.buffer_size == 0 {
            return Err(ConfigError::Validation(
                "control.buffer_size must be non-zero".to_string(),
            ));
        }
        if self.control.reconnect_attempts == 0 {
            return Err(ConfigError::Validation(
                "control.reconnect_attempts must be at least 1".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }

    /// Path of the daemon's pid file (holds the control cookie).
    pub fn pid_file_path(&self) -> PathBuf {
        self.daemon
            .pid_file
            .clone()
            .unwrap_or_else(|| self.runtime_file("pid"))
    }

    /// Path of the daemon's control socket.
    pub fn socket_path(&self) -> PathBuf {
        self.daemon
            .socket_path
            .clone()
            .unwrap_or_else(|| self.runtime_file("socket"))
    }

    fn runtime_file(&self, extension: &str) -> PathBuf {
        self.daemon.rundir.join(format!(
            "{}.{}.{extension}",
            self.daemon.binary, self.daemon.netname
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.daemon.netname, "vpn");
        assert_eq!(config.daemon.rundir, PathBuf::from("/var/run"));
        assert_eq!(config.control.read_timeout_ms, 600);
        assert_eq!(config.control.buffer_size, 16);
        assert!(config.control.reconnect);
        assert_eq!(config.control.reconnect_attempts, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.control.read_timeout(), Duration::from_millis(600));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [daemon]
            netname = "backbone"
            rundir = "/run"
            binary = "tincd"

            [control]
            read_timeout_ms = 250
            buffer_size = 4096
            reconnect = false
            reconnect_attempts = 5

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.daemon.netname, "backbone");
        assert_eq!(config.control.read_timeout_ms, 250);
        assert_eq!(config.control.buffer_size, 4096);
        assert!(!config.control.reconnect);
        assert_eq!(config.control.reconnect_attempts, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.pid_file_path(),
            PathBuf::from("/run/tincd.backbone.pid")
        );
        assert_eq!(
            config.socket_path(),
            PathBuf::from("/run/tincd.backbone.socket")
        );
    }

    #[test]
    fn test_default_paths_follow_naming_convention() {
        let config = AppConfig::default();
        assert_eq!(config.pid_file_path(), PathBuf::from("/var/run/tinc.vpn.pid"));
        assert_eq!(
            config.socket_path(),
            PathBuf::from("/var/run/tinc.vpn.socket")
        );
    }

    #[test]
    fn test_explicit_paths_override_convention() {
        let toml = r#"
            [daemon]
            pid_file = "/tmp/custom.pid"
            socket_path = "/tmp/custom.sock"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.pid_file_path(), PathBuf::from("/tmp/custom.pid"));
        assert_eq!(config.socket_path(), PathBuf::from("/tmp/custom.sock"));
    }

    #[test]
    fn test_validation_rejects_empty_netname() {
        let toml = r#"
            [daemon]
            netname = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_netname_with_slash() {
        let toml = r#"
            [daemon]
            netname = "../etc"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let toml = r#"
            [control]
            read_timeout_ms = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_buffer() {
        let toml = r#"
            [control]
            buffer_size = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let toml = r#"
            [control]
            reconnect_attempts = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::parse(&text).unwrap();
        assert_eq!(parsed.daemon.netname, config.daemon.netname);
        assert_eq!(parsed.control.buffer_size, config.control.buffer_size);
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tincinfo.toml");
        tokio::fs::write(&path, b"[daemon]\nnetname = \"office\"\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.daemon.netname, "office");
    }

    #[test_log::test(tokio::test)]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
