//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::PathBuf;

use tincinfo_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .netname("office")
///     .read_timeout_ms(50)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn netname(mut self, netname: &str) -> Self {
        self.config.daemon.netname = netname.to_string();
        self
    }

    pub fn rundir(mut self, rundir: impl Into<PathBuf>) -> Self {
        self.config.daemon.rundir = rundir.into();
        self
    }

    pub fn pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.daemon.pid_file = Some(path.into());
        self
    }

    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.daemon.socket_path = Some(path.into());
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.control.read_timeout_ms = ms;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.control.buffer_size = size;
        self
    }

    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.config.control.reconnect = enabled;
        self
    }

    pub fn reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.control.reconnect_attempts = attempts;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
