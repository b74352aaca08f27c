//! Pid file fixtures.
//!
//! A tinc daemon writes `<pid> <cookie> <host> port <port>` to its pid file.
//! [`PidFileFixture`] writes such a file into a temporary run directory and
//! hands out the matching control socket path.

use std::path::PathBuf;

use tempfile::TempDir;
use tincinfo_config::AppConfig;

use crate::config::TestConfigBuilder;

/// A 64-character control cookie used by every fixture.
pub const TEST_COOKIE: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

/// Network name used by fixtures.
pub const TEST_NETNAME: &str = "testnet";

/// A temporary run directory holding a pid file.
///
/// The directory is deleted when the fixture is dropped.
pub struct PidFileFixture {
    pub pid_file: PathBuf,
    pub socket_path: PathBuf,
    temp_dir: TempDir,
}

impl PidFileFixture {
    /// Create a run directory with a well-formed pid file carrying
    /// [`TEST_COOKIE`].
    pub fn new() -> Self {
        Self::with_contents(&format!("4242 {TEST_COOKIE} 127.0.0.1 port 655\n"))
    }

    /// Create a run directory whose pid file holds exactly `contents`.
    pub fn with_contents(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let pid_file = temp_dir.path().join(format!("tinc.{TEST_NETNAME}.pid"));
        let socket_path = temp_dir.path().join(format!("tinc.{TEST_NETNAME}.socket"));
        std::fs::write(&pid_file, contents).expect("failed to write pid file");

        Self {
            pid_file,
            socket_path,
            temp_dir,
        }
    }

    /// Run directory containing the pid file and socket.
    pub fn rundir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// A config pointing at this run directory by naming convention, with a
    /// short read timeout so tests stay fast.
    pub fn config(&self) -> AppConfig {
        TestConfigBuilder::new()
            .rundir(self.rundir())
            .netname(TEST_NETNAME)
            .read_timeout_ms(50)
            .build()
    }
}

impl Default for PidFileFixture {
    fn default() -> Self {
        Self::new()
    }
}
