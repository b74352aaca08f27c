#![deny(unsafe_code)]

//! Shared test utilities for the tincinfo workspace.
//!
//! Provides a scripted fake control daemon, pid file fixtures, config
//! builders, and tracing helpers so that individual crate tests stay concise
//! and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! tincinfo-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod pid_file;
pub mod tracing_setup;

pub use daemon::{DaemonScript, FakeDaemon};
pub use pid_file::{PidFileFixture, TEST_COOKIE};
