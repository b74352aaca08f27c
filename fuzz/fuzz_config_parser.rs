//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`. Parsing and validation may
//! reject the input but must never panic, and anything accepted must yield
//! usable runtime paths.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = tincinfo_config::AppConfig::parse(s) {
            let _ = config.pid_file_path();
            let _ = config.socket_path();
            let _ = config.control.read_timeout();
        }
    }
});
