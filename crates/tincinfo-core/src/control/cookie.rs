//! The control cookie and the pid file that carries it.
//!
//! tincd writes `<pid> <cookie> <host> port <port>` to its pid file. Only the
//! cookie matters for authentication; it is kept in a [`Cookie`] that is
//! zeroized on drop and redacted in `Debug` output.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::ControlError;
use super::request::COOKIE_LEN;

/// The daemon's control cookie, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Cookie(String);

impl Cookie {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The cookie text. Only the handshake builder should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the cookie has the length tincd generates. Anything else will
    /// be refused by the handshake whitelist.
    pub fn is_well_formed(&self) -> bool {
        self.0.chars().count() == COOKIE_LEN
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cookie([REDACTED])")
    }
}

/// Parsed contents of a tincd pid file.
#[derive(Debug, Clone)]
pub struct PidFile {
    /// Daemon process id, when the first token is numeric.
    pub pid: Option<u32>,
    /// Control cookie (second token). Its length is not checked here.
    pub cookie: Cookie,
}

impl PidFile {
    /// Read and parse the pid file at `path`. The file is closed before
    /// this returns.
    pub fn read(path: &Path) -> Result<Self, ControlError> {
        let mut content = std::fs::read_to_string(path).map_err(|source| ControlError::PidFile {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = Self::parse(&content, path);
        content.zeroize();

        let parsed = parsed?;
        if !parsed.cookie.is_well_formed() {
            warn!(
                path = %path.display(),
                expected = COOKIE_LEN,
                "Control cookie has an unexpected length, authentication will be refused"
            );
        }
        debug!(path = %path.display(), pid = ?parsed.pid, "Read control cookie from pid file");
        Ok(parsed)
    }

    /// Parse pid file `content`; `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ControlError> {
        let mut tokens = content.split_whitespace();
        let pid = tokens.next().and_then(|t| t.parse().ok());
        let cookie = tokens
            .next()
            .map(Cookie::new)
            .ok_or_else(|| ControlError::MissingCookie(path.to_path_buf()))?;

        Ok(Self { pid, cookie })
    }
}
