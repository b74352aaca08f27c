//! The control channel: one blocking Unix socket connection to tincd.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tincinfo_config::ControlConfig;
use tracing::{debug, info, warn};

use super::ControlError;
use super::cookie::{Cookie, PidFile};
use super::request::{self, DumpRequest, Request};

/// Tunables for a [`ControlChannel`].
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// A read that waits this long without data ends the response.
    pub read_timeout: Duration,
    /// Bytes requested per socket read.
    pub buffer_size: usize,
    /// Reconnect and resend once when a send hits a transport error.
    pub reconnect: bool,
    /// Attempts per reconnect.
    pub reconnect_attempts: u32,
}

impl ChannelOptions {
    /// A zero read timeout is refused by the socket, so it is caught here
    /// rather than surfacing as an I/O error the reconnect path would retry.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.read_timeout.is_zero() {
            return Err(ControlError::InvalidOptions("read_timeout must be non-zero"));
        }
        Ok(())
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(600),
            buffer_size: 16,
            reconnect: false,
            reconnect_attempts: 3,
        }
    }
}

impl From<&ControlConfig> for ChannelOptions {
    fn from(config: &ControlConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            buffer_size: config.buffer_size,
            reconnect: config.reconnect,
            reconnect_attempts: config.reconnect_attempts,
        }
    }
}

/// Waits between reconnect attempts.
pub trait Sleeper: Send {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Delay after failed reconnect attempt `attempt` (1-based): `ceil(e^attempt)`
/// seconds, so 3 s, 8 s, 21 s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(f64::from(attempt).exp().ceil() as u64)
}

/// A connection to tincd's control socket.
///
/// All I/O is blocking and one request is in flight at a time. The socket is
/// closed on [`disconnect`](Self::disconnect) and when the channel is dropped.
pub struct ControlChannel {
    socket_path: PathBuf,
    cookie: Cookie,
    stream: Option<UnixStream>,
    options: ChannelOptions,
    sleeper: Box<dyn Sleeper>,
}

impl ControlChannel {
    /// Create a channel for `socket_path`, taking the cookie from the pid
    /// file at `pid_file`. Does not connect.
    pub fn open(
        pid_file: impl AsRef<Path>,
        socket_path: impl Into<PathBuf>,
        options: ChannelOptions,
    ) -> Result<Self, ControlError> {
        let pid_file = PidFile::read(pid_file.as_ref())?;
        Ok(Self::with_cookie(pid_file.cookie, socket_path, options))
    }

    /// Create a channel with an already known cookie. Does not connect.
    pub fn with_cookie(
        cookie: Cookie,
        socket_path: impl Into<PathBuf>,
        options: ChannelOptions,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            cookie,
            stream: None,
            options,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace how the channel waits between reconnect attempts.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect to the control socket and return the daemon's greeting.
    ///
    /// Returns `Ok(None)` without touching the socket if already connected.
    pub fn connect(&mut self) -> Result<Option<String>, ControlError> {
        if self.stream.is_some() {
            return Ok(None);
        }
        self.options.validate()?;

        let mut stream =
            UnixStream::connect(&self.socket_path).map_err(|source| ControlError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;
        stream.set_read_timeout(Some(self.options.read_timeout))?;

        let greeting = read_framed(&mut stream, self.options.buffer_size)?;
        debug!(
            path = %self.socket_path.display(),
            bytes = greeting.len(),
            "Connected to control socket"
        );

        self.stream = Some(stream);
        Ok(Some(decode_text(&greeting)))
    }

    /// Close the socket. Does nothing when not connected.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(path = %self.socket_path.display(), "Disconnected from control socket");
        }
    }

    /// Send the cookie handshake and return the daemon's reply.
    ///
    /// The reply is not interpreted; a rejected cookie shows up as the
    /// daemon closing the connection or answering with an error line.
    pub fn authenticate(&mut self) -> Result<String, ControlError> {
        let payload = request::handshake(&self.cookie);
        let response = self.communicate(&payload)?;
        info!(path = %self.socket_path.display(), "Authenticated on control socket");
        Ok(response)
    }

    /// Send a whitelisted request and return the framed response.
    ///
    /// `request` is either a dump request name such as `"REQ_DUMP_NODES"`
    /// or a complete handshake line. Anything else fails with
    /// [`ControlError::InvalidRequest`] before a byte is written.
    ///
    /// With reconnect enabled, a send that fails on the transport triggers
    /// [`reconnect`](Self::reconnect) and exactly one resend.
    pub fn communicate(&mut self, request: &str) -> Result<String, ControlError> {
        let request = Request::parse(request)?;

        if let Err(err) = self.send_request(&request) {
            if !(self.options.reconnect && err.is_transport()) {
                return Err(err);
            }
            warn!(request = %request, error = %err, "Control request failed, reconnecting");
            self.reconnect(self.options.reconnect_attempts)?;
            self.send_request(&request)?;
        }

        self.read_response()
    }

    /// Send one of the dump requests.
    pub fn dump(&mut self, request: DumpRequest) -> Result<String, ControlError> {
        self.communicate(request.name())
    }

    /// Drop the connection, connect again, and re-authenticate, trying up to
    /// `max_attempts` times.
    ///
    /// After failed attempt `n` the channel sleeps [`backoff_delay(n)`](backoff_delay)
    /// before the next one. Once the budget is spent the last transport
    /// error is returned. Errors that are not transport errors end the loop
    /// at once.
    pub fn reconnect(&mut self, max_attempts: u32) -> Result<(), ControlError> {
        if max_attempts == 0 {
            return Err(ControlError::NoReconnectAttempts);
        }

        let mut attempt = 1;
        loop {
            match self.try_reconnect() {
                Ok(()) => {
                    info!(attempt, "Reconnected to control socket");
                    return Ok(());
                }
                Err(err) if err.is_transport() => {
                    if attempt >= max_attempts {
                        warn!(attempts = max_attempts, error = %err, "Giving up on control socket");
                        return Err(err);
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "Reconnect attempt failed"
                    );
                    self.sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn try_reconnect(&mut self) -> Result<(), ControlError> {
        self.disconnect();
        self.connect()?;
        self.handshake()?;
        Ok(())
    }

    /// Authenticate without the reconnect path, for use inside `reconnect`.
    fn handshake(&mut self) -> Result<String, ControlError> {
        let payload = request::handshake(&self.cookie);
        let request = Request::parse(&payload)?;
        self.send_request(&request)?;
        self.read_response()
    }

    fn send_request(&mut self, request: &Request<'_>) -> Result<(), ControlError> {
        let stream = self.stream.as_mut().ok_or(ControlError::NoConnection)?;
        debug!(request = %request, "Sending control request");
        stream.write_all(request.wire().as_bytes())?;
        Ok(())
    }

    fn read_response(&mut self) -> Result<String, ControlError> {
        let stream = self.stream.as_mut().ok_or(ControlError::NoConnection)?;
        let response = read_framed(stream, self.options.buffer_size)?;
        debug!(bytes = response.len(), "Received control response");
        Ok(decode_text(&response))
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for ControlChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlChannel")
            .field("socket_path", &self.socket_path)
            .field("cookie", &self.cookie)
            .field("connected", &self.stream.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Read `chunk_size` bytes at a time until a read times out or the peer
/// closes the stream. Whatever arrived by then is the response.
fn read_framed(stream: &mut UnixStream, chunk_size: usize) -> io::Result<Vec<u8>> {
    let mut response = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(response)
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
