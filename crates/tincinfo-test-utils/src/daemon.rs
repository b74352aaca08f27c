//! A scripted stand-in for tincd's control socket.
//!
//! [`FakeDaemon`] binds a Unix socket and serves connections one at a time on
//! a background thread. Each connection gets the script's greeting, then every
//! newline-terminated request line is answered from the script's response
//! table. Lines without a scripted response get no answer. Every byte the
//! daemon reads is recorded so tests can assert on exactly what was sent.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// What the fake daemon says and when it hangs up.
#[derive(Debug, Clone)]
pub struct DaemonScript {
    greeting: String,
    responses: HashMap<String, String>,
    close_after: Option<usize>,
}

impl DaemonScript {
    /// An empty script that greets with a tinc-style ID line.
    pub fn new() -> Self {
        Self {
            greeting: "0 fakenode 17.7\n".to_string(),
            responses: HashMap::new(),
            close_after: None,
        }
    }

    /// Replace the greeting sent on accept. An empty greeting sends nothing.
    pub fn greeting(mut self, greeting: &str) -> Self {
        self.greeting = greeting.to_string();
        self
    }

    /// Answer `request` (one line, without its trailing newline) with
    /// `response`.
    pub fn respond(mut self, request: &str, response: &str) -> Self {
        self.responses
            .insert(request.to_string(), response.to_string());
        self
    }

    /// Accept the handshake for `cookie` the way tincd does.
    pub fn accept_cookie(self, cookie: &str) -> Self {
        self.respond(&format!("0 ^{cookie} 0"), "4 0 4242\n")
    }

    /// Hang up after answering this many request lines on a connection.
    pub fn close_after(mut self, requests: usize) -> Self {
        self.close_after = Some(requests);
        self
    }
}

impl Default for DaemonScript {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state between the test and the serving thread.
#[derive(Default)]
struct DaemonState {
    received: Mutex<Vec<u8>>,
    connections: AtomicUsize,
    stop: AtomicBool,
}

/// A fake control daemon listening on a Unix socket.
///
/// The serving thread is stopped and joined when this value is dropped.
pub struct FakeDaemon {
    socket_path: PathBuf,
    state: Arc<DaemonState>,
    handle: Option<JoinHandle<()>>,
}

impl FakeDaemon {
    /// Bind `socket_path` and start serving `script`.
    pub fn start(socket_path: impl AsRef<Path>, script: DaemonScript) -> Self {
        let socket_path = socket_path.as_ref().to_path_buf();
        std::fs::remove_file(&socket_path).ok();

        let listener = UnixListener::bind(&socket_path).expect("failed to bind fake daemon socket");
        listener
            .set_nonblocking(true)
            .expect("failed to make listener non-blocking");

        let state = Arc::new(DaemonState::default());
        let thread_state = Arc::clone(&state);
        let handle = std::thread::spawn(move || serve(listener, script, thread_state));

        Self {
            socket_path,
            state,
            handle: Some(handle),
        }
    }

    /// Socket path the daemon is bound to.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Every byte received so far, across all connections.
    pub fn received(&self) -> Vec<u8> {
        self.state
            .received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// [`received`](Self::received) as text.
    pub fn received_text(&self) -> String {
        String::from_utf8_lossy(&self.received()).into_owned()
    }

    /// Forget everything received so far.
    pub fn clear_received(&self) {
        if let Ok(mut received) = self.state.received.lock() {
            received.clear();
        }
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.state.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        std::fs::remove_file(&self.socket_path).ok();
    }
}

fn serve(listener: UnixListener, script: DaemonScript, state: Arc<DaemonState>) {
    while !state.stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                state.connections.fetch_add(1, Ordering::SeqCst);
                debug!("fake daemon accepted connection");
                if let Err(e) = handle_connection(stream, &script, &state) {
                    debug!(error = %e, "fake daemon connection ended");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(POLL_INTERVAL),
            Err(_) => break,
        }
    }
}

fn handle_connection(
    mut stream: UnixStream,
    script: &DaemonScript,
    state: &DaemonState,
) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL_INTERVAL))?;
    stream.write_all(script.greeting.as_bytes())?;

    let mut pending = Vec::new();
    let mut answered = 0;
    let mut chunk = [0u8; 256];

    while !state.stop.load(Ordering::SeqCst) {
        let n = match stream.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => return Err(e),
        };

        if let Ok(mut received) = state.received.lock() {
            received.extend_from_slice(&chunk[..n]);
        }
        pending.extend_from_slice(&chunk[..n]);

        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();

            if let Some(response) = script.responses.get(&line) {
                stream.write_all(response.as_bytes())?;
            }
            answered += 1;

            if script.close_after.is_some_and(|limit| answered >= limit) {
                debug!(answered, "fake daemon hanging up");
                return Ok(());
            }
        }
    }

    Ok(())
}
