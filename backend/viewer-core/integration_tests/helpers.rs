//! Test helpers: a scripted stub viewer speaking the wire protocol over the
//! real Unix-domain transport, plus fake viewer executables and timing
//! utilities.

use viewer_core::config::BridgeConfig;
use viewer_core::ipc::Endpoint;
use viewer_core::protocol::{Envelope, Reply, ViewerCommand};

use std::io::{ErrorKind, Read, Result as IoResult, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

static ENDPOINT_INDEX: AtomicUsize = AtomicUsize::new(0);

/// Unique endpoint address per test so parallel tests never share a socket.
pub fn unique_address(prefix: &str) -> String {
    format!(
        "ipc://{prefix}-{}-{}",
        std::process::id(),
        ENDPOINT_INDEX.fetch_add(1, Ordering::SeqCst)
    )
}

/// Scripted handling of one state query.
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Answer with this reply code.
    Reply(i32),
    /// Never answer; the client's receive timeout fires.
    Silent,
    /// Answer with this code after holding the request open for a while.
    DelayedReply(Duration, i32),
}

struct Script {
    behaviors: Vec<StubBehavior>,
    index: usize,
}

impl Script {
    fn next(&mut self) -> StubBehavior {
        let behavior = self
            .behaviors
            .get(self.index)
            .or(self.behaviors.last())
            .copied()
            .unwrap_or(StubBehavior::Reply(0));
        self.index += 1;
        behavior
    }
}

/// Stub peer: binds the endpoint's socket, answers state queries per the
/// current script, acknowledges every other command with code 0, and counts
/// what it saw.
pub struct StubViewer {
    address: String,
    script: Arc<Mutex<Script>>,
    state_queries: Arc<AtomicUsize>,
    stop_commands: Arc<AtomicUsize>,
    scene_opens: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl StubViewer {
    pub fn spawn(address: &str, behaviors: Vec<StubBehavior>) -> Self {
        let endpoint = Endpoint::parse(address).expect("valid stub address");
        let socket_path = endpoint.socket_path().to_path_buf();
        let _ = std::fs::remove_file(&socket_path);

        let listener = UnixListener::bind(&socket_path).expect("bind stub listener");
        listener
            .set_nonblocking(true)
            .expect("nonblocking stub listener");

        let script = Arc::new(Mutex::new(Script {
            behaviors,
            index: 0,
        }));
        let state_queries = Arc::new(AtomicUsize::new(0));
        let stop_commands = Arc::new(AtomicUsize::new(0));
        let scene_opens = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_thread = {
            let script = Arc::clone(&script);
            let state_queries = Arc::clone(&state_queries);
            let stop_commands = Arc::clone(&stop_commands);
            let scene_opens = Arc::clone(&scene_opens);
            let shutdown = Arc::clone(&shutdown);

            thread::spawn(move || {
                loop {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    match listener.accept() {
                        Ok((stream, _)) => {
                            stream
                                .set_nonblocking(false)
                                .expect("blocking stub connection");
                            let script = Arc::clone(&script);
                            let state_queries = Arc::clone(&state_queries);
                            let stop_commands = Arc::clone(&stop_commands);
                            let scene_opens = Arc::clone(&scene_opens);
                            // Handlers exit when the client closes the
                            // context; no join needed.
                            thread::spawn(move || {
                                handle_connection(
                                    stream,
                                    &script,
                                    &state_queries,
                                    &stop_commands,
                                    &scene_opens,
                                );
                            });
                        }
                        Err(e) if e.kind() == ErrorKind::WouldBlock => {
                            thread::sleep(Duration::from_millis(2));
                        }
                        Err(_) => break,
                    }
                }
                let _ = std::fs::remove_file(&socket_path);
            })
        };

        Self {
            address: address.to_string(),
            script,
            state_queries,
            stop_commands,
            scene_opens,
            shutdown,
            accept_thread: Some(accept_thread),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Replace the state-query script; subsequent queries restart at the
    /// beginning of the new script.
    pub fn set_state_script(&self, behaviors: Vec<StubBehavior>) {
        let mut script = self.script.lock().expect("stub script lock");
        script.behaviors = behaviors;
        script.index = 0;
    }

    /// Total state queries seen across all scripts.
    pub fn state_query_count(&self) -> usize {
        self.state_queries.load(Ordering::SeqCst)
    }

    pub fn stop_command_count(&self) -> usize {
        self.stop_commands.load(Ordering::SeqCst)
    }

    pub fn scene_open_count(&self) -> usize {
        self.scene_opens.load(Ordering::SeqCst)
    }
}

impl Drop for StubViewer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

fn handle_connection(
    stream: UnixStream,
    script: &Arc<Mutex<Script>>,
    state_queries: &Arc<AtomicUsize>,
    stop_commands: &Arc<AtomicUsize>,
    scene_opens: &Arc<AtomicUsize>,
) {
    loop {
        let payload = match read_frame(&stream) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        let envelope = match Envelope::decode(&payload) {
            Ok(envelope) => envelope,
            Err(_) => return,
        };

        let reply_code = match envelope {
            Envelope::ViewerCommand(ViewerCommand::GetViewerState) => {
                state_queries.fetch_add(1, Ordering::SeqCst);
                let behavior = script.lock().expect("stub script lock").next();
                match behavior {
                    StubBehavior::Reply(code) => Some(code),
                    StubBehavior::Silent => None,
                    StubBehavior::DelayedReply(delay, code) => {
                        thread::sleep(delay);
                        Some(code)
                    }
                }
            }
            Envelope::ViewerCommand(ViewerCommand::StopViewer) => {
                stop_commands.fetch_add(1, Ordering::SeqCst);
                Some(0)
            }
            Envelope::ViewerCommand(ViewerCommand::OpenScene { .. }) => {
                scene_opens.fetch_add(1, Ordering::SeqCst);
                Some(0)
            }
            Envelope::ViewerCommand(_) => Some(0),
            Envelope::Reply(_) => return,
        };

        if let Some(code) = reply_code {
            let bytes = Envelope::Reply(Reply::new(code, ""))
                .encode()
                .expect("encode stub reply");
            if write_frame(&stream, &bytes).is_err() {
                return;
            }
        }
    }
}

fn read_frame(mut stream: &UnixStream) -> IoResult<Vec<u8>> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header)?;
    let length = u32::from_le_bytes(header) as usize;
    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_frame(mut stream: &UnixStream, payload: &[u8]) -> IoResult<()> {
    stream.write_all(&(payload.len() as u32).to_le_bytes())?;
    stream.write_all(payload)?;
    stream.flush()
}

/// Write an executable fake viewer that stays alive long enough for a test.
pub fn fake_viewer(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-viewer.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake viewer");

    let mut permissions = std::fs::metadata(&path)
        .expect("fake viewer metadata")
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("fake viewer permissions");

    path
}

/// Config tuned for tests: 1 ms polls, short transport timeouts.
pub fn test_config(address: &str, viewer_path: PathBuf) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.viewer.endpoint = address.to_string();
    config.viewer.viewer_path = viewer_path;
    config.viewer.send_timeout_ms = 200;
    config.viewer.receive_timeout_ms = 200;
    config.polling.watchdog_interval_ms = 1;
    config.polling.boot_poll_ms = 1;
    config.polling.scene_poll_ms = 1;
    config
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
