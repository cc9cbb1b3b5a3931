use crate::error::transport::TransportError;
use crate::ipc::connection::Connection;
use crate::ipc::work::{Work, WorkState};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{error, info, trace};

/// Which phase of a request a reply callback invocation corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Send,
    Recv,
}

/// Callback receiving the outcome of one accepted request: the phase that
/// completed, a result code (0 = success) and the reply payload (empty on
/// failure). Invoked exactly once, on the worker thread that completed the
/// terminal step of the request.
pub type ReplyCallback = Box<dyn FnOnce(ReplyKind, i32, Vec<u8>) + Send + 'static>;

/// Request/reply IPC client emulating non-blocking send/receive on top of a
/// blocking socket primitive.
///
/// Each accepted request runs through a small per-item state machine
/// (`Init → Send → Recv → Init`); the blocking send and the blocking receive
/// each execute on their own short-lived worker thread. Completed items are
/// recycled through a free list instead of reallocated.
pub struct Client {
    inner: Arc<Shared>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
}

struct Shared {
    started: AtomicBool,
    stopping: AtomicBool,
    connection: Mutex<Option<Connection>>,
    /// Every work item ever allocated for the current session.
    works: Mutex<Vec<Arc<Work>>>,
    /// The idle subset of `works`, state `Init`.
    free_works: Mutex<Vec<Arc<Work>>>,
    /// Consecutive send/receive failures; advisory health only, never used
    /// to trip a reconnect internally.
    error_count: AtomicU32,
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                started: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                connection: Mutex::new(None),
                works: Mutex::new(Vec::new()),
                free_works: Mutex::new(Vec::new()),
                error_count: AtomicU32::new(0),
            }),
            send_timeout: None,
            receive_timeout: None,
        }
    }

    /// Transport-level timeout applied to every blocking send. Takes effect
    /// at the next [`Client::start`].
    pub fn set_send_timeout(&mut self, timeout: Duration) {
        self.send_timeout = Some(timeout);
    }

    /// Transport-level timeout applied to every blocking receive. Takes
    /// effect at the next [`Client::start`].
    pub fn set_receive_timeout(&mut self, timeout: Duration) {
        self.receive_timeout = Some(timeout);
    }

    /// Open the transport and make the client ready to accept requests. Any
    /// previous session is stopped first; the error counter resets.
    #[track_caller]
    pub fn start(&mut self, address: &str) -> Result<(), TransportError> {
        self.stop();

        info!("Starting IPC client for {address}");
        self.inner.error_count.store(0, Ordering::SeqCst);
        lock(&self.inner.works).clear();
        lock(&self.inner.free_works).clear();

        let connection = Connection::open(address, self.send_timeout, self.receive_timeout)?;
        *lock(&self.inner.connection) = Some(connection);

        self.inner.started.store(true, Ordering::SeqCst);
        info!("IPC client started");
        Ok(())
    }

    /// Tear the session down: close every context (releasing the peer-side
    /// resources and unblocking stuck workers), join the workers, drop the
    /// connection. Idempotent and safe to call when not started. Reply
    /// callbacks of requests cancelled by the stop are not invoked.
    pub fn stop(&mut self) {
        if !self.inner.started.swap(false, Ordering::SeqCst) {
            return;
        }

        self.inner.stopping.store(true, Ordering::SeqCst);

        // Snapshot the registry so no list lock is held while joining.
        let works: Vec<Arc<Work>> = lock(&self.inner.works).clone();
        for work in &works {
            work.ctx.close();
        }
        for work in &works {
            let worker = lock(&work.stage).worker.take();
            if let Some(handle) = worker {
                let _ = handle.join();
            }
        }

        lock(&self.inner.works).clear();
        lock(&self.inner.free_works).clear();
        if let Some(connection) = lock(&self.inner.connection).take() {
            connection.close();
        }

        self.inner.stopping.store(false, Ordering::SeqCst);
        info!("IPC client stopped");
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Rolling count of consecutive send/receive failures. Resets to zero on
    /// any successful receive.
    pub fn error_count(&self) -> u32 {
        self.inner.error_count.load(Ordering::SeqCst)
    }

    /// Number of work items allocated for the current session.
    pub fn allocated_work_count(&self) -> usize {
        lock(&self.inner.works).len()
    }

    /// Number of allocated work items currently idle on the free list.
    pub fn idle_work_count(&self) -> usize {
        lock(&self.inner.free_works).len()
    }

    /// Test-only view of the free list's per-item states.
    #[cfg(test)]
    pub(crate) fn idle_states(&self) -> Vec<WorkState> {
        lock(&self.inner.free_works)
            .iter()
            .map(|work| lock(&work.stage).state)
            .collect()
    }

    /// Submit one request. Fails synchronously only when the client is not
    /// started or a request context cannot be opened; once accepted, the
    /// outcome (including send/receive failures) arrives through `reply`,
    /// which is invoked exactly once.
    #[track_caller]
    pub fn send(&self, message: Vec<u8>, reply: ReplyCallback) -> Result<(), TransportError> {
        trace!("Client send ({} bytes)", message.len());

        if !self.is_started() {
            return Err(TransportError::NotStarted {
                message: "Send called before the client was started".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let work = match lock(&self.inner.free_works).pop() {
            Some(work) => work,
            None => self.allocate_work()?,
        };

        {
            let mut stage = lock(&work.stage);
            // A recycled item's previous worker has already passed its
            // terminal step; join it so the slot is fully quiesced.
            if let Some(handle) = stage.worker.take() {
                drop(stage);
                let _ = handle.join();
                stage = lock(&work.stage);
            }
            stage.state = WorkState::Send;
            stage.reply = Some(reply);
            stage.worker = Some(Shared::spawn_send(&self.inner, &work, message));
        }

        Ok(())
    }

    /// Open a context and register a brand-new work item. The free-list lock
    /// is not held here: the lock guards list mutation, never the dial.
    #[track_caller]
    fn allocate_work(&self) -> Result<Arc<Work>, TransportError> {
        let ctx = {
            let guard = lock(&self.inner.connection);
            let connection = guard.as_ref().ok_or_else(|| TransportError::NotStarted {
                message: "Send called without an open connection".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;
            connection.open_context()?
        };

        let work = Arc::new(Work::new(ctx));
        lock(&self.inner.works).push(Arc::clone(&work));
        Ok(work)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn spawn_send(inner: &Arc<Shared>, work: &Arc<Work>, payload: Vec<u8>) -> thread::JoinHandle<()> {
        let inner = Arc::clone(inner);
        let work = Arc::clone(work);
        thread::spawn(move || {
            let code = match work.ctx.send(&payload) {
                Ok(()) => 0,
                Err(e) => result_code(&e),
            };
            Shared::step(&inner, &work, code, Vec::new());
        })
    }

    fn spawn_recv(inner: &Arc<Shared>, work: &Arc<Work>) -> thread::JoinHandle<()> {
        let inner = Arc::clone(inner);
        let work = Arc::clone(work);
        thread::spawn(move || {
            let (code, payload) = match work.ctx.recv() {
                Ok(payload) => (0, payload),
                Err(e) => (result_code(&e), Vec::new()),
            };
            Shared::step(&inner, &work, code, payload);
        })
    }

    /// Completion callback of both worker kinds; dispatches on the item's
    /// current state.
    ///
    /// `Send` success hands the item to a receive worker; `Send` failure and
    /// both `Recv` outcomes are terminal: the reply callback fires and the
    /// item returns to the free pool.
    fn step(inner: &Arc<Shared>, work: &Arc<Work>, code: i32, payload: Vec<u8>) {
        let state = lock(&work.stage).state;
        match state {
            WorkState::Init => {}
            WorkState::Send => {
                trace!("Request state Send [{code}]");

                if code == 0 {
                    // Hold the stage lock across the spawn so the item
                    // cannot be recycled before the receive worker's handle
                    // is recorded.
                    let mut stage = lock(&work.stage);
                    stage.state = WorkState::Recv;
                    if inner.stopping.load(Ordering::SeqCst) {
                        return;
                    }
                    stage.worker = Some(Shared::spawn_recv(inner, work));
                    return;
                }

                inner.error_count.fetch_add(1, Ordering::SeqCst);
                error!("Request send failed [{code}]");
                Shared::finish(inner, work, ReplyKind::Send, code, Vec::new());
            }
            WorkState::Recv => {
                trace!("Request state Recv [{code}]");

                if code == 0 {
                    inner.error_count.store(0, Ordering::SeqCst);
                } else {
                    inner.error_count.fetch_add(1, Ordering::SeqCst);
                    error!("Request receive failed [{code}]");
                }
                Shared::finish(inner, work, ReplyKind::Recv, code, payload);
            }
        }
    }

    /// Terminal step: invoke the reply callback (outside any lock) exactly
    /// once and recycle the item.
    fn finish(inner: &Arc<Shared>, work: &Arc<Work>, kind: ReplyKind, code: i32, payload: Vec<u8>) {
        let reply = lock(&work.stage).reply.take();
        if let Some(reply) = reply {
            if !inner.stopping.load(Ordering::SeqCst) {
                reply(kind, code, payload);
            }
        }
        inner.release(work);
    }

    fn release(&self, work: &Arc<Work>) {
        lock(&work.stage).state = WorkState::Init;
        // Items released during a stop are about to be torn down; keeping
        // them off the free list stops a closed context from being reused.
        if self.stopping.load(Ordering::SeqCst) {
            return;
        }
        lock(&self.free_works).push(Arc::clone(work));
    }
}

/// Maps an I/O failure to the non-zero result code surfaced to reply
/// callbacks. -1 stands in when the OS did not supply an errno.
fn result_code(error: &std::io::Error) -> i32 {
    error.raw_os_error().unwrap_or(-1)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
