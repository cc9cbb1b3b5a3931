use crate::ipc::client::ReplyCallback;
use crate::ipc::connection::RequestContext;

use std::sync::Mutex;
use std::thread::JoinHandle;

/// Position of a work item in its request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkState {
    Init,
    Send,
    Recv,
}

/// A reusable request slot: one request context plus the bookkeeping of the
/// worker thread currently (or last) driving it.
///
/// Exactly one work item is associated with any in-flight request. An item is
/// either idle on the client's free list (state `Init`) or in flight; it
/// returns to the free list only through a terminal step of the state
/// machine.
pub(crate) struct Work {
    pub(crate) ctx: RequestContext,
    pub(crate) stage: Mutex<WorkStage>,
}

pub(crate) struct WorkStage {
    pub(crate) state: WorkState,
    pub(crate) reply: Option<ReplyCallback>,
    pub(crate) worker: Option<JoinHandle<()>>,
}

impl Work {
    pub(crate) fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            stage: Mutex::new(WorkStage {
                state: WorkState::Init,
                reply: None,
                worker: None,
            }),
        }
    }
}
