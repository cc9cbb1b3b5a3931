//! External viewer process lifecycle.
//!
//! [`ViewerController`] owns the process handle and the command sender and
//! runs the status machine `Closed → Boot → Processing → Closing → Closed`.
//! Readiness and scene-load waits are bounded-retry polling loops that block
//! the calling thread; they are meant to be invoked from a context that is
//! expected to block (a user-triggered action), never from a
//! latency-sensitive path. The host drives [`ViewerController::poll_process`]
//! on a short fixed interval as the watchdog.

mod controller;
mod process;

pub use controller::{ProcessStatus, SceneDescription, ViewerController};
pub use process::ViewerProcess;
