//! Asynchronous request/reply IPC client over a blocking local socket.
//!
//! The transport primitive here is deliberately synchronous: a Unix-domain
//! stream with per-call timeouts. The client rebuilds a non-blocking contract
//! on top of it by running every blocking send or receive on its own
//! short-lived worker thread and reporting completion through a reply
//! callback. Callers of [`Client::send`] never block beyond a short
//! list-mutation lock.
//!
//! # Architecture
//!
//! - [`Endpoint`] maps the URL-style address (`ipc://<name>`) to a socket
//!   path.
//! - [`Connection`] owns the dial side and opens per-request
//!   [`RequestContext`]s, each its own timeout-configured stream.
//! - [`Client`] drives a pool of reusable work items through a
//!   Send→Recv state machine and recycles them instead of reallocating.
//!
//! # Threading
//!
//! The reply callback runs on whichever worker thread completed the terminal
//! step of the request; callers must not assume a fixed calling thread. The
//! free/registry lists are the only cross-thread state; their mutexes are
//! never held during blocking I/O.

mod client;
mod connection;
mod endpoint;
mod work;

pub use client::{Client, ReplyCallback, ReplyKind};
pub use connection::{Connection, RequestContext};
pub use endpoint::Endpoint;

#[cfg(test)]
pub(crate) use work::WorkState;
