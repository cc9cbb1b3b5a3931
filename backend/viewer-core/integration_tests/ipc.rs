//! Integration tests for the request/reply client against a stub peer:
//! pool recycling, the error counter, single-reply delivery, and the full
//! codec round trip.

use crate::helpers::{StubBehavior, StubViewer, unique_address, wait_until};

use viewer_core::error::transport::TransportError;
use viewer_core::ipc::{Client, ReplyKind};
use viewer_core::protocol::{Envelope, Reply, ViewerCommand, ViewerState};
use viewer_core::sender::CommandSender;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn state_query_bytes() -> Vec<u8> {
    Envelope::ViewerCommand(ViewerCommand::GetViewerState)
        .encode()
        .expect("encode state query")
}

fn short_timeout_client() -> Client {
    let mut client = Client::new();
    client.set_send_timeout(Duration::from_millis(200));
    client.set_receive_timeout(Duration::from_millis(200));
    client
}

/// **VALUE**: Verifies the pool invariant: completed requests recycle their
/// work item back to the free list instead of growing the pool.
///
/// **WHY THIS MATTERS**: Every request that fails to recycle leaks a request
/// context (a socket) for the lifetime of the session. A long-running host
/// sends thousands of transform updates.
///
/// **BUG THIS CATCHES**: Would catch the terminal step forgetting to release
/// the item (the free list staying empty and the pool allocating a fresh
/// context per request).
#[test]
fn given_sequential_requests_when_completed_then_single_work_item_recycled() {
    // GIVEN: A stub that answers every state query as ready
    let address = unique_address("ipc-recycle");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);

    let mut client = short_timeout_client();
    client.start(stub.address()).expect("client should start");

    // WHEN: Running several requests strictly one after another
    for _ in 0..3 {
        let (tx, rx) = mpsc::channel();
        client
            .send(
                state_query_bytes(),
                Box::new(move |kind, code, _payload| {
                    tx.send((kind, code)).expect("report reply");
                }),
            )
            .expect("send should be accepted");

        let (kind, code) = rx.recv_timeout(TEST_TIMEOUT).expect("reply should arrive");
        assert_eq!(kind, ReplyKind::Recv);
        assert_eq!(code, 0);

        // THEN: The one work item returns to the free list after each trip
        assert!(
            wait_until(TEST_TIMEOUT, || client.idle_work_count() == 1),
            "work item was not recycled"
        );
        assert_eq!(client.allocated_work_count(), 1);
    }

    client.stop();
}

/// **VALUE**: Verifies concurrent in-flight requests each get their own work
/// item, and all items land back on the free list afterwards.
///
/// **BUG THIS CATCHES**: Would catch a work item being handed to two
/// in-flight requests at once (free-list pop outside the lock), which would
/// interleave two requests on one request context.
#[test]
fn given_concurrent_requests_when_completed_then_items_distinct_and_recycled() {
    // GIVEN: A stub that holds every state query open briefly
    let address = unique_address("ipc-concurrent");
    let stub = StubViewer::spawn(
        &address,
        vec![StubBehavior::DelayedReply(Duration::from_millis(50), 0)],
    );

    let mut client = short_timeout_client();
    client.start(stub.address()).expect("client should start");

    // WHEN: Three requests are in flight at once
    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let completed = Arc::clone(&completed);
        client
            .send(
                state_query_bytes(),
                Box::new(move |_kind, _code, _payload| {
                    completed.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .expect("send should be accepted");
    }

    // THEN: Each got a distinct work item, and all recycle on completion
    assert!(
        wait_until(TEST_TIMEOUT, || client.allocated_work_count() == 3),
        "expected one work item per in-flight request"
    );
    assert!(
        wait_until(TEST_TIMEOUT, || completed.load(Ordering::SeqCst) == 3),
        "not all replies arrived"
    );
    assert!(
        wait_until(TEST_TIMEOUT, || client.idle_work_count() == 3),
        "not all work items recycled"
    );

    client.stop();
}

/// **VALUE**: Verifies the consecutive-error counter: N receive failures
/// leave it at exactly N, and one successful receive resets it to 0.
///
/// **WHY THIS MATTERS**: The counter is the only health signal the host gets
/// for a wedged viewer; an off-by-one or a missed reset makes it useless.
///
/// **BUG THIS CATCHES**: Would catch the reset being applied on send success
/// instead of receive success, or failures not being counted at all.
#[test]
fn given_receive_failures_when_counted_then_counter_tracks_and_resets() {
    // GIVEN: A stub that swallows three state queries, then answers
    let address = unique_address("ipc-errors");
    let stub = StubViewer::spawn(
        &address,
        vec![
            StubBehavior::Silent,
            StubBehavior::Silent,
            StubBehavior::Silent,
            StubBehavior::Reply(0),
        ],
    );

    let mut client = short_timeout_client();
    client.start(stub.address()).expect("client should start");
    assert_eq!(client.error_count(), 0);

    // WHEN: Three requests time out on receive
    for expected in 1..=3u32 {
        let (tx, rx) = mpsc::channel();
        client
            .send(
                state_query_bytes(),
                Box::new(move |kind, code, payload| {
                    tx.send((kind, code, payload)).expect("report reply");
                }),
            )
            .expect("send should be accepted");

        let (kind, code, payload) = rx.recv_timeout(TEST_TIMEOUT).expect("reply should arrive");

        // THEN: The failure surfaces as a non-zero receive code with an
        // empty payload, and the counter is exactly the failure count
        assert_eq!(kind, ReplyKind::Recv);
        assert_ne!(code, 0);
        assert!(payload.is_empty());
        assert_eq!(client.error_count(), expected);
    }

    // WHEN: The next request succeeds
    let (tx, rx) = mpsc::channel();
    client
        .send(
            state_query_bytes(),
            Box::new(move |kind, code, _payload| {
                tx.send((kind, code)).expect("report reply");
            }),
        )
        .expect("send should be accepted");
    let (kind, code) = rx.recv_timeout(TEST_TIMEOUT).expect("reply should arrive");

    // THEN: The counter resets to zero
    assert_eq!((kind, code), (ReplyKind::Recv, 0));
    assert_eq!(client.error_count(), 0);

    client.stop();
}

/// **VALUE**: Verifies the reply callback fires exactly once per accepted
/// request, for successful and failed round trips alike.
#[test]
fn given_mixed_outcomes_when_completed_then_each_reply_fires_once() {
    // GIVEN: A stub that answers, swallows, then answers again
    let address = unique_address("ipc-single-reply");
    let stub = StubViewer::spawn(
        &address,
        vec![
            StubBehavior::Reply(0),
            StubBehavior::Silent,
            StubBehavior::Reply(0),
        ],
    );

    let mut client = short_timeout_client();
    client.start(stub.address()).expect("client should start");

    // WHEN: Three requests run to completion
    let mut invocation_counts = Vec::new();
    for _ in 0..3 {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let (tx, rx) = mpsc::channel();
        client
            .send(
                state_query_bytes(),
                Box::new(move |_kind, _code, _payload| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tx.send(()).expect("report reply");
                }),
            )
            .expect("send should be accepted");
        rx.recv_timeout(TEST_TIMEOUT).expect("reply should arrive");
        invocation_counts.push(invocations);
    }

    // THEN: Every callback ran exactly once (FnOnce rules out twice; this
    // guards against zero after a reported completion)
    for invocations in invocation_counts {
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    client.stop();
}

/// **VALUE**: Verifies the full round trip through the envelope codec, the
/// command sender and the RPC client: a state query against a ready stub
/// decodes to `Reply.code == 0`.
#[test]
fn given_ready_stub_when_state_queried_then_decoded_reply_is_ready() {
    // GIVEN: A ready stub and a started command sender
    let address = unique_address("ipc-roundtrip");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);

    let mut sender = CommandSender::new(stub.address());
    sender.start().expect("sender should start");

    // WHEN: Sending a typed state query
    let (tx, rx) = mpsc::channel();
    sender
        .send_command(ViewerCommand::GetViewerState, move |kind, code, payload| {
            tx.send((kind, code, payload)).expect("report reply");
        })
        .expect("command should be accepted");

    let (kind, code, payload) = rx.recv_timeout(TEST_TIMEOUT).expect("reply should arrive");

    // THEN: The decoded reply reports the ready state
    assert_eq!((kind, code), (ReplyKind::Recv, 0));
    let reply = Reply::from_envelope_bytes(&payload).expect("reply should decode");
    assert_eq!(reply.code, 0);
    assert_eq!(reply.state(), Some(ViewerState::Ready));

    sender.stop();
}

/// **VALUE**: Verifies a send before `start` is refused synchronously with
/// no side effect; the callback must never fire for a rejected request.
#[test]
fn given_unstarted_client_when_sending_then_not_started_error() {
    let client = Client::new();

    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);
    let result = client.send(
        state_query_bytes(),
        Box::new(move |_kind, _code, _payload| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert!(matches!(result, Err(TransportError::NotStarted { .. })));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert_eq!(client.allocated_work_count(), 0);
}

/// **VALUE**: Verifies start/stop bookkeeping: `is_started` reflects only a
/// successful start without an intervening stop, and stop is idempotent.
#[test]
fn given_start_stop_cycles_when_queried_then_is_started_accurate() {
    let address = unique_address("ipc-startstop");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);

    let mut client = short_timeout_client();
    assert!(!client.is_started());

    client.start(stub.address()).expect("client should start");
    assert!(client.is_started());

    client.stop();
    assert!(!client.is_started());

    // Stopping again is a no-op
    client.stop();
    assert!(!client.is_started());

    // A dial against a dead endpoint fails without keeping partial state
    drop(stub);
    assert!(
        wait_until(TEST_TIMEOUT, || {
            client.start(&address).is_err()
        }),
        "start should fail once the stub socket is gone"
    );
    assert!(!client.is_started());
}
