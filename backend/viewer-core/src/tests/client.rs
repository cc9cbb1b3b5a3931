// Unit tests for the request/reply client's pool bookkeeping. The full
// protocol round trips live in integration_tests/.

use crate::ipc::{Client, ReplyKind, WorkState};

use std::env::temp_dir;
use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Bind a listener that answers every length-prefixed frame by echoing it.
/// The accept thread lives for the rest of the test process.
fn spawn_echo_listener(name: &str) -> String {
    let address = format!("ipc://{name}");
    let socket_path = temp_dir().join(format!("{name}.sock"));
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path).expect("bind echo listener");

    thread::spawn(move || {
        while let Ok((mut stream, _)) = listener.accept() {
            thread::spawn(move || {
                loop {
                    let mut header = [0u8; 4];
                    if stream.read_exact(&mut header).is_err() {
                        return;
                    }
                    let length = u32::from_le_bytes(header) as usize;
                    let mut payload = vec![0u8; length];
                    if stream.read_exact(&mut payload).is_err() {
                        return;
                    }
                    if stream.write_all(&header).is_err() {
                        return;
                    }
                    if stream.write_all(&payload).is_err() {
                        return;
                    }
                }
            });
        }
    });

    address
}

/// **VALUE**: Verifies the pool invariant from the inside: an item returned
/// to the free list is back in the `Init` state, and a completed request
/// leaves exactly one allocated item.
///
/// **WHY THIS MATTERS**: An item recycled in the `Send` or `Recv` state
/// would confuse the completion dispatch of its next request, since the worker
/// callback branches on that state.
///
/// **BUG THIS CATCHES**: Would catch the release path forgetting to reset
/// the state before appending to the free list.
#[test]
fn given_completed_request_when_recycled_then_free_item_state_is_init() {
    // GIVEN: An echo peer and a started client
    let address = spawn_echo_listener(&format!("unit-client-{}", std::process::id()));

    let mut client = Client::new();
    client.set_send_timeout(Duration::from_millis(200));
    client.set_receive_timeout(Duration::from_millis(200));
    client.start(&address).expect("client should start");

    // WHEN: One request completes its round trip
    let (tx, rx) = mpsc::channel();
    client
        .send(
            b"ping".to_vec(),
            Box::new(move |kind, code, payload| {
                tx.send((kind, code, payload)).expect("report reply");
            }),
        )
        .expect("send should be accepted");

    let (kind, code, payload) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("reply should arrive");
    assert_eq!((kind, code), (ReplyKind::Recv, 0));
    assert_eq!(payload, b"ping");

    // THEN: The single allocated item is idle again, in the Init state
    let deadline = Instant::now() + Duration::from_secs(5);
    while client.idle_work_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(client.idle_states(), vec![WorkState::Init]);
    assert_eq!(client.allocated_work_count(), 1);

    client.stop();
}
