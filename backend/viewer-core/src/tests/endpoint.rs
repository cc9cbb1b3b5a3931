// Unit tests for endpoint address parsing.
// Integration tests for the full transport are in integration_tests/.

use crate::error::transport::TransportError;
use crate::ipc::Endpoint;

/// **VALUE**: Verifies that a well-known `ipc://<name>` address parses into a
/// socket path ending in `<name>.sock`.
///
/// **WHY THIS MATTERS**: Both sides of the channel derive the socket path
/// from the same address string. If the mapping drifts, the host dials a
/// path the viewer never listens on and every start fails.
///
/// **BUG THIS CATCHES**: Would catch a refactor that changes the suffix or
/// stops using the host part of the URL as the socket name.
#[test]
fn given_valid_address_when_parsed_then_maps_name_to_socket_path() {
    // GIVEN: The well-known viewer address
    let address = "ipc://stageviewer";

    // WHEN: Parsing it
    let endpoint = Endpoint::parse(address).expect("address should parse");

    // THEN: Name and socket path are derived from the address
    assert_eq!(endpoint.name(), "stageviewer");
    let path = endpoint.socket_path().to_string_lossy().into_owned();
    assert!(
        path.ends_with("stageviewer.sock"),
        "unexpected socket path: {path}"
    );
}

/// **VALUE**: Verifies that non-`ipc` schemes are rejected up front.
///
/// **WHY THIS MATTERS**: A `tcp://` or `http://` address reaching the dialer
/// would produce a confusing connect error against a nonsense file path
/// instead of a clear configuration error.
///
/// **BUG THIS CATCHES**: Would catch the scheme check being dropped or
/// loosened during a parser refactor.
#[test]
fn given_wrong_scheme_when_parsed_then_endpoint_error() {
    let result = Endpoint::parse("tcp://stageviewer");

    assert!(matches!(result, Err(TransportError::Endpoint { .. })));
}

/// **VALUE**: Verifies that an address without a name part is rejected.
///
/// **BUG THIS CATCHES**: Would catch `ipc://` silently mapping to a socket
/// named `.sock` in the temp directory.
#[test]
fn given_missing_name_when_parsed_then_endpoint_error() {
    for address in ["ipc://", "not an address"] {
        let result = Endpoint::parse(address);
        assert!(
            matches!(result, Err(TransportError::Endpoint { .. })),
            "should reject: {address}"
        );
    }
}
