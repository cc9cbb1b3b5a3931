// Unit tests for bridge error conversions.

use crate::error::BridgeError;

use common::ErrorLocation;

use std::panic::Location;

use viewer_core::error::CoreError;
use viewer_core::error::transport::TransportError;

/// **VALUE**: Verifies core errors convert into the `Core` variant and keep
/// their formatted message.
///
/// **WHY THIS MATTERS**: The bridge reports errors as display strings; if
/// the conversion drops the inner message, the user sees an empty error.
#[test]
fn given_core_error_when_converted_then_core_variant_keeps_message() {
    // GIVEN: A transport failure from the core
    let core: CoreError = TransportError::NotStarted {
        message: "Send called before the client was started".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    // WHEN: Converting into a bridge error
    let bridge: BridgeError = core.into();

    // THEN: The variant and message survive
    match &bridge {
        BridgeError::Core { message, .. } => {
            assert!(message.contains("before the client was started"));
        }
        other => panic!("expected Core variant, got {other:?}"),
    }
}

/// **VALUE**: Verifies the display format carries the error location, which
/// is what makes a one-line report actionable.
#[test]
fn given_bridge_error_when_displayed_then_location_included() {
    let error = BridgeError::Bridge {
        message: "Failed to create log directory".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    let rendered = error.to_string();

    assert!(rendered.starts_with("Bridge Error: Failed to create log directory"));
    assert!(rendered.contains("error.rs"), "missing location: {rendered}");
}
