// Unit tests for logger initialization.

use crate::logger::initialize;

use tempfile::TempDir;

/// **VALUE**: Verifies the logger initializes once and tolerates repeat
/// calls instead of erroring or double-installing a global sink.
///
/// **WHY THIS MATTERS**: Both the binary and integration harnesses call
/// `initialize`; a second call must never take the process down.
#[test]
fn given_repeated_initialize_when_called_then_both_succeed() {
    let log_dir = TempDir::new().expect("temp log dir");

    initialize(log_dir.path()).expect("first initialize should succeed");
    initialize(log_dir.path()).expect("second initialize should be a no-op");
}
