//! Integration tests for the viewer lifecycle controller: boot readiness
//! polling, scene-load polling, watchdog transitions and shutdown.

use crate::helpers::{StubBehavior, StubViewer, fake_viewer, test_config, unique_address, wait_until};

use viewer_core::error::CoreError;
use viewer_core::lifecycle::{ProcessStatus, SceneDescription, ViewerController};
use viewer_core::protocol::{ClippingMethod, ClippingPlane};

use std::time::Duration;

use tempfile::TempDir;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn test_scene() -> SceneDescription {
    SceneDescription {
        scene_path: "/tmp/stage-scene.fbx".to_string(),
        camera_name: "camera1".to_string(),
        aim_length: 2.5,
        clipping_plane: ClippingPlane::Both,
        clipping_method: ClippingMethod::None,
    }
}

/// Boot a controller against a long-lived fake viewer and the given stub
/// script, returning it in the `Processing` state.
fn booted_controller(stub: &StubViewer, dir: &TempDir) -> ViewerController {
    let viewer = fake_viewer(dir.path(), "sleep 30");
    let mut controller = ViewerController::new(test_config(stub.address(), viewer));

    controller
        .start_and_wait_ready()
        .expect("viewer should boot");

    controller.poll_process();
    assert_eq!(controller.status(), ProcessStatus::Processing);
    controller
}

/// **VALUE**: Verifies the readiness poll's settle delay: even a viewer
/// that reports ready on the very first query is polled at least six times
/// (five settle iterations plus the deciding one) before success.
///
/// **WHY THIS MATTERS**: The settle delay papers over the window where the
/// viewer's listener answers but its renderer is still initializing.
/// "Optimizing away" the wait reintroduces a startup race with real
/// hardware.
///
/// **BUG THIS CATCHES**: Would catch the readiness check running before the
/// settle iterations have elapsed.
#[test]
fn given_instantly_ready_viewer_when_booted_then_settle_delay_still_applies() {
    // GIVEN: A stub that reports ready on every poll
    let address = unique_address("boot-settle");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);
    let dir = TempDir::new().expect("temp dir");
    let viewer = fake_viewer(dir.path(), "sleep 30");

    let mut controller = ViewerController::new(test_config(stub.address(), viewer));

    // WHEN: Booting and waiting for readiness
    controller
        .start_and_wait_ready()
        .expect("viewer should boot");

    // THEN: At least six state queries went out before success
    assert!(
        wait_until(TEST_TIMEOUT, || stub.state_query_count() >= 6),
        "expected at least 6 state queries, saw {}",
        stub.state_query_count()
    );

    controller.force_stop();
}

/// **VALUE**: Verifies the readiness poll's give-up bound: a viewer that
/// never reports the expected state is polled exactly 21 times and the wait
/// returns without error.
///
/// **WHY THIS MATTERS**: The bound is what keeps a wedged viewer from
/// hanging the host forever; the success return on timeout is deliberate,
/// inherited behavior (the watchdog and error counter carry the bad news).
///
/// **BUG THIS CATCHES**: Would catch an off-by-one in the iteration bound or
/// the timeout path being turned into an error.
#[test]
fn given_never_ready_viewer_when_booted_then_gives_up_after_21_polls() {
    // GIVEN: A stub that always reports loading
    let address = unique_address("boot-timeout");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(1)]);
    let dir = TempDir::new().expect("temp dir");
    let viewer = fake_viewer(dir.path(), "sleep 30");

    let mut controller = ViewerController::new(test_config(stub.address(), viewer));

    // WHEN: Booting against the never-ready viewer
    controller
        .start_and_wait_ready()
        .expect("the timeout path must not surface an error");

    // THEN: Exactly 21 state queries were issued
    assert!(
        wait_until(TEST_TIMEOUT, || stub.state_query_count() == 21),
        "expected exactly 21 state queries, saw {}",
        stub.state_query_count()
    );
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(stub.state_query_count(), 21);

    controller.force_stop();
}

/// **VALUE**: Verifies the scene-load wait takes the success branch when a
/// loading status is observed and then clears, not the fast-load timeout.
///
/// **WHY THIS MATTERS**: The two exits are distinguishable by how long they
/// take (~3 polls vs ~16); regressing into the timeout branch makes every
/// scene load pay the full fast-load window.
///
/// **BUG THIS CATCHES**: Would catch the mismatch flag not being recorded,
/// which would force the timeout branch even for slow loads.
#[test]
fn given_slow_scene_load_when_waited_then_exits_via_success_branch() {
    // GIVEN: A booted viewer whose scene load reports loading twice
    let address = unique_address("scene-success");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);
    let dir = TempDir::new().expect("temp dir");
    let mut controller = booted_controller(&stub, &dir);

    // Let any state query still in flight from the boot poll drain before
    // swapping the script.
    std::thread::sleep(Duration::from_millis(20));

    let queries_before = stub.state_query_count();
    stub.set_state_script(vec![
        StubBehavior::Reply(1),
        StubBehavior::Reply(1),
        StubBehavior::Reply(0),
    ]);

    // WHEN: Loading the scene
    controller
        .load_scene_and_wait(&test_scene())
        .expect("scene load should succeed");

    // THEN: The viewer got the scene exactly once, and the wait exited after
    // a handful of polls (the timeout branch needs 16+)
    assert_eq!(stub.scene_open_count(), 1);
    let scene_polls = stub.state_query_count() - queries_before;
    assert!(
        (3..=6).contains(&scene_polls),
        "expected the success branch (few polls), saw {scene_polls}"
    );

    controller.force_stop();
}

/// **VALUE**: Verifies the fast-load path: a scene load that never shows a
/// loading status is waited out and still reported as success.
#[test]
fn given_instant_scene_load_when_waited_then_fast_timeout_is_success() {
    // GIVEN: A booted viewer that reports ready throughout the load
    let address = unique_address("scene-fast");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);
    let dir = TempDir::new().expect("temp dir");
    let mut controller = booted_controller(&stub, &dir);

    std::thread::sleep(Duration::from_millis(20));
    let queries_before = stub.state_query_count();

    // WHEN: Loading the scene
    controller
        .load_scene_and_wait(&test_scene())
        .expect("fast load should still be success");

    // THEN: The wait burned through the full fast-load window
    let scene_polls = stub.state_query_count() - queries_before;
    assert!(
        scene_polls >= 16,
        "expected the fast-load window (16+ polls), saw {scene_polls}"
    );

    controller.force_stop();
}

/// **VALUE**: Verifies shutdown sends exactly one stop command from
/// `Processing`, transitions to `Closing`, and that a second shutdown sends
/// nothing further.
///
/// **BUG THIS CATCHES**: Would catch a repeated shutdown re-sending stop
/// commands to a viewer that is already tearing down.
#[test]
fn given_processing_viewer_when_shutdown_twice_then_one_stop_command() {
    // GIVEN: A booted, processing viewer
    let address = unique_address("shutdown");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);
    let dir = TempDir::new().expect("temp dir");
    let mut controller = booted_controller(&stub, &dir);

    // WHEN: Requesting shutdown
    controller.shutdown();

    // THEN: Status is closing and exactly one stop command went out
    assert_eq!(controller.status(), ProcessStatus::Closing);
    assert!(
        wait_until(TEST_TIMEOUT, || stub.stop_command_count() == 1),
        "expected one stop command"
    );

    // WHEN: Requesting shutdown again while closing
    controller.shutdown();

    // THEN: No further command is sent
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(stub.stop_command_count(), 1);
    assert_eq!(controller.status(), ProcessStatus::Closing);

    controller.force_stop();
}

/// **VALUE**: Verifies a missing viewer executable surfaces as a launch
/// error and leaves the controller in `Closed`.
#[test]
fn given_missing_executable_when_booted_then_launch_error() {
    let address = unique_address("launch-fail");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("no-such-viewer");

    let mut controller = ViewerController::new(test_config(stub.address(), missing));

    let result = controller.start_and_wait_ready();

    assert!(matches!(result, Err(CoreError::Lifecycle(_))));
    assert_eq!(controller.status(), ProcessStatus::Closed);
}

/// **VALUE**: Verifies a viewer that dies during boot is reported as a hard
/// failure instead of the wait spinning to its timeout.
#[test]
fn given_viewer_dying_during_boot_when_waited_then_exit_error() {
    // GIVEN: A fake viewer that exits immediately
    let address = unique_address("boot-death");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(1)]);
    let dir = TempDir::new().expect("temp dir");
    let viewer = fake_viewer(dir.path(), "exit 0");

    let mut controller = ViewerController::new(test_config(stub.address(), viewer));

    // WHEN: Booting
    let result = controller.start_and_wait_ready();

    // THEN: The unexpected exit surfaces as a lifecycle error
    assert!(matches!(result, Err(CoreError::Lifecycle(_))));
}

/// **VALUE**: Verifies the watchdog transitions: a live process promotes
/// `Boot` to `Processing`; a vanished process lands in `Closed` and stops
/// the command sender.
#[test]
fn given_process_exit_when_watchdog_polls_then_closed_and_sender_stopped() {
    // GIVEN: A booted, processing viewer
    let address = unique_address("watchdog");
    let stub = StubViewer::spawn(&address, vec![StubBehavior::Reply(0)]);
    let dir = TempDir::new().expect("temp dir");
    let mut controller = booted_controller(&stub, &dir);
    assert!(controller.sender().is_started());

    // WHEN: The process dies and the watchdog observes it
    controller.force_stop();
    controller.poll_process();

    // THEN: The controller is back to closed with the sender stopped
    assert_eq!(controller.status(), ProcessStatus::Closed);
    assert!(!controller.sender().is_started());
}
