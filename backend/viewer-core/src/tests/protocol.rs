// Unit tests for the wire codec: envelope tagging, reply decoding, command
// payload shapes.

use crate::protocol::{
    ClippingMethod, ClippingPlane, Envelope, Reply, SceneOption, ViewerCommand, ViewerState,
};

use serde_json::Value;

/// **VALUE**: Verifies the envelope's outer tag layout
/// (`data_type`/`data`) and the command's inner tag layout (`id`/`body`).
///
/// **WHY THIS MATTERS**: The viewer on the other side of the socket decodes
/// by these exact field names. A serde attribute change silently breaks the
/// protocol while every in-process round-trip test keeps passing.
///
/// **BUG THIS CATCHES**: Would catch a renamed tag, a dropped
/// `rename_all = "snake_case"`, or a variant rename reaching the wire.
#[test]
fn given_command_envelope_when_encoded_then_wire_tags_are_stable() {
    // GIVEN: An open-scene command in an envelope
    let envelope = Envelope::ViewerCommand(ViewerCommand::OpenScene {
        path: "/tmp/stage.fbx".to_string(),
        options: vec![SceneOption::new("camera", "camera1")],
    });

    // WHEN: Encoding to JSON
    let bytes = envelope.encode().expect("encode should succeed");
    let value: Value = serde_json::from_slice(&bytes).expect("valid JSON");

    // THEN: Outer and inner tags carry the snake_case discriminators
    assert_eq!(value["data_type"], "viewer_command");
    assert_eq!(value["data"]["id"], "open_scene");
    assert_eq!(value["data"]["body"]["path"], "/tmp/stage.fbx");
    assert_eq!(value["data"]["body"]["options"][0]["key"], "camera");
}

/// **VALUE**: Verifies that a reply-bearing envelope decodes into a `Reply`
/// and that the code maps onto the viewer state.
///
/// **BUG THIS CATCHES**: Would catch the reply extraction accepting command
/// envelopes, or the state mapping drifting from `Ready=0, Loading=1`.
#[test]
fn given_reply_envelope_bytes_when_decoded_then_reply_and_state_extracted() {
    let bytes = Envelope::Reply(Reply::new(1, "loading scene"))
        .encode()
        .expect("encode should succeed");

    let reply = Reply::from_envelope_bytes(&bytes).expect("decode should succeed");

    assert_eq!(reply.code, 1);
    assert_eq!(reply.message, "loading scene");
    assert_eq!(reply.state(), Some(ViewerState::Loading));
}

/// **VALUE**: Verifies that a command envelope is refused where a reply is
/// expected, instead of being misread.
#[test]
fn given_command_envelope_bytes_when_decoded_as_reply_then_decode_error() {
    let bytes = Envelope::ViewerCommand(ViewerCommand::GetViewerState)
        .encode()
        .expect("encode should succeed");

    assert!(Reply::from_envelope_bytes(&bytes).is_err());
}

/// **VALUE**: Verifies open-scene options keep their insertion order through
/// the codec.
///
/// **WHY THIS MATTERS**: Options are an ordered list by contract; the
/// viewer applies them in the order the host wrote them. A refactor to a map
/// type would pass most tests while reordering keys on the wire.
#[test]
fn given_open_scene_options_when_round_tripped_then_order_preserved() {
    let command = ViewerCommand::OpenScene {
        path: "/tmp/stage.fbx".to_string(),
        options: vec![
            SceneOption::new("camera", "camera1"),
            SceneOption::new("aim_length", "2.5"),
        ],
    };

    let bytes = Envelope::ViewerCommand(command.clone())
        .encode()
        .expect("encode should succeed");
    let decoded = Envelope::decode(&bytes).expect("decode should succeed");

    assert_eq!(decoded, Envelope::ViewerCommand(command));
}

/// **VALUE**: Verifies that an unknown reply code yields no viewer state
/// rather than a bogus one.
#[test]
fn given_unknown_code_when_mapped_then_no_state() {
    assert_eq!(ViewerState::from_code(0), Some(ViewerState::Ready));
    assert_eq!(ViewerState::from_code(1), Some(ViewerState::Loading));
    assert_eq!(ViewerState::from_code(7), None);
    assert_eq!(ViewerState::from_code(-1), None);
}

/// **VALUE**: Verifies every command variant reports a stable wire name for
/// log lines.
#[test]
fn given_commands_when_named_then_names_match_wire_tags() {
    let cases = [
        (ViewerCommand::GetViewerState, "get_viewer_state"),
        (ViewerCommand::StopViewer, "stop_viewer"),
        (
            ViewerCommand::SetClipping {
                plane: ClippingPlane::Front,
                method: ClippingMethod::Same,
            },
            "set_clipping",
        ),
    ];

    for (command, expected) in cases {
        assert_eq!(command.name(), expected);
    }
}
