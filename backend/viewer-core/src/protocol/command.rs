use serde::{Deserialize, Serialize};

/// One key/value option attached to an open-scene request.
///
/// Options are an ordered list, not a map: the viewer applies them in the
/// order the host wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOption {
    pub key: String,
    pub value: String,
}

impl SceneOption {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Which clipping planes the viewer applies to the scene volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClippingPlane {
    Both,
    Front,
    Top,
    None,
}

/// How aggressively the viewer clips against the display volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClippingMethod {
    None,
    Same,
    IncHalf,
}

/// The closed set of control commands the viewer understands.
///
/// `set_object_transform` carries a row-major 16-element matrix; `open_scene`
/// carries the interchange file path plus its ordered options (by convention
/// `camera` and `aim_length`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", content = "body", rename_all = "snake_case")]
pub enum ViewerCommand {
    OpenScene {
        path: String,
        options: Vec<SceneOption>,
    },
    SetObjectTransform {
        name: String,
        transform: [f32; 16],
    },
    StartAnimation,
    StopAnimation,
    SetAnimationFrame {
        frame: i32,
        fps: f32,
    },
    GetViewerState,
    SelectCamera {
        name: String,
    },
    SetCameraAimLength {
        length: f32,
    },
    EditCameraAim {
        enabled: bool,
    },
    StopViewer,
    StartExporting,
    EndExporting,
    SetClipping {
        plane: ClippingPlane,
        method: ClippingMethod,
    },
}

impl ViewerCommand {
    /// Wire tag of this command, for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ViewerCommand::OpenScene { .. } => "open_scene",
            ViewerCommand::SetObjectTransform { .. } => "set_object_transform",
            ViewerCommand::StartAnimation => "start_animation",
            ViewerCommand::StopAnimation => "stop_animation",
            ViewerCommand::SetAnimationFrame { .. } => "set_animation_frame",
            ViewerCommand::GetViewerState => "get_viewer_state",
            ViewerCommand::SelectCamera { .. } => "select_camera",
            ViewerCommand::SetCameraAimLength { .. } => "set_camera_aim_length",
            ViewerCommand::EditCameraAim { .. } => "edit_camera_aim",
            ViewerCommand::StopViewer => "stop_viewer",
            ViewerCommand::StartExporting => "start_exporting",
            ViewerCommand::EndExporting => "end_exporting",
            ViewerCommand::SetClipping { .. } => "set_clipping",
        }
    }
}
