use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::error::codec::CodecError;
use crate::error::lifecycle::LifecycleError;
use crate::ipc::ReplyKind;
use crate::lifecycle::process::ViewerProcess;
use crate::protocol::{
    ClippingMethod, ClippingPlane, Reply, SceneOption, ViewerCommand, ViewerState,
};
use crate::sender::CommandSender;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread::sleep;
use std::time::Duration;

use log::{debug, error, info, trace, warn};

/// Unconditional settle polls before the readiness loop may declare success,
/// and the iteration bound past which it gives up waiting.
const BOOT_SETTLE_ITERATIONS: u32 = 5;
const BOOT_MAX_ITERATIONS: u32 = 20;

/// Same pair for the scene-load loop. The max bound only applies when a
/// loading status was never observed (the load outran the first poll).
const LOAD_SETTLE_ITERATIONS: u32 = 5;
const LOAD_MAX_ITERATIONS: u32 = 15;

/// Lifecycle position of the external viewer process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Boot,
    Processing,
    Closing,
    Closed,
}

/// Everything needed to present one scene in the viewer.
///
/// Producing the interchange file (and the camera/aim numbers) is the host's
/// job; this struct only describes the result.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    pub scene_path: String,
    pub camera_name: String,
    pub aim_length: f32,
    pub clipping_plane: ClippingPlane,
    pub clipping_method: ClippingMethod,
}

/// State machine managing viewer boot, readiness polling, scene-load polling
/// and shutdown.
///
/// One controller instance owns one viewer process and one command sender;
/// whoever installs the host integration owns the controller and passes it
/// into event/timer handlers by reference.
pub struct ViewerController {
    config: BridgeConfig,
    status: ProcessStatus,
    process: Option<ViewerProcess>,
    sender: CommandSender,
}

impl ViewerController {
    pub fn new(config: BridgeConfig) -> Self {
        let sender = CommandSender::with_timeouts(
            &config.viewer.endpoint,
            Duration::from_millis(config.viewer.send_timeout_ms),
            Duration::from_millis(config.viewer.receive_timeout_ms),
        );

        Self {
            config,
            status: ProcessStatus::Closed,
            process: None,
            sender,
        }
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn sender(&self) -> &CommandSender {
        &self.sender
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// One watchdog step; the host calls this on a short fixed interval
    /// (`polling.watchdog_interval_ms`).
    ///
    /// Observes the process handle: an exit during `Closing` is a clean
    /// close, an exit during `Boot` is a connection failure, an exit during
    /// `Processing` is a disconnection. Whenever the process is gone the
    /// command sender is stopped. A process seen alive promotes `Boot` to
    /// `Processing`, the only place that transition happens.
    pub fn poll_process(&mut self) {
        let alive = match self.process.as_mut() {
            Some(process) => process.is_alive(),
            None => false,
        };

        if !alive {
            match self.status {
                ProcessStatus::Boot => error!("Failed to connect with the stage viewer"),
                ProcessStatus::Processing => info!("Disconnected from the stage viewer"),
                ProcessStatus::Closing => info!("Finished closing the stage viewer"),
                ProcessStatus::Closed => {}
            }
            self.status = ProcessStatus::Closed;
            self.process = None;
            if self.sender.is_started() {
                self.sender.stop();
            }
            return;
        }

        if self.status == ProcessStatus::Boot {
            debug!("Stage viewer process is up");
            self.status = ProcessStatus::Processing;
        }
    }

    /// Launch the viewer if needed and poll until it reports ready.
    ///
    /// The loop always waits through the settle iterations before it may
    /// test for readiness, even if the remote already reports ready; past
    /// the give-up bound it stops polling and reports success anyway,
    /// leaving a warning in the log.
    pub fn start_and_wait_ready(&mut self) -> Result<(), CoreError> {
        let poll = Duration::from_millis(self.config.polling.boot_poll_ms);

        if self.status == ProcessStatus::Processing {
            if !self.sender.is_started() {
                self.sender.start()?;
            }
            return Ok(());
        }

        self.launch()?;

        let expected = ViewerState::Ready.code();
        let observed = Arc::new(AtomicI32::new(expected));
        let mut counter: u32 = 0;

        loop {
            sleep(poll);

            if self.status != ProcessStatus::Processing && self.process_exited() {
                error!("Stage viewer exited before reporting ready");
                return Err(LifecycleError::Exited {
                    message: "Stage viewer exited before reporting ready".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }
                .into());
            }

            if !self.sender.is_started() {
                // The viewer creates its listener some time after launch;
                // dial failures here just mean "not yet".
                if let Err(e) = self.sender.start() {
                    debug!("Viewer endpoint not ready yet: {e}");
                }
                sleep(poll);
                continue;
            }

            self.query_state(&observed)?;

            if counter < BOOT_SETTLE_ITERATIONS {
                trace!("Readiness poll settling ({counter})");
                sleep(poll);
                counter += 1;
                continue;
            }

            if observed.load(Ordering::SeqCst) == expected {
                debug!("Stage viewer reported ready");
                break;
            }

            counter += 1;
            sleep(poll);
            if counter > BOOT_MAX_ITERATIONS {
                warn!("Gave up waiting for the stage viewer to report ready");
                break;
            }
        }

        info!("Started the stage viewer");
        Ok(())
    }

    /// Open `scene` in the viewer and poll until the load settles.
    ///
    /// Tracks whether a loading status was ever observed; a load too fast
    /// for that is waited out and then treated as success.
    pub fn load_scene_and_wait(&mut self, scene: &SceneDescription) -> Result<(), CoreError> {
        let poll = Duration::from_millis(self.config.polling.scene_poll_ms);

        self.open_scene(scene)?;

        let expected = ViewerState::Ready.code();
        let observed = Arc::new(AtomicI32::new(expected));
        let mut start_wait = false;
        let mut need_timeout = false;
        let mut counter: u32 = 0;

        loop {
            self.query_state(&observed)?;
            let ready = observed.load(Ordering::SeqCst) == expected;

            if !ready {
                if !start_wait {
                    info!("Scene load in progress");
                    start_wait = true;
                } else {
                    trace!("Scene load poll: still loading");
                }
                sleep(poll);
                counter += 1;
                continue;
            }

            if !start_wait && !need_timeout {
                if counter < LOAD_SETTLE_ITERATIONS {
                    trace!("Scene load poll settling ({counter})");
                } else {
                    // Five settle polls without ever observing a loading
                    // status; arm the fast-load timeout.
                    debug!("Scene load poll: arming fast-load timeout");
                    need_timeout = true;
                }
                sleep(poll);
                counter += 1;
                continue;
            }

            if start_wait {
                info!("Scene load finished");
                break;
            }

            if counter > LOAD_MAX_ITERATIONS {
                info!("Scene load poll timed out; assuming the load already finished");
                break;
            }
            trace!("Scene load poll: waiting out the fast-load window");
            sleep(poll);
            counter += 1;
        }

        Ok(())
    }

    /// Full host-to-viewer synchronization of one scene: ensure the viewer
    /// is running, bracket the interchange-file handoff with the exporting
    /// commands, load the scene, then push camera and clipping settings.
    pub fn sync_scene(&mut self, scene: &SceneDescription) -> Result<(), CoreError> {
        self.start_and_wait_ready()?;

        self.send_logged(ViewerCommand::StartExporting, "begin exporting")?;

        if let Err(e) = self.load_scene_and_wait(scene) {
            // Tell the viewer the handoff is off before surfacing the error.
            let _ = self.send_logged(ViewerCommand::EndExporting, "cancel exporting");
            return Err(e);
        }

        self.select_camera(&scene.camera_name)?;
        self.set_camera_aim_length(scene.aim_length)?;
        self.set_clipping(scene.clipping_plane, scene.clipping_method)?;

        Ok(())
    }

    /// Request viewer shutdown. `Processing` sends exactly one stop command
    /// and moves to `Closing`; the `Closed` transition happens through the
    /// watchdog once the process actually exits.
    pub fn shutdown(&mut self) {
        match self.status {
            ProcessStatus::Processing => {
                info!("Start closing the stage viewer");
                self.status = ProcessStatus::Closing;
                self.send_outcome_logged(ViewerCommand::StopViewer, "viewer stop");
            }
            ProcessStatus::Closing => {
                info!("Already closing the stage viewer");
            }
            ProcessStatus::Boot => {}
            ProcessStatus::Closed => {
                if self.sender.is_started() {
                    self.sender.stop();
                }
            }
        }
    }

    /// Last-resort teardown for a viewer that ignores the stop command.
    pub fn force_stop(&mut self) {
        if let Some(process) = self.process.as_mut() {
            if process.force_stop() {
                self.status = ProcessStatus::Closed;
                self.process = None;
            }
        }
        if self.sender.is_started() {
            self.sender.stop();
        }
    }

    // ============================================
    // COMMAND OPERATIONS
    // ============================================

    /// Push one object's world transform (row-major 16 elements).
    pub fn set_object_transform(&self, name: &str, transform: [f32; 16]) -> bool {
        let accepted = self.sender.post_command(ViewerCommand::SetObjectTransform {
            name: name.to_string(),
            transform,
        });

        if accepted {
            info!("Load transform success: {name}");
        } else {
            warn!("Load transform failure: {name}");
        }
        accepted
    }

    /// Start animation playback. Skipped unless the viewer is running.
    pub fn start_animation(&self) {
        if self.status != ProcessStatus::Processing {
            return;
        }
        if self.sender.post_command(ViewerCommand::StartAnimation) {
            info!("Succeeded in starting animation");
        }
    }

    /// Stop animation playback. Skipped unless the viewer is running.
    pub fn stop_animation(&self) {
        if self.status != ProcessStatus::Processing {
            return;
        }
        if self.sender.post_command(ViewerCommand::StopAnimation) {
            info!("Succeeded in stopping animation");
        }
    }

    /// Jump the viewer to `frame` at `fps`. Skipped unless running.
    pub fn set_animation_frame(&self, frame: i32, fps: f32) {
        if self.status != ProcessStatus::Processing {
            return;
        }
        if self
            .sender
            .post_command(ViewerCommand::SetAnimationFrame { frame, fps })
        {
            info!("Succeeded in setting animation frame {frame} / {fps} [fps]");
        }
    }

    /// Select the render camera by name. An empty name is refused before it
    /// reaches the wire.
    #[track_caller]
    pub fn select_camera(&self, name: &str) -> Result<(), CoreError> {
        if name.is_empty() {
            return Err(CodecError::Encode {
                message: "Cannot select a camera without a name".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        }

        self.send_logged(
            ViewerCommand::SelectCamera {
                name: name.to_string(),
            },
            "select camera",
        )
    }

    pub fn set_camera_aim_length(&self, length: f32) -> Result<(), CoreError> {
        self.send_logged(
            ViewerCommand::SetCameraAimLength { length },
            "set camera aim length",
        )
    }

    /// Toggle interactive aim editing in the viewer.
    pub fn edit_camera_aim(&self, enabled: bool) {
        self.sender
            .post_command(ViewerCommand::EditCameraAim { enabled });
    }

    pub fn set_clipping(
        &self,
        plane: ClippingPlane,
        method: ClippingMethod,
    ) -> Result<(), CoreError> {
        self.send_logged(
            ViewerCommand::SetClipping { plane, method },
            "set clipping",
        )
    }

    // ============================================
    // INTERNALS
    // ============================================

    /// Spawn the viewer process and enter `Boot`. A boot or shutdown already
    /// in flight refuses the launch.
    #[track_caller]
    fn launch(&mut self) -> Result<(), CoreError> {
        // A relaunch always renegotiates the channel.
        if self.sender.is_started() {
            self.sender.stop();
        }

        if self.status == ProcessStatus::Boot {
            info!("Already starting the stage viewer");
            return Err(LifecycleError::Busy {
                message: "Stage viewer is already starting".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        }

        if self.status == ProcessStatus::Closing {
            error!("Unable to start while the stage viewer is closing");
            return Err(LifecycleError::Busy {
                message: "Cannot start while the stage viewer is closing".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        }

        match ViewerProcess::launch(&self.config.viewer.viewer_path) {
            Ok(process) => {
                self.process = Some(process);
                self.status = ProcessStatus::Boot;
                Ok(())
            }
            Err(e) => {
                self.status = ProcessStatus::Closed;
                error!("Cannot launch the stage viewer: {e}");
                Err(e.into())
            }
        }
    }

    fn process_exited(&mut self) -> bool {
        match self.process.as_mut() {
            Some(process) => !process.is_alive(),
            None => true,
        }
    }

    /// Submit a state query whose reply records the remote status code into
    /// `observed`. Mid-poll round-trip failures leave `observed` untouched;
    /// only a context-acquisition failure surfaces as an error.
    fn query_state(&self, observed: &Arc<AtomicI32>) -> Result<(), CoreError> {
        let slot = Arc::clone(observed);
        self.sender
            .send_command(ViewerCommand::GetViewerState, move |kind, code, payload| {
                if kind == ReplyKind::Recv && code == 0 {
                    if let Ok(reply) = Reply::from_envelope_bytes(&payload) {
                        slot.store(reply.code, Ordering::SeqCst);
                    }
                }
            })
    }

    fn open_scene(&self, scene: &SceneDescription) -> Result<(), CoreError> {
        let command = ViewerCommand::OpenScene {
            path: scene.scene_path.clone(),
            options: vec![
                SceneOption::new("camera", &scene.camera_name),
                SceneOption::new("aim_length", scene.aim_length.to_string()),
            ],
        };

        self.send_logged(command, "send the scene")?;
        info!("Sent the scene to the stage viewer");
        Ok(())
    }

    /// Submit a command whose reply outcome is logged; submit failures
    /// propagate to the caller.
    fn send_logged(&self, command: ViewerCommand, action: &'static str) -> Result<(), CoreError> {
        self.sender.send_command(command, move |_kind, code, _payload| {
            if code == 0 {
                info!("{action}: success");
            } else {
                warn!("{action}: failure [{code}]");
            }
        })
    }

    /// Like [`Self::send_logged`] but submit failures are logged too, for
    /// paths that must not propagate (shutdown).
    fn send_outcome_logged(&self, command: ViewerCommand, action: &'static str) {
        if let Err(e) = self.send_logged(command, action) {
            error!("{action}: could not submit command: {e}");
        }
    }
}
