use crate::error::lifecycle::LifecycleError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};
use sysinfo::{Pid, Process, ProcessesToUpdate, Signal, System};

const PID_FLAG: &str = "--pid";
const KILL_VERIFY_MAX_ELAPSED: Duration = Duration::from_secs(5);

/// Handle to the spawned viewer process.
pub struct ViewerProcess {
    child: Child,
    pid: u32,
}

impl ViewerProcess {
    /// Spawn the viewer executable, passing the host pid on the command line
    /// (`--pid <callerPID>`) so the child can identify its parent. The
    /// socket address is a fixed well-known string; no other discovery is
    /// used.
    #[track_caller]
    pub fn launch(executable: &Path) -> Result<Self, LifecycleError> {
        let host_pid = std::process::id();
        debug!(
            "Launching viewer {} with {PID_FLAG} {host_pid}",
            executable.display()
        );

        let child = Command::new(executable)
            .arg(PID_FLAG)
            .arg(host_pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LifecycleError::Launch {
                message: format!("Failed to launch viewer {}: {e}", executable.display()),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        let pid = child.id();
        info!("Launched viewer process (PID: {pid})");

        Ok(Self { child, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking liveness probe: `true` while the child has not exited.
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                trace!("Viewer process exited: {status}");
                false
            }
            Err(e) => {
                warn!("Failed to query viewer process: {e}");
                false
            }
        }
    }

    /// Last-resort termination for a viewer that ignores the stop command:
    /// graceful signal first, force kill as fallback, then verify with a
    /// bounded backoff wait.
    ///
    /// Returns `true` once the process is gone.
    pub fn force_stop(&mut self) -> bool {
        let pid = self.pid;

        let signalled = with_process(pid, |p| {
            if let Some(sent) = p.kill_with(Signal::Term) {
                debug!("Sent SIGTERM to viewer PID {pid}: success={sent}");
                sent
            } else {
                let killed = p.kill();
                debug!("Sent SIGKILL to viewer PID {pid}: success={killed}");
                killed
            }
        })
        .unwrap_or(false);

        if !signalled {
            return !self.is_alive();
        }

        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(KILL_VERIFY_MAX_ELAPSED),
            ..Default::default()
        };

        loop {
            if !self.is_alive() {
                debug!("Viewer PID {pid} terminated");
                return true;
            }

            match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Viewer PID {pid} still alive, retrying after {duration:?}");
                    sleep(duration);
                }
                None => {
                    warn!("Viewer PID {pid} still running after max backoff time");
                    return false;
                }
            }
        }
    }
}

impl Drop for ViewerProcess {
    fn drop(&mut self) {
        // Reap the child if it already exited; a running viewer is left
        // alone; closing it is the controller's decision, not drop's.
        let _ = self.child.try_wait();
    }
}

fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let mut sys = System::new_all();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    sys.process(Pid::from_u32(pid)).map(f)
}
