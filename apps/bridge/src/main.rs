use stagebridge::error::BridgeError;
use stagebridge::logger::initialize as LoggerInitialize;

use viewer_core::config::BridgeConfig;
use viewer_core::lifecycle::{ProcessStatus, SceneDescription, ViewerController};
use viewer_core::protocol::{ClippingMethod, ClippingPlane};

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use log::info;

const APP_DIR_NAME: &str = "stagelink";
const DEFAULT_CAMERA_NAME: &str = "camera1";
const DEFAULT_AIM_LENGTH: f32 = 1.0;
const USAGE: &str = "usage: stagebridge <scene-path> [camera-name] [aim-length]";

fn main() {
    if let Err(e) = run() {
        eprintln!("stagebridge: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), BridgeError> {
    let scene = parse_args()?;

    let log_dir = app_data_dir()?.join("logs");
    create_dir_all(&log_dir).map_err(|e| BridgeError::Bridge {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST; everything below reports through it
    LoggerInitialize(&log_dir)?;

    info!("Stagebridge starting");
    info!("Log directory: {}", log_dir.display());

    let config_dir = dirs::config_dir()
        .ok_or_else(|| BridgeError::Bridge {
            message: "No config directory available on this platform".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?
        .join(APP_DIR_NAME);
    let config = BridgeConfig::load(&config_dir)?;

    let watchdog_interval = Duration::from_millis(config.polling.watchdog_interval_ms);
    let mut controller = ViewerController::new(config);

    controller.sync_scene(&scene)?;

    info!("Scene synchronized; watching the viewer process (close the viewer to exit)");

    loop {
        controller.poll_process();
        if controller.status() == ProcessStatus::Closed {
            break;
        }
        sleep(watchdog_interval);
    }

    info!("Viewer closed; exiting");
    Ok(())
}

fn parse_args() -> Result<SceneDescription, BridgeError> {
    let mut args = env::args().skip(1);

    let scene_path = args.next().ok_or_else(|| BridgeError::Bridge {
        message: USAGE.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let camera_name = args
        .next()
        .unwrap_or_else(|| DEFAULT_CAMERA_NAME.to_string());

    let aim_length = match args.next() {
        Some(raw) => raw.parse::<f32>().map_err(|e| BridgeError::Bridge {
            message: format!("Invalid aim length '{raw}': {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?,
        None => DEFAULT_AIM_LENGTH,
    };

    Ok(SceneDescription {
        scene_path,
        camera_name,
        aim_length,
        clipping_plane: ClippingPlane::None,
        clipping_method: ClippingMethod::None,
    })
}

fn app_data_dir() -> Result<PathBuf, BridgeError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| BridgeError::Bridge {
            message: "No local data directory available on this platform".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
}
