use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;
use viewer_core::error::CoreError;
use viewer_core::error::config::ConfigError;

/// Errors surfaced by the bridge application itself.
///
/// Core failures keep their formatted message and the call site where the
/// bridge observed them; the structured detail has already been logged by
/// the core at that point.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Error from the bridge application wiring (arguments, directories,
    /// logger).
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },

    /// Error from viewer-core operations (transport, lifecycle, config).
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for BridgeError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        BridgeError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for BridgeError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        BridgeError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
