use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LifecycleError {
    #[error("Launch Error: {message} {location}")]
    Launch {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Process Exit Error: {message} {location}")]
    Exited {
        message: String,
        location: ErrorLocation,
    },

    #[error("Busy Error: {message} {location}")]
    Busy {
        message: String,
        location: ErrorLocation,
    },
}
