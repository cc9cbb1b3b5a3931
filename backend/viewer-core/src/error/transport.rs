use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("Endpoint Error: {message} {location}")]
    Endpoint {
        message: String,
        location: ErrorLocation,
    },

    #[error("Dial Error: {message} {location}")]
    Dial {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Context Acquire Error: {message} {location}")]
    ContextAcquire {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Not Started Error: {message} {location}")]
    NotStarted {
        message: String,
        location: ErrorLocation,
    },
}
