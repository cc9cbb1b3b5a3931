use crate::error::codec::CodecError;
use crate::protocol::envelope::Envelope;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Exit code plus human-readable message carried by a reply envelope.
///
/// For state queries the code doubles as the remote [`ViewerState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub code: i32,
    pub message: String,
}

impl Reply {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Decode the reply out of a received envelope.
    #[track_caller]
    pub fn from_envelope_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        match Envelope::decode(bytes)? {
            Envelope::Reply(reply) => Ok(reply),
            Envelope::ViewerCommand(command) => Err(CodecError::Decode {
                message: format!(
                    "Expected a reply envelope, got a {} command",
                    command.name()
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// The viewer state encoded in this reply, if the code maps to one.
    pub fn state(&self) -> Option<ViewerState> {
        ViewerState::from_code(self.code)
    }
}

/// Remote readiness as reported by a state-query reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Ready = 0,
    Loading = 1,
}

impl ViewerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ViewerState::Ready),
            1 => Some(ViewerState::Loading),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}
