use crate::error::codec::CodecError;
use crate::protocol::command::ViewerCommand;
use crate::protocol::reply::Reply;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Outer wire wrapper tagging a payload with its data-type discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data_type", content = "data", rename_all = "snake_case")]
pub enum Envelope {
    ViewerCommand(ViewerCommand),
    Reply(Reply),
}

impl Envelope {
    #[track_caller]
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode {
            message: format!("Failed to encode envelope: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            message: format!("Failed to decode envelope: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
