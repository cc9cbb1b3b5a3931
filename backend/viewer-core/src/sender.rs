//! Serialization boundary between typed viewer commands and the IPC client.

use crate::error::CoreError;
use crate::ipc::{Client, ReplyKind};
use crate::protocol::{Envelope, ViewerCommand};

use std::time::Duration;

use log::{error, trace, warn};

/// Default per-direction transport timeout for command round trips.
const COMMAND_TIMEOUT: Duration = Duration::from_millis(300);

/// Encodes viewer commands into wire envelopes and hands them to the
/// request/reply client it owns.
pub struct CommandSender {
    address: String,
    client: Client,
}

impl CommandSender {
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_timeouts(address, COMMAND_TIMEOUT, COMMAND_TIMEOUT)
    }

    pub fn with_timeouts(
        address: impl Into<String>,
        send_timeout: Duration,
        receive_timeout: Duration,
    ) -> Self {
        let mut client = Client::new();
        client.set_send_timeout(send_timeout);
        client.set_receive_timeout(receive_timeout);
        Self {
            address: address.into(),
            client,
        }
    }

    pub fn start(&mut self) -> Result<(), CoreError> {
        self.client.start(&self.address)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.client.stop();
    }

    pub fn is_started(&self) -> bool {
        self.client.is_started()
    }

    /// Advisory health signal: consecutive transport failures on the
    /// underlying client.
    pub fn error_count(&self) -> u32 {
        self.client.error_count()
    }

    /// Encode `command` and submit it. `reply` fires exactly once with the
    /// raw reply bytes, or with a non-zero code and an empty payload if the
    /// round trip failed.
    pub fn send_command<F>(&self, command: ViewerCommand, reply: F) -> Result<(), CoreError>
    where
        F: FnOnce(ReplyKind, i32, Vec<u8>) + Send + 'static,
    {
        trace!("Sending {} command", command.name());
        let message = Envelope::ViewerCommand(command).encode()?;
        self.client.send(message, Box::new(reply))?;
        Ok(())
    }

    /// Fire-and-forget submit: failures (synchronous or from the round trip)
    /// are logged rather than returned. `true` means the command was
    /// accepted for sending.
    pub fn post_command(&self, command: ViewerCommand) -> bool {
        let name = command.name();
        let result = self.send_command(command, move |kind, code, _payload| {
            if code != 0 {
                warn!("{name} command failed during {kind:?} [{code}]");
            }
        });

        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to submit {name} command: {e}");
                false
            }
        }
    }
}
