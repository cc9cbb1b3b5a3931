use crate::error::transport::TransportError;
use crate::ipc::endpoint::Endpoint;

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::panic::Location;
use std::time::Duration;

use log::debug;

/// Upper bound on a single wire frame. Anything larger is treated as a
/// corrupt stream rather than an allocation request.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
const FRAME_HEADER_BYTES: usize = 4;

/// Dial side of the request/reply channel.
///
/// Holds a probe stream for the lifetime of the session (so a vanished
/// listener is caught at start, not at first request) and opens one fresh
/// [`RequestContext`] per pooled work item.
pub struct Connection {
    endpoint: Endpoint,
    probe: UnixStream,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
}

impl Connection {
    /// Parse `address` and dial it. On failure nothing is retained; the
    /// caller can retry with a fresh call once the listener exists.
    #[track_caller]
    pub fn open(
        address: &str,
        send_timeout: Option<Duration>,
        receive_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let endpoint = Endpoint::parse(address)?;

        let probe =
            UnixStream::connect(endpoint.socket_path()).map_err(|e| TransportError::Dial {
                message: format!("Failed to dial {}", endpoint.socket_path().display()),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        debug!("Dialed viewer endpoint '{}'", endpoint.name());

        Ok(Self {
            endpoint,
            probe,
            send_timeout,
            receive_timeout,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Open a fresh request context: its own dialed stream with the
    /// session's per-direction timeouts applied.
    #[track_caller]
    pub fn open_context(&self) -> Result<RequestContext, TransportError> {
        let stream = UnixStream::connect(self.endpoint.socket_path()).map_err(|e| {
            TransportError::ContextAcquire {
                message: format!(
                    "Failed to open a request context on {}",
                    self.endpoint.socket_path().display()
                ),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            }
        })?;

        stream
            .set_write_timeout(self.send_timeout)
            .and_then(|_| stream.set_read_timeout(self.receive_timeout))
            .map_err(|e| TransportError::ContextAcquire {
                message: format!("Failed to configure request context timeouts: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        Ok(RequestContext { stream })
    }

    pub fn close(&self) {
        let _ = self.probe.shutdown(Shutdown::Both);
    }
}

/// A peer-addressable channel endpoint bound to the request/reply socket,
/// used for exactly one request at a time.
///
/// All methods take `&self`; in particular [`RequestContext::close`] may be
/// called from another thread to unblock a worker stuck in a blocking call.
pub struct RequestContext {
    stream: UnixStream,
}

impl RequestContext {
    /// Blocking framed send: 4-byte little-endian length prefix, then the
    /// payload. Honors the write timeout configured at open.
    pub fn send(&self, payload: &[u8]) -> IoResult<()> {
        if payload.len() > MAX_FRAME_BYTES {
            return Err(IoError::new(
                ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds the frame cap", payload.len()),
            ));
        }

        let mut stream = &self.stream;
        let header = (payload.len() as u32).to_le_bytes();
        stream.write_all(&header)?;
        stream.write_all(payload)?;
        stream.flush()
    }

    /// Blocking framed receive, the inverse of [`RequestContext::send`].
    pub fn recv(&self) -> IoResult<Vec<u8>> {
        let mut stream = &self.stream;

        let mut header = [0u8; FRAME_HEADER_BYTES];
        stream.read_exact(&mut header)?;

        let length = u32::from_le_bytes(header) as usize;
        if length > MAX_FRAME_BYTES {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!("peer announced a frame of {length} bytes"),
            ));
        }

        let mut payload = vec![0u8; length];
        stream.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Force-close both directions, releasing the peer-side resources and
    /// unblocking any pending send or receive on this context.
    pub fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
