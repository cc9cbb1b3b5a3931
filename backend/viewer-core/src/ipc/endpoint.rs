use crate::error::transport::TransportError;

use common::ErrorLocation;

use std::env::temp_dir;
use std::panic::Location;
use std::path::{Path, PathBuf};

use url::Url;

const ENDPOINT_SCHEME: &str = "ipc";
const SOCKET_SUFFIX: &str = ".sock";

/// Parsed form of a URL-style local endpoint address (`ipc://<name>`).
///
/// The name resolves to a Unix-domain socket path under the system temp
/// directory; both sides of the channel derive the same path from the same
/// well-known address string, so no other discovery is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
    path: PathBuf,
}

impl Endpoint {
    #[track_caller]
    pub fn parse(address: &str) -> Result<Self, TransportError> {
        let url = Url::parse(address).map_err(|e| TransportError::Endpoint {
            message: format!("Invalid endpoint address '{address}': {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if url.scheme() != ENDPOINT_SCHEME {
            return Err(TransportError::Endpoint {
                message: format!(
                    "Unsupported scheme '{}' in endpoint address '{address}'",
                    url.scheme()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let name = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| TransportError::Endpoint {
                message: format!("Endpoint address '{address}' has no name"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let path = temp_dir().join(format!("{name}{SOCKET_SUFFIX}"));

        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }
}
