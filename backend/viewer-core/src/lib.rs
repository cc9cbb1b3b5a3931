pub mod config;
pub mod error;
pub mod ipc;
pub mod lifecycle;
pub mod protocol;
pub mod sender;

#[cfg(test)]
mod tests;

pub const VIEWER_BINARY: &str = "stageviewer";
pub const VIEWER_ENDPOINT: &str = const_format::concatcp!("ipc://", VIEWER_BINARY);
