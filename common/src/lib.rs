//! Shared leaf types for the stagelink workspace.
//!
//! This crate holds the small types every other crate depends on. It has no
//! business logic; keeping it a leaf avoids dependency cycles between the
//! core library and the host application.

pub mod error_location;

pub use error_location::ErrorLocation;
