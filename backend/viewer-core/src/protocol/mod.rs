//! Wire protocol between the host and the stage viewer.
//!
//! Every exchange is strict request/reply: the host sends one [`Envelope`]
//! carrying a [`ViewerCommand`], the viewer answers with one envelope
//! carrying a [`Reply`]. Payloads are JSON; framing (length prefix) is the
//! transport's job, so this module never sees partial bytes.
//!
//! The command set is a closed enum: adding a command means adding a variant
//! and letting the tagged serde codec handle both directions. There is no
//! per-command id/branch dispatch to keep in sync.

mod command;
mod envelope;
mod reply;

pub use command::{ClippingMethod, ClippingPlane, SceneOption, ViewerCommand};
pub use envelope::Envelope;
pub use reply::{Reply, ViewerState};
