//! Connection state machine
//!
//! Defines where the link stands in the identity and registration handshake.
//! The state machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{ConnectionState, StopReason};
