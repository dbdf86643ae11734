//! Application-facing traits
//!
//! These traits define the interface between the protocol engine and the
//! firmware that embeds it.

pub mod handler;

pub use handler::Handler;
