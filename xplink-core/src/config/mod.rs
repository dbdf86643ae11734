//! Configuration types
//!
//! Board-agnostic tuning for the protocol engine.

pub mod types;

pub use types::*;
