//! Liveness and timeout supervision
//!
//! Detects stalled frames, unanswered registrations, and a silent host.

pub mod monitor;

pub use monitor::{LivenessMonitor, LivenessStatus};
