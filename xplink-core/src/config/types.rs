//! Configuration type definitions
//!
//! Timeouts and wire formatting for one engine instance. The defaults match
//! the reference host plugin.

use xplink_protocol::{FieldFormat, MAX_PAYLOAD_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum dataref or command name length
pub const MAX_NAME_LEN: usize = 96;

/// Maximum registered datarefs and commands
pub const MAX_REGISTRATIONS: usize = 32;

/// Longest string dataref value kept in the inbound slot
pub const MAX_STRING_LEN: usize = MAX_PAYLOAD_SIZE;

/// After a frame header, longest gap between bytes before the frame is dropped
pub const RX_TIMEOUT_MS: u32 = 500;

/// How long to wait for registration responses
///
/// Very large: the simulator may report the aircraft loaded and then stay
/// busy for tens of seconds before it answers.
pub const RESPONSE_TIMEOUT_MS: u32 = 90_000;

/// Bytes drained from the transport per poll
pub const MAX_BYTES_PER_POLL: u16 = 256;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Inter-byte gap (ms) that abandons a partial frame
    pub rx_timeout_ms: u32,
    /// Silence (ms) from the host while resolving before giving up on
    /// outstanding registrations
    pub response_timeout_ms: u32,
    /// Silence (ms) while connected before the link counts as lost
    ///
    /// Hosts that only push on change need this raised well above the
    /// slowest subscription rate.
    pub link_timeout_ms: u32,
    /// Upper bound on bytes consumed in one poll
    pub max_bytes_per_poll: u16,
    /// Field widths and float precision
    pub fields: FieldFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rx_timeout_ms: RX_TIMEOUT_MS,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            link_timeout_ms: RX_TIMEOUT_MS,
            max_bytes_per_poll: MAX_BYTES_PER_POLL,
            fields: FieldFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Same configuration with a different float precision
    pub fn with_float_precision(mut self, digits: u8) -> Self {
        self.fields.float_precision = digits;
        self
    }

    /// Same configuration with a different link timeout
    pub fn with_link_timeout(mut self, timeout_ms: u32) -> Self {
        self.link_timeout_ms = timeout_ms;
        self
    }
}
