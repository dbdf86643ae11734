//! Liveness monitor implementation
//!
//! Tracks when the last byte, frame, and registration exchange happened.
//! Time is a free-running millisecond counter supplied by the caller; all
//! arithmetic wraps, so the counter may roll over.

use crate::config::EngineConfig;
use crate::state::ConnectionState;

/// Verdict for the connection as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LivenessStatus {
    /// Nothing overdue
    Ok,
    /// Registration responses stopped arriving while resolving
    RegistrationExpired,
    /// No complete frame while connected for the link timeout
    LinkLost,
}

/// Liveness monitor for timeout detection
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    rx_timeout_ms: u32,
    response_timeout_ms: u32,
    link_timeout_ms: u32,
    /// Last byte received (ms)
    last_byte_ms: u32,
    /// Last complete frame received (ms)
    last_frame_ms: u32,
    /// Last registration request sent or response received (ms)
    last_registration_ms: u32,
}

impl LivenessMonitor {
    /// Create a new monitor with all timers starting at `now_ms`
    pub fn new(config: &EngineConfig, now_ms: u32) -> Self {
        Self {
            rx_timeout_ms: config.rx_timeout_ms,
            response_timeout_ms: config.response_timeout_ms,
            link_timeout_ms: config.link_timeout_ms,
            last_byte_ms: now_ms,
            last_frame_ms: now_ms,
            last_registration_ms: now_ms,
        }
    }

    /// Record a byte received
    pub fn byte_received(&mut self, now_ms: u32) {
        self.last_byte_ms = now_ms;
    }

    /// Record a complete frame received
    pub fn frame_received(&mut self, now_ms: u32) {
        self.last_byte_ms = now_ms;
        self.last_frame_ms = now_ms;
    }

    /// Record a registration request or response
    pub fn registration_activity(&mut self, now_ms: u32) {
        self.last_registration_ms = now_ms;
    }

    /// Give the link a full timeout window starting now
    pub fn restart_link_timer(&mut self, now_ms: u32) {
        self.last_frame_ms = now_ms;
    }

    /// Check whether a partial frame has gone quiet
    pub fn frame_stalled(&self, now_ms: u32, mid_frame: bool) -> bool {
        mid_frame && elapsed(self.last_byte_ms, now_ms) > self.rx_timeout_ms
    }

    /// Check session-level timeouts for the given state
    pub fn check(&self, now_ms: u32, state: ConnectionState) -> LivenessStatus {
        match state {
            ConnectionState::Resolving
                if elapsed(self.last_registration_ms, now_ms) > self.response_timeout_ms =>
            {
                LivenessStatus::RegistrationExpired
            }
            ConnectionState::Connected
                if elapsed(self.last_frame_ms, now_ms) > self.link_timeout_ms =>
            {
                LivenessStatus::LinkLost
            }
            _ => LivenessStatus::Ok,
        }
    }
}

fn elapsed(since_ms: u32, now_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> LivenessMonitor {
        LivenessMonitor::new(&EngineConfig::default(), 0)
    }

    #[test]
    fn test_normal_operation() {
        let mut monitor = monitor();
        monitor.frame_received(400);
        assert_eq!(monitor.check(800, ConnectionState::Connected), LivenessStatus::Ok);
        assert!(!monitor.frame_stalled(800, true));
    }

    #[test]
    fn test_link_lost() {
        let monitor = monitor();
        assert_eq!(monitor.check(500, ConnectionState::Connected), LivenessStatus::Ok);
        assert_eq!(
            monitor.check(501, ConnectionState::Connected),
            LivenessStatus::LinkLost
        );
    }

    #[test]
    fn test_link_timeout_ignored_when_not_connected() {
        let monitor = monitor();
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::IdentityPending,
        ] {
            assert_eq!(monitor.check(1_000_000, state), LivenessStatus::Ok);
        }
    }

    #[test]
    fn test_registration_expired() {
        let mut monitor = monitor();
        monitor.registration_activity(1_000);
        assert_eq!(
            monitor.check(91_000, ConnectionState::Resolving),
            LivenessStatus::Ok
        );
        assert_eq!(
            monitor.check(91_001, ConnectionState::Resolving),
            LivenessStatus::RegistrationExpired
        );
    }

    #[test]
    fn test_frame_stall_needs_partial_frame() {
        let mut monitor = monitor();
        monitor.byte_received(100);
        assert!(!monitor.frame_stalled(700, false));
        assert!(monitor.frame_stalled(700, true));
        monitor.byte_received(650);
        assert!(!monitor.frame_stalled(700, true));
    }

    #[test]
    fn test_counter_wraparound() {
        let mut monitor = monitor();
        monitor.frame_received(u32::MAX - 100);
        assert_eq!(
            monitor.check(200, ConnectionState::Connected),
            LivenessStatus::Ok
        );
        assert_eq!(
            monitor.check(400, ConnectionState::Connected),
            LivenessStatus::LinkLost
        );
    }
}
