//! Connection state definition
//!
//! Registration entries and the outbound API consult the current state;
//! handles are only trusted while `Connected`.

use super::events::Event;

/// Link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No session; waiting for the host to ask who we are
    #[default]
    Disconnected,
    /// Name sent, waiting for the registration window
    IdentityPending,
    /// Registration requests outstanding
    Resolving,
    /// Every registration answered (or timed out)
    Connected,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// Host sent its shutdown notice
    HostExiting,
    /// Link went quiet while connected
    LinkTimeout,
    /// Host asked for identity again mid-session
    HostRestarted,
}

impl ConnectionState {
    /// Check if a session is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    /// Check if handles can be trusted
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if registration requests may go out right away
    pub fn accepts_registrations(&self) -> bool {
        matches!(self, ConnectionState::Resolving | ConnectionState::Connected)
    }

    /// Process an event and return the next state
    ///
    /// Tearing down an active session (handles, stop callback) is the
    /// caller's job; this only decides where the link ends up.
    pub fn transition(self, event: Event) -> Self {
        use ConnectionState::*;
        use Event::*;

        match (self, event) {
            // Identity can be requested at any time; mid-session it means
            // the host restarted
            (_, IdentityRequested) => IdentityPending,

            (IdentityPending, RegistrationWindow) => Resolving,
            (Connected, RegistrationWindow) => Resolving,

            (Resolving, RegistrationsSettled) => Connected,
            (Resolving, ResponseTimeout) => Connected,

            (Connected, RegistrationAdded) => Resolving,

            (IdentityPending | Resolving | Connected, HostExiting) => Disconnected,
            (Connected, LinkTimeout) => Disconnected,

            // Default: stay in current state
            _ => self,
        }
    }
}
