//! Events that trigger connection state transitions

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Host requests
    /// Host asked for the device name (`N`)
    IdentityRequested,
    /// Host is ready for registrations (`Q`)
    RegistrationWindow,
    /// Host is shutting down (`X`)
    HostExiting,

    // Registration progress
    /// Every entry is resolved or rejected
    RegistrationsSettled,
    /// Host stopped answering registration requests
    ResponseTimeout,
    /// Application registered a name after the handshake
    RegistrationAdded,

    // Supervisor
    /// No complete frame within the link timeout
    LinkTimeout,
}

impl Event {
    /// Check if this event tears the session down
    pub fn is_reset_event(&self) -> bool {
        matches!(
            self,
            Event::HostExiting | Event::LinkTimeout | Event::IdentityRequested
        )
    }
}
