//! Engine error type

use xplink_protocol::MessageError;

use crate::registry::RegistryError;

/// Errors returned by the engine and the application API
///
/// `E` is the transport error of the serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The serial port failed to read or write
    Transport(E),
    /// Handle is [`Handle::INVALID`](xplink_protocol::Handle::INVALID)
    InvalidHandle,
    /// Handle does not belong to any resolved registration
    UnknownHandle,
    /// Operation does not apply to this kind of registration
    WrongKind,
    /// Name longer than `MAX_NAME_LEN`
    NameTooLong,
    /// No room for another registration
    RegistryFull,
    /// Message could not be put on the wire
    Message(MessageError),
}

impl<E> From<MessageError> for Error<E> {
    fn from(err: MessageError) -> Self {
        Error::Message(err)
    }
}

impl<E> From<RegistryError> for Error<E> {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NameTooLong => Error::NameTooLong,
            RegistryError::Full => Error::RegistryFull,
        }
    }
}
