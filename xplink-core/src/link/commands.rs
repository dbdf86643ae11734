//! Command channel and host notices

use xplink_hal::SerialPort;
use xplink_protocol::{DeviceMessage, Handle};

use super::Link;
use crate::error::Error;

impl<P: SerialPort> Link<P> {
    /// Trigger a command once
    pub fn command_trigger(&mut self, handle: Handle) -> Result<(), Error<P::Error>> {
        self.command_trigger_n(handle, 1)
    }

    /// Trigger a command `count` times with a single packet
    pub fn command_trigger_n(&mut self, handle: Handle, count: u16) -> Result<(), Error<P::Error>> {
        let handle = valid(handle)?;
        self.tx.send(&DeviceMessage::CommandTrigger { handle, count })
    }

    /// Begin holding a command
    ///
    /// Every start must be followed by exactly one [`command_end`](Self::command_end)
    /// for the same handle; nothing here tracks the pairing.
    pub fn command_start(&mut self, handle: Handle) -> Result<(), Error<P::Error>> {
        let handle = valid(handle)?;
        self.tx.send(&DeviceMessage::CommandStart(handle))
    }

    /// Release a held command
    pub fn command_end(&mut self, handle: Handle) -> Result<(), Error<P::Error>> {
        let handle = valid(handle)?;
        self.tx.send(&DeviceMessage::CommandEnd(handle))
    }

    /// Write a line to the host plugin's log
    pub fn send_debug_message(&mut self, text: &str) -> Result<(), Error<P::Error>> {
        self.tx.send(&DeviceMessage::Debug(text))
    }

    /// Have the simulator speak `text`
    pub fn send_speak_message(&mut self, text: &str) -> Result<(), Error<P::Error>> {
        self.tx.send(&DeviceMessage::Speak(text))
    }

    /// Ask the host plugin to restart the handshake
    pub fn send_reset_request(&mut self) -> Result<(), Error<P::Error>> {
        self.tx.send(&DeviceMessage::Reset)
    }
}

fn valid<E>(handle: Handle) -> Result<Handle, Error<E>> {
    if handle.is_valid() {
        Ok(handle)
    } else {
        Err(Error::InvalidHandle)
    }
}
