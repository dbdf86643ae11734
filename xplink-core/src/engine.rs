//! Engine: the link plus the application handler

use xplink_hal::SerialPort;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::link::Link;
use crate::traits::Handler;

/// One protocol engine per serial link
///
/// Owns the port through its [`Link`] and the application [`Handler`].
/// Call [`poll`](Self::poll) once per main-loop cycle.
pub struct Engine<P: SerialPort, H: Handler<P>> {
    link: Link<P>,
    handler: H,
}

impl<P: SerialPort, H: Handler<P>> Engine<P, H> {
    /// Create a disconnected engine
    ///
    /// Nothing is sent until the host asks for the device name.
    pub fn new(
        port: P,
        device_name: &str,
        config: EngineConfig,
        handler: H,
        now_ms: u32,
    ) -> Result<Self, Error<P::Error>> {
        Ok(Self {
            link: Link::new(port, device_name, config, now_ms)?,
            handler,
        })
    }

    /// Process pending input and timeouts
    ///
    /// `now_ms` is a free-running millisecond counter; it may wrap. Reads at
    /// most `max_bytes_per_poll` bytes and makes at most one connection
    /// state change per call.
    pub fn poll(&mut self, now_ms: u32) -> Result<(), Error<P::Error>> {
        self.link.poll(now_ms, &mut self.handler)
    }

    pub fn link(&self) -> &Link<P> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<P> {
        &mut self.link
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}
