//! Protocol state shared with application callbacks
//!
//! [`Link`] owns the serial port, the registration table, the inbound value
//! slot and the connection state. The [`Engine`](crate::Engine) drives it
//! from `poll` and hands it to the [`Handler`] callbacks as `&mut Link`, so
//! the application can register names and send packets from inside them.

mod commands;
mod updates;


use heapless::String;
use xplink_hal::SerialPort;
use xplink_protocol::{
    DeviceMessage, FieldFormat, Frame, FrameParser, Handle, HostMessage, MessageError, Scaling,
};

use crate::config::{EngineConfig, MAX_NAME_LEN};
use crate::error::Error;
use crate::liveness::{LivenessMonitor, LivenessStatus};
use crate::registry::{EntryKind, EntryState, RegistrationId, Registry, Resolution, Subscription};
use crate::state::{ConnectionState, Event, StopReason};
use crate::traits::Handler;

pub use updates::{DataType, InboundData, InboundValue};

/// Bytes pulled from the port per read call
const RX_CHUNK_SIZE: usize = 64;

/// Encodes device messages and writes each as one packet
struct Outbound<P> {
    port: P,
    format: FieldFormat,
}

impl<P: SerialPort> Outbound<P> {
    fn send(&mut self, message: &DeviceMessage<'_>) -> Result<(), Error<P::Error>> {
        let frame = message.to_frame(&self.format)?;
        let packet = frame.encode_to_vec().map_err(MessageError::from)?;
        trace!("tx '{}' ({} bytes)", char::from(frame.kind), packet.len());
        self.port.write_all(&packet).map_err(Error::Transport)
    }
}

/// Protocol engine state and the application-facing API
pub struct Link<P: SerialPort> {
    tx: Outbound<P>,
    config: EngineConfig,
    device_name: String<MAX_NAME_LEN>,
    state: ConnectionState,
    registry: Registry,
    parser: FrameParser,
    monitor: LivenessMonitor,
    inbound: Option<InboundValue>,
    rx_chunk: [u8; RX_CHUNK_SIZE],
    rx_len: usize,
    rx_pos: usize,
    now_ms: u32,
}

impl<P: SerialPort> Link<P> {
    /// Create a disconnected link
    ///
    /// Fails if the device name is too long or cannot be sent as a string
    /// field.
    pub fn new(
        port: P,
        device_name: &str,
        config: EngineConfig,
        now_ms: u32,
    ) -> Result<Self, Error<P::Error>> {
        let device_name = String::try_from(device_name).map_err(|_| Error::NameTooLong)?;
        DeviceMessage::Name(&device_name).to_frame(&config.fields)?;

        Ok(Self {
            tx: Outbound {
                port,
                format: config.fields,
            },
            config,
            device_name,
            state: ConnectionState::Disconnected,
            registry: Registry::new(),
            parser: FrameParser::new(),
            monitor: LivenessMonitor::new(&config, now_ms),
            inbound: None,
            rx_chunk: [0; RX_CHUNK_SIZE],
            rx_len: 0,
            rx_pos: 0,
            now_ms,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Borrow the serial port
    pub fn port(&self) -> &P {
        &self.tx.port
    }

    /// Borrow the serial port mutably
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.tx.port
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// True once every registration is answered or expired
    pub fn connection_status(&self) -> bool {
        self.state.is_connected()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current handle for a name, [`Handle::INVALID`] if unknown or unresolved
    pub fn handle_of(&self, kind: EntryKind, name: &str) -> Handle {
        self.registry
            .find(kind, name)
            .and_then(|id| self.registry.get(id))
            .map_or(Handle::INVALID, |entry| entry.handle())
    }

    /// Current handle for a registration
    pub fn handle(&self, id: RegistrationId) -> Handle {
        self.registry
            .get(id)
            .map_or(Handle::INVALID, |entry| entry.handle())
    }

    /// Declare a dataref
    ///
    /// Calling again with the same name returns the same entry. While a
    /// session is resolving or connected the request goes out at once;
    /// otherwise it waits for the next registration window.
    pub fn register_dataref(&mut self, name: &str) -> Result<EntryMut<'_, P>, Error<P::Error>> {
        self.register(EntryKind::DataRef, name)
    }

    /// Declare a command
    pub fn register_command(&mut self, name: &str) -> Result<EntryMut<'_, P>, Error<P::Error>> {
        self.register(EntryKind::Command, name)
    }

    /// Access an existing registration
    pub fn entry(&mut self, id: RegistrationId) -> Option<EntryMut<'_, P>> {
        self.registry.get(id)?;
        Some(EntryMut { link: self, id })
    }

    fn register(&mut self, kind: EntryKind, name: &str) -> Result<EntryMut<'_, P>, Error<P::Error>> {
        let id = self.registry.insert(kind, name)?;

        let unrequested = self
            .registry
            .get(id)
            .is_some_and(|entry| entry.state() == EntryState::Unrequested);
        if unrequested && self.state.accepts_registrations() {
            if self.state.is_connected() {
                self.state = self.state.transition(Event::RegistrationAdded);
                self.monitor.registration_activity(self.now_ms);
                debug!("late registration, resolving again");
            }
            self.send_registration(id)?;
        }

        Ok(EntryMut { link: self, id })
    }

    /// Send the `b`/`m` request for one entry and mark it pending
    fn send_registration(&mut self, id: RegistrationId) -> Result<(), Error<P::Error>> {
        let Some(entry) = self.registry.get(id) else {
            return Ok(());
        };
        let message = match entry.kind() {
            EntryKind::DataRef => DeviceMessage::RegisterDataRef(entry.name()),
            EntryKind::Command => DeviceMessage::RegisterCommand(entry.name()),
        };
        self.tx.send(&message)?;

        if let Some(entry) = self.registry.get_mut(id) {
            entry.set_state(EntryState::Pending);
        }
        self.monitor.registration_activity(self.now_ms);
        Ok(())
    }

    /// Send every request not yet out this session
    ///
    /// Entries stay `Unrequested` after a failed write, so a later poll
    /// picks them up again.
    fn request_outstanding(&mut self) -> Result<(), Error<P::Error>> {
        for id in self.registry.unrequested() {
            self.send_registration(id)?;
        }
        Ok(())
    }

    /// Re-send stored subscription and scaling for a freshly resolved entry
    fn replay_subscriptions(&mut self, id: RegistrationId) -> Result<(), Error<P::Error>> {
        let Some(entry) = self.registry.get(id) else {
            return Ok(());
        };
        let handle = entry.handle();
        let subscription = entry.subscription();
        let scaling = entry.scaling();

        if let Some(Subscription {
            rate_ms,
            precision,
            element,
        }) = subscription
        {
            self.tx.send(&DeviceMessage::RequestUpdates {
                handle,
                rate_ms,
                precision,
                element,
            })?;
        }
        if let Some(scaling) = scaling {
            self.tx.send(&DeviceMessage::Scaling { handle, scaling })?;
        }
        Ok(())
    }

    /// Move to `Connected` once nothing is pending
    fn settle_if_done(&mut self) {
        if self.state == ConnectionState::Resolving && self.registry.outstanding_count() == 0 {
            self.state = self.state.transition(Event::RegistrationsSettled);
            self.monitor.restart_link_timer(self.now_ms);
            info!("connected, {} registrations", self.registry.len());
        }
    }

    /// Drain the port, dispatch frames and run the timeout checks
    pub(crate) fn poll<H: Handler<P>>(
        &mut self,
        now_ms: u32,
        handler: &mut H,
    ) -> Result<(), Error<P::Error>> {
        self.now_ms = now_ms;

        if self.monitor.frame_stalled(now_ms, self.parser.in_frame()) {
            warn!("partial frame timed out");
            self.parser.reset();
        }

        let start_state = self.state;
        let mut budget = usize::from(self.config.max_bytes_per_poll);
        while budget > 0 {
            if self.rx_pos == self.rx_len {
                let want = budget.min(RX_CHUNK_SIZE);
                let n = self
                    .tx
                    .port
                    .read_available(&mut self.rx_chunk[..want])
                    .map_err(Error::Transport)?;
                if n == 0 {
                    break;
                }
                self.rx_len = n.min(want);
                self.rx_pos = 0;
            }

            let byte = self.rx_chunk[self.rx_pos];
            self.rx_pos += 1;
            budget -= 1;
            self.monitor.byte_received(now_ms);

            match self.parser.feed(byte) {
                Ok(Some(frame)) => {
                    self.monitor.frame_received(now_ms);
                    self.dispatch(&frame, handler)?;
                    if self.state != start_state {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("frame dropped: {}", err),
            }
        }

        if self.state != start_state {
            return Ok(());
        }

        match self.monitor.check(now_ms, self.state) {
            LivenessStatus::Ok => {}
            LivenessStatus::RegistrationExpired => {
                let expired = self.registry.expire_outstanding();
                warn!("{} registrations unanswered", expired);
                self.state = self.state.transition(Event::ResponseTimeout);
                self.monitor.restart_link_timer(now_ms);
            }
            LivenessStatus::LinkLost => {
                warn!("link lost");
                self.end_session(Event::LinkTimeout, handler);
            }
        }

        if self.state == ConnectionState::Resolving {
            self.request_outstanding()?;
        }
        Ok(())
    }

    /// Handle one complete host frame
    fn dispatch<H: Handler<P>>(&mut self, frame: &Frame, handler: &mut H) -> Result<(), Error<P::Error>> {
        let message = match HostMessage::from_frame(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!("ignoring frame '{}': {}", char::from(frame.kind), err);
                return Ok(());
            }
        };

        match message {
            HostMessage::RequestName => {
                self.end_session(Event::IdentityRequested, handler);
                self.tx.send(&DeviceMessage::Name(&self.device_name))?;
                self.state = self.state.transition(Event::IdentityRequested);
                debug!("identity sent");
            }
            HostMessage::RegistrationWindow => {
                let next = self.state.transition(Event::RegistrationWindow);
                if next == self.state {
                    debug!("registration window ignored in {}", self.state);
                    return Ok(());
                }
                self.state = next;
                self.monitor.registration_activity(self.now_ms);
                handler.on_init(self);

                self.request_outstanding()?;
                self.settle_if_done();
            }
            HostMessage::DataRefResult { handle, name } => {
                self.apply_response(EntryKind::DataRef, name, handle)?;
            }
            HostMessage::CommandResult { handle, name } => {
                self.apply_response(EntryKind::Command, name, handle)?;
            }
            HostMessage::Update {
                handle,
                value,
                element,
            } => {
                if self.store_inbound(handle, value, element) {
                    handler.on_update(self, handle);
                }
            }
            HostMessage::Exiting => {
                self.end_session(Event::HostExiting, handler);
            }
        }
        Ok(())
    }

    fn apply_response(
        &mut self,
        kind: EntryKind,
        name: &str,
        handle: Handle,
    ) -> Result<(), Error<P::Error>> {
        if !self.state.accepts_registrations() {
            debug!("registration response outside a session");
            return Ok(());
        }
        self.monitor.registration_activity(self.now_ms);

        let handle = if self.tx.format.fits_handle(handle.raw()) {
            handle
        } else {
            warn!("handle {} for {} does not fit the handle field", handle, name);
            Handle::INVALID
        };
        match self.registry.apply_response(kind, name, handle) {
            Resolution::Resolved(id) => {
                trace!("{} resolved to {}", name, handle);
                self.replay_subscriptions(id)?;
            }
            Resolution::Rejected(_) => warn!("host does not know {}", name),
            Resolution::Ignored => debug!("no pending registration for {}", name),
        }
        self.settle_if_done();
        Ok(())
    }

    /// Tear down an active session for `event`
    ///
    /// Handles are invalidated. `on_stop` runs once, and only for a session
    /// that got as far as `on_init`. Does nothing when already disconnected.
    fn end_session<H: Handler<P>>(&mut self, event: Event, handler: &mut H) {
        if !event.is_reset_event() || !self.state.is_active() {
            return;
        }
        let initialized = self.state.accepts_registrations();

        self.state = ConnectionState::Disconnected;
        self.registry.invalidate_all();
        self.inbound = None;

        if !initialized {
            debug!("identity exchange abandoned");
            return;
        }
        let reason = match event {
            Event::IdentityRequested => StopReason::HostRestarted,
            Event::LinkTimeout => StopReason::LinkTimeout,
            _ => StopReason::HostExiting,
        };
        info!("session ended: {}", reason);
        handler.on_stop(self, reason);
    }
}

/// Handle to one registration, returned by `register_dataref` and
/// `register_command`
pub struct EntryMut<'a, P: SerialPort> {
    link: &'a mut Link<P>,
    id: RegistrationId,
}

impl<'a, P: SerialPort> EntryMut<'a, P> {
    /// Stable id, valid across sessions
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Handle for the current session, [`Handle::INVALID`] until resolved
    pub fn handle(&self) -> Handle {
        self.link.handle(self.id)
    }

    pub fn state(&self) -> EntryState {
        self.link
            .registry
            .get(self.id)
            .map_or(EntryState::Unrequested, |entry| entry.state())
    }

    /// Subscribe to updates for this dataref
    ///
    /// Sent now if resolved, and again after every re-registration.
    pub fn request_updates(
        self,
        rate_ms: u32,
        precision: f32,
        element: Option<u16>,
    ) -> Result<Self, Error<P::Error>> {
        self.link.subscribe(
            self.id,
            Subscription {
                rate_ms,
                precision,
                element,
            },
        )?;
        Ok(self)
    }

    /// Ask the host to scale this dataref before sending it
    pub fn set_scaling(
        self,
        in_low: i32,
        in_high: i32,
        out_low: i32,
        out_high: i32,
    ) -> Result<Self, Error<P::Error>> {
        self.link.scale(
            self.id,
            Scaling {
                in_low,
                in_high,
                out_low,
                out_high,
            },
        )?;
        Ok(self)
    }
}
