//! Application callbacks

use xplink_hal::SerialPort;
use xplink_protocol::Handle;

use crate::link::Link;
use crate::state::StopReason;

/// Hooks the engine calls from inside `poll`
///
/// Each callback gets the [`Link`] so it can register names, subscribe, and
/// send packets. Nothing borrowed from the link outlives the call.
pub trait Handler<P: SerialPort> {
    /// The host opened a registration window
    ///
    /// Declare datarefs and commands here. Registrations are idempotent, so
    /// running the same code every session is fine.
    fn on_init(&mut self, link: &mut Link<P>);

    /// The session ended and every handle is now invalid
    ///
    /// Called once per session, never while already disconnected.
    fn on_stop(&mut self, link: &mut Link<P>, reason: StopReason) {
        let _ = (link, reason);
    }

    /// A subscribed dataref changed
    ///
    /// Read the value with [`Link::read_int`], [`Link::read_float`] or
    /// [`Link::read_str`] before returning; the next update overwrites it.
    fn on_update(&mut self, link: &mut Link<P>, handle: Handle);
}
