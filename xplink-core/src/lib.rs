//! Device side of the XPLink protocol
//!
//! This crate contains everything between the serial port and the
//! application:
//!
//! - Connection state machine (identity, registration, connected)
//! - Registration table that survives host restarts
//! - Update dispatch into a single inbound value slot
//! - Command trigger channel
//! - Liveness supervision (stalled frames, silent host)
//! - Configuration type definitions
//!
//! # Usage
//!
//! ```ignore
//! struct Panel { gear: Option<RegistrationId> }
//!
//! impl<P: SerialPort> Handler<P> for Panel {
//!     fn on_init(&mut self, link: &mut Link<P>) {
//!         if let Ok(entry) = link.register_dataref("sim/cockpit/switches/gear_handle_status") {
//!             self.gear = Some(entry.id());
//!             let _ = entry.request_updates(100, 0.0, None);
//!         }
//!     }
//!
//!     fn on_update(&mut self, link: &mut Link<P>, handle: Handle) {
//!         if self.gear.map(|id| link.handle(id)) == Some(handle) {
//!             gear_led.set(link.read_int() != 0);
//!         }
//!     }
//! }
//!
//! let mut engine = Engine::new(uart, "Gear panel", EngineConfig::default(), panel, now_ms())?;
//! loop {
//!     engine.poll(now_ms())?;
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod config;
pub mod engine;
pub mod error;
pub mod link;
pub mod liveness;
pub mod registry;
pub mod state;
pub mod traits;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::Error;
pub use link::{DataType, EntryMut, InboundData, InboundValue, Link};
pub use registry::{EntryKind, EntryState, RegistrationId, Subscription};
pub use state::{ConnectionState, StopReason};
pub use traits::Handler;
pub use xplink_protocol::{Handle, Scaling, Value};
