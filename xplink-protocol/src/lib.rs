//! XPLink serial protocol
//!
//! This crate defines the wire protocol between a small embedded device and
//! the X-Plane host plugin that owns the simulation state. The device asks
//! for handles by name; afterwards every packet is addressed by handle.
//!
//! # Protocol Overview
//!
//! All messages are printable text framed by sentinels:
//! ```text
//! ┌───────┬──────┬──────────────────────────┬─────┐
//! │ START │ TYPE │ FIELDS                   │ END │
//! │ '['   │ 1B   │ ,123,"text",1.500000 ... │ ']' │
//! └───────┴──────┴──────────────────────────┴─────┘
//! ```
//!
//! A packet is at most [`MAX_PACKET_SIZE`] bytes. See [`messages`] for the
//! type characters and [`fields`] for how values are written.

#![no_std]
#![deny(unsafe_code)]

pub mod fields;
pub mod frame;
pub mod handle;
pub mod messages;

pub use fields::{FieldError, FieldFormat, FieldReader, FieldWriter};
pub use frame::{Frame, FrameError, FrameParser, FRAME_END, FRAME_START, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE};
pub use handle::Handle;
pub use messages::{DeviceMessage, HostMessage, MessageError, Scaling, Value};
