//! XPLink Hardware Abstraction Layer
//!
//! The protocol engine only needs a byte stream to the host. This crate
//! defines that boundary so the same engine runs on any board whose HAL can
//! provide a UART.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (panel firmware)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  xplink-core (protocol engine)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  xplink-hal (this crate - SerialPort)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  chip HAL UART (embedded-io)            │
//! └─────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

pub use uart::{IoSerial, SerialPort, BAUDRATE};
