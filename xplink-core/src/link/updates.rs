//! Subscriptions, dataref writes and the inbound value slot

use heapless::String;
use xplink_hal::SerialPort;
use xplink_protocol::{DeviceMessage, Handle, Scaling, Value};

use super::Link;
use crate::config::MAX_STRING_LEN;
use crate::error::Error;
use crate::registry::{Entry, EntryKind, RegistrationId, Subscription};

/// Decoded payload of the latest update
#[derive(Debug, Clone, PartialEq)]
pub enum InboundData {
    Int(i32),
    Float(f32),
    Str(String<MAX_STRING_LEN>),
}

/// Type tag of the latest update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataType {
    Int,
    Float,
    Str,
}

/// The most recent update for a subscribed dataref
///
/// Single slot: a new update overwrites it whether or not it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundValue {
    pub handle: Handle,
    pub data: InboundData,
    pub element: Option<u16>,
}

impl InboundValue {
    pub fn data_type(&self) -> DataType {
        match self.data {
            InboundData::Int(_) => DataType::Int,
            InboundData::Float(_) => DataType::Float,
            InboundData::Str(_) => DataType::Str,
        }
    }
}

impl<P: SerialPort> Link<P> {
    /// Subscribe to updates for a resolved dataref
    ///
    /// The subscription is stored on the entry and re-sent whenever the
    /// handle is resolved again in a later session.
    pub fn request_updates(
        &mut self,
        handle: Handle,
        rate_ms: u32,
        precision: f32,
        element: Option<u16>,
    ) -> Result<(), Error<P::Error>> {
        let id = self.resolved_dataref(handle)?;
        self.subscribe(
            id,
            Subscription {
                rate_ms,
                precision,
                element,
            },
        )
    }

    /// Ask the host to map a resolved dataref from `in_low..in_high` onto
    /// `out_low..out_high` before sending it
    pub fn set_scaling(
        &mut self,
        handle: Handle,
        in_low: i32,
        in_high: i32,
        out_low: i32,
        out_high: i32,
    ) -> Result<(), Error<P::Error>> {
        let id = self.resolved_dataref(handle)?;
        self.scale(
            id,
            Scaling {
                in_low,
                in_high,
                out_low,
                out_high,
            },
        )
    }

    /// Write a dataref value, or one array element of it
    ///
    /// String writes are not part of the protocol and fail with
    /// `MessageError::Unsupported`.
    pub fn dataref_write<'v>(
        &mut self,
        handle: Handle,
        value: impl Into<Value<'v>>,
        element: Option<u16>,
    ) -> Result<(), Error<P::Error>> {
        if !handle.is_valid() {
            return Err(Error::InvalidHandle);
        }
        self.tx.send(&DeviceMessage::Write {
            handle,
            value: value.into(),
            element,
        })
    }

    /// Latest update, if any arrived this session
    pub fn inbound(&self) -> Option<&InboundValue> {
        self.inbound.as_ref()
    }

    /// Latest value as an integer; floats truncate, strings read as 0
    pub fn read_int(&self) -> i32 {
        match self.inbound.as_ref().map(|value| &value.data) {
            Some(InboundData::Int(v)) => *v,
            Some(InboundData::Float(v)) => *v as i32,
            _ => 0,
        }
    }

    /// Latest value as a float; strings read as 0.0
    pub fn read_float(&self) -> f32 {
        match self.inbound.as_ref().map(|value| &value.data) {
            Some(InboundData::Int(v)) => *v as f32,
            Some(InboundData::Float(v)) => *v,
            _ => 0.0,
        }
    }

    /// Latest value if it was a string update
    pub fn read_str(&self) -> Option<&str> {
        match self.inbound.as_ref().map(|value| &value.data) {
            Some(InboundData::Str(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Array element of the latest update
    pub fn read_element(&self) -> Option<u16> {
        self.inbound.as_ref().and_then(|value| value.element)
    }

    pub fn read_type(&self) -> Option<DataType> {
        self.inbound.as_ref().map(InboundValue::data_type)
    }

    pub(super) fn subscribe(
        &mut self,
        id: RegistrationId,
        subscription: Subscription,
    ) -> Result<(), Error<P::Error>> {
        let entry = self.dataref_entry_mut(id)?;
        entry.set_subscription(subscription);
        let handle = entry.handle();

        if handle.is_valid() {
            self.tx.send(&DeviceMessage::RequestUpdates {
                handle,
                rate_ms: subscription.rate_ms,
                precision: subscription.precision,
                element: subscription.element,
            })?;
        }
        Ok(())
    }

    pub(super) fn scale(&mut self, id: RegistrationId, scaling: Scaling) -> Result<(), Error<P::Error>> {
        let entry = self.dataref_entry_mut(id)?;
        entry.set_scaling(scaling);
        let handle = entry.handle();

        if handle.is_valid() {
            self.tx.send(&DeviceMessage::Scaling { handle, scaling })?;
        }
        Ok(())
    }

    /// Store an update if it belongs to a resolved dataref
    ///
    /// Returns false, leaving the slot untouched, for anything else.
    pub(super) fn store_inbound(&mut self, handle: Handle, value: Value<'_>, element: Option<u16>) -> bool {
        if self.registry.find_handle(EntryKind::DataRef, handle).is_none() {
            debug!("update for unknown handle {}", handle);
            return false;
        }

        let data = match value {
            Value::Int(v) => InboundData::Int(v),
            Value::Float(v) => InboundData::Float(v),
            Value::Str(text) => match String::try_from(text) {
                Ok(text) => InboundData::Str(text),
                Err(_) => return false,
            },
        };
        self.inbound = Some(InboundValue {
            handle,
            data,
            element,
        });
        true
    }

    fn resolved_dataref(&self, handle: Handle) -> Result<RegistrationId, Error<P::Error>> {
        if !handle.is_valid() {
            return Err(Error::InvalidHandle);
        }
        self.registry
            .find_handle(EntryKind::DataRef, handle)
            .ok_or(Error::UnknownHandle)
    }

    fn dataref_entry_mut(&mut self, id: RegistrationId) -> Result<&mut Entry, Error<P::Error>> {
        let entry = self.registry.get_mut(id).ok_or(Error::UnknownHandle)?;
        if entry.kind() != EntryKind::DataRef {
            return Err(Error::WrongKind);
        }
        Ok(entry)
    }
}
