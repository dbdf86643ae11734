//! Message types for the XPLink protocol
//!
//! Message types are divided into two categories. Upper case type
//! characters generally come from the host plugin, lower case ones from the
//! device. The value packets `1`-`4` flow both ways: the host pushes updates
//! with them and the device writes datarefs with them.

use crate::fields::{FieldError, FieldFormat, FieldReader, FieldWriter};
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use crate::handle::Handle;
use heapless::Vec;

// Message type IDs: Host → Device
pub const MSG_REQUEST_NAME: u8 = b'N';
pub const MSG_REGISTRATION_WINDOW: u8 = b'Q';
pub const MSG_DATAREF_RESULT: u8 = b'D';
pub const MSG_COMMAND_RESULT: u8 = b'C';
pub const MSG_UPDATE_STRING: u8 = b'9';
pub const MSG_EXITING: u8 = b'X';

// Message type IDs: both directions
pub const MSG_VALUE_INT: u8 = b'1';
pub const MSG_VALUE_FLOAT: u8 = b'2';
pub const MSG_VALUE_INT_ARRAY: u8 = b'3';
pub const MSG_VALUE_FLOAT_ARRAY: u8 = b'4';

// Message type IDs: Device → Host
pub const MSG_NAME: u8 = b'n';
pub const MSG_REGISTER_DATAREF: u8 = b'b';
pub const MSG_REGISTER_COMMAND: u8 = b'm';
pub const MSG_REQUEST_UPDATES: u8 = b'r';
pub const MSG_REQUEST_UPDATES_ARRAY: u8 = b't';
pub const MSG_SCALING: u8 = b'u';
pub const MSG_COMMAND_TRIGGER: u8 = b'k';
pub const MSG_COMMAND_START: u8 = b'i';
pub const MSG_COMMAND_END: u8 = b'j';
pub const MSG_DEBUG: u8 = b'g';
pub const MSG_SPEAK: u8 = b's';
pub const MSG_RESET: u8 = b'z';

/// Errors turning frames into messages and back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Type character not defined for this direction
    UnknownType(u8),
    /// Message cannot be expressed on the wire
    Unsupported,
    /// A payload field was missing or malformed
    Field(FieldError),
    /// Frame construction failed
    Frame(FrameError),
}

impl From<FieldError> for MessageError {
    fn from(err: FieldError) -> Self {
        MessageError::Field(err)
    }
}

impl From<FrameError> for MessageError {
    fn from(err: FrameError) -> Self {
        MessageError::Frame(err)
    }
}

/// A dataref value as carried by value packets
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value<'a> {
    Int(i32),
    Float(f32),
    Str(&'a str),
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i16> for Value<'_> {
    fn from(v: i16) -> Self {
        Value::Int(i32::from(v))
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(v)
    }
}

/// Input/output ranges the host maps a dataref through before sending it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scaling {
    pub in_low: i32,
    pub in_high: i32,
    pub out_low: i32,
    pub out_high: i32,
}

/// Messages from the host plugin to the device
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostMessage<'a> {
    /// Host asks who is on the other end
    RequestName,
    /// Host is ready to accept registration requests
    RegistrationWindow,
    /// Result of a dataref registration (invalid handle = not found)
    DataRefResult { handle: Handle, name: &'a str },
    /// Result of a command registration (invalid handle = not found)
    CommandResult { handle: Handle, name: &'a str },
    /// Pushed dataref value
    Update {
        handle: Handle,
        value: Value<'a>,
        element: Option<u16>,
    },
    /// Host is shutting down
    Exiting,
}

impl<'a> HostMessage<'a> {
    /// Parse a host message from a frame
    pub fn from_frame(frame: &'a Frame) -> Result<Self, MessageError> {
        let mut fields = FieldReader::new(&frame.payload);
        let message = match frame.kind {
            MSG_REQUEST_NAME => HostMessage::RequestName,
            MSG_REGISTRATION_WINDOW => HostMessage::RegistrationWindow,
            MSG_EXITING => HostMessage::Exiting,
            MSG_DATAREF_RESULT | MSG_COMMAND_RESULT => {
                let handle = Handle::new(fields.int()?);
                let name = fields.string()?;
                if frame.kind == MSG_DATAREF_RESULT {
                    HostMessage::DataRefResult { handle, name }
                } else {
                    HostMessage::CommandResult { handle, name }
                }
            }
            kind @ (MSG_VALUE_INT | MSG_VALUE_FLOAT | MSG_VALUE_INT_ARRAY
            | MSG_VALUE_FLOAT_ARRAY | MSG_UPDATE_STRING) => {
                let handle = Handle::new(fields.int()?);
                let (value, element) = read_value(kind, &mut fields)?;
                HostMessage::Update {
                    handle,
                    value,
                    element,
                }
            }
            other => return Err(MessageError::UnknownType(other)),
        };
        Ok(message)
    }

    /// Encode this message into a frame (for testing or simulation)
    pub fn to_frame(&self, format: &FieldFormat) -> Result<Frame, MessageError> {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        let mut fields = FieldWriter::new(&mut payload, *format);
        let kind = match self {
            HostMessage::RequestName => MSG_REQUEST_NAME,
            HostMessage::RegistrationWindow => MSG_REGISTRATION_WINDOW,
            HostMessage::Exiting => MSG_EXITING,
            HostMessage::DataRefResult { handle, name } => {
                fields.handle(handle.raw())?.string(name)?;
                MSG_DATAREF_RESULT
            }
            HostMessage::CommandResult { handle, name } => {
                fields.handle(handle.raw())?.string(name)?;
                MSG_COMMAND_RESULT
            }
            HostMessage::Update {
                handle,
                value,
                element,
            } => {
                fields.handle(handle.raw())?;
                write_value(&mut fields, value, *element)?
            }
        };
        Ok(Frame::new(kind, &payload)?)
    }
}

/// Messages from the device to the host plugin
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceMessage<'a> {
    /// Identity response
    Name(&'a str),
    /// Ask the host for a dataref handle
    RegisterDataRef(&'a str),
    /// Ask the host for a command handle
    RegisterCommand(&'a str),
    /// Subscribe to updates, at most one every `rate_ms`
    RequestUpdates {
        handle: Handle,
        rate_ms: u32,
        precision: f32,
        element: Option<u16>,
    },
    /// Ask the host to scale values before sending them
    Scaling { handle: Handle, scaling: Scaling },
    /// Write a dataref value
    Write {
        handle: Handle,
        value: Value<'a>,
        element: Option<u16>,
    },
    /// Trigger a command `count` times
    CommandTrigger { handle: Handle, count: u16 },
    /// Begin holding a command
    CommandStart(Handle),
    /// Release a held command
    CommandEnd(Handle),
    /// Line for the plugin log
    Debug(&'a str),
    /// Text for the simulator speech synthesizer
    Speak(&'a str),
    /// Ask the plugin to reset the link
    Reset,
}

impl<'a> DeviceMessage<'a> {
    /// Encode this message into a frame
    pub fn to_frame(&self, format: &FieldFormat) -> Result<Frame, MessageError> {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        let mut fields = FieldWriter::new(&mut payload, *format);
        let kind = match self {
            DeviceMessage::Name(name) => {
                fields.string(name)?;
                MSG_NAME
            }
            DeviceMessage::RegisterDataRef(name) => {
                fields.string(name)?;
                MSG_REGISTER_DATAREF
            }
            DeviceMessage::RegisterCommand(name) => {
                fields.string(name)?;
                MSG_REGISTER_COMMAND
            }
            DeviceMessage::RequestUpdates {
                handle,
                rate_ms,
                precision,
                element,
            } => {
                fields
                    .handle(handle.raw())?
                    .value(i64::from(*rate_ms))?
                    .float(*precision)?;
                match element {
                    Some(element) => {
                        fields.count(i64::from(*element))?;
                        MSG_REQUEST_UPDATES_ARRAY
                    }
                    None => MSG_REQUEST_UPDATES,
                }
            }
            DeviceMessage::Scaling { handle, scaling } => {
                fields
                    .handle(handle.raw())?
                    .value(i64::from(scaling.in_low))?
                    .value(i64::from(scaling.in_high))?
                    .value(i64::from(scaling.out_low))?
                    .value(i64::from(scaling.out_high))?;
                MSG_SCALING
            }
            DeviceMessage::Write {
                handle,
                value,
                element,
            } => {
                if matches!(value, Value::Str(_)) {
                    return Err(MessageError::Unsupported);
                }
                fields.handle(handle.raw())?;
                write_value(&mut fields, value, *element)?
            }
            DeviceMessage::CommandTrigger { handle, count } => {
                fields.handle(handle.raw())?.count(i64::from(*count))?;
                MSG_COMMAND_TRIGGER
            }
            DeviceMessage::CommandStart(handle) => {
                fields.handle(handle.raw())?;
                MSG_COMMAND_START
            }
            DeviceMessage::CommandEnd(handle) => {
                fields.handle(handle.raw())?;
                MSG_COMMAND_END
            }
            DeviceMessage::Debug(text) => {
                fields.string(text)?;
                MSG_DEBUG
            }
            DeviceMessage::Speak(text) => {
                fields.string(text)?;
                MSG_SPEAK
            }
            DeviceMessage::Reset => MSG_RESET,
        };
        Ok(Frame::new(kind, &payload)?)
    }

    /// Parse a device message from a frame (for testing or simulation)
    pub fn from_frame(frame: &'a Frame) -> Result<Self, MessageError> {
        let mut fields = FieldReader::new(&frame.payload);
        let message = match frame.kind {
            MSG_NAME => DeviceMessage::Name(fields.string()?),
            MSG_REGISTER_DATAREF => DeviceMessage::RegisterDataRef(fields.string()?),
            MSG_REGISTER_COMMAND => DeviceMessage::RegisterCommand(fields.string()?),
            MSG_DEBUG => DeviceMessage::Debug(fields.string()?),
            MSG_SPEAK => DeviceMessage::Speak(fields.string()?),
            MSG_RESET => DeviceMessage::Reset,
            MSG_REQUEST_UPDATES | MSG_REQUEST_UPDATES_ARRAY => {
                let handle = Handle::new(fields.int()?);
                let rate_ms = u32::try_from(fields.long()?).map_err(|_| FieldError::OutOfRange)?;
                let precision = fields.float()?;
                let element = if frame.kind == MSG_REQUEST_UPDATES_ARRAY {
                    Some(fields.element()?)
                } else {
                    None
                };
                DeviceMessage::RequestUpdates {
                    handle,
                    rate_ms,
                    precision,
                    element,
                }
            }
            MSG_SCALING => DeviceMessage::Scaling {
                handle: Handle::new(fields.int()?),
                scaling: Scaling {
                    in_low: fields.int()?,
                    in_high: fields.int()?,
                    out_low: fields.int()?,
                    out_high: fields.int()?,
                },
            },
            kind @ (MSG_VALUE_INT | MSG_VALUE_FLOAT | MSG_VALUE_INT_ARRAY
            | MSG_VALUE_FLOAT_ARRAY) => {
                let handle = Handle::new(fields.int()?);
                let (value, element) = read_value(kind, &mut fields)?;
                DeviceMessage::Write {
                    handle,
                    value,
                    element,
                }
            }
            MSG_COMMAND_TRIGGER => DeviceMessage::CommandTrigger {
                handle: Handle::new(fields.int()?),
                count: fields.element()?,
            },
            MSG_COMMAND_START => DeviceMessage::CommandStart(Handle::new(fields.int()?)),
            MSG_COMMAND_END => DeviceMessage::CommandEnd(Handle::new(fields.int()?)),
            other => return Err(MessageError::UnknownType(other)),
        };
        Ok(message)
    }
}

/// Read the value (and element, for array packets) following the handle
fn read_value<'a>(
    kind: u8,
    fields: &mut FieldReader<'a>,
) -> Result<(Value<'a>, Option<u16>), FieldError> {
    Ok(match kind {
        MSG_VALUE_INT => (Value::Int(fields.int()?), None),
        MSG_VALUE_FLOAT => (Value::Float(fields.float()?), None),
        MSG_VALUE_INT_ARRAY => {
            let value = Value::Int(fields.int()?);
            (value, Some(fields.element()?))
        }
        MSG_VALUE_FLOAT_ARRAY => {
            let value = Value::Float(fields.float()?);
            (value, Some(fields.element()?))
        }
        _ => (Value::Str(fields.string()?), None),
    })
}

/// Write a value and optional element, returning the packet type to use
fn write_value(
    fields: &mut FieldWriter<'_>,
    value: &Value<'_>,
    element: Option<u16>,
) -> Result<u8, FieldError> {
    let kind = match (value, element) {
        (Value::Int(v), None) => {
            fields.value(i64::from(*v))?;
            MSG_VALUE_INT
        }
        (Value::Float(v), None) => {
            fields.float(*v)?;
            MSG_VALUE_FLOAT
        }
        (Value::Int(v), Some(element)) => {
            fields.value(i64::from(*v))?.count(i64::from(element))?;
            MSG_VALUE_INT_ARRAY
        }
        (Value::Float(v), Some(element)) => {
            fields.float(*v)?.count(i64::from(element))?;
            MSG_VALUE_FLOAT_ARRAY
        }
        (Value::Str(text), _) => {
            fields.string(text)?;
            MSG_UPDATE_STRING
        }
    };
    Ok(kind)
}
