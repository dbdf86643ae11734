//! Text field marshaling for frame payloads
//!
//! Numeric fields are decimal text preceded by a comma. Integers are written
//! zero-padded to a fixed width so packet sizes stay bounded; floats carry a
//! fixed number of decimals. Strings are double-quoted.
//!
//! ```text
//! [k,005,003]        command 5, trigger 3 times
//! [D,12,"sim/x"]     dataref "sim/x" resolved to handle 12
//! [b"sim/x"]         register dataref "sim/x"
//! ```
//!
//! Decoding is lenient about padding and the leading comma, so a host that
//! writes `[1,5,42]` and one that writes `[1,005,00000000042]` both parse.

use core::fmt::Write as _;
use core::str::FromStr;

use heapless::{String, Vec};

use crate::frame::{FRAME_END, FRAME_START, MAX_PAYLOAD_SIZE};

/// Separator written before every numeric field
pub const FIELD_SEPARATOR: u8 = b',';

/// Delimiter around string fields
pub const STRING_QUOTE: u8 = b'"';

/// Widest integer field the encoder accepts
pub const MAX_FIELD_WIDTH: u8 = 18;

/// Errors produced while encoding or decoding fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    /// Expected field is not present
    Missing,
    /// Field text does not parse as the expected type
    Malformed,
    /// Value does not fit the configured field width
    OutOfRange,
    /// String contains a quote or a frame sentinel
    InvalidText,
    /// Field does not fit the remaining frame capacity
    Overflow,
}

/// Field widths and float precision used on the wire
///
/// The reference host reads fields with `atoi`/`atof`, so widths only bound
/// what this side writes. They are configuration rather than literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldFormat {
    /// Digits for dataref and command handles
    ///
    /// Also caps the handles this side accepts: a host answer with a handle
    /// wider than this is treated as a rejection.
    pub handle_width: u8,
    /// Digits for trigger counts and array elements
    pub count_width: u8,
    /// Digits for integer values, update rates and scaling bounds
    pub value_width: u8,
    /// Decimals written for floating point values
    pub float_precision: u8,
}

impl Default for FieldFormat {
    fn default() -> Self {
        Self {
            handle_width: 3,
            count_width: 3,
            value_width: 11,
            float_precision: 6,
        }
    }
}

impl FieldFormat {
    /// Check whether a raw handle can be written as a handle field
    pub fn fits_handle(&self, raw: i32) -> bool {
        let (min, max) = width_range(self.handle_width);
        (min..=max).contains(&i64::from(raw))
    }
}

/// Inclusive range of integers that fit a zero-padded field of `width` chars
///
/// A negative value spends one character on its sign.
pub fn width_range(width: u8) -> (i64, i64) {
    let width = u32::from(width.clamp(1, MAX_FIELD_WIDTH));
    let max = 10i64.pow(width) - 1;
    let min = -(10i64.pow(width - 1) - 1);
    (min, max)
}

/// Appends fields to a frame payload
#[derive(Debug)]
pub struct FieldWriter<'a> {
    payload: &'a mut Vec<u8, MAX_PAYLOAD_SIZE>,
    format: FieldFormat,
}

impl<'a> FieldWriter<'a> {
    /// Start writing fields after whatever `payload` already holds
    pub fn new(payload: &'a mut Vec<u8, MAX_PAYLOAD_SIZE>, format: FieldFormat) -> Self {
        Self { payload, format }
    }

    /// Bytes still available in the payload
    pub fn remaining(&self) -> usize {
        self.payload.capacity() - self.payload.len()
    }

    /// Write a handle field
    pub fn handle(&mut self, handle: i32) -> Result<&mut Self, FieldError> {
        self.int(i64::from(handle), self.format.handle_width)
    }

    /// Write a trigger count or array element field
    pub fn count(&mut self, count: i64) -> Result<&mut Self, FieldError> {
        self.int(count, self.format.count_width)
    }

    /// Write an integer value field
    pub fn value(&mut self, value: i64) -> Result<&mut Self, FieldError> {
        self.int(value, self.format.value_width)
    }

    /// Write a zero-padded integer of exactly `width` characters
    pub fn int(&mut self, value: i64, width: u8) -> Result<&mut Self, FieldError> {
        let (min, max) = width_range(width);
        if value < min || value > max {
            return Err(FieldError::OutOfRange);
        }

        let mut text = String::<24>::new();
        write!(text, "{:0width$}", value, width = usize::from(width))
            .map_err(|_| FieldError::Overflow)?;
        self.push_field(text.as_bytes())
    }

    /// Write a float with the configured number of decimals
    pub fn float(&mut self, value: f32) -> Result<&mut Self, FieldError> {
        if !value.is_finite() {
            return Err(FieldError::OutOfRange);
        }

        let mut text = String::<48>::new();
        write!(
            text,
            "{:.prec$}",
            value,
            prec = usize::from(self.format.float_precision)
        )
        .map_err(|_| FieldError::OutOfRange)?;
        self.push_field(text.as_bytes())
    }

    /// Write a quoted string
    ///
    /// The separator is omitted when the string is the first field, which is
    /// how name and message packets are laid out.
    pub fn string(&mut self, text: &str) -> Result<&mut Self, FieldError> {
        if text
            .bytes()
            .any(|b| b == STRING_QUOTE || b == FRAME_START || b == FRAME_END)
        {
            return Err(FieldError::InvalidText);
        }

        let separator = usize::from(!self.payload.is_empty());
        if separator + text.len() + 2 > self.remaining() {
            return Err(FieldError::Overflow);
        }

        if separator == 1 {
            self.push(FIELD_SEPARATOR)?;
        }
        self.push(STRING_QUOTE)?;
        self.payload
            .extend_from_slice(text.as_bytes())
            .map_err(|_| FieldError::Overflow)?;
        self.push(STRING_QUOTE)?;
        Ok(self)
    }

    fn push_field(&mut self, text: &[u8]) -> Result<&mut Self, FieldError> {
        if text.len() + 1 > self.remaining() {
            return Err(FieldError::Overflow);
        }
        self.push(FIELD_SEPARATOR)?;
        self.payload
            .extend_from_slice(text)
            .map_err(|_| FieldError::Overflow)?;
        Ok(self)
    }

    fn push(&mut self, byte: u8) -> Result<(), FieldError> {
        self.payload.push(byte).map_err(|_| FieldError::Overflow)
    }
}

/// Reads fields from a frame payload in order
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Start reading at the first byte after the type character
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.payload.len()
    }

    /// Read a signed 32-bit integer field
    pub fn int(&mut self) -> Result<i32, FieldError> {
        i32::try_from(self.long()?).map_err(|_| FieldError::OutOfRange)
    }

    /// Read an integer field as wide as any width the writer accepts
    pub fn long(&mut self) -> Result<i64, FieldError> {
        self.parse()
    }

    /// Read a non-negative integer field that must fit a `u16`
    pub fn element(&mut self) -> Result<u16, FieldError> {
        self.parse()
    }

    /// Read a floating point field
    pub fn float(&mut self) -> Result<f32, FieldError> {
        let value: f32 = self.parse()?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FieldError::Malformed)
        }
    }

    /// Read a quoted string field
    pub fn string(&mut self) -> Result<&'a str, FieldError> {
        self.skip_separator();
        let rest = &self.payload[self.pos..];
        if rest.first() != Some(&STRING_QUOTE) {
            return Err(if rest.is_empty() {
                FieldError::Missing
            } else {
                FieldError::Malformed
            });
        }

        let body = &rest[1..];
        let len = body
            .iter()
            .position(|&b| b == STRING_QUOTE)
            .ok_or(FieldError::Malformed)?;
        let text = core::str::from_utf8(&body[..len]).map_err(|_| FieldError::Malformed)?;
        self.pos += len + 2;
        Ok(text)
    }

    fn parse<T: FromStr>(&mut self) -> Result<T, FieldError> {
        let raw = self.raw()?;
        raw.parse().map_err(|_| FieldError::Malformed)
    }

    /// Raw text of the next unquoted field, trimmed
    fn raw(&mut self) -> Result<&'a str, FieldError> {
        self.skip_separator();
        let rest = &self.payload[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == FIELD_SEPARATOR)
            .unwrap_or(rest.len());
        self.pos += len;

        let text = core::str::from_utf8(&rest[..len])
            .map_err(|_| FieldError::Malformed)?
            .trim();
        if text.is_empty() {
            Err(FieldError::Missing)
        } else {
            Ok(text)
        }
    }

    fn skip_separator(&mut self) {
        if self.payload.get(self.pos) == Some(&FIELD_SEPARATOR) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut FieldWriter<'_>) -> Result<(), FieldError>) -> Vec<u8, MAX_PAYLOAD_SIZE> {
        let mut payload = Vec::new();
        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        f(&mut writer).unwrap();
        payload
    }

    #[test]
    fn test_width_range() {
        assert_eq!(width_range(3), (-99, 999));
        assert_eq!(width_range(1), (0, 9));
        assert_eq!(width_range(11), (-9_999_999_999, 99_999_999_999));
    }

    #[test]
    fn test_fits_handle() {
        let format = FieldFormat::default();
        assert!(format.fits_handle(0));
        assert!(format.fits_handle(999));
        assert!(!format.fits_handle(1000));
    }

    #[test]
    fn test_trigger_fields_are_three_digits() {
        let payload = written(|w| {
            w.handle(5)?.count(3)?;
            Ok(())
        });
        assert_eq!(&payload[..], b",005,003");
    }

    #[test]
    fn test_negative_value_padding() {
        let mut payload = Vec::new();
        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        writer.int(-42, 5).unwrap();
        assert_eq!(&payload[..], b",-0042");
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut payload = Vec::new();
        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        assert_eq!(writer.handle(1000).unwrap_err(), FieldError::OutOfRange);
        assert_eq!(writer.handle(-100).unwrap_err(), FieldError::OutOfRange);
        assert_eq!(writer.count(999).map(|_| ()), Ok(()));
        assert_eq!(&payload[..], b",999");
    }

    #[test]
    fn test_i32_fits_value_width() {
        let payload = written(|w| {
            w.value(i64::from(i32::MIN))?.value(i64::from(i32::MAX))?;
            Ok(())
        });
        let mut reader = FieldReader::new(&payload);
        assert_eq!(reader.int(), Ok(i32::MIN));
        assert_eq!(reader.int(), Ok(i32::MAX));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_full_value_width_reads_back() {
        let payload = written(|w| {
            w.value(99_999_999_999)?.value(-9_999_999_999)?;
            Ok(())
        });
        assert_eq!(&payload[..], b",99999999999,-9999999999");

        let mut reader = FieldReader::new(&payload);
        assert_eq!(reader.clone().int(), Err(FieldError::OutOfRange));
        assert_eq!(reader.long(), Ok(99_999_999_999));
        assert_eq!(reader.long(), Ok(-9_999_999_999));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_float_precision() {
        let mut payload = Vec::new();
        let format = FieldFormat {
            float_precision: 2,
            ..FieldFormat::default()
        };
        FieldWriter::new(&mut payload, format).float(1.456).unwrap();
        assert_eq!(&payload[..], b",1.46");
    }

    #[test]
    fn test_float_not_finite() {
        let mut payload = Vec::new();
        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        assert_eq!(writer.float(f32::NAN).unwrap_err(), FieldError::OutOfRange);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_leading_string_has_no_separator() {
        let payload = written(|w| {
            w.string("sim/x")?;
            Ok(())
        });
        assert_eq!(&payload[..], b"\"sim/x\"");
    }

    #[test]
    fn test_string_after_number() {
        let payload = written(|w| {
            w.handle(12)?.string("sim/x")?;
            Ok(())
        });
        assert_eq!(&payload[..], b",012,\"sim/x\"");
    }

    #[test]
    fn test_string_rejects_sentinels() {
        let mut payload = Vec::new();
        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        assert_eq!(writer.string("a]b").unwrap_err(), FieldError::InvalidText);
        assert_eq!(writer.string("say \"hi\"").unwrap_err(), FieldError::InvalidText);
    }

    #[test]
    fn test_string_capacity_enforced() {
        let long = [b'x'; MAX_PAYLOAD_SIZE - 1];
        let text = core::str::from_utf8(&long).unwrap();
        let mut payload = Vec::new();
        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        assert_eq!(writer.string(text).unwrap_err(), FieldError::Overflow);
        assert!(payload.is_empty());

        let mut writer = FieldWriter::new(&mut payload, FieldFormat::default());
        let fits = &text[..MAX_PAYLOAD_SIZE - 2];
        assert!(writer.string(fits).is_ok());
        assert_eq!(writer.remaining(), 0);
    }

    #[test]
    fn test_reader_lenient_padding() {
        let mut reader = FieldReader::new(b",5, 0042,-7");
        assert_eq!(reader.int(), Ok(5));
        assert_eq!(reader.int(), Ok(42));
        assert_eq!(reader.int(), Ok(-7));
        assert_eq!(reader.int(), Err(FieldError::Missing));
    }

    #[test]
    fn test_reader_first_field_without_comma() {
        let mut reader = FieldReader::new(b"5,\"sim/x\"");
        assert_eq!(reader.int(), Ok(5));
        assert_eq!(reader.string(), Ok("sim/x"));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reader_string_with_comma() {
        let mut reader = FieldReader::new(b",3,\"a,b\",9");
        assert_eq!(reader.int(), Ok(3));
        assert_eq!(reader.string(), Ok("a,b"));
        assert_eq!(reader.int(), Ok(9));
    }

    #[test]
    fn test_reader_malformed() {
        assert_eq!(FieldReader::new(b",abc").int(), Err(FieldError::Malformed));
        assert_eq!(FieldReader::new(b",-1").element(), Err(FieldError::Malformed));
        assert_eq!(FieldReader::new(b",\"open").string(), Err(FieldError::Malformed));
        assert_eq!(FieldReader::new(b",12").string(), Err(FieldError::Malformed));
        assert_eq!(FieldReader::new(b"").string(), Err(FieldError::Missing));
        assert_eq!(FieldReader::new(b",,4").int(), Err(FieldError::Missing));
    }

    #[test]
    fn test_reader_float() {
        let mut reader = FieldReader::new(b",3.250000,-0.5,inf");
        assert_eq!(reader.float(), Ok(3.25));
        assert_eq!(reader.float(), Ok(-0.5));
        assert_eq!(reader.float(), Err(FieldError::Malformed));
    }
}
