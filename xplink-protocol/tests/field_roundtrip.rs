//! Integer fields survive encode/decode across the whole width range

use heapless::Vec;
use proptest::prelude::*;
use xplink_protocol::fields::{width_range, MAX_FIELD_WIDTH};
use xplink_protocol::{FieldError, FieldFormat, FieldReader, FieldWriter, MAX_PAYLOAD_SIZE};

fn encode(value: i64, width: u8) -> Result<Vec<u8, MAX_PAYLOAD_SIZE>, FieldError> {
    let mut payload = Vec::new();
    FieldWriter::new(&mut payload, FieldFormat::default()).int(value, width)?;
    Ok(payload)
}

fn decode(payload: &[u8]) -> Result<i64, FieldError> {
    FieldReader::new(payload).long()
}

proptest! {
    #[test]
    fn int_roundtrip_within_width(width in 1u8..=MAX_FIELD_WIDTH, seed in any::<i64>()) {
        let (min, max) = width_range(width);
        let span = (max - min + 1) as u64;
        let value = min + (seed.unsigned_abs() % span) as i64;

        let payload = encode(value, width).unwrap();
        // Separator plus exactly `width` characters
        prop_assert_eq!(payload.len(), usize::from(width) + 1);
        prop_assert_eq!(decode(&payload), Ok(value));
    }

    #[test]
    fn int_outside_width_rejected(width in 1u8..=MAX_FIELD_WIDTH, excess in 1i64..1_000_000) {
        let (min, max) = width_range(width);
        prop_assert_eq!(encode(max + excess, width), Err(FieldError::OutOfRange));
        prop_assert_eq!(encode(min - excess, width), Err(FieldError::OutOfRange));
    }

    #[test]
    fn i32_value_roundtrip(value in any::<i32>()) {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        FieldWriter::new(&mut payload, FieldFormat::default())
            .value(i64::from(value))
            .unwrap();
        prop_assert_eq!(FieldReader::new(&payload).int(), Ok(value));
    }

    #[test]
    fn default_value_width_roundtrip(seed in any::<i64>()) {
        let (min, max) = width_range(FieldFormat::default().value_width);
        let value = min + (seed.unsigned_abs() % (max - min + 1) as u64) as i64;

        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        FieldWriter::new(&mut payload, FieldFormat::default())
            .value(value)
            .unwrap();
        prop_assert_eq!(FieldReader::new(&payload).long(), Ok(value));
    }

    #[test]
    fn handle_roundtrip(handle in -99i32..=999) {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        FieldWriter::new(&mut payload, FieldFormat::default())
            .handle(handle)
            .unwrap();
        prop_assert_eq!(&payload[..1], b",");
        prop_assert_eq!(FieldReader::new(&payload).int(), Ok(handle));
    }
}
