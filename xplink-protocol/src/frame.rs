//! Frame encoding and decoding for the XPLink serial protocol.
//!
//! Frame format:
//! - START (1 byte): `[` synchronization byte
//! - TYPE (1 byte): message type character
//! - PAYLOAD (0-197 bytes): comma separated text fields
//! - END (1 byte): `]` trailer
//!
//! Nothing inside a frame is binary, so the sentinels never appear in a
//! well-formed payload. The field layer rejects text that would contain them.

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = b'[';

/// Frame trailer byte
pub const FRAME_END: u8 = b']';

/// Maximum complete packet size, sentinels included
///
/// Needs to hold the longest dataref name plus about ten bytes of framing
/// and handle fields, and the longest string dataref the device subscribes to.
pub const MAX_PACKET_SIZE: usize = 200;

/// Maximum payload size (packet minus START, TYPE and END)
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - 3;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Incoming frame exceeded `MAX_PACKET_SIZE` and was dropped
    Overflow,
    /// `[]` with no type character
    Empty,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type character
    pub kind: u8,
    /// Payload bytes between the type character and the trailer
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Build a frame from a type character and payload bytes
    pub fn new(kind: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::BufferTooSmall)?;

        Ok(Self {
            kind,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(kind: u8) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    /// Size of this frame on the wire
    pub fn encoded_len(&self) -> usize {
        3 + self.payload.len()
    }

    /// Write `[`, type, payload and `]` into `buffer`
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = FRAME_START;
        buffer[1] = self.kind;
        buffer[2..2 + self.payload.len()].copy_from_slice(&self.payload);
        buffer[frame_len - 1] = FRAME_END;

        Ok(frame_len)
    }

    /// Encode into an owned packet
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_PACKET_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Incremental parser for the inbound byte stream
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, { MAX_PACKET_SIZE - 2 }>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for START byte
    WaitingForStart,
    /// Accumulating TYPE and PAYLOAD until END
    InFrame,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForStart,
            buffer: Vec::new(),
        }
    }

    /// Reset the parser state, dropping any partial frame
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForStart;
        self.buffer.clear();
    }

    /// True while a frame header has been seen but not its trailer
    pub fn in_frame(&self) -> bool {
        self.state == ParseState::InFrame
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` when a frame had to
    /// be dropped. After an error the parser waits for the next START.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForStart => {
                if byte == FRAME_START {
                    self.buffer.clear();
                    self.state = ParseState::InFrame;
                }
                // Silently ignore bytes between frames
                Ok(None)
            }
            ParseState::InFrame => match byte {
                // No nesting: a new header restarts accumulation
                FRAME_START => {
                    self.buffer.clear();
                    Ok(None)
                }
                FRAME_END => {
                    let result = match self.buffer.split_first() {
                        Some((&kind, payload)) => Frame::new(kind, payload).map(Some),
                        None => Err(FrameError::Empty),
                    };
                    self.reset();
                    result
                }
                _ => {
                    if self.buffer.push(byte).is_err() {
                        self.reset();
                        return Err(FrameError::Overflow);
                    }
                    Ok(None)
                }
            },
        }
    }

    /// Feed a slice, stopping at the first complete frame
    ///
    /// Bytes after that frame are left unconsumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(b'N');
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 3);
        assert_eq!(&buffer[..3], b"[N]");
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let frame = Frame::new(b'k', b",005,003").unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        assert_eq!(&encoded[..], b"[k,005,003]");
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = Frame::new(b'g', b"\"hello\"").unwrap();
        let mut buffer = [0u8; 5];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(b'D', b",12,\"sim/x\"").unwrap();
        let encoded = original.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&encoded).unwrap().unwrap();

        assert_eq!(parsed, original);
        assert!(!parser.in_frame());
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(b"xx]junk[Q]").unwrap().unwrap();
        assert_eq!(parsed.kind, b'Q');
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_start_mid_frame_restarts() {
        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(b"[1,5,4[2,7,1.5]").unwrap().unwrap();
        assert_eq!(parsed.kind, b'2');
        assert_eq!(&parsed.payload[..], b",7,1.5");
    }

    #[test]
    fn test_frame_delivered_once() {
        let mut parser = FrameParser::new();
        let mut frames = 0;
        for &byte in b"[N]]]" {
            if parser.feed(byte).unwrap().is_some() {
                frames += 1;
            }
        }
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_empty_frame() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(b"[]"), Err(FrameError::Empty));
        assert!(!parser.in_frame());
    }

    #[test]
    fn test_overflow_drops_and_resyncs() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed(FRAME_START), Ok(None));

        let mut overflowed = false;
        for _ in 0..MAX_PACKET_SIZE {
            if parser.feed(b'a') == Err(FrameError::Overflow) {
                overflowed = true;
                break;
            }
        }
        assert!(overflowed);
        assert!(!parser.in_frame());

        // Tail of the oversized frame is ignored, next frame parses
        let parsed = parser.feed_bytes(b"aaaa][X]").unwrap().unwrap();
        assert_eq!(parsed.kind, b'X');
    }

    #[test]
    fn test_largest_frame_fits() {
        let payload = [b'a'; MAX_PAYLOAD_SIZE];
        let frame = Frame::new(b'9', &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        assert_eq!(encoded.len(), MAX_PACKET_SIZE);

        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded).unwrap(), Some(frame));
    }

    #[test]
    fn test_reset_abandons_partial_frame() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(b"[1,5,"), Ok(None));
        assert!(parser.in_frame());
        parser.reset();
        assert!(!parser.in_frame());
        assert_eq!(parser.feed_bytes(b"42]"), Ok(None));
    }
}
