//! Serial link abstractions
//!
//! The protocol engine never blocks: it drains whatever bytes are already
//! buffered and writes each packet in one call. Chip HALs either implement
//! [`SerialPort`] directly or wrap an `embedded-io` UART in [`IoSerial`].

use embedded_io::{Read, ReadReady, Write};

/// Baud rate of the host plugin, 8N1; it does not negotiate
pub const BAUDRATE: u32 = 115_200;

/// Bidirectional byte stream to the host
pub trait SerialPort {
    /// Error type for transport operations
    type Error;

    /// Copy already-received bytes into `buf`
    ///
    /// Returns `Ok(0)` when nothing is pending. Never waits for data.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write a complete packet
    ///
    /// The packet goes out as one write so frames from different callers
    /// never interleave.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Adapter from blocking `embedded-io` traits to [`SerialPort`]
///
/// `ReadReady` gates every read so the engine's poll stays non-blocking.
#[derive(Debug)]
pub struct IoSerial<T> {
    inner: T,
}

impl<T> IoSerial<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped UART
    pub fn inner(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Give back the wrapped UART
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> SerialPort for IoSerial<T>
where
    T: Read + ReadReady + Write,
{
    type Error = T::Error;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !self.inner.read_ready()? {
            return Ok(0);
        }
        self.inner.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        Write::write_all(&mut self.inner, data)?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{ErrorKind, ErrorType};
    use heapless::Vec;

    /// Loopback UART: bytes written become readable
    struct Loopback {
        data: Vec<u8, 64>,
        flushed: bool,
    }

    impl ErrorType for Loopback {
        type Error = ErrorKind;
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            let rest: Vec<u8, 64> = Vec::from_slice(&self.data[n..]).map_err(|_| ErrorKind::Other)?;
            self.data = rest;
            Ok(n)
        }
    }

    impl ReadReady for Loopback {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.data.is_empty())
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.data.extend_from_slice(buf).map_err(|_| ErrorKind::OutOfMemory)?;
            self.flushed = false;
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushed = true;
            Ok(())
        }
    }

    #[test]
    fn test_read_available_does_not_block_when_idle() {
        let mut port = IoSerial::new(Loopback {
            data: Vec::new(),
            flushed: false,
        });
        let mut buf = [0u8; 8];
        assert_eq!(port.read_available(&mut buf), Ok(0));
    }

    #[test]
    fn test_write_then_read() {
        let mut port = IoSerial::new(Loopback {
            data: Vec::new(),
            flushed: false,
        });
        port.write_all(b"[N]").unwrap();
        assert!(port.inner().flushed);

        let mut buf = [0u8; 2];
        assert_eq!(port.read_available(&mut buf), Ok(2));
        assert_eq!(&buf, b"[N");
        assert_eq!(port.read_available(&mut buf), Ok(1));
        assert_eq!(buf[0], b']');
        assert_eq!(port.read_available(&mut buf), Ok(0));
    }
}
