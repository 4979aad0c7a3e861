//! Byte transport the session talks through.
//!
//! The session only needs line reads with a timeout plus the ability to
//! bounce the port, so anything implementing [`Transport`] can drive it:
//! the real serial port, or a scripted stand-in for tests.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use serialport::{ClearBuffer, SerialPort};

use crate::constants::{BAUD_RATE, READ_TIMEOUT};
use crate::error::TransportError;

/// Size of a single read from the port.
const READ_CHUNK: usize = 256;

/// A line-oriented byte stream to the analyzer.
pub trait Transport {
    /// Write all bytes.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read up to and including the next `\n`.
    ///
    /// Returns whatever arrived before the read timeout if no terminator was
    /// seen, which may be empty.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Reopen a closed link with the same settings.
    fn open(&mut self) -> io::Result<()>;

    /// Close the link.
    fn close(&mut self) -> io::Result<()>;

    /// Discard any input received but not yet read.
    fn flush_input(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }

    fn open(&mut self) -> io::Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn flush_input(&mut self) -> io::Result<()> {
        (**self).flush_input()
    }
}

// ============================================================================
// Serial Port
// ============================================================================

/// [`Transport`] over a local serial port.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
    /// Bytes read past the last returned line.
    buffer: BytesMut,
}

impl SerialTransport {
    /// Open `path` at the analyzer's baud rate and read timeout.
    pub fn open_default(path: &str) -> Result<Self, TransportError> {
        Self::open_with(path, BAUD_RATE, READ_TIMEOUT)
    }

    /// Open `path` with explicit link settings.
    pub fn open_with(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        log::debug!("opened {} at {} baud", path, baud_rate);
        Ok(SerialTransport {
            path: path.to_string(),
            baud_rate,
            timeout,
            port: Some(port),
            buffer: BytesMut::with_capacity(READ_CHUNK * 2),
        })
    }

    /// Port path, e.g. `/dev/ttyUSB0`.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        let path = &self.path;
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, format!("{} is closed", path)))
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        Some(self.buffer.split_to(end + 1).to_vec())
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }
            if Instant::now() >= deadline {
                break;
            }
            match self.port()?.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        // Timed out mid-line: hand back the partial line.
        Ok(self.buffer.split().to_vec())
    }

    fn open(&mut self) -> io::Result<()> {
        if self.port.is_none() {
            let port = serialport::new(&self.path, self.baud_rate)
                .timeout(self.timeout)
                .open()?;
            self.port = Some(port);
            log::debug!("reopened {}", self.path);
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the handle closes the port.
        self.port = None;
        self.buffer.clear();
        Ok(())
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// List the serial ports the OS knows about.
pub fn available_ports() -> Result<Vec<String>, TransportError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
