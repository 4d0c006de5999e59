//! The serial transport contract.
//!
//! Grounded on `mpf.platforms.base_serial_communicator.BaseSerialCommunicator`:
//! a `connect -> identify -> loop { read; parse }` lifecycle, a byte-at-a-time
//! `readuntil(separator, min_chars)`, and write buffering with high/low
//! watermarks. Framing for any real hardware dialect (WPC, FAST, P-ROC, ...)
//! is out of scope here; what this module provides is the trait contract
//! plus a same-process [`SimulatedTransport`] that decodes a small line
//! protocol, enough to drive tests and the CLI demo without real hardware.

mod byte_channel;
mod simulated;

pub use byte_channel::{byte_channel, ByteReceiver, ByteSender};
pub use simulated::{ParsedEvent, SimulatedTransport};

/// Writes are buffered; once buffered bytes reach this many, writers should
/// stop accepting more until the buffer drains back to
/// [`WRITE_LOW_WATERMARK`].
pub const WRITE_HIGH_WATERMARK: usize = 2048;
/// The buffered-byte count a write buffer must drain back to before writers
/// resume after hitting [`WRITE_HIGH_WATERMARK`].
pub const WRITE_LOW_WATERMARK: usize = 1024;

/// The lifecycle contract a hardware-specific serial transport implements.
///
/// `connect`/`identify`/`read_byte`/`write` are the asynchronous primitives;
/// `parse` and the frame-delimiter accessors are synchronous, since decoding
/// a complete frame once it has arrived needs no further waiting.
pub trait SerialTransport {
    /// The error type this transport's I/O operations can fail with.
    type Error: std::fmt::Display;

    /// Opens the underlying connection (e.g. a serial port at a configured
    /// URL and baud rate).
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Performs the platform-specific handshake that confirms the other end
    /// is the expected hardware.
    async fn identify(&mut self) -> Result<(), Self::Error>;

    /// Reads exactly one byte. [`read_until`] calls this in a loop; an
    /// empty or errored read is this trait's signal to stop the machine.
    async fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Queues `data` for writing, subject to the watermarks above.
    async fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Decodes one complete frame, as delimited by [`Self::separator`] and
    /// [`Self::min_frame_len`].
    fn parse(&mut self, frame: &[u8]);

    /// The byte that terminates a frame.
    fn separator(&self) -> u8 {
        b'\n'
    }

    /// A frame shorter than this many bytes is not yet complete even if it
    /// ends in [`Self::separator`] (guards against spurious early matches).
    fn min_frame_len(&self) -> usize {
        0
    }
}

/// Reads bytes one at a time until `separator` is seen in a buffer longer
/// than `min_chars`.
pub async fn read_until<T>(
    transport: &mut T,
    separator: u8,
    min_chars: usize,
) -> Result<Vec<u8>, T::Error>
where
    T: SerialTransport,
{
    let mut buffer = Vec::new();
    loop {
        let byte = transport.read_byte().await?;
        buffer.push(byte);
        if byte == separator && buffer.len() > min_chars {
            return Ok(buffer);
        }
    }
}

/// Drives one transport through its full lifecycle: connect, identify, then
/// read-and-parse frames forever (until a read fails).
pub async fn run<T>(transport: &mut T) -> Result<(), T::Error>
where
    T: SerialTransport,
{
    transport.connect().await?;
    transport.identify().await?;
    loop {
        let separator = transport.separator();
        let min_chars = transport.min_frame_len();
        let frame = read_until(transport, separator, min_chars).await?;
        transport.parse(&frame);
    }
}
