//! Newline-delimited frame codec.
//!
//! Each frame is one UTF-8 JSON value terminated by `\n`. The
//! [`FrameBuffer`] retains any bytes read past the delimiter, so several
//! frames written back-to-back by the peer are handed out one at a time
//! in arrival order.

use std::io::{self, Read, Write};

use serde::Serialize;
use thiserror::Error;

/// Upper bound on a single frame, delimiter included.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// Errors surfaced while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A frame exceeded [`MAX_FRAME_BYTES`] before its delimiter arrived.
    #[error("frame too large: {size} bytes exceeds {max} byte limit")]
    TooLarge { size: usize, max: usize },
    /// Underlying stream failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Frame serialisation failed.
    #[error("failed to serialise frame: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Carry-over buffer for reading delimited frames from a byte stream.
///
/// The buffer outlives individual reads: bytes belonging to the next
/// frame stay queued until the following [`read_frame`](Self::read_frame)
/// call, which drains them before touching the stream again.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// Creates an empty frame buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the next complete frame from `reader`.
    ///
    /// Blocks until a delimiter arrives, the stream ends, or the frame
    /// limit is exceeded. Returns `Ok(None)` when the peer closes the
    /// stream with no buffered bytes; a final unterminated frame at end
    /// of stream is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when the accumulated frame
    /// exceeds [`MAX_FRAME_BYTES`] and [`FrameError::Io`] on stream
    /// failure.
    pub fn read_frame<R: Read>(&mut self, reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
        if let Some(frame) = self.take_buffered_frame()? {
            return Ok(Some(frame));
        }

        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            let bytes_read = read_with_retry(reader, &mut chunk)?;

            if bytes_read == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            self.pending.extend_from_slice(&chunk[..bytes_read]);
            if let Some(frame) = self.take_buffered_frame()? {
                return Ok(Some(frame));
            }
        }
    }

    /// Splits off the first buffered frame, if a delimiter is queued.
    fn take_buffered_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            let frame = std::mem::replace(&mut self.pending, rest);
            return Ok(Some(frame));
        }
        enforce_limit(self.pending.len())?;
        Ok(None)
    }
}

/// Serialises `payload` as one frame and flushes the stream.
///
/// # Errors
///
/// Returns [`FrameError::Serialise`] when encoding fails and
/// [`FrameError::Io`] when the write or flush fails.
pub fn write_frame<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    payload: &T,
) -> Result<(), FrameError> {
    serde_json::to_writer(&mut *writer, payload)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn read_with_retry<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_limit(size: usize) -> Result<(), FrameError> {
    if size > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            size,
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}
