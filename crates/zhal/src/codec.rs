//! Length-prefixed JSON framing shared by the command and receive paths.
//!
//! Every frame is a big-endian `u16` body length followed by that many bytes
//! of UTF-8 JSON:
//!
//! ```text
//! +--------+--------+---------------------------+
//! | len hi | len lo | JSON body (len bytes)     |
//! +--------+--------+---------------------------+
//! ```

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Size of the length prefix.
pub const HEADER_BYTES: usize = 2;

/// Largest body the prefix can describe.
pub const MAX_FRAME_BYTES: usize = u16::MAX as usize;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The encoded body does not fit the length prefix.
    #[error("frame body of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Encoded body size.
        size: usize,
        /// Limit imposed by the prefix.
        max: usize,
    },
    /// The peer closed the stream part-way through a frame.
    #[error("stream ended after {received} of {expected} bytes")]
    Truncated {
        /// Bytes the frame section required.
        expected: usize,
        /// Bytes actually read.
        received: usize,
    },
    /// Socket-level failure, including read and write timeouts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The body was not the expected JSON document.
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialises `document` into a complete frame.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] when the body exceeds
/// [`MAX_FRAME_BYTES`], or [`FrameError::Json`] when serialisation fails.
#[expect(clippy::big_endian_bytes, reason = "wire length prefix is big-endian")]
pub fn encode_frame<T>(document: &T) -> Result<Vec<u8>, FrameError>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(document)?;
    let length = u16::try_from(body.len()).map_err(|_| FrameError::TooLarge {
        size: body.len(),
        max: MAX_FRAME_BYTES,
    })?;
    let mut frame = Vec::with_capacity(HEADER_BYTES + body.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Encodes `document` and writes it to `writer`, flushing afterwards.
///
/// # Errors
///
/// Propagates encoding failures and I/O errors from the writer.
pub fn write_frame<W, T>(writer: &mut W, document: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let frame = encode_frame(document)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame
/// starts.
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] when the stream ends inside a frame,
/// [`FrameError::Io`] for socket failures, and [`FrameError::Json`] when the
/// body does not decode as `T`.
#[expect(clippy::big_endian_bytes, reason = "wire length prefix is big-endian")]
pub fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut header = [0_u8; HEADER_BYTES];
    let header_read = read_full(reader, &mut header)?;
    if header_read == 0 {
        return Ok(None);
    }
    if header_read < HEADER_BYTES {
        return Err(FrameError::Truncated {
            expected: HEADER_BYTES,
            received: header_read,
        });
    }

    let length = usize::from(u16::from_be_bytes(header));
    let mut body = vec![0_u8; length];
    let body_read = read_full(reader, &mut body)?;
    if body_read < length {
        return Err(FrameError::Truncated {
            expected: length,
            received: body_read,
        });
    }

    Ok(Some(serde_json::from_slice(&body)?))
}

/// Fills `buffer` unless the stream ends first; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while let Some(remaining) = buffer.get_mut(filled..) {
        if remaining.is_empty() {
            break;
        }
        match reader.read(remaining) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}
