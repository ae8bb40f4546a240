//! Chunked transfer-encoding framing.
//!
//! The send path in the engine interleaves these fragments around the
//! compressor output: a chunk header before each batch, a close between
//! batches, and the trailer as the very last bytes of the response.

use std::fmt;

/// Separator between a chunk's payload and the next chunk header.
pub const CHUNK_CLOSE: &[u8] = b"\r\n";

/// Closes the open chunk and terminates the stream:
/// `\r\n` + `0\r\n\r\n`.
pub const CHUNK_TRAILER: &[u8] = b"\r\n0\r\n\r\n";

/// Format a chunk header for a payload of `len` bytes.
#[must_use]
pub fn chunk_header(len: usize) -> String {
    format!("{len:X}\r\n")
}

/// Error decoding a chunked stream.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkedError {
    /// A chunk-size line is not valid hex.
    BadChunkSize,
    /// The stream ended before the terminating zero chunk.
    Truncated,
    /// A chunk payload was not followed by CRLF.
    BadSeparator,
}

impl fmt::Display for ChunkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadChunkSize => write!(f, "invalid chunk size"),
            Self::Truncated => write!(f, "chunked stream truncated"),
            Self::BadSeparator => write!(f, "chunk payload not terminated by CRLF"),
        }
    }
}

impl std::error::Error for ChunkedError {}

/// Decode a complete chunked stream, returning the reassembled payload.
///
/// Used by the test suites to verify what the engine put on the wire;
/// requests to the engine itself are never chunked.
pub fn decode_chunked(mut stream: &[u8]) -> Result<Vec<u8>, ChunkedError> {
    let mut payload = Vec::new();

    loop {
        let line_end = stream
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or(ChunkedError::Truncated)?;
        let size_line =
            std::str::from_utf8(&stream[..line_end]).map_err(|_| ChunkedError::BadChunkSize)?;
        let size_str = size_line.split(';').next().unwrap_or("").trim();
        let size =
            usize::from_str_radix(size_str, 16).map_err(|_| ChunkedError::BadChunkSize)?;
        stream = &stream[line_end + 2..];

        if size == 0 {
            // optional trailers, then the final CRLF
            return if stream.ends_with(b"\r\n") {
                Ok(payload)
            } else {
                Err(ChunkedError::Truncated)
            };
        }

        if stream.len() < size + 2 {
            return Err(ChunkedError::Truncated);
        }
        payload.extend_from_slice(&stream[..size]);
        if &stream[size..size + 2] != b"\r\n" {
            return Err(ChunkedError::BadSeparator);
        }
        stream = &stream[size + 2..];
    }
}
