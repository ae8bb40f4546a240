//! Streaming gzip for response bodies.
//!
//! [`GzipStream`] compresses the response body in rounds. Each round
//! feeds a batch of not-yet-compressed source bytes to the encoder and
//! either sync-flushes (more source may follow, e.g. a file still being
//! read) or finishes the stream (the producer is complete). The output
//! of a round becomes exactly one chunk of the chunked transfer
//! encoding.
//!
//! Counters mirror the send path's bookkeeping: `zhave` is the number
//! of valid bytes in the current output batch, `zsent` how many of
//! them reached the socket. `zsent <= zhave` always holds, and a new
//! round may only start once the previous batch is fully drained.

use std::fmt;
use std::io::{self, Write};
use std::mem;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Source bytes fed to the compressor per round; each round's output
/// becomes one chunk on the wire.
pub const GZIP_SOURCE_CHUNK: usize = 16384;

/// Default gzip level when the configuration does not set one.
pub const DEFAULT_GZIP_LEVEL: u32 = 3;

/// Deflate strategy knob.
///
/// Accepted for configuration compatibility; the bundled deflate
/// backend always runs the default strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GzipStrategy {
    #[default]
    Default,
    Filtered,
    HuffmanOnly,
    Rle,
    Fixed,
}

/// Compressor failure; the slot is marked dead when this surfaces
/// mid-stream.
#[derive(Debug)]
pub struct GzipError(io::Error);

impl fmt::Display for GzipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gzip compression failed: {}", self.0)
    }
}

impl std::error::Error for GzipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for GzipError {
    fn from(e: io::Error) -> Self {
        Self(e)
    }
}

enum Stage {
    Streaming(GzEncoder<Vec<u8>>),
    /// The stream has been finished; the final batch (including the
    /// gzip trailer) is drained from here.
    Finished(Vec<u8>),
}

/// Streaming gzip state for one response.
pub struct GzipStream {
    stage: Stage,
    zhave: usize,
    zsent: usize,
    total_in: u64,
    /// Output bytes accounted for in completed rounds.
    drained_out: u64,
    finished: bool,
}

impl GzipStream {
    /// Create a compressor for one response. `level` is clamped to the
    /// valid 1..=9 range.
    #[must_use]
    pub fn new(level: u32, _strategy: GzipStrategy) -> Self {
        let encoder = GzEncoder::new(
            Vec::with_capacity(GZIP_SOURCE_CHUNK),
            Compression::new(level.clamp(1, 9)),
        );
        Self {
            stage: Stage::Streaming(encoder),
            zhave: 0,
            zsent: 0,
            total_in: 0,
            drained_out: 0,
            finished: false,
        }
    }

    /// Run one compression round over `src`.
    ///
    /// The previous batch must be fully drained. With `finish` the gzip
    /// stream is finalized and no further rounds are accepted; without
    /// it the encoder is sync-flushed so the output is a complete
    /// representation of everything fed so far.
    ///
    /// Returns the batch size now pending.
    pub fn compress_round(&mut self, src: &[u8], finish: bool) -> Result<usize, GzipError> {
        debug_assert_eq!(self.zsent, self.zhave, "previous batch not drained");

        if self.finished {
            return Ok(0);
        }

        self.drained_out += self.zhave as u64;
        self.total_in += src.len() as u64;

        if finish {
            let stage = mem::replace(&mut self.stage, Stage::Finished(Vec::new()));
            let Stage::Streaming(mut encoder) = stage else {
                return Ok(0);
            };
            encoder.get_mut().clear();
            encoder.write_all(src)?;
            let out = encoder.finish()?;
            self.zhave = out.len();
            self.zsent = 0;
            self.finished = true;
            self.stage = Stage::Finished(out);
        } else {
            let Stage::Streaming(encoder) = &mut self.stage else {
                return Ok(0);
            };
            encoder.get_mut().clear();
            encoder.write_all(src)?;
            encoder.flush()?;
            self.zhave = encoder.get_ref().len();
            self.zsent = 0;
        }

        Ok(self.zhave)
    }

    /// The not-yet-sent part of the current batch.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        let out = match &self.stage {
            Stage::Streaming(encoder) => encoder.get_ref().as_slice(),
            Stage::Finished(out) => out.as_slice(),
        };
        &out[self.zsent..self.zhave]
    }

    /// Record `n` bytes of the current batch as written to the socket.
    pub fn advance(&mut self, n: usize) {
        self.zsent = self.zsent.saturating_add(n).min(self.zhave);
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.zsent < self.zhave
    }

    /// The gzip stream has been finalized.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Source bytes fed across all rounds.
    #[must_use]
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Compressed bytes produced across all rounds.
    #[must_use]
    pub fn total_out(&self) -> u64 {
        self.drained_out + self.zhave as u64
    }

    #[must_use]
    pub fn batch_len(&self) -> usize {
        self.zhave
    }
}

impl fmt::Debug for GzipStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipStream")
            .field("zhave", &self.zhave)
            .field("zsent", &self.zsent)
            .field("total_in", &self.total_in)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
