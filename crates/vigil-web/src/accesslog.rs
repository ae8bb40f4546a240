//! Per-request access logging.
//!
//! One record per completed request: identity, peer, mode label, byte
//! counts with the compression ratio, and the three durations
//! (preparation, sending, total). URLs are sanitized before they reach
//! the log: control characters become spaces.

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;

/// One completed request.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub id: u64,
    pub thread: String,
    pub peer_ip: String,
    pub peer_port: u16,
    /// `FILECOPY`, `OPTIONS`, `STREAM` or `DATA`.
    pub mode: &'static str,
    /// Bytes that reached the wire for the body (compressed size when
    /// gzip was on).
    pub sent_bytes: u64,
    /// Uncompressed body size.
    pub size_bytes: u64,
    pub prep_ms: f64,
    pub sent_ms: f64,
    pub total_ms: f64,
    pub code: u16,
    /// URL as received, control characters replaced by spaces.
    pub url: String,
}

impl AccessLogEntry {
    /// Compression saving as a negative percentage, `-0%` when nothing
    /// was saved or the body was empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.size_bytes == 0 {
            return -0.0;
        }
        -((self.size_bytes.saturating_sub(self.sent_bytes)) as f64 / self.size_bytes as f64
            * 100.0)
    }
}

/// Replace control characters with spaces before a string reaches the
/// access log.
#[must_use]
pub fn strip_control_characters(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Output flavour of the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// The classic one-line format.
    Line,
    /// One JSON object per line.
    Json,
}

enum Sink {
    Disabled,
    Writer(Mutex<Box<dyn Write + Send>>),
}

/// Serialized access-log sink shared by all slots.
pub struct AccessLog {
    sink: Sink,
    format: LogFormat,
}

impl AccessLog {
    /// Log to stderr in the line format.
    #[must_use]
    pub fn to_stderr() -> Self {
        Self::to_writer(Box::new(std::io::stderr()), LogFormat::Line)
    }

    /// Drop all records.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
            format: LogFormat::Line,
        }
    }

    #[must_use]
    pub fn to_writer(writer: Box<dyn Write + Send>, format: LogFormat) -> Self {
        Self {
            sink: Sink::Writer(Mutex::new(writer)),
            format,
        }
    }

    /// Write one record. I/O failures are swallowed; logging never
    /// breaks request processing.
    pub fn log(&self, entry: &AccessLogEntry) {
        let Sink::Writer(writer) = &self.sink else {
            return;
        };

        let line = match self.format {
            LogFormat::Line => format_line(entry),
            LogFormat::Json => match serde_json::to_string(entry) {
                Ok(json) => json,
                Err(_) => return,
            },
        };

        let mut writer = writer.lock();
        let _ = writeln!(writer, "{line}");
    }
}

impl std::fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLog")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

fn format_line(e: &AccessLogEntry) -> String {
    format!(
        "{}: {} '[{}]:{}' '{}' (sent/all = {}/{} bytes {:.0}%, prep/sent/total = {:.2}/{:.2}/{:.2} ms) {} '{}'",
        e.id,
        e.thread,
        e.peer_ip,
        e.peer_port,
        e.mode,
        e.sent_bytes,
        e.size_bytes,
        e.ratio(),
        e.prep_ms,
        e.sent_ms,
        e.total_ms,
        e.code,
        e.url,
    )
}
