//! Growable byte buffer with response metadata.
//!
//! Every client slot owns a handful of these: the receive/response data
//! buffer, the custom-header scratch, the serialized header output, and
//! the three URL buffers. A buffer carries the metadata the response
//! assembler needs (content type, date, expires, cacheability) so that
//! handlers can annotate the body they build without reaching into the
//! slot.
//!
//! Buffers are append-only between resets. `reset` truncates to zero
//! length but keeps the allocation, which is what makes slot reuse
//! across keep-alive requests cheap.

use std::fmt;
use std::time::SystemTime;

use crate::content_type::ContentType;

/// Initial capacity for URL buffers.
pub const URL_INITIAL_SIZE: usize = 64;

/// Initial capacity for the response data buffer.
pub const RESPONSE_INITIAL_SIZE: usize = 4096;

/// Initial capacity for header buffers.
pub const HEADER_INITIAL_SIZE: usize = 1024;

/// Growable byte buffer carrying response metadata.
#[derive(Debug)]
pub struct WebBuffer {
    data: Vec<u8>,
    /// Content type the response assembler will emit for this body.
    pub content_type: ContentType,
    /// Body date; `None` means "now" at header build time. Static file
    /// responses set this to the file's mtime.
    pub date: Option<SystemTime>,
    /// Expiration date; `None` derives from `date` and cacheability.
    pub expires: Option<SystemTime>,
    no_cacheable: bool,
}

impl WebBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(RESPONSE_INITIAL_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            content_type: ContentType::PlainText,
            date: None,
            expires: None,
            no_cacheable: false,
        }
    }

    /// Truncate to zero length, retaining capacity and metadata.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Ensure capacity for at least `n` more bytes.
    ///
    /// Growth failures abort the process (`Vec` semantics); no operation
    /// ever silently drops data.
    pub fn need_bytes(&mut self, n: usize) {
        self.data.reserve(n);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Lossy UTF-8 view, for logging and tokenizing.
    #[must_use]
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn push_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Append `s` with HTML special characters escaped.
    pub fn push_html_escaped(&mut self, s: &str) {
        for c in s.chars() {
            match c {
                '&' => self.push_str("&amp;"),
                '<' => self.push_str("&lt;"),
                '>' => self.push_str("&gt;"),
                '"' => self.push_str("&quot;"),
                '\'' => self.push_str("&#39;"),
                _ => {
                    let mut tmp = [0u8; 4];
                    self.push_str(c.encode_utf8(&mut tmp));
                }
            }
        }
    }

    /// Replace every occurrence of `from` with `to` in place.
    pub fn replace_char(&mut self, from: u8, to: u8) {
        for b in &mut self.data {
            if *b == from {
                *b = to;
            }
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Mark the body cacheable (the default for fresh buffers).
    pub fn cacheable(&mut self) {
        self.no_cacheable = false;
    }

    /// Mark the body non-cacheable; the assembler emits
    /// `Cache-Control: no-cache, no-store, must-revalidate`.
    pub fn no_cacheable(&mut self) {
        self.no_cacheable = true;
    }

    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        !self.no_cacheable
    }

    /// Reset metadata alongside contents, for slot reuse.
    pub fn reset_with_metadata(&mut self) {
        self.data.clear();
        self.content_type = ContentType::PlainText;
        self.date = None;
        self.expires = None;
        self.no_cacheable = false;
    }
}

impl Default for WebBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for WebBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}
