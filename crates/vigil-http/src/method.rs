//! Request modes.
//!
//! A slot's mode is a little wider than an HTTP method: `Stream` is the
//! internal metrics-ingest handshake, and `FileCopy` is the state a GET
//! enters once the static file resolver has opened a file and the slot
//! is pumping it to the socket.

/// The request mode of a client slot.
///
/// Fresh and reused slots start in `Get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    #[default]
    Get,
    Options,
    Post,
    Put,
    Delete,
    /// Internal metrics-ingest handshake.
    Stream,
    /// Static file transfer in flight.
    FileCopy,
}

/// Wire prefixes recognized by the request validator, longest first is
/// not required; prefixes are unambiguous.
const METHOD_PREFIXES: &[(&[u8], RequestMode)] = &[
    (b"GET ", RequestMode::Get),
    (b"OPTIONS ", RequestMode::Options),
    (b"POST ", RequestMode::Post),
    (b"PUT ", RequestMode::Put),
    (b"DELETE ", RequestMode::Delete),
    (b"STREAM ", RequestMode::Stream),
];

impl RequestMode {
    /// Match a recognized method prefix at the start of `buf`.
    ///
    /// Returns the mode and the offset of the request-target on success.
    #[must_use]
    pub fn from_prefix(buf: &[u8]) -> Option<(Self, usize)> {
        for (prefix, mode) in METHOD_PREFIXES {
            if buf.starts_with(prefix) {
                return Some((*mode, prefix.len()));
            }
        }
        None
    }

    /// True for the plain data-serving modes (GET/POST/PUT/DELETE).
    #[must_use]
    pub fn is_data(self) -> bool {
        matches!(self, Self::Get | Self::Post | Self::Put | Self::Delete)
    }

    /// True when the method carries a request body.
    #[must_use]
    pub fn expects_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    /// Label used by the access log.
    #[must_use]
    pub fn log_label(self) -> &'static str {
        match self {
            Self::FileCopy => "FILECOPY",
            Self::Options => "OPTIONS",
            Self::Stream => "STREAM",
            Self::Get | Self::Post | Self::Put | Self::Delete => "DATA",
        }
    }
}
