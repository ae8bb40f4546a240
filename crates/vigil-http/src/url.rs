//! Request-target decoding and path classification.
//!
//! The request validator hands the raw request-target here. The target
//! is percent-decoded as a whole and then split at the first `?`, so an
//! encoded `%3F` in the path does start the query string — that is the
//! contract the dashboards rely on. The decoded query keeps its leading
//! `?`.

use std::fmt;

/// Dashboard major version selected by a `v0`/`v1`/`v2` path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardVersion {
    V0,
    V1,
    V2,
}

impl DashboardVersion {
    /// The path segment form, used to build filesystem candidates.
    #[must_use]
    pub const fn as_segment(self) -> &'static str {
        match self {
            Self::V0 => "v0",
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    /// Recognize a version path segment.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "v0" => Some(Self::V0),
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            _ => None,
        }
    }
}

/// Flags describing the decoded request path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathFlags {
    /// Dashboard version prefix, at most one per request.
    pub version: Option<DashboardVersion>,
    /// Last character of the decoded path is `/`, or the path is empty.
    pub trailing_slash: bool,
    /// The last path segment contains a `.` after its last `/`.
    pub file_extension: bool,
}

impl PathFlags {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Compute the trailing-slash and file-extension flags for a
    /// decoded path. The version flag is owned by the router, which
    /// discovers version segments while walking the path.
    pub fn classify(&mut self, path: &str) {
        let bytes = path.as_bytes();

        // the query string, if any, does not participate
        let end = bytes.iter().position(|&b| b == b'?').unwrap_or(bytes.len());
        let path = &bytes[..end];

        self.trailing_slash = path.is_empty() || path[path.len() - 1] == b'/';

        self.file_extension = false;
        for &b in path.iter().rev() {
            if b == b'/' {
                break;
            }
            if b == b'.' {
                self.file_extension = true;
                break;
            }
        }
    }
}

/// Percent-decoding failure; surfaces to the client as 400.
#[derive(Debug, PartialEq, Eq)]
pub struct UrlDecodeError;

impl fmt::Display for UrlDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed percent-encoding in URL")
    }
}

impl std::error::Error for UrlDecodeError {}

/// Strictly percent-decode `s`.
///
/// A `%` not followed by two hex digits, and decoded bytes that do not
/// form valid UTF-8, are both decoding errors. `+` is left alone; this
/// is a path decoder, not a form decoder.
pub fn percent_decode(s: &str) -> Result<String, UrlDecodeError> {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let (hi, lo) = match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&h), Some(&l)) => (hex_val(h), hex_val(l)),
                _ => return Err(UrlDecodeError),
            };
            match (hi, lo) {
                (Some(h), Some(l)) => {
                    decoded.push((h << 4) | l);
                    i += 3;
                }
                _ => return Err(UrlDecodeError),
            }
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).map_err(|_| UrlDecodeError)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode a request-target into `(path, query)`.
///
/// The whole target is decoded first, then split at the first `?`; the
/// query keeps the `?`. An absent query decodes to an empty string.
pub fn decode_path_and_query(target: &str) -> Result<(String, String), UrlDecodeError> {
    let decoded = percent_decode(target)?;

    match decoded.find('?') {
        Some(pos) => {
            let query = decoded[pos..].to_string();
            let mut path = decoded;
            path.truncate(pos);
            Ok((path, query))
        }
        None => Ok((decoded, String::new())),
    }
}
