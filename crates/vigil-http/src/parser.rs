//! Incremental HTTP/1.1 request validation.
//!
//! [`validate`] runs against the slot's accumulating receive buffer and
//! is called again after every read until it reaches a terminal result.
//! It is restartable: until it returns [`Validation::Ok`] it has no
//! observable effect beyond the attempt bookkeeping in
//! [`ParseAttempts`], so calling it repeatedly over a growing buffer is
//! safe.
//!
//! Completeness is probed with a watermark: the `\r\n\r\n` terminator
//! search restarts a few bytes before the previous buffer size, so a
//! terminator straddling two reads is still found without rescanning
//! the whole buffer on every event.
//!
//! Only a fixed set of request headers is interpreted; everything else
//! is skipped. The recognized set is `Origin`, `Connection`,
//! `Accept-Encoding`, `DNT`, `User-Agent`, `X-Auth-Token`, `Host` and
//! `X-Forwarded-Host` (plus `Content-Length`, which only feeds the
//! completeness arithmetic).

use crate::method::RequestMode;
use crate::url::{decode_path_and_query, percent_decode};

/// Parse attempts tolerated without the buffer growing before the slot
/// is declared a slow client.
pub const MAX_HEADER_FETCH_TRIES: usize = 10;

/// Policy inputs the validator needs from the slot and configuration.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Honour the `DNT` request header.
    pub respect_do_not_track: bool,
    /// Offer gzip when the client accepts it.
    pub enable_gzip: bool,
    /// Attempt bound for the slow-client guard.
    pub max_header_fetch_tries: usize,
    /// The transport already speaks TLS.
    pub transport_encrypted: bool,
    /// The transport is a unix-domain socket; TLS policy never applies.
    pub transport_local: bool,
    /// The server has a TLS context configured at all.
    pub tls_available: bool,
    /// Policy: refuse ingest on plain transports and upgrade browsers.
    pub tls_force: bool,
    /// Policy: upgrade plain browser connections to TLS.
    pub tls_default: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            respect_do_not_track: false,
            enable_gzip: true,
            max_header_fetch_tries: MAX_HEADER_FETCH_TRIES,
            transport_encrypted: false,
            transport_local: false,
            tls_available: false,
            tls_force: false,
            tls_default: false,
        }
    }
}

/// Attempt counter and progress watermark, kept on the slot across
/// reads of the same request.
#[derive(Debug, Default)]
pub struct ParseAttempts {
    tries: usize,
    last_size: usize,
}

impl ParseAttempts {
    pub fn reset(&mut self) {
        self.tries = 0;
        self.last_size = 0;
    }

    #[must_use]
    pub fn tries(&self) -> usize {
        self.tries
    }
}

/// Recognized request headers, owned copies.
#[derive(Debug, Default, Clone)]
pub struct RecognizedHeaders {
    pub origin: Option<String>,
    pub user_agent: Option<String>,
    pub auth_bearer_token: Option<String>,
    pub host: Option<String>,
    pub forwarded_host: Option<String>,
}

/// Everything the validator learned about a complete request.
#[derive(Debug, Default)]
pub struct RequestFacts {
    pub mode: RequestMode,
    /// The request-target exactly as received.
    pub url_as_received: String,
    /// Decoded path (empty for STREAM, which has no path).
    pub path: String,
    /// Decoded query string with its leading `?`, or empty.
    pub query: String,
    pub headers: RecognizedHeaders,
    /// The request asked for keep-alive.
    pub keep_alive: bool,
    /// The client accepts gzip and the policy allows it.
    pub gzip_accepted: bool,
    /// `DNT` header value, only when the respect policy is on.
    pub do_not_track: Option<bool>,
    /// Captured request body for POST/PUT.
    pub payload: Vec<u8>,
}

/// Outcome of a validation attempt.
#[derive(Debug)]
pub enum Validation {
    /// A complete, supported request.
    Ok(Box<RequestFacts>),
    /// Keep reading; no response yet.
    Incomplete,
    /// Unrecognized method, or ingest refused by TLS policy.
    NotSupported,
    /// Percent-decoding of the request-target failed.
    MalformedUrl,
    /// Bytes beyond the end of the message that are not a body.
    ExcessRequestData,
    /// The slow-client attempt bound was hit without progress.
    TooManyRetries,
    /// Plain transport but policy requires TLS: answer with the
    /// `https://` upgrade redirect.
    Redirect(Box<RequestFacts>),
}

/// Validate the receive buffer. See the module docs for the contract.
pub fn validate(
    buf: &[u8],
    attempts: &mut ParseAttempts,
    policy: &ValidationPolicy,
) -> Validation {
    let len = buf.len();
    let prev_size = attempts.last_size;
    attempts.tries += 1;
    attempts.last_size = len;
    let advanced = len > prev_size;

    // completeness probe, restarting just behind the previous size so a
    // terminator split across reads is still seen
    let search_from = if attempts.tries > 1 {
        prev_size.saturating_sub(4).min(len)
    } else {
        0
    };
    let header_end =
        find_subsequence(&buf[search_from..], b"\r\n\r\n").map(|p| search_from + p);

    if header_end.is_none()
        && !advanced
        && attempts.tries > policy.max_header_fetch_tries
    {
        log::info!(
            "disabling slow client after {} attempts to read the request ({} bytes received)",
            attempts.tries,
            len
        );
        attempts.reset();
        return Validation::TooManyRetries;
    }

    if len < 4 {
        return Validation::Incomplete;
    }

    let Some((mode, target_start)) = RequestMode::from_prefix(buf) else {
        attempts.reset();
        return Validation::NotSupported;
    };

    if mode == RequestMode::Stream
        && policy.tls_force
        && !policy.transport_encrypted
        && !policy.transport_local
    {
        let hostname = stream_hostname(&buf[target_start..]);
        log::error!(
            "server is configured to always use encrypted connections, \
             refusing plain ingest from child '{hostname}'"
        );
        attempts.reset();
        return Validation::NotSupported;
    }

    let Some(header_end) = header_end else {
        return Validation::Incomplete;
    };

    // the request-target runs up to " HTTP/"
    let Some(proto) = find_subsequence(&buf[target_start..], b" HTTP/") else {
        return Validation::Incomplete;
    };
    let target_end = target_start + proto;

    // the terminator must come after the request line
    if target_end > header_end {
        return Validation::Incomplete;
    }

    let mut facts = RequestFacts {
        mode,
        ..RequestFacts::default()
    };
    let mut content_length: Option<usize> = None;

    // walk the header lines between the request line and the terminator
    let mut cursor = match find_subsequence(&buf[target_end..header_end + 2], b"\r\n") {
        Some(p) => target_end + p + 2,
        None => header_end + 2,
    };
    while cursor < header_end {
        let line_end = match find_subsequence(&buf[cursor..header_end + 2], b"\r\n") {
            Some(p) => cursor + p,
            None => break,
        };
        if line_end == cursor {
            break;
        }
        interpret_header(&buf[cursor..line_end], &mut facts, &mut content_length, policy);
        cursor = line_end + 2;
    }

    // body arithmetic and the excess-data check
    let body_start = header_end + 4;
    if mode.expects_body() {
        let expect = content_length.unwrap_or(0);
        let message_end = body_start + expect;
        if len < message_end {
            return Validation::Incomplete;
        }
        facts.payload = buf[body_start..message_end].to_vec();
        if buf[message_end..].iter().any(|&b| !b.is_ascii_whitespace()) {
            attempts.reset();
            return Validation::ExcessRequestData;
        }
    } else if buf[body_start..].iter().any(|&b| !b.is_ascii_whitespace()) {
        attempts.reset();
        return Validation::ExcessRequestData;
    }

    // decode the request-target
    let Ok(raw_target) = std::str::from_utf8(&buf[target_start..target_end]) else {
        attempts.reset();
        return Validation::MalformedUrl;
    };
    facts.url_as_received = raw_target.to_string();

    if mode == RequestMode::Stream {
        // ingest requests have no path, only parameters
        match percent_decode(raw_target) {
            Ok(query) => facts.query = query,
            Err(_) => {
                attempts.reset();
                return Validation::MalformedUrl;
            }
        }
    } else {
        match decode_path_and_query(raw_target) {
            Ok((path, query)) => {
                facts.path = path;
                facts.query = query;
            }
            Err(_) => {
                attempts.reset();
                return Validation::MalformedUrl;
            }
        }
    }

    attempts.reset();

    if policy.tls_available
        && !policy.transport_local
        && !policy.transport_encrypted
        && (policy.tls_force || policy.tls_default)
        && mode != RequestMode::Stream
    {
        return Validation::Redirect(Box::new(facts));
    }

    Validation::Ok(Box::new(facts))
}

/// Interpret one header line if its name is in the recognized set.
fn interpret_header(
    line: &[u8],
    facts: &mut RequestFacts,
    content_length: &mut Option<usize>,
    policy: &ValidationPolicy,
) {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return;
    };
    let name = &line[..colon];
    let mut value = &line[colon + 1..];
    while value.first() == Some(&b' ') {
        value = &value[1..];
    }
    let Ok(value) = std::str::from_utf8(value) else {
        return;
    };

    if name.eq_ignore_ascii_case(b"Origin") {
        facts.headers.origin = Some(value.to_string());
    } else if name.eq_ignore_ascii_case(b"Connection") {
        if contains_ignore_case(value, "keep-alive") {
            facts.keep_alive = true;
        }
    } else if policy.respect_do_not_track && name.eq_ignore_ascii_case(b"DNT") {
        if value.starts_with('0') {
            facts.do_not_track = Some(false);
        } else if value.starts_with('1') {
            facts.do_not_track = Some(true);
        }
    } else if name.eq_ignore_ascii_case(b"User-Agent") {
        // only the ingest handshake records the agent of its peer
        if facts.mode == RequestMode::Stream {
            facts.headers.user_agent = Some(value.to_string());
        }
    } else if name.eq_ignore_ascii_case(b"X-Auth-Token") {
        facts.headers.auth_bearer_token = Some(value.to_string());
    } else if name.eq_ignore_ascii_case(b"Host") {
        facts.headers.host = Some(value.to_string());
    } else if name.eq_ignore_ascii_case(b"Accept-Encoding") {
        if policy.enable_gzip && contains_ignore_case(value, "gzip") {
            facts.gzip_accepted = true;
        }
    } else if name.eq_ignore_ascii_case(b"X-Forwarded-Host") {
        facts.headers.forwarded_host = Some(value.to_string());
    } else if name.eq_ignore_ascii_case(b"Content-Length") {
        *content_length = value.trim().parse().ok();
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Pull the ingest hostname out of a STREAM request-target for the
/// refusal log line.
fn stream_hostname(target: &[u8]) -> String {
    if let Some(pos) = find_subsequence(target, b"hostname=") {
        let tail = &target[pos + b"hostname=".len()..];
        if let Some(end) = tail.iter().position(|&b| b == b'&') {
            let end = end.min(255);
            return String::from_utf8_lossy(&tail[..end]).into_owned();
        }
    }
    "not available".to_string()
}
