//! Per-connection client slot.
//!
//! One [`ClientState`] lives for the whole life of a connection and is
//! reset, not reallocated, between sequential requests on a keep-alive
//! socket: the six buffers keep their allocations, the recognized
//! headers and compressor are torn down, and the flags go back to their
//! accept-time defaults.
//!
//! The receive buffer and the response body share one buffer
//! (`response.data`): the request accumulates there until validation
//! completes, the URL pieces are copied out, and handlers then reset it
//! and write the response body into it. The `mirror` debug endpoint
//! depends on this sharing.

use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use vigil_http::buffer::{HEADER_INITIAL_SIZE, URL_INITIAL_SIZE};
use vigil_http::parser::{ParseAttempts, RecognizedHeaders};
use vigil_http::{ContentType, GzipStream, PathFlags, RequestMode, StatusCode, WebBuffer};

/// Readiness directions the slot is waiting on.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitFlags {
    /// Wait for the input descriptor (socket, or file in FILECOPY).
    pub receive: bool,
    /// Wait for the socket to accept more response bytes.
    pub send: bool,
    /// The TLS engine needs the socket readable before retrying.
    pub tls_receive: bool,
    /// The TLS engine needs the socket writable before retrying.
    pub tls_send: bool,
}

/// Per-connection policy latched at accept time plus per-request
/// tracking state.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyFlags {
    /// Client sent `DNT: 1` and the respect policy is on.
    pub do_not_track: bool,
    /// The response requires tracking despite DNT (cookies in play).
    pub tracking_required: bool,
    /// Listener policy: TLS is mandatory.
    pub tls_force: bool,
    /// Listener policy: plain browsers are upgraded to TLS.
    pub tls_default: bool,
    /// The transport supports the kernel cork.
    pub corkable: bool,
}

/// Transfer-level response flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferFlags {
    /// Keep the connection open after this response.
    pub keep_alive: bool,
    /// The response body is chunk-encoded.
    pub chunked: bool,
    /// The kernel cork is currently engaged.
    pub corked: bool,
}

/// Response-side state of a slot.
#[derive(Debug)]
pub struct ResponseState {
    pub code: StatusCode,
    /// Custom headers accumulated while routing.
    pub header: WebBuffer,
    /// The final serialized header block.
    pub header_output: WebBuffer,
    /// Receive buffer, then response body.
    pub data: WebBuffer,
    /// Declared length for file responses; the file producer fills
    /// `data` up to this.
    pub rlen: usize,
    /// Body bytes already passed to the socket, or through the
    /// compressor when gzip is on.
    pub sent: usize,
    /// Streaming compressor, present once `Accept-Encoding: gzip` was
    /// seen on the request.
    pub gzip: Option<GzipStream>,
    /// Compressed output is enabled for this response.
    pub zoutput: bool,
    /// The response sets cookies, which affects the `Tk` header.
    pub has_cookies: bool,
    /// Chunk frames (headers, separators, trailer) pending on the wire.
    pub frame: Vec<u8>,
    pub frame_sent: usize,
    /// Chunks opened so far; the trailer is only sent if at least one
    /// chunk was.
    pub chunks_opened: usize,
    /// The chunked trailer has been queued; the response ends when the
    /// frame drains.
    pub finalized: bool,
}

impl ResponseState {
    fn new() -> Self {
        Self {
            code: StatusCode::from_u16(0),
            header: WebBuffer::with_capacity(HEADER_INITIAL_SIZE),
            header_output: WebBuffer::with_capacity(HEADER_INITIAL_SIZE),
            data: WebBuffer::new(),
            rlen: 0,
            sent: 0,
            gzip: None,
            zoutput: false,
            has_cookies: false,
            frame: Vec::new(),
            frame_sent: 0,
            chunks_opened: 0,
            finalized: false,
        }
    }

    /// Unsent chunk-frame bytes.
    #[must_use]
    pub fn pending_frame(&self) -> &[u8] {
        &self.frame[self.frame_sent..]
    }
}

/// Request lifecycle timestamps.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    /// First byte of the request observed.
    pub tv_in: Option<Instant>,
    /// Response prepared; header about to be sent.
    pub tv_ready: Option<Instant>,
    /// Rolling timeout checkpoint.
    pub last_checkpoint: Option<Instant>,
    /// Configured per-request timeout; zero disables.
    pub timeout: Duration,
}

/// Per-request byte counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub received_bytes: u64,
    pub sent_bytes: u64,
}

/// Everything a connection slot owns apart from its transport.
#[derive(Debug)]
pub struct ClientState {
    pub id: u64,
    /// Requests completed on this slot so far.
    pub use_count: u64,
    pub peer_ip: String,
    pub peer_port: u16,

    pub mode: RequestMode,
    pub url_as_received: WebBuffer,
    pub url_path_decoded: WebBuffer,
    pub url_query_string_decoded: WebBuffer,
    /// Captured POST/PUT body.
    pub payload: Vec<u8>,

    pub attempts: ParseAttempts,
    pub wait: WaitFlags,
    pub policy: PolicyFlags,
    pub transfer: TransferFlags,
    pub path_flags: PathFlags,
    pub headers: RecognizedHeaders,

    pub response: ResponseState,
    pub timings: Timings,
    pub stats: Stats,

    /// Fatal condition observed; the driver harvests the slot.
    pub dead: bool,
    /// Input file while a static file response is in flight. `None`
    /// means input and output are the same duplex socket.
    pub file_in: Option<File>,

    memory_accounting: Arc<AtomicUsize>,
}

impl ClientState {
    #[must_use]
    pub fn new(id: u64, peer_ip: String, peer_port: u16, memory: Arc<AtomicUsize>) -> Self {
        memory.fetch_add(std::mem::size_of::<Self>(), Ordering::Relaxed);

        Self {
            id,
            use_count: 0,
            peer_ip,
            peer_port,
            mode: RequestMode::Get,
            url_as_received: WebBuffer::with_capacity(URL_INITIAL_SIZE),
            url_path_decoded: WebBuffer::with_capacity(URL_INITIAL_SIZE),
            url_query_string_decoded: WebBuffer::with_capacity(URL_INITIAL_SIZE),
            payload: Vec::new(),
            attempts: ParseAttempts::default(),
            wait: WaitFlags {
                receive: true,
                ..WaitFlags::default()
            },
            policy: PolicyFlags::default(),
            transfer: TransferFlags::default(),
            path_flags: PathFlags::default(),
            headers: RecognizedHeaders::default(),
            response: ResponseState::new(),
            timings: Timings::default(),
            stats: Stats::default(),
            dead: false,
            file_in: None,
            memory_accounting: memory,
        }
    }

    /// Reset for the next request on the same keep-alive socket.
    ///
    /// The six buffers keep their allocations; the memory accounting
    /// pointer, identity and use-count survive; everything else goes
    /// back to accept-time defaults.
    pub fn reset_for_next_request(&mut self) {
        self.url_as_received.reset_with_metadata();
        self.url_path_decoded.reset_with_metadata();
        self.url_query_string_decoded.reset_with_metadata();
        self.response.header.reset_with_metadata();
        self.response.header_output.reset_with_metadata();
        self.response.data.reset_with_metadata();

        self.payload.clear();
        self.headers = RecognizedHeaders::default();
        self.attempts.reset();
        self.path_flags.reset();

        self.mode = RequestMode::Get;
        self.policy.do_not_track = false;
        self.policy.tracking_required = false;
        self.transfer.keep_alive = false;
        self.transfer.chunked = false;

        self.wait.receive = true;
        self.wait.send = false;
        self.wait.tls_receive = false;
        self.wait.tls_send = false;

        self.response.code = StatusCode::from_u16(0);
        self.response.rlen = 0;
        self.response.sent = 0;
        self.response.gzip = None;
        self.response.zoutput = false;
        self.response.has_cookies = false;
        self.response.frame.clear();
        self.response.frame_sent = 0;
        self.response.chunks_opened = 0;
        self.response.finalized = false;

        self.timings.tv_in = None;
        self.timings.tv_ready = None;
        self.timings.last_checkpoint = None;

        self.stats = Stats::default();
    }

    /// The response for the current request has been prepared.
    #[must_use]
    pub fn response_prepared(&self) -> bool {
        self.timings.tv_ready.is_some()
    }

    // ===== canned error responses =====

    /// 403 with the fixed denial body.
    pub fn permission_denied(&mut self) -> StatusCode {
        self.response.data.content_type = ContentType::PlainText;
        self.response.data.reset();
        self.response
            .data
            .push_str("You are not allowed to access this resource.");
        self.response.code = StatusCode::FORBIDDEN;
        StatusCode::FORBIDDEN
    }

    /// 412 when an authorization bearer is missing.
    pub fn bearer_required(&mut self) -> StatusCode {
        self.response.data.content_type = ContentType::PlainText;
        self.response.data.reset();
        self.response
            .data
            .push_str("An authorization bearer is required to access the resource.");
        self.response.code = StatusCode::PRECONDITION_FAILED;
        StatusCode::PRECONDITION_FAILED
    }

    /// 400 when more than one dashboard version appears in the URL.
    pub fn multiple_versions_bad_request(&mut self) -> StatusCode {
        self.response.data.content_type = ContentType::PlainText;
        self.response.data.reset();
        self.response
            .data
            .push_str("Multiple dashboard versions given at the URL.");
        self.response.code = StatusCode::BAD_REQUEST;
        StatusCode::BAD_REQUEST
    }

    // ===== timeout checkpoints =====

    /// Stamp the request-received time once per request.
    pub fn timeout_checkpoint_init(&mut self) {
        if self.timings.tv_in.is_none() {
            self.timings.tv_in = Some(Instant::now());
        }
    }

    /// Stamp the response-ready time and return the preparation
    /// duration.
    pub fn timeout_checkpoint_response_ready(&mut self) -> Duration {
        let now = Instant::now();
        self.timings.last_checkpoint = Some(now);
        self.timings.tv_ready = Some(now);
        self.timings
            .tv_in
            .map_or(Duration::ZERO, |tv_in| now.duration_since(tv_in))
    }

    /// Roll the checkpoint; if the configured timeout has elapsed since
    /// the request was received, replace the response with the 504 body
    /// and report `true`.
    pub fn timeout_checkpoint_and_check(&mut self) -> bool {
        let now = Instant::now();
        self.timings.last_checkpoint = Some(now);

        if self.timings.timeout.is_zero() {
            return false;
        }
        let Some(tv_in) = self.timings.tv_in else {
            return false;
        };
        if now.duration_since(tv_in) < self.timings.timeout {
            return false;
        }

        self.response.data.reset();
        self.response.data.content_type = ContentType::PlainText;
        self.response.data.push_str("Query timeout exceeded");
        self.response.code = StatusCode::GATEWAY_TIMEOUT;
        true
    }

    /// Initialize the response compressor; a no-op once compression is
    /// enabled or after body bytes have been sent.
    pub fn enable_compression(&mut self, level: u32, strategy: vigil_http::GzipStrategy) {
        if self.response.gzip.is_some() {
            return;
        }
        if self.response.sent != 0 {
            log::error!(
                "{}: cannot enable compression in the middle of a response",
                self.id
            );
            return;
        }

        self.response.gzip = Some(GzipStream::new(level, strategy));
        self.response.zoutput = true;
        self.transfer.chunked = true;
    }

    /// Body date for the access log and header assembly.
    #[must_use]
    pub fn body_date(&self) -> SystemTime {
        self.response.data.date.unwrap_or_else(SystemTime::now)
    }
}

impl Drop for ClientState {
    fn drop(&mut self) {
        self.memory_accounting
            .fetch_sub(std::mem::size_of::<Self>(), Ordering::Relaxed);
    }
}
