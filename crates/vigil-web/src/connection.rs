//! Per-connection state machine.
//!
//! A [`WebClient`] couples one transport with one slot and walks each
//! request through receive → validate → route → respond, then either
//! resets the slot for the next request on the same socket or marks it
//! dead for the driver to harvest.
//!
//! The machine is driven entirely by external readiness events
//! ([`handle_read_ready`][WebClient::handle_read_ready],
//! [`handle_write_ready`][WebClient::handle_write_ready],
//! [`check_timeout`][WebClient::check_timeout]); within one slot there
//! is no internal parallelism. Whenever the transport reports
//! would-block, the pending direction lands in the slot's wait flags
//! and the machine yields.

use std::fmt::Write as _;
use std::io::Read;
use std::time::Duration;

use vigil_http::chunked::{chunk_header, CHUNK_CLOSE, CHUNK_TRAILER};
use vigil_http::compress::GZIP_SOURCE_CHUNK;
use vigil_http::parser::{validate, RequestFacts, Validation};
use vigil_http::{format_http_date, ContentType, GzipStream, RequestMode, StatusCode};

use crate::accesslog::{strip_control_characters, AccessLogEntry};
use crate::api::Capability;
use crate::engine::WebEngine;
use crate::router;
use crate::slot::ClientState;
use crate::transport::{Direction, IoOutcome, Transport};

/// Spins tolerated while pushing the header block into a congested
/// socket before the slot is given up on.
const HEADER_SEND_RETRIES: usize = 100;

/// Auto-redirect page for the TLS upgrade response.
const TLS_UPGRADE_BODY: &str = "<!DOCTYPE html><html>\
<body onload=\"window.location.href ='https://'+ window.location.hostname + ':' + window.location.port + window.location.pathname + window.location.search\">\
Redirecting to the encrypted connection. In case your browser does not support redirection, please click \
<a onclick=\"window.location.href ='https://'+ window.location.hostname + ':' + window.location.port + window.location.pathname + window.location.search\">here</a>.\
</body></html>";

/// One connection: transport plus slot.
#[derive(Debug)]
pub struct WebClient<T: Transport> {
    transport: T,
    pub state: ClientState,
}

/// Record a would-block so the event loop re-arms the right direction.
fn note_blocked(state: &mut ClientState, encrypted: bool, direction: Direction) {
    if encrypted {
        state.wait.tls_receive = direction == Direction::Read;
        state.wait.tls_send = direction == Direction::Write;
    } else {
        match direction {
            Direction::Read => state.wait.receive = true,
            Direction::Write => state.wait.send = true,
        }
    }
}

fn clear_tls_wait(state: &mut ClientState, encrypted: bool) {
    if encrypted {
        state.wait.tls_receive = false;
        state.wait.tls_send = false;
    }
}

impl<T: Transport> WebClient<T> {
    #[must_use]
    pub fn new(transport: T, state: ClientState) -> Self {
        Self { transport, state }
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state.dead
    }

    /// The event loop should arm read readiness.
    #[must_use]
    pub fn wants_read(&self) -> bool {
        self.state.wait.receive || self.state.wait.tls_receive
    }

    /// The event loop should arm write readiness.
    #[must_use]
    pub fn wants_write(&self) -> bool {
        self.state.wait.send || self.state.wait.tls_send
    }

    /// The slot is producing from a file rather than the socket; file
    /// input does not go through the socket's readiness poll.
    #[must_use]
    pub fn reading_file(&self) -> bool {
        self.state.mode == RequestMode::FileCopy
            && self.state.wait.receive
            && self.state.file_in.is_some()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ===== readiness entry points =====

    /// Input is ready: the socket while receiving a request, the file
    /// while a static file response is in flight.
    pub fn handle_read_ready(&mut self, engine: &WebEngine) {
        if self.state.dead {
            return;
        }

        if self.state.mode == RequestMode::FileCopy {
            self.read_file();
            return;
        }

        let received = self.receive();
        if self.state.dead || received == 0 {
            return;
        }
        if !self.state.response_prepared() {
            self.process_request(engine);
        }
    }

    /// The socket can take more response bytes.
    pub fn handle_write_ready(&mut self, engine: &WebEngine) {
        if self.state.dead || !self.state.response_prepared() {
            return;
        }
        self.advance_send(engine);
    }

    /// Roll the timeout checkpoint. When the deadline has passed, a 504
    /// replaces the in-flight response; if the header is already on the
    /// wire the slot is marked dead instead.
    pub fn check_timeout(&mut self, engine: &WebEngine) -> bool {
        if self.state.dead || self.state.timings.tv_in.is_none() {
            return false;
        }

        let already_responding = self.state.response_prepared();

        // a 504 already in flight is not killed by its own deadline
        if already_responding && self.state.response.code == StatusCode::GATEWAY_TIMEOUT {
            return false;
        }
        if !self.state.timeout_checkpoint_and_check() {
            return false;
        }

        if already_responding {
            self.state.dead = true;
        } else {
            self.state.wait.receive = false;
            self.respond(engine);
        }
        true
    }

    // ===== receive side =====

    fn receive(&mut self) -> usize {
        let Self { transport, state } = self;
        let mut scratch = [0u8; 4096];

        match transport.read(&mut scratch) {
            Ok(IoOutcome::Ready(n)) => {
                clear_tls_wait(state, transport.is_encrypted());
                state.stats.received_bytes += n as u64;
                state.response.data.push_bytes(&scratch[..n]);
                n
            }
            Ok(IoOutcome::WouldBlock(direction)) => {
                note_blocked(state, transport.is_encrypted(), direction);
                state.wait.receive = true;
                0
            }
            Ok(IoOutcome::Closed) => {
                state.dead = true;
                0
            }
            Err(e) => {
                log::debug!("{}: receive failed: {e}", state.id);
                state.dead = true;
                0
            }
        }
    }

    /// The file producer: pull bytes from the input file into the body
    /// buffer and arm the socket for sending. Never called from the
    /// write-ready path.
    fn read_file(&mut self) {
        let state = &mut self.state;
        let rlen = state.response.rlen;

        if rlen <= state.response.data.len() {
            state.wait.receive = false;
            return;
        }
        let Some(file) = state.file_in.as_mut() else {
            state.wait.receive = false;
            return;
        };

        let left = rlen - state.response.data.len();
        let mut scratch = vec![0u8; left.min(16 * 1024)];

        match file.read(&mut scratch) {
            Ok(0) => {
                // premature EOF: stop producing, input becomes the
                // socket again; the shortfall surfaces at send time
                state.wait.receive = false;
                state.file_in = None;
            }
            Ok(n) => {
                state.response.data.push_bytes(&scratch[..n]);
                state.wait.send = true;
                if state.response.data.len() >= rlen {
                    state.wait.receive = false;
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::Interrupted
                    || e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                log::debug!("{}: file read failed: {e}", state.id);
                state.dead = true;
            }
        }
    }

    // ===== request processing =====

    /// Validate the receive buffer and, once a verdict exists, build
    /// the response and start sending it.
    pub fn process_request(&mut self, engine: &WebEngine) {
        self.state.timeout_checkpoint_init();

        let policy = engine
            .config
            .validation_policy(self.transport.is_encrypted(), self.transport.is_local());
        let outcome = validate(
            self.state.response.data.as_bytes(),
            &mut self.state.attempts,
            &policy,
        );

        match outcome {
            Validation::Ok(facts) => {
                self.apply_facts(*facts, engine);

                match self.state.mode {
                    RequestMode::Stream => {
                        if engine.access.allows(Capability::Stream, &self.state) {
                            let code = engine.ingest.spawn_receiver(&mut self.state);
                            self.state.response.code = code;
                            // the receiver owns the socket from here on
                            self.state.dead = true;
                            return;
                        }
                        self.state.permission_denied();
                    }

                    RequestMode::Options => {
                        if self.any_web_capability(engine) {
                            let state = &mut self.state;
                            state.response.data.content_type = ContentType::PlainText;
                            state.response.data.reset();
                            state.response.data.push_str("OK");
                            state.response.code = StatusCode::OK;
                        } else {
                            self.state.permission_denied();
                        }
                    }

                    _ => {
                        if self.any_web_capability(engine) {
                            let state = &mut self.state;
                            state.path_flags.reset();
                            let path = state.url_path_decoded.as_str_lossy().into_owned();
                            state.path_flags.classify(&path);

                            let localhost = engine.hosts.localhost();
                            let code =
                                router::process_url(engine, &mut self.state, &localhost, &path);
                            self.state.response.code = code;
                        } else {
                            self.state.permission_denied();
                        }
                    }
                }
            }

            Validation::Incomplete => {
                if self.state.response.data.len() > engine.config.max_request_size {
                    let state = &mut self.state;
                    let received = state.response.data.len();
                    state.url_as_received.reset();
                    state.url_as_received.push_str("too big request");
                    state.response.data.reset();
                    let _ = write!(
                        state.response.data,
                        "Received request is too big (received {received} bytes, max is {} bytes).\r\n",
                        engine.config.max_request_size
                    );
                    state.response.code = StatusCode::BAD_REQUEST;
                } else {
                    self.state.wait.receive = true;
                    return;
                }
            }

            Validation::Redirect(facts) => {
                self.apply_facts(*facts, engine);
                let state = &mut self.state;
                state.response.data.content_type = ContentType::Html;
                state.response.data.reset();
                state.response.data.push_str(TLS_UPGRADE_BODY);
                state.response.code = StatusCode::HTTPS_UPGRADE;
            }

            Validation::MalformedUrl => {
                self.terminal_parse_error("Malformed URL...\r\n");
            }
            Validation::ExcessRequestData => {
                self.terminal_parse_error("Excess data in request.\r\n");
            }
            Validation::NotSupported => {
                self.terminal_parse_error("HTTP method requested is not supported...\r\n");
            }
            Validation::TooManyRetries => {
                // a slow client gets no response at all
                self.state.wait.receive = false;
                self.state.dead = true;
                return;
            }
        }

        self.respond(engine);
    }

    fn terminal_parse_error(&mut self, body: &str) {
        let state = &mut self.state;
        state.wait.receive = false;
        state.response.data.reset();
        state.response.data.push_str(body);
        state.response.code = StatusCode::BAD_REQUEST;
    }

    fn any_web_capability(&self, engine: &WebEngine) -> bool {
        Capability::ANY_WEB
            .iter()
            .any(|cap| engine.access.allows(*cap, &self.state))
    }

    /// Move what the validator learned onto the slot.
    fn apply_facts(&mut self, facts: RequestFacts, engine: &WebEngine) {
        let state = &mut self.state;

        state.mode = facts.mode;

        // set exactly once per request
        if state.url_as_received.is_empty() {
            state.url_as_received.push_str(&facts.url_as_received);
        }
        state.url_path_decoded.reset();
        state.url_path_decoded.push_str(&facts.path);
        state.url_query_string_decoded.reset();
        state.url_query_string_decoded.push_str(&facts.query);

        state.headers = facts.headers;
        state.payload = facts.payload;

        if facts.keep_alive {
            state.transfer.keep_alive = true;
        }
        if let Some(enabled) = facts.do_not_track {
            state.policy.do_not_track = enabled;
        }
        if facts.gzip_accepted {
            state.enable_compression(engine.config.gzip_level, engine.config.gzip_strategy);
        }

        // the request is fully consumed
        state.wait.receive = false;
    }

    /// Stamp readiness, serialize and push the header, and arm the send
    /// side.
    fn respond(&mut self, engine: &WebEngine) {
        self.state.timeout_checkpoint_response_ready();
        self.state.response.sent = 0;

        self.send_http_header(engine);
        if self.state.dead {
            return;
        }

        self.state.wait.send = !self.state.response.data.is_empty();

        if self.state.mode == RequestMode::FileCopy && self.state.response.rlen > 0 {
            self.state.wait.receive = true;
        } else if !self.state.wait.send {
            // nothing buffered and no producer: run the send path once
            // so an empty response still completes
            self.advance_send(engine);
        }
    }

    // ===== header assembly =====

    /// Serialize the response header block in its fixed order.
    fn build_http_header(&mut self, engine: &WebEngine) {
        let state = &mut self.state;

        if state.response.code != StatusCode::OK {
            state.response.data.no_cacheable();
        }

        let date = state.body_date();
        let expires = state.response.data.expires.unwrap_or_else(|| {
            if state.response.data.is_cacheable() {
                date + Duration::from_secs(86400)
            } else {
                date
            }
        });

        let out = &mut state.response.header_output;
        out.reset();

        if state.response.code == StatusCode::HTTPS_UPGRADE {
            state.response.code = StatusCode::MOVED_PERMANENTLY;
            let _ = write!(
                out,
                "HTTP/1.1 {}\r\nLocation: https://{}{}\r\n",
                state.response.code,
                state.headers.host.as_deref().unwrap_or(""),
                state.url_as_received.as_str_lossy(),
            );
        } else {
            let _ = write!(
                out,
                "HTTP/1.1 {}\r\n\
                 Connection: {}\r\n\
                 Server: Vigil Embedded HTTP Server v{}\r\n\
                 Access-Control-Allow-Origin: {}\r\n\
                 Access-Control-Allow-Credentials: true\r\n\
                 Content-Type: {}\r\n\
                 Date: {}\r\n",
                state.response.code,
                if state.transfer.keep_alive {
                    "keep-alive"
                } else {
                    "close"
                },
                env!("CARGO_PKG_VERSION"),
                state.headers.origin.as_deref().unwrap_or("*"),
                state.response.data.content_type.as_str(),
                format_http_date(date),
            );
        }

        if let Some(ref x_frame_options) = engine.config.x_frame_options {
            let _ = write!(out, "X-Frame-Options: {x_frame_options}\r\n");
        }

        if engine.config.respect_do_not_track {
            if state.response.has_cookies || state.policy.tracking_required {
                out.push_str("Tk: T;cookies\r\n");
            } else {
                out.push_str("Tk: N\r\n");
            }
        }

        if state.mode == RequestMode::Options {
            out.push_str(
                "Access-Control-Allow-Methods: GET, OPTIONS\r\n\
                 Access-Control-Allow-Headers: accept, x-requested-with, origin, content-type, cookie, pragma, cache-control, x-auth-token\r\n\
                 Access-Control-Max-Age: 1209600\r\n",
            );
        } else {
            let _ = write!(
                out,
                "Cache-Control: {}\r\nExpires: {}\r\n",
                if state.response.data.is_cacheable() {
                    "public"
                } else {
                    "no-cache, no-store, must-revalidate\r\nPragma: no-cache"
                },
                format_http_date(expires),
            );
        }

        // custom headers accumulated while routing
        if !state.response.header.is_empty() {
            let custom = state.response.header.as_bytes().to_vec();
            out.push_bytes(&custom);
        }

        if state.response.zoutput {
            out.push_str("Content-Encoding: gzip\r\n");
        }

        if state.transfer.chunked {
            out.push_str("Transfer-Encoding: chunked\r\n");
        } else {
            let length = if state.response.data.is_empty() {
                state.response.rlen
            } else {
                state.response.data.len()
            };
            if length > 0 {
                let _ = write!(out, "Content-Length: {length}\r\n");
            } else {
                // unknowable body length: the connection must close to
                // delimit the response
                state.transfer.keep_alive = false;
            }
        }

        out.push_str("\r\n");
    }

    /// Cork, then push the serialized header with a bounded number of
    /// retries against a congested socket.
    fn send_http_header(&mut self, engine: &WebEngine) {
        self.build_http_header(engine);

        if self.state.policy.corkable && !self.state.transfer.corked {
            match self.transport.set_cork(true) {
                Ok(()) => self.state.transfer.corked = true,
                Err(e) => log::error!("{}: failed to enable TCP_CORK: {e}", self.state.id),
            }
        }

        let total = self.state.response.header_output.len();
        let mut written = 0;
        let mut retries = 0;

        while written < total {
            let Self { transport, state } = self;
            let outcome = transport.write(&state.response.header_output.as_bytes()[written..]);
            match outcome {
                Ok(IoOutcome::Ready(n)) if n > 0 => {
                    clear_tls_wait(state, transport.is_encrypted());
                    written += n;
                }
                Ok(IoOutcome::Ready(_) | IoOutcome::WouldBlock(_)) => {
                    retries += 1;
                    if retries > HEADER_SEND_RETRIES {
                        log::error!("{}: cannot send HTTP header to web client", state.id);
                        state.dead = true;
                        break;
                    }
                }
                Ok(IoOutcome::Closed) => {
                    state.dead = true;
                    break;
                }
                Err(e) => {
                    log::error!("{}: HTTP header write failed: {e}", state.id);
                    state.dead = true;
                    break;
                }
            }
        }

        self.state.stats.sent_bytes += written as u64;
    }

    // ===== send side =====

    /// One "ready to advance" step of the response body; dispatches on
    /// the compression flag.
    pub fn advance_send(&mut self, engine: &WebEngine) {
        if self.state.response.zoutput {
            self.send_deflate(engine);
        } else {
            self.send_plain(engine);
        }
    }

    fn send_plain(&mut self, engine: &WebEngine) {
        loop {
            if self.state.dead {
                return;
            }

            let remaining = self.state.response.data.len() - self.state.response.sent;
            if remaining == 0 {
                if self.waiting_for_file_producer() {
                    self.state.wait.send = false;
                    return;
                }
                self.complete_request(engine);
                return;
            }

            let Self { transport, state } = self;
            let from = state.response.sent;
            match transport.write(&state.response.data.as_bytes()[from..]) {
                Ok(IoOutcome::Ready(n)) if n > 0 => {
                    clear_tls_wait(state, transport.is_encrypted());
                    state.stats.sent_bytes += n as u64;
                    state.response.sent += n;
                }
                Ok(IoOutcome::Ready(_)) => return,
                Ok(IoOutcome::WouldBlock(direction)) => {
                    note_blocked(state, transport.is_encrypted(), direction);
                    return;
                }
                Ok(IoOutcome::Closed) => {
                    state.dead = true;
                    return;
                }
                Err(e) => {
                    log::debug!("{}: body write failed: {e}", state.id);
                    state.dead = true;
                    return;
                }
            }
        }
    }

    fn waiting_for_file_producer(&self) -> bool {
        self.state.mode == RequestMode::FileCopy
            && self.state.wait.receive
            && self.state.response.rlen > 0
            && self.state.response.rlen > self.state.response.data.len()
    }

    /// The gzip + chunked send path. Interleaves compressor rounds with
    /// socket writes; the chunked trailer is the last thing on the
    /// wire.
    fn send_deflate(&mut self, engine: &WebEngine) {
        loop {
            if self.state.dead {
                return;
            }
            if !self.flush_frame() {
                return;
            }

            // drain the current compressor batch
            {
                let Self { transport, state } = self;
                let encrypted = transport.is_encrypted();
                let Some(gzip) = state.response.gzip.as_mut() else {
                    state.dead = true;
                    return;
                };
                if gzip.has_pending() {
                    match transport.write(gzip.pending()) {
                        Ok(IoOutcome::Ready(n)) if n > 0 => {
                            gzip.advance(n);
                            clear_tls_wait(state, encrypted);
                            state.stats.sent_bytes += n as u64;
                            continue;
                        }
                        Ok(IoOutcome::Ready(_)) => return,
                        Ok(IoOutcome::WouldBlock(direction)) => {
                            note_blocked(state, encrypted, direction);
                            return;
                        }
                        Ok(IoOutcome::Closed) => {
                            state.dead = true;
                            return;
                        }
                        Err(e) => {
                            log::debug!("{}: compressed write failed: {e}", state.id);
                            state.dead = true;
                            return;
                        }
                    }
                }
            }

            let state = &mut self.state;
            let response = &mut state.response;

            if response.finalized {
                // the trailer has fully drained
                break;
            }

            let have_source = response.data.len() > response.sent;
            let producer_done = match state.mode {
                RequestMode::FileCopy => {
                    !state.wait.receive && response.data.len() >= response.rlen
                }
                _ => true,
            };
            let stream_finished = response
                .gzip
                .as_ref()
                .map_or(false, GzipStream::is_finished);

            if !have_source && !producer_done {
                // more file bytes will come; they re-arm the send side
                state.wait.send = false;
                return;
            }

            if !have_source && stream_finished {
                if response.chunks_opened > 0 {
                    response.frame.extend_from_slice(CHUNK_TRAILER);
                }
                response.finalized = true;
                continue;
            }

            // compress one more batch of source bytes
            let src_end = (response.sent + GZIP_SOURCE_CHUNK).min(response.data.len());
            let finish = producer_done && src_end == response.data.len();

            let produced = {
                let source = &response.data.as_bytes()[response.sent..src_end];
                let Some(gzip) = response.gzip.as_mut() else {
                    state.dead = true;
                    return;
                };
                match gzip.compress_round(source, finish) {
                    Ok(n) => n,
                    Err(e) => {
                        log::error!("{}: compression failed, closing client: {e}", state.id);
                        state.dead = true;
                        return;
                    }
                }
            };
            response.sent = src_end;

            if produced > 0 {
                if response.chunks_opened > 0 {
                    response.frame.extend_from_slice(CHUNK_CLOSE);
                }
                response
                    .frame
                    .extend_from_slice(chunk_header(produced).as_bytes());
                response.chunks_opened += 1;
            }
        }

        self.complete_request(engine);
    }

    /// Push pending chunk-frame bytes (headers, separators, trailer).
    /// Returns true once the frame is fully drained.
    fn flush_frame(&mut self) -> bool {
        loop {
            let Self { transport, state } = self;
            if state.response.pending_frame().is_empty() {
                state.response.frame.clear();
                state.response.frame_sent = 0;
                return true;
            }

            let from = state.response.frame_sent;
            match transport.write(&state.response.frame[from..]) {
                Ok(IoOutcome::Ready(n)) if n > 0 => {
                    clear_tls_wait(state, transport.is_encrypted());
                    state.response.frame_sent += n;
                    state.stats.sent_bytes += n as u64;
                }
                Ok(IoOutcome::Ready(_)) => return false,
                Ok(IoOutcome::WouldBlock(direction)) => {
                    note_blocked(state, transport.is_encrypted(), direction);
                    return false;
                }
                Ok(IoOutcome::Closed) => {
                    state.dead = true;
                    return false;
                }
                Err(e) => {
                    log::debug!("{}: chunk frame write failed: {e}", state.id);
                    state.dead = true;
                    return false;
                }
            }
        }
    }

    // ===== request completion =====

    /// The response is fully on the wire: uncork, log, and either reset
    /// the slot for the next request or mark it for closing.
    fn complete_request(&mut self, engine: &WebEngine) {
        if self.state.transfer.corked {
            if let Err(e) = self.transport.set_cork(false) {
                log::error!("{}: failed to disable TCP_CORK: {e}", self.state.id);
            }
            self.state.transfer.corked = false;
        }

        self.log_access(engine);

        self.state.file_in = None;
        self.state.use_count += 1;

        if self.state.transfer.keep_alive {
            self.state.reset_for_next_request();
        } else {
            self.state.dead = true;
        }
    }

    fn log_access(&self, engine: &WebEngine) {
        let state = &self.state;
        if state.url_as_received.is_empty() {
            return;
        }

        let size = if state.mode == RequestMode::FileCopy {
            state.response.rlen as u64
        } else {
            state.response.data.len() as u64
        };
        let sent = if state.response.zoutput {
            state
                .response
                .gzip
                .as_ref()
                .map_or(size, GzipStream::total_out)
        } else {
            size
        };

        let now = std::time::Instant::now();
        let prep_ms = match (state.timings.tv_in, state.timings.tv_ready) {
            (Some(tv_in), Some(tv_ready)) => {
                tv_ready.duration_since(tv_in).as_secs_f64() * 1000.0
            }
            _ => 0.0,
        };
        let sent_ms = state.timings.tv_ready.map_or(0.0, |tv_ready| {
            now.duration_since(tv_ready).as_secs_f64() * 1000.0
        });
        let total_ms = state.timings.tv_in.map_or(0.0, |tv_in| {
            now.duration_since(tv_in).as_secs_f64() * 1000.0
        });

        let thread = std::thread::current()
            .name()
            .map_or_else(|| "-".to_string(), ToString::to_string);

        engine.access_log.log(&AccessLogEntry {
            id: state.id,
            thread,
            peer_ip: state.peer_ip.clone(),
            peer_port: state.peer_port,
            mode: state.mode.log_label(),
            sent_bytes: sent,
            size_bytes: size,
            prep_ms,
            sent_ms,
            total_ms,
            code: state.response.code.as_u16(),
            url: strip_control_characters(&state.url_as_received.as_str_lossy()),
        });
    }
}
