//! Engine configuration.
//!
//! The agent's configuration loader populates this; the engine itself
//! never touches config files.

use std::path::PathBuf;
use std::time::Duration;

use vigil_http::compress::DEFAULT_GZIP_LEVEL;
use vigil_http::parser::{ValidationPolicy, MAX_HEADER_FETCH_TRIES};
use vigil_http::GzipStrategy;

/// Largest request the engine accepts while still reading headers.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration knobs for the web engine.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Root directory of the static dashboard files.
    pub web_root: PathBuf,
    /// Offer gzip to clients that accept it.
    pub enable_gzip: bool,
    /// Gzip level, 1-9.
    pub gzip_level: u32,
    /// Deflate strategy knob (see [`GzipStrategy`]).
    pub gzip_strategy: GzipStrategy,
    /// Honour the `DNT` request header and emit `Tk`.
    pub respect_do_not_track: bool,
    /// Emitted verbatim as `X-Frame-Options` when set.
    pub x_frame_options: Option<String>,
    /// Per-request timeout; zero disables the check.
    pub timeout: Duration,
    /// Ceiling on the receive buffer while headers are incomplete.
    pub max_request_size: usize,
    /// Attempt bound for the slow-client guard.
    pub max_header_fetch_tries: usize,
    /// A TLS listener context is configured.
    pub tls_available: bool,
    /// Refuse plain ingest and upgrade plain browsers.
    pub tls_force: bool,
    /// Upgrade plain browser connections to TLS.
    pub tls_default: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("/usr/share/vigil/web"),
            enable_gzip: true,
            gzip_level: DEFAULT_GZIP_LEVEL,
            gzip_strategy: GzipStrategy::Default,
            respect_do_not_track: false,
            x_frame_options: None,
            timeout: DEFAULT_TIMEOUT,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            max_header_fetch_tries: MAX_HEADER_FETCH_TRIES,
            tls_available: false,
            tls_force: false,
            tls_default: false,
        }
    }
}

impl WebConfig {
    #[must_use]
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_gzip(mut self, enabled: bool) -> Self {
        self.enable_gzip = enabled;
        self
    }

    #[must_use]
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level.clamp(1, 9);
        self
    }

    #[must_use]
    pub fn with_gzip_strategy(mut self, strategy: GzipStrategy) -> Self {
        self.gzip_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_respect_do_not_track(mut self, respect: bool) -> Self {
        self.respect_do_not_track = respect;
        self
    }

    #[must_use]
    pub fn with_x_frame_options(mut self, value: impl Into<String>) -> Self {
        self.x_frame_options = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self
    }

    #[must_use]
    pub fn with_tls_policy(mut self, available: bool, force: bool, default: bool) -> Self {
        self.tls_available = available;
        self.tls_force = force;
        self.tls_default = default;
        self
    }

    /// The validator policy for a transport with the given properties.
    #[must_use]
    pub fn validation_policy(&self, encrypted: bool, local: bool) -> ValidationPolicy {
        ValidationPolicy {
            respect_do_not_track: self.respect_do_not_track,
            enable_gzip: self.enable_gzip,
            max_header_fetch_tries: self.max_header_fetch_tries,
            transport_encrypted: encrypted,
            transport_local: local,
            tls_available: self.tls_available,
            tls_force: self.tls_force,
            tls_default: self.tls_default,
        }
    }
}
