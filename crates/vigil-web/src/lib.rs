//! Connection engine for the vigil embedded web server.
//!
//! This crate drives HTTP/1.1 requests over non-blocking transports:
//! it owns the per-connection slot, the receive → validate → route →
//! respond state machine, URL dispatch, the static file service, and
//! the gzip+chunked send pipeline. The wire-level primitives live in
//! `vigil-http`.
//!
//! The hard boundaries of this crate are the seams in [`api`]: the
//! versioned JSON handlers, host lookup, access control, streaming
//! ingest and the configuration dump are collaborators, consumed
//! through narrow traits.
//!
//! A minimal thread-per-connection driver is bundled in [`server`];
//! embeddings with their own event loop drive
//! [`connection::WebClient`] readiness entry points directly.

#![deny(unsafe_code)]
// Pedantic clippy lints allowed (style suggestions, not correctness issues)
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::single_match_else)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::struct_excessive_bools)]

pub mod accesslog;
pub mod api;
pub mod config;
pub mod connection;
pub mod engine;
mod router;
pub mod server;
pub mod slot;
mod staticfiles;
pub mod testing;
#[cfg(feature = "tls")]
pub mod tls;
pub mod transport;

pub use accesslog::{AccessLog, AccessLogEntry, LogFormat};
pub use api::{
    AccessPolicy, ApiDispatch, ApiVersion, Capability, ConfigSource, HostHandle, HostRegistry,
    StreamIngest,
};
pub use config::WebConfig;
pub use connection::WebClient;
pub use engine::WebEngine;
pub use slot::ClientState;
#[cfg(feature = "tls")]
pub use tls::TlsTransport;
pub use transport::{Direction, IoOutcome, PlainTransport, Transport};

#[cfg(unix)]
pub use transport::UnixTransport;
