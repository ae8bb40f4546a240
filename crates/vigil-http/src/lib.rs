//! Wire-level HTTP/1.1 primitives for the vigil embedded web server.
//!
//! This crate has no I/O: it is the byte-level half of the engine that
//! `vigil-web` drives from its connection state machine.
//!
//! - [`buffer::WebBuffer`] — growable byte buffer with body metadata
//! - [`parser::validate`] — restartable request validation over an
//!   accumulating receive buffer
//! - [`url`] — request-target decoding and path classification
//! - [`compress::GzipStream`] + [`chunked`] — the streaming
//!   gzip/chunked response pipeline
//! - [`status`], [`content_type`], [`date`] — response vocabulary

#![forbid(unsafe_code)]
// Pedantic clippy lints allowed (style suggestions, not correctness issues)
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::single_char_pattern)]
#![allow(clippy::manual_strip)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod buffer;
pub mod chunked;
pub mod compress;
pub mod content_type;
pub mod date;
pub mod method;
pub mod parser;
pub mod status;
pub mod url;

pub use buffer::WebBuffer;
pub use compress::{GzipStream, GzipStrategy, DEFAULT_GZIP_LEVEL};
pub use content_type::ContentType;
pub use date::format_http_date;
pub use method::RequestMode;
pub use parser::{
    validate, ParseAttempts, RecognizedHeaders, RequestFacts, Validation, ValidationPolicy,
    MAX_HEADER_FETCH_TRIES,
};
pub use status::StatusCode;
pub use url::{DashboardVersion, PathFlags};
