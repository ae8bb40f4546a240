//! Encrypted transport over OpenSSL.
//!
//! A TLS operation that cannot progress reports the direction the TLS
//! engine is waiting for, which is not necessarily the direction of the
//! application-level operation (a renegotiating `read` may want the
//! socket writable). The connection machine records that direction in
//! the slot's TLS wait flags so the event loop re-arms correctly.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

use openssl::ssl::{ErrorCode, SslStream};

use crate::transport::{Direction, IoOutcome, Transport};

/// TLS transport over an established `SslStream`.
///
/// The handshake is the listener's business; the engine receives the
/// stream after `accept` completed.
pub struct TlsTransport {
    stream: SslStream<TcpStream>,
}

impl TlsTransport {
    /// Wrap an established TLS session; switches the underlying socket
    /// to non-blocking mode.
    pub fn new(stream: SslStream<TcpStream>) -> io::Result<Self> {
        stream.get_ref().set_nonblocking(true)?;
        Ok(Self { stream })
    }

    fn map_ssl_error(err: &openssl::ssl::Error, op: Direction) -> io::Result<IoOutcome> {
        match err.code() {
            ErrorCode::WANT_READ => Ok(IoOutcome::WouldBlock(Direction::Read)),
            ErrorCode::WANT_WRITE => Ok(IoOutcome::WouldBlock(Direction::Write)),
            ErrorCode::ZERO_RETURN => Ok(IoOutcome::Closed),
            _ => {
                if let Some(io_err) = err.io_error() {
                    if io_err.kind() == io::ErrorKind::WouldBlock
                        || io_err.kind() == io::ErrorKind::Interrupted
                    {
                        return Ok(IoOutcome::WouldBlock(op));
                    }
                }
                Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("TLS failure: {err}"),
                ))
            }
        }
    }
}

impl Transport for TlsTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome> {
        match self.stream.ssl_read(buf) {
            Ok(0) => Ok(IoOutcome::Closed),
            Ok(n) => Ok(IoOutcome::Ready(n)),
            Err(e) => Self::map_ssl_error(&e, Direction::Read),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome> {
        match self.stream.ssl_write(buf) {
            Ok(n) => Ok(IoOutcome::Ready(n)),
            Err(e) => Self::map_ssl_error(&e, Direction::Write),
        }
    }

    fn is_encrypted(&self) -> bool {
        true
    }

    fn wait(&self, read: bool, write: bool, timeout: Option<Duration>) -> io::Result<(bool, bool)> {
        // bytes buffered inside the TLS engine count as readable
        if read && self.stream.ssl().pending() > 0 {
            return Ok((true, false));
        }

        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            crate::transport::poll_fd(self.stream.get_ref().as_raw_fd(), read, write, timeout)
        }
        #[cfg(not(unix))]
        {
            let _ = timeout;
            Ok((read, write))
        }
    }
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport").finish_non_exhaustive()
    }
}
