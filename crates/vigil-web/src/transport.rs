//! Unified read/write over plain or encrypted sockets.
//!
//! The slot never touches a socket directly; it goes through
//! [`Transport`], which normalizes `EAGAIN`/`EWOULDBLOCK`/`EINTR` to
//! [`IoOutcome::WouldBlock`] with the direction the caller should wait
//! for. Encrypted transports (see the `tls` feature) surface the same
//! tri-state, so the connection machine is oblivious to the transport
//! flavour.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// The direction the next I/O attempt should wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Outcome of a non-blocking transport operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOutcome {
    /// The operation moved `n` bytes.
    Ready(usize),
    /// The operation would block until the named direction is ready.
    WouldBlock(Direction),
    /// The peer closed the channel.
    Closed,
}

/// Byte-stream capability the connection machine consumes.
///
/// `wait` exists for the bundled thread-per-connection driver; an
/// external event loop arms its own readiness sources and never calls
/// it.
pub trait Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome>;

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome>;

    /// The transport already speaks TLS.
    fn is_encrypted(&self) -> bool {
        false
    }

    /// Unix-domain transport; TLS policy never applies.
    fn is_local(&self) -> bool {
        false
    }

    /// The kernel cork is available on this transport.
    fn is_corkable(&self) -> bool {
        false
    }

    /// Enable or disable the kernel cork. Failures are reported but are
    /// never fatal to the request.
    fn set_cork(&mut self, _on: bool) -> io::Result<()> {
        Ok(())
    }

    /// Block until the socket is ready for the requested directions.
    /// Returns `(readable, writable)`.
    fn wait(&self, read: bool, write: bool, timeout: Option<Duration>) -> io::Result<(bool, bool)>;
}

fn map_read(result: io::Result<usize>) -> io::Result<IoOutcome> {
    match result {
        Ok(0) => Ok(IoOutcome::Closed),
        Ok(n) => Ok(IoOutcome::Ready(n)),
        Err(e)
            if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::Interrupted =>
        {
            Ok(IoOutcome::WouldBlock(Direction::Read))
        }
        Err(e) => Err(e),
    }
}

fn map_write(result: io::Result<usize>) -> io::Result<IoOutcome> {
    match result {
        Ok(n) => Ok(IoOutcome::Ready(n)),
        Err(e)
            if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::Interrupted =>
        {
            Ok(IoOutcome::WouldBlock(Direction::Write))
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn poll_fd(
    fd: std::os::fd::RawFd,
    read: bool,
    write: bool,
    timeout: Option<Duration>,
) -> io::Result<(bool, bool)> {
    let mut events: libc::c_short = 0;
    if read {
        events |= libc::POLLIN;
    }
    if write {
        events |= libc::POLLOUT;
    }

    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    let timeout_ms = timeout.map_or(-1, |d| d.as_millis().min(i32::MAX as u128) as libc::c_int);

    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok((
        pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0,
        pfd.revents & (libc::POLLOUT | libc::POLLHUP | libc::POLLERR) != 0,
    ))
}

/// Plain TCP transport over a non-blocking socket.
#[derive(Debug)]
pub struct PlainTransport {
    stream: TcpStream,
}

impl PlainTransport {
    /// Wrap an accepted socket; switches it to non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }

    #[must_use]
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

impl Transport for PlainTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome> {
        map_read(self.stream.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome> {
        map_write(self.stream.write(buf))
    }

    fn is_corkable(&self) -> bool {
        cfg!(target_os = "linux")
    }

    #[cfg(target_os = "linux")]
    #[allow(unsafe_code)]
    fn set_cork(&mut self, on: bool) -> io::Result<()> {
        use std::os::fd::AsRawFd;

        let value: libc::c_int = libc::c_int::from(on);
        let rc = unsafe {
            libc::setsockopt(
                self.stream.as_raw_fd(),
                libc::IPPROTO_TCP,
                libc::TCP_CORK,
                std::ptr::addr_of!(value).cast(),
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(unix)]
    fn wait(&self, read: bool, write: bool, timeout: Option<Duration>) -> io::Result<(bool, bool)> {
        use std::os::fd::AsRawFd;
        poll_fd(self.stream.as_raw_fd(), read, write, timeout)
    }

    #[cfg(not(unix))]
    fn wait(
        &self,
        _read: bool,
        _write: bool,
        _timeout: Option<Duration>,
    ) -> io::Result<(bool, bool)> {
        Ok((true, true))
    }
}

/// Unix-domain transport. Always plain; the TLS upgrade policy does not
/// apply to local peers.
#[cfg(unix)]
#[derive(Debug)]
pub struct UnixTransport {
    stream: UnixStream,
}

#[cfg(unix)]
impl UnixTransport {
    pub fn new(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }
}

#[cfg(unix)]
impl Transport for UnixTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome> {
        map_read(self.stream.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome> {
        map_write(self.stream.write(buf))
    }

    fn is_local(&self) -> bool {
        true
    }

    fn wait(&self, read: bool, write: bool, timeout: Option<Duration>) -> io::Result<(bool, bool)> {
        use std::os::fd::AsRawFd;
        poll_fd(self.stream.as_raw_fd(), read, write, timeout)
    }
}
