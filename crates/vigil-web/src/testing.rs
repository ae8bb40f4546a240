//! Test doubles for driving the engine without sockets.
//!
//! [`MockTransport`] scripts what the "peer" sends and captures what
//! the engine writes, with optional would-block injection to exercise
//! the wait-flag machinery. [`run_request`] pumps a client until the
//! current request completes one way or the other.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::connection::WebClient;
use crate::engine::WebEngine;
use crate::transport::{Direction, IoOutcome, Transport};

/// Scriptable in-memory transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    incoming: VecDeque<Vec<u8>>,
    /// Everything the engine wrote, in order.
    pub written: Vec<u8>,
    /// Report the peer as closed once the script is exhausted.
    pub close_after_script: bool,
    /// Next `n` writes report would-block.
    pub write_blocks: usize,
    /// Cap on bytes accepted per write, to exercise partial writes.
    pub write_limit: Option<usize>,
    pub encrypted: bool,
    pub local: bool,
    pub corks: Vec<bool>,
}

impl MockTransport {
    /// A transport that will deliver each element of `reads` on
    /// successive read calls.
    #[must_use]
    pub fn script(reads: &[&[u8]]) -> Self {
        Self {
            incoming: reads.iter().map(|r| r.to_vec()).collect(),
            ..Self::default()
        }
    }

    /// Push one more scripted read.
    pub fn push_read(&mut self, bytes: &[u8]) {
        self.incoming.push_back(bytes.to_vec());
    }

    /// The response bytes written so far, split at the header/body
    /// boundary.
    #[must_use]
    pub fn split_response(&self) -> (String, Vec<u8>) {
        let boundary = self
            .written
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map_or(self.written.len(), |p| p + 4);
        (
            String::from_utf8_lossy(&self.written[..boundary]).into_owned(),
            self.written[boundary..].to_vec(),
        )
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome> {
        match self.incoming.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.incoming.push_front(chunk[n..].to_vec());
                }
                Ok(IoOutcome::Ready(n))
            }
            None if self.close_after_script => Ok(IoOutcome::Closed),
            None => Ok(IoOutcome::WouldBlock(Direction::Read)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<IoOutcome> {
        if self.write_blocks > 0 {
            self.write_blocks -= 1;
            return Ok(IoOutcome::WouldBlock(Direction::Write));
        }
        let n = self.write_limit.map_or(buf.len(), |cap| cap.min(buf.len()));
        self.written.extend_from_slice(&buf[..n]);
        Ok(IoOutcome::Ready(n))
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn is_corkable(&self) -> bool {
        false
    }

    fn set_cork(&mut self, on: bool) -> io::Result<()> {
        self.corks.push(on);
        Ok(())
    }

    fn wait(
        &self,
        read: bool,
        write: bool,
        _timeout: Option<Duration>,
    ) -> io::Result<(bool, bool)> {
        Ok((read, write))
    }
}

/// Pump a client until the current request completes (slot reused),
/// the slot dies, or the iteration budget runs out.
///
/// Returns the number of iterations used; panics when the budget runs
/// out, which in a test means the machine wedged.
pub fn run_request(engine: &WebEngine, client: &mut WebClient<MockTransport>) -> usize {
    let before = client.state.use_count;

    for iteration in 0..10_000usize {
        if client.is_dead() || client.state.use_count > before {
            return iteration;
        }

        if client.check_timeout(engine) {
            continue;
        }

        if client.reading_file() {
            client.handle_read_ready(engine);
            if client.wants_write() {
                client.handle_write_ready(engine);
            }
            continue;
        }

        if client.wants_read() {
            client.handle_read_ready(engine);
        }
        if client.is_dead() || client.state.use_count > before {
            return iteration;
        }
        if client.wants_write() {
            client.handle_write_ready(engine);
        }
    }

    panic!("request did not complete within the iteration budget");
}
