//! Bundled thread-per-connection driver.
//!
//! The engine itself is event-driven and loop-agnostic; this module is
//! the simplest admissible driver around it: accept, spawn a thread,
//! and inside the thread poll the socket for the directions the slot's
//! wait flags ask for. An embedding with its own event loop ignores
//! this module and drives [`WebClient`] readiness entry points
//! directly.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::connection::WebClient;
use crate::engine::WebEngine;
use crate::transport::{PlainTransport, Transport};

/// Poll granularity; bounds how late a timeout check can fire.
const POLL_TICK: Duration = Duration::from_millis(100);

/// Accept connections until the engine's exit flag is raised or the
/// listener fails fatally.
pub fn serve(engine: Arc<WebEngine>, listener: TcpListener) -> io::Result<()> {
    for stream in listener.incoming() {
        if engine.exit_requested() {
            break;
        }

        match stream {
            Ok(stream) => {
                let engine = Arc::clone(&engine);
                thread::Builder::new()
                    .name("vigil-web".to_string())
                    .spawn(move || handle_connection(&engine, stream))?;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => {
                log::error!("accept failed: {e}");
                if is_fatal_accept_error(&e) {
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

fn is_fatal_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotConnected | io::ErrorKind::InvalidInput
    )
}

fn handle_connection(engine: &WebEngine, stream: TcpStream) {
    let peer = stream.peer_addr().ok();
    let (peer_ip, peer_port) =
        peer.map_or_else(|| ("unknown".to_string(), 0), |a| (a.ip().to_string(), a.port()));

    let _ = stream.set_nodelay(true);

    let transport = match PlainTransport::new(stream) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("cannot prepare client socket: {e}");
            return;
        }
    };

    let mut client = engine.new_client(transport, peer_ip, peer_port);
    drive(engine, &mut client);
}

/// Pump one connection until its slot dies.
pub fn drive<T: Transport>(engine: &WebEngine, client: &mut WebClient<T>) {
    while !client.is_dead() {
        if client.check_timeout(engine) {
            continue;
        }

        // the file producer does not go through the socket poll
        if client.reading_file() {
            client.handle_read_ready(engine);
            if client.wants_write() {
                client.handle_write_ready(engine);
            }
            continue;
        }

        let want_read = client.wants_read();
        let want_write = client.wants_write();
        if !want_read && !want_write {
            // nothing armed: the slot is stuck; let the timeout decide
            thread::sleep(POLL_TICK);
            continue;
        }

        let (readable, writable) =
            match client
                .transport()
                .wait(want_read, want_write, Some(POLL_TICK))
            {
                Ok(ready) => ready,
                Err(e) => {
                    log::debug!("poll failed: {e}");
                    break;
                }
            };

        if readable && want_read {
            client.handle_read_ready(engine);
        }
        if writable && want_write {
            client.handle_write_ready(engine);
        }
    }
}
