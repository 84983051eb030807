// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use super::frame;
use log::{debug, trace};
use mio::net::{TcpListener, TcpStream};
use std::io::{ErrorKind, Write as _};
use std::net::SocketAddr;

struct Peer {
    addr: SocketAddr,
    stream: TcpStream,
    /// Unsent rest of the last message
    pending: Vec<u8>,
}

impl Peer {
    /// Write as much of the pending bytes as the socket takes
    fn flush_pending(&mut self) -> std::io::Result<()> {
        while !self.pending.is_empty() {
            match self.stream.write(&self.pending) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Sending end of a status channel
///
/// Every message goes to all subscribers connected at the time of sending. A subscriber
/// that has not taken the previous message yet misses the new one.
pub struct Publisher {
    listener: TcpListener,
    peers: Vec<Peer>,
}

impl Publisher {
    pub fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Publisher {
            listener,
            peers: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of connected subscribers
    pub fn subscribers(&self) -> usize {
        self.peers.len()
    }

    /// Publish one message. Returns the number of subscribers it was handed to.
    pub fn send(&mut self, payload: &[u8]) -> std::io::Result<usize> {
        self.accept_pending()?;
        let frame = frame::encode(payload)?;

        let mut delivered = 0;
        self.peers.retain_mut(|peer| {
            if let Err(e) = peer.flush_pending() {
                debug!("Dropping subscriber {}: {e}", peer.addr);
                return false;
            }
            if !peer.pending.is_empty() {
                trace!("Subscriber {} is busy, message dropped", peer.addr);
                return true;
            }
            peer.pending.extend_from_slice(&frame);
            match peer.flush_pending() {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    debug!("Dropping subscriber {}: {e}", peer.addr);
                    false
                }
            }
        });
        Ok(delivered)
    }

    fn accept_pending(&mut self) -> std::io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    debug!("Subscriber connected from {addr}");
                    _ = stream.set_nodelay(true);
                    self.peers.push(Peer {
                        addr,
                        stream,
                        pending: Vec::new(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                // The peer gave up before we got to it
                Err(e) if e.kind() == ErrorKind::ConnectionAborted => {}
                Err(e) => return Err(e),
            }
        }
    }
}
