// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use super::frame::FrameDecoder;
use log::{debug, trace, warn};
use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read as _};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const STREAM: Token = Token(0);
const READ_CHUNK_SIZE: usize = 4096;

/// Receiving end of a status channel
///
/// Connects lazily: connecting to an absent peer is not an error, the connection is
/// retried at most once per reconnect interval until the peer shows up.
pub struct Subscriber {
    remote: SocketAddr,
    poll: Poll,
    events: Events,
    stream: Option<TcpStream>,
    last_attempt: Option<Instant>,
    decoder: FrameDecoder,
    queue: VecDeque<Vec<u8>>,
    timeout: Duration,
    conflate: bool,
    topic: Vec<u8>,
    reconnect_interval: Duration,
}

impl Subscriber {
    pub fn new(
        remote: SocketAddr,
        timeout: Duration,
        conflate: bool,
        topic: Vec<u8>,
        reconnect_interval: Duration,
    ) -> std::io::Result<Self> {
        let mut subscriber = Subscriber {
            remote,
            poll: Poll::new()?,
            events: Events::with_capacity(4),
            stream: None,
            last_attempt: None,
            decoder: FrameDecoder::default(),
            queue: VecDeque::new(),
            timeout,
            conflate,
            topic,
            reconnect_interval,
        };
        subscriber.ensure_connected();
        Ok(subscriber)
    }

    /// Wait up to the receive timeout for the next message
    pub fn receive(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            self.ensure_connected();
            self.drain();
            if let Some(message) = self.queue.pop_front() {
                return Ok(Some(message));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let mut wait = deadline - now;
            if self.stream.is_none() {
                if let Some(last_attempt) = self.last_attempt {
                    let retry_in = self.reconnect_interval.saturating_sub(last_attempt.elapsed());
                    wait = wait.min(retry_in);
                }
            }
            match self.poll.poll(&mut self.events, Some(wait)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn ensure_connected(&mut self) {
        if self.stream.is_some() {
            return;
        }
        if let Some(last_attempt) = self.last_attempt {
            if last_attempt.elapsed() < self.reconnect_interval {
                return;
            }
        }
        self.last_attempt = Some(Instant::now());

        let mut stream = match TcpStream::connect(self.remote) {
            Ok(stream) => stream,
            Err(e) => {
                debug!("Connecting to {} failed: {e}", self.remote);
                return;
            }
        };
        if let Err(e) = self
            .poll
            .registry()
            .register(&mut stream, STREAM, Interest::READABLE)
        {
            warn!("Failed to register subscriber stream: {e}");
            return;
        }
        _ = stream.set_nodelay(true);
        trace!("Subscriber connecting to {}", self.remote);
        self.stream = Some(stream);
    }

    /// Read everything available and queue the complete messages
    fn drain(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut closed = false;
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("Publisher at {} closed the connection", self.remote);
                    closed = true;
                    break;
                }
                Ok(n) => self.decoder.extend(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                // Still connecting or nothing to read
                Err(e)
                    if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::NotConnected =>
                {
                    break
                }
                Err(e) => {
                    debug!("Reading from {} failed: {e}", self.remote);
                    closed = true;
                    break;
                }
            }
        }

        loop {
            match self.decoder.next_frame() {
                Ok(Some(message)) => self.accept(message),
                Ok(None) => break,
                Err(e) => {
                    warn!("Dropping corrupt stream from {}: {e}", self.remote);
                    closed = true;
                    break;
                }
            }
        }

        if closed {
            self.drop_stream();
        }
    }

    fn accept(&mut self, message: Vec<u8>) {
        if !message.starts_with(&self.topic) {
            trace!("Discarding message outside of the topic filter");
            return;
        }
        if self.conflate {
            self.queue.clear();
        }
        self.queue.push_back(message);
    }

    fn drop_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            _ = self.poll.registry().deregister(&mut stream); // errors ignored
        }
        self.decoder.clear();
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.drop_stream();
    }
}
