// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Publish/subscribe status channel over TCP
//!
//! A channel owns one subscriber, connected to the remote peer's publisher, and one
//! publisher, bound locally for the remote peer's subscriber. Both are created on the
//! first connect and torn down together.

mod endpoint;
mod frame;
mod interface;
mod publisher;
mod subscriber;

pub use endpoint::Endpoint;
pub use frame::MAX_PAYLOAD_SIZE;
pub use interface::StatusTransport;

use crate::configuration::channel::{Builder, ChannelConfig};
use crate::error::{Error, Result};
use log::{debug, error, info, warn};
use publisher::Publisher;
use std::net::SocketAddr;
use subscriber::Subscriber;

struct Endpoints {
    subscriber: Subscriber,
    publisher: Publisher,
}

/// Bidirectional status channel
pub struct StatusChannel {
    config: ChannelConfig,
    endpoints: Option<Endpoints>,
}

impl StatusChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            endpoints: None,
        }
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.endpoints.is_some()
    }

    /// Address the publisher is bound to, if connected
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoints
            .as_ref()
            .and_then(|endpoints| endpoints.publisher.local_addr().ok())
    }

    /// Number of subscribers currently attached to the publisher
    pub fn subscribers(&self) -> usize {
        self.endpoints
            .as_ref()
            .map_or(0, |endpoints| endpoints.publisher.subscribers())
    }

    /// Create subscriber and publisher. Does nothing if already connected.
    ///
    /// Either both endpoints are up afterwards or none is.
    pub fn connect(&mut self) -> Result<()> {
        if self.endpoints.is_some() {
            return Ok(());
        }
        match self.open() {
            Ok(endpoints) => {
                info!(
                    "Status channel connected: subscribed to {}, publishing on {}",
                    self.config.subscribe, self.config.publish
                );
                self.endpoints = Some(endpoints);
                Ok(())
            }
            Err(e) => {
                error!("Status channel failed to connect: {e}");
                Err(e)
            }
        }
    }

    fn open(&self) -> Result<Endpoints> {
        let remote = resolve(&self.config.subscribe)?;
        let local = resolve(&self.config.publish)?;

        let subscriber = Subscriber::new(
            remote,
            self.config.receive_timeout,
            self.config.conflate,
            self.config.topic.clone(),
            self.config.reconnect_interval,
        )
        .map_err(|e| Error::Connection((e, "failed to create subscriber")))?;
        // A failing bind drops the subscriber again
        let publisher = Publisher::bind(local)
            .map_err(|e| Error::Connection((e, "failed to bind publisher")))?;

        Ok(Endpoints {
            subscriber,
            publisher,
        })
    }

    /// Close both endpoints. Returns false if the channel was not connected.
    pub fn disconnect(&mut self) -> bool {
        match self.endpoints.take() {
            Some(_) => {
                info!("Status channel disconnected");
                true
            }
            None => {
                warn!("Status channel is not connected");
                false
            }
        }
    }

    /// Publish one message, connecting first if needed
    pub fn try_send(&mut self, payload: &[u8]) -> Result<()> {
        let endpoints = self.endpoints_mut()?;
        match endpoints.publisher.send(payload) {
            Ok(delivered) => {
                debug!("Published {} bytes to {delivered} subscribers", payload.len());
                Ok(())
            }
            Err(e) => {
                debug!("Failed to publish status: {e}");
                Err(Error::Send((e, "failed to publish")))
            }
        }
    }

    /// Wait up to the receive timeout for a message, connecting first if needed
    pub fn try_receive(&mut self) -> Result<Option<Vec<u8>>> {
        let endpoints = self.endpoints_mut()?;
        endpoints
            .subscriber
            .receive()
            .map_err(|e| Error::Connection((e, "failed to poll subscriber")))
    }

    fn endpoints_mut(&mut self) -> Result<&mut Endpoints> {
        self.connect()?;
        self.endpoints
            .as_mut()
            .ok_or(Error::Channel("status channel not connected"))
    }
}

impl StatusTransport for StatusChannel {
    fn connect(&mut self) -> Result<()> {
        StatusChannel::connect(self)
    }

    fn disconnect(&mut self) -> bool {
        StatusChannel::disconnect(self)
    }

    fn is_connected(&self) -> bool {
        StatusChannel::is_connected(self)
    }

    fn try_send(&mut self, payload: &[u8]) -> Result<()> {
        StatusChannel::try_send(self, payload)
    }

    fn try_receive(&mut self) -> Result<Option<Vec<u8>>> {
        StatusChannel::try_receive(self)
    }
}

fn resolve(endpoint: &str) -> Result<SocketAddr> {
    endpoint
        .parse::<Endpoint>()
        .and_then(|endpoint| endpoint.socket_addr())
        .map_err(|e| Error::Connection((e, "invalid endpoint")))
}

#[cfg(test)]
mod test {
    use super::StatusChannel;
    use crate::error::Error;
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Channel publishing on an ephemeral port and subscribed to `remote`
    fn channel(remote: &str) -> StatusChannel {
        StatusChannel::builder()
            .subscribe(remote)
            .publish("tcp://127.0.0.1:0")
            .reconnect_interval(Duration::from_millis(10))
            .build()
    }

    fn unused_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        format!("tcp://{}", listener.local_addr().unwrap())
    }

    /// Connect `receiver` to `sender` and wait until messages flow
    fn link(sender: &mut StatusChannel, receiver: &mut StatusChannel) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            assert!(Instant::now() < deadline, "channels did not link");
            sender.try_send(b"warmup").unwrap();
            if receiver.try_receive().unwrap().is_some() {
                break;
            }
        }
        while receiver.try_receive().unwrap().is_some() {}
        assert_eq!(sender.subscribers(), 1);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut channel = channel(&unused_endpoint());
        channel.connect().unwrap();
        let addr = channel.local_addr().unwrap();
        channel.connect().unwrap();
        assert_eq!(channel.local_addr(), Some(addr));
    }

    #[test]
    fn disconnect_twice() {
        let mut channel = channel(&unused_endpoint());
        assert!(!channel.disconnect());
        assert_eq!(channel.subscribers(), 0);

        channel.connect().unwrap();
        assert!(channel.disconnect());
        assert!(!channel.is_connected());
        assert!(!channel.disconnect());
        assert_eq!(channel.local_addr(), None);
    }

    #[test]
    fn failed_bind_rolls_back() {
        let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut channel = StatusChannel::builder()
            .subscribe(unused_endpoint())
            .publish(format!("tcp://{}", occupied.local_addr().unwrap()))
            .build();

        let result = channel.connect();
        assert!(matches!(result, Err(Error::Connection(_))));
        assert!(!channel.is_connected());
        assert!(matches!(channel.try_send(b"x"), Err(Error::Connection(_))));
    }

    #[test]
    fn invalid_endpoint_is_a_connection_error() {
        let mut channel = StatusChannel::builder().subscribe("localhost:5555").build();
        assert!(matches!(channel.connect(), Err(Error::Connection(_))));
    }

    #[test]
    fn receive_times_out() {
        let mut channel = channel(&unused_endpoint());
        channel.connect().unwrap();
        let start = Instant::now();
        assert_eq!(channel.try_receive().unwrap(), None);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(100), "{elapsed:?}");
    }

    #[test]
    fn only_the_newest_message_is_kept() {
        let mut sender = channel(&unused_endpoint());
        sender.connect().unwrap();
        let sender_addr = sender.local_addr().unwrap();
        let mut receiver = channel(&format!("tcp://{sender_addr}"));
        link(&mut sender, &mut receiver);

        for message in ["one", "two", "three"] {
            sender.try_send(message.as_bytes()).unwrap();
        }
        thread::sleep(Duration::from_millis(50));

        assert_eq!(receiver.try_receive().unwrap().as_deref(), Some(&b"three"[..]));
        assert_eq!(receiver.try_receive().unwrap(), None);
    }

    #[test]
    fn queue_mode_keeps_every_message() {
        let mut sender = channel(&unused_endpoint());
        sender.connect().unwrap();
        let sender_addr = sender.local_addr().unwrap();
        let mut receiver = StatusChannel::builder()
            .subscribe(format!("tcp://{sender_addr}"))
            .publish("tcp://127.0.0.1:0")
            .conflate(false)
            .build();
        link(&mut sender, &mut receiver);

        sender.try_send(b"one").unwrap();
        sender.try_send(b"two").unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(receiver.try_receive().unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(receiver.try_receive().unwrap().as_deref(), Some(&b"two"[..]));
    }

    #[test]
    fn topic_filter_drops_other_messages() {
        let mut sender = channel(&unused_endpoint());
        sender.connect().unwrap();
        let sender_addr = sender.local_addr().unwrap();
        let mut receiver = StatusChannel::builder()
            .subscribe(format!("tcp://{sender_addr}"))
            .publish("tcp://127.0.0.1:0")
            .topic("status")
            .build();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            assert!(Instant::now() < deadline, "channels did not link");
            sender.try_send(b"noise").unwrap();
            sender.try_send(b"status:warmup").unwrap();
            if receiver.try_receive().unwrap().is_some() {
                break;
            }
        }
        while receiver.try_receive().unwrap().is_some() {}

        sender.try_send(b"status:1").unwrap();
        sender.try_send(b"noise").unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(receiver.try_receive().unwrap().as_deref(), Some(&b"status:1"[..]));
        assert_eq!(receiver.try_receive().unwrap(), None);
    }
}
