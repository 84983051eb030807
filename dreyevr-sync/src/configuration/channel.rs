// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Status channel builder

use crate::channel::StatusChannel;
use std::time::Duration;

/// Endpoint the simulator subscribes to (the controller's publisher)
pub const DEFAULT_SUBSCRIBE_ENDPOINT: &str = "tcp://localhost:5555";
/// Endpoint the simulator publishes on
pub const DEFAULT_PUBLISH_ENDPOINT: &str = "tcp://*:5556";
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(10);
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

/// Settings of a status channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Remote endpoint the subscriber connects to
    pub subscribe: String,
    /// Local endpoint the publisher binds
    pub publish: String,
    /// Upper bound of a single receive attempt
    pub receive_timeout: Duration,
    /// Keep only the newest unread message
    pub conflate: bool,
    /// Payload prefix a message must start with to be delivered, empty for all
    pub topic: Vec<u8>,
    /// Minimum time between two connection attempts of the subscriber
    pub reconnect_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            subscribe: DEFAULT_SUBSCRIBE_ENDPOINT.to_owned(),
            publish: DEFAULT_PUBLISH_ENDPOINT.to_owned(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            conflate: true,
            topic: Vec::new(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

/// Status channel builder
#[derive(Debug, Default)]
pub struct Builder {
    config: ChannelConfig,
}

impl Builder {
    /// Set the remote endpoint to subscribe to, e.g. `tcp://localhost:5555`
    pub fn subscribe(mut self, endpoint: impl Into<String>) -> Self {
        self.config.subscribe = endpoint.into();
        self
    }

    /// Set the local endpoint to publish on, e.g. `tcp://*:5556`
    pub fn publish(mut self, endpoint: impl Into<String>) -> Self {
        self.config.publish = endpoint.into();
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    pub fn conflate(mut self, conflate: bool) -> Self {
        self.config.conflate = conflate;
        self
    }

    pub fn topic(mut self, topic: impl Into<Vec<u8>>) -> Self {
        self.config.topic = topic.into();
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.config.reconnect_interval = interval;
        self
    }

    /// Get the configuration without building a channel
    pub fn config(self) -> ChannelConfig {
        self.config
    }

    /// Build the channel. Nothing is connected until first use.
    pub fn build(self) -> StatusChannel {
        StatusChannel::new(self.config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.subscribe, "tcp://localhost:5555");
        assert_eq!(config.publish, "tcp://*:5556");
        assert_eq!(config.receive_timeout, Duration::from_millis(10));
        assert!(config.conflate);
        assert!(config.topic.is_empty());
    }

    #[test]
    fn builder_overrides() {
        let config = Builder::default()
            .subscribe("tcp://127.0.0.1:7000")
            .publish("tcp://127.0.0.1:7001")
            .conflate(false)
            .topic("status")
            .config();
        assert_eq!(config.subscribe, "tcp://127.0.0.1:7000");
        assert_eq!(config.publish, "tcp://127.0.0.1:7001");
        assert!(!config.conflate);
        assert_eq!(config.topic, b"status");
    }
}
