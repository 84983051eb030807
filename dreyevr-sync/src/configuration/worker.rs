// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Status worker builder

use crate::channel::{StatusChannel, StatusTransport};
use crate::codec::StatusCodec;
use crate::configuration::channel::ChannelConfig;
use crate::error::Error;
use crate::status::VehicleStatus;
use crate::worker::StatusWorker;
use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(30);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_millis(10);
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Timing of the worker life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTiming {
    /// Delay before the first connection attempt
    pub initial_delay: Duration,
    /// Delay between a successful connect and the first publish
    pub settle_delay: Duration,
    /// Delay after disconnecting on stop
    pub grace_delay: Duration,
    /// Delay after a failed connection attempt
    pub backoff: Duration,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            grace_delay: DEFAULT_GRACE_DELAY,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Status worker builder
#[derive(Default)]
pub struct Builder {
    pub channel: Option<ChannelConfig>,
    pub transport: Option<Box<dyn StatusTransport>>,
    pub codec: Option<StatusCodec>,
    pub timing: WorkerTiming,
    pub initial_status: Option<VehicleStatus>,
}

impl Builder {
    /// Set the channel configuration
    pub fn channel(mut self, config: ChannelConfig) -> Self {
        self.channel = Some(config);
        self
    }

    /// Use `transport` instead of a status channel built from the channel configuration
    pub fn transport(mut self, transport: Box<dyn StatusTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn codec(mut self, codec: StatusCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn timing(mut self, timing: WorkerTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Status published once the channel is up, `ManualDrive` if not set
    pub fn initial_status(mut self, status: VehicleStatus) -> Self {
        self.initial_status = Some(status);
        self
    }

    /// Spawn the worker thread
    pub fn build(self) -> Result<StatusWorker, Error> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(StatusChannel::new(self.channel.unwrap_or_default())),
        };
        StatusWorker::spawn(
            transport,
            self.codec.unwrap_or_default(),
            self.timing,
            self.initial_status.unwrap_or(VehicleStatus::ManualDrive),
        )
    }
}
