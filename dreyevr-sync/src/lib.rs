// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Vehicle status synchronization between a driving simulator and an external
//! experiment controller.
//!
//! # Status channel
//!
//! Both processes run a [StatusChannel](crate::channel::StatusChannel): a subscriber
//! connected to the other side's publisher and a publisher bound locally. Receives wait
//! for a bounded time only and, by default, see just the newest message.
//!
//! # Status records
//!
//! Every message is a small record (`from`, `timestamp`, `vehicle_status`, `time_data`)
//! encoded by the [StatusCodec](crate::codec::StatusCodec). The codec drives the
//! schema-based [walker](crate::walker), which checks after every handler that the
//! traversal stayed balanced.
//!
//! # Status worker
//!
//! A [StatusWorker](crate::worker::StatusWorker) owns the channel on a dedicated thread,
//! publishes the local status and applies inbound ones to a lock-free store that the
//! frame-rate side reads through a [StatusHandle](crate::worker::StatusHandle).

pub mod channel;
pub mod codec;
pub mod configuration;
pub mod error;
pub mod status;
pub mod walker;
pub mod worker;

/// Re-export the public API
pub mod prelude {
    pub use crate::channel::{StatusChannel, StatusTransport};
    pub use crate::codec::{StatusCodec, StatusRecord};
    pub use crate::configuration::{self, channel::ChannelConfig, worker::WorkerTiming};
    pub use crate::error::Error;
    pub use crate::status::{StatusStore, Transition, VehicleStatus};
    pub use crate::walker::format::WireFormat;
    pub use crate::worker::{StatusHandle, StatusWorker, WorkerState};
}
