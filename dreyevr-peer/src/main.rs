// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Experiment controller stand-in
//!
//! Publishes a scripted sequence of vehicle statuses to the simulator and prints the
//! status the simulator reports back.

use anyhow::{Context, Error};
use argh::FromArgs;
use dreyevr_sync::codec::{timestamp, StatusRecord};
use dreyevr_sync::prelude::*;
use log::{info, warn, LevelFilter};
use std::time::{Duration, Instant};

/// Sender tag of the controller
const SENDER: &str = "client";
/// Sequence used when none is given
const DEFAULT_SEQUENCE: [VehicleStatus; 5] = [
    VehicleStatus::Autopilot,
    VehicleStatus::PreAlertAutopilot,
    VehicleStatus::TakeOver,
    VehicleStatus::TakeOverManual,
    VehicleStatus::TrialOver,
];

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help", "help"))]
/// Controller arguments
struct Args {
    #[argh(description = "status to send, repeat for a sequence")]
    #[argh(option, short = 's')]
    status: Vec<VehicleStatus>,

    #[argh(description = "seconds each status is held")]
    #[argh(option, short = 'i', default = "3")]
    interval: u64,

    #[argh(description = "endpoint of the simulator's publisher")]
    #[argh(option, default = "String::from(\"tcp://localhost:5556\")")]
    subscribe: String,

    #[argh(description = "endpoint to publish on")]
    #[argh(option, default = "String::from(\"tcp://*:5555\")")]
    publish: String,

    #[argh(description = "wire format sent to the simulator")]
    #[argh(option, default = "WireFormat::MsgPack")]
    format: WireFormat,

    #[argh(description = "log level")]
    #[argh(option, short = 'l')]
    log_level: Option<LevelFilter>,
}

fn main() -> Result<(), Error> {
    let Args {
        status,
        interval,
        subscribe,
        publish,
        format,
        log_level,
    } = argh::from_env();

    dreyevr_logger::init(log_level.unwrap_or(LevelFilter::Info));

    let sequence = if status.is_empty() {
        DEFAULT_SEQUENCE.to_vec()
    } else {
        status
    };
    let hold = Duration::from_secs(interval);

    let codec = StatusCodec::builder()
        .sender(SENDER)
        .outbound(format)
        .inbound(WireFormat::Json)
        .build();
    let mut channel = StatusChannel::builder()
        .subscribe(subscribe)
        .publish(publish)
        .build();
    channel.connect().context("failed to connect status channel")?;

    let mut simulator = VehicleStatus::Unknown;
    for status in sequence {
        info!("Sending {status} for {interval}s");
        let start = Instant::now();
        while start.elapsed() < hold {
            let remaining = hold.saturating_sub(start.elapsed());
            let record = StatusRecord {
                from: SENDER.to_owned(),
                timestamp: timestamp(),
                vehicle_status: status.name().to_owned(),
                time_data: remaining.as_secs().to_string(),
            };
            match codec.encode_record(&record) {
                Ok(payload) => {
                    if let Err(e) = channel.try_send(&payload) {
                        warn!("Failed to send {status}: {e}");
                    }
                }
                Err(e) => warn!("Failed to encode {status}: {e}"),
            }

            match channel.try_receive() {
                Ok(Some(payload)) => match codec.decode(&payload) {
                    Ok(record) if record.status() != simulator => {
                        simulator = record.status();
                        println!("{} simulator: {simulator}", record.timestamp);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Discarding malformed message: {e}"),
                },
                Ok(None) => {}
                Err(e) => warn!("Receive failed: {e}"),
            }
        }
    }

    channel.disconnect();
    Ok(())
}
