// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Headless simulator side
//!
//! Runs a status worker and reads the status at frame rate the way the HUD does,
//! printing every transition. Ends when the controller reports `TrialOver`.

use anyhow::{bail, Error};
use argh::FromArgs;
use dreyevr_sync::configuration::channel::Builder as ChannelBuilder;
use dreyevr_sync::prelude::*;
use log::{info, LevelFilter};
use std::thread;
use std::time::{Duration, Instant};

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help", "help"))]
/// Simulator arguments
struct Args {
    #[argh(description = "endpoint of the controller's publisher")]
    #[argh(option, default = "String::from(\"tcp://localhost:5555\")")]
    subscribe: String,

    #[argh(description = "endpoint to publish on")]
    #[argh(option, default = "String::from(\"tcp://*:5556\")")]
    publish: String,

    #[argh(description = "frames per second")]
    #[argh(option, default = "90")]
    fps: u32,

    #[argh(description = "stop after this many seconds")]
    #[argh(option, short = 'd')]
    duration: Option<u64>,

    #[argh(description = "request a take over after this many seconds")]
    #[argh(option)]
    take_over_after: Option<u64>,

    #[argh(description = "log level")]
    #[argh(option, short = 'l')]
    log_level: Option<LevelFilter>,
}

fn main() -> Result<(), Error> {
    let Args {
        subscribe,
        publish,
        fps,
        duration,
        take_over_after,
        log_level,
    } = argh::from_env();

    dreyevr_logger::init(log_level.unwrap_or(LevelFilter::Info));

    if fps == 0 {
        bail!("fps must be positive");
    }
    let frame = Duration::from_secs(1) / fps;
    let duration = duration.map(Duration::from_secs);
    let mut take_over_at = take_over_after.map(Duration::from_secs);

    let worker = StatusWorker::builder()
        .channel(
            ChannelBuilder::default()
                .subscribe(subscribe)
                .publish(publish)
                .config(),
        )
        .build()?;
    let handle = worker.handle();

    info!("Simulator running at {fps} fps");
    let start = Instant::now();
    let mut last = handle.current();
    loop {
        let elapsed = start.elapsed();
        if duration.is_some_and(|duration| elapsed >= duration) {
            break;
        }
        if take_over_at.is_some_and(|at| elapsed >= at) {
            take_over_at = None;
            handle.update(VehicleStatus::TakeOver)?;
        }

        let current = handle.current();
        if current != last {
            println!(
                "{:>8.3}s {last} -> {current} (timer '{}')",
                elapsed.as_secs_f64(),
                handle.schedule_timer()
            );
            last = current;
        }
        if current == VehicleStatus::TrialOver {
            info!("Trial over");
            break;
        }

        thread::sleep(frame);
    }

    worker.join();
    Ok(())
}
