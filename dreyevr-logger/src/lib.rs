// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Console logger for the DReyeVR status tools
//!
//! Implements the `log` facade. Every line carries a timestamp, the target, process
//! and thread id, and the level, colored for the terminal.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{self, Write};
use std::process;
use std::str::FromStr;

pub mod fmt;
mod thread;

const ENV_RUST_LOG: &str = "RUST_LOG";

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    Stdout,
    #[default]
    Stderr,
}

/// Initialize the logger, writing to stderr.
///
/// A valid level passed as `RUST_LOG` environment variable overrides `level`.
/// Does nothing if a logger is already installed.
pub fn init(level: LevelFilter) {
    if let Err(e) = try_init(level, Output::Stderr) {
        eprintln!("Logger already initialized: {e}");
    }
}

/// Initialize the logger with an explicit output
pub fn try_init(level: LevelFilter, output: Output) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(Logger::new(output)))?;
    log::set_max_level(level_from_env().unwrap_or(level));
    Ok(())
}

/// The logger
#[derive(Debug, Default)]
pub struct Logger {
    output: Output,
}

impl Logger {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = fmt::Line {
            level: record.level(),
            target: record.target(),
            file: record.file(),
            line: record.line(),
            pid: process::id(),
            tid: thread::id(),
            args: record.args(),
        };
        // Logging must never take the process down
        let _ = match self.output {
            Output::Stdout => fmt::format(&line, io::stdout().lock()),
            Output::Stderr => fmt::format(&line, io::stderr().lock()),
        };
    }

    fn flush(&self) {
        let _ = match self.output {
            Output::Stdout => io::stdout().flush(),
            Output::Stderr => io::stderr().flush(),
        };
    }
}

/// Try to parse the log level from the environment variable `RUST_LOG`.
fn level_from_env() -> Option<LevelFilter> {
    std::env::var(ENV_RUST_LOG).ok().and_then(|s| {
        LevelFilter::from_str(&s)
            .inspect_err(|_| eprintln!("Failed to parse log level from `RUST_LOG={s}`"))
            .ok()
    })
}
