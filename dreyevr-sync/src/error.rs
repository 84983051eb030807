// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Status synchronization error implementation

use crate::walker::WalkError;

/// Status synchronization error type
///
/// None of these are fatal to the host: a failing call is skipped and the
/// next worker iteration tries again.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Endpoint parsing, resolution or socket setup failed
    Connection((std::io::Error, &'static str)),
    /// Publishing failed after the channel was connected
    Send((std::io::Error, &'static str)),
    /// Inbound payload could not be walked into a status record
    Decode(WalkError),
    /// Outbound record could not be walked into the wire format
    Encode(WalkError),
    /// Intra-process channel closed
    Channel(&'static str),
    /// Worker thread could not be started
    Spawn(std::io::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Connection((e, description)) => {
                write!(f, "Connection error: {}, {}", description, e)
            }
            Error::Send((e, description)) => write!(f, "Send error: {}, {}", description, e),
            Error::Decode(e) => write!(f, "Decode error: {}", e),
            Error::Encode(e) => write!(f, "Encode error: {}", e),
            Error::Channel(description) => write!(f, "Channel error, {}", description),
            Error::Spawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
        }
    }
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
