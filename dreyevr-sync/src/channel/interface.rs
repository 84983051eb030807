// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;

/// Bidirectional message transport driven by the status worker
pub trait StatusTransport: Send {
    /// Set up both directions. Does nothing if already connected.
    fn connect(&mut self) -> Result<(), Error>;

    /// Tear down both directions. Returns false if there was nothing to tear down.
    fn disconnect(&mut self) -> bool;

    fn is_connected(&self) -> bool;

    /// Publish one message
    fn try_send(&mut self, payload: &[u8]) -> Result<(), Error>;

    /// One bounded wait for the next message. `Ok(None)` if none arrived in time.
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, Error>;
}
