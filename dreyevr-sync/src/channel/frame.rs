// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Length-prefixed message framing: `[u32 big-endian length][payload]`

use std::io::{Error, ErrorKind};

/// Largest payload accepted on the wire
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

const HEADER_SIZE: usize = size_of::<u32>();

pub fn encode(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "payload exceeds the maximum message size",
        ));
    }
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reassembles frames from a byte stream
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take the next complete frame. An oversized length marks the stream as corrupt.
    pub fn next_frame(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let Some(header) = self.buffer.get(..HEADER_SIZE) else {
            return Ok(None);
        };
        let mut len = [0u8; HEADER_SIZE];
        len.copy_from_slice(header);
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "announced message length exceeds the maximum message size",
            ));
        }
        if self.buffer.len() < HEADER_SIZE + len {
            return Ok(None);
        }
        let payload = self.buffer[HEADER_SIZE..HEADER_SIZE + len].to_vec();
        self.buffer.drain(..HEADER_SIZE + len);
        Ok(Some(payload))
    }
}
