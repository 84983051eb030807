// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Wire format seam of the walker
//!
//! A [`FormatReader`] yields the entries of an encoded document one at a time, a
//! [`FormatWriter`] produces one. The byte-level encoding is left to `rmp` and `serde_json`.

mod json;
mod msgpack;

pub use json::{JsonReader, JsonWriter};
pub use msgpack::{MsgPackReader, MsgPackWriter};

use super::error::{WalkError, WalkErrorKind};
use std::fmt::Display;
use std::str::FromStr;

type Result<T, E = WalkError> = std::result::Result<T, E>;

/// Next entry of an encoded document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEntry {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Blob,
    MapRoot,
    MapEnd,
    ArrayRoot,
    ArrayEnd,
    /// The root value has been consumed
    Ended,
}

/// Pull reader over an encoded document
pub trait FormatReader {
    fn peek(&mut self) -> Result<DataEntry>;

    fn read_nil(&mut self) -> Result<()>;

    fn read_bool(&mut self) -> Result<bool>;

    fn read_int(&mut self) -> Result<i64>;

    fn read_float(&mut self) -> Result<f64>;

    fn read_str(&mut self) -> Result<String>;

    fn read_blob(&mut self) -> Result<Vec<u8>>;

    /// Enter a map. Returns the number of key/value pairs.
    fn read_map_root(&mut self) -> Result<usize>;

    fn read_map_end(&mut self) -> Result<()>;

    /// Enter an array. Returns the number of elements.
    fn read_array_root(&mut self) -> Result<usize>;

    fn read_array_end(&mut self) -> Result<()>;

    /// Check that nothing follows the root value
    fn finish(&mut self) -> Result<()> {
        match self.peek()? {
            DataEntry::Ended => Ok(()),
            entry => Err(WalkError::new(
                WalkErrorKind::TrailingData,
                format!("{entry:?} after the end of the document"),
            )),
        }
    }
}

/// Push writer producing an encoded document
pub trait FormatWriter {
    fn write_bool(&mut self, value: bool) -> Result<()>;

    fn write_int(&mut self, value: i64) -> Result<()>;

    fn write_float(&mut self, value: f64) -> Result<()>;

    fn write_str(&mut self, value: &str) -> Result<()>;

    fn write_blob(&mut self, value: &[u8]) -> Result<()>;

    fn write_map_root(&mut self, len: usize) -> Result<()>;

    fn write_map_end(&mut self) -> Result<()>;

    fn write_array_root(&mut self, len: usize) -> Result<()>;

    fn write_array_end(&mut self) -> Result<()>;

    /// Take the encoded document
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// Wire format of one direction of the status channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    MsgPack,
    Json,
}

impl Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireFormat::MsgPack => f.write_str("msgpack"),
            WireFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msgpack" | "messagepack" => Ok(WireFormat::MsgPack),
            "json" => Ok(WireFormat::Json),
            other => Err(format!("unknown wire format '{other}'")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::WireFormat;

    #[test]
    fn wire_format_names() {
        assert_eq!("json".parse::<WireFormat>(), Ok(WireFormat::Json));
        assert_eq!("MsgPack".parse::<WireFormat>(), Ok(WireFormat::MsgPack));
        assert!("xml".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::default().to_string(), "msgpack");
    }
}
