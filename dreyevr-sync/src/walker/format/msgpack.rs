// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use super::{DataEntry, FormatReader, FormatWriter, Result};
use crate::walker::error::{WalkError, WalkErrorKind};
use rmp::Marker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Map,
    Array,
}

#[derive(Debug)]
struct Container {
    kind: ContainerKind,
    /// Items left in the container, keys and values counted separately for maps
    remaining: usize,
}

/// MessagePack document reader
pub struct MsgPackReader<'a> {
    input: &'a [u8],
    containers: Vec<Container>,
    root_read: bool,
}

impl<'a> MsgPackReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            containers: Vec::new(),
            root_read: false,
        }
    }

    /// Account for one item of the enclosing container (or the root) being consumed
    fn begin_item(&mut self) -> Result<()> {
        match self.containers.last_mut() {
            Some(container) if container.remaining > 0 => {
                container.remaining -= 1;
                Ok(())
            }
            Some(container) => Err(WalkError::new(
                WalkErrorKind::UnexpectedEntry,
                format!("read past the end of a {:?}", container.kind),
            )),
            None if !self.root_read => {
                self.root_read = true;
                Ok(())
            }
            None => Err(WalkError::new(
                WalkErrorKind::TrailingData,
                "read past the end of the document",
            )),
        }
    }

    fn expect(&mut self, expected: DataEntry) -> Result<()> {
        let entry = self.peek()?;
        if entry != expected {
            return Err(WalkError::new(
                WalkErrorKind::UnexpectedEntry,
                format!("expected {expected:?}, found {entry:?}"),
            ));
        }
        self.begin_item()
    }

    fn take(&mut self, len: u32) -> Result<&'a [u8]> {
        let len = len as usize;
        if self.input.len() < len {
            return Err(WalkError::new(
                WalkErrorKind::UnexpectedEnd,
                format!("{len} bytes announced, {} left", self.input.len()),
            ));
        }
        let (head, tail) = self.input.split_at(len);
        self.input = tail;
        Ok(head)
    }

    fn end_container(&mut self, kind: ContainerKind) -> Result<()> {
        match self.containers.last() {
            Some(container) if container.kind == kind && container.remaining == 0 => {
                self.containers.pop();
                Ok(())
            }
            Some(container) => Err(WalkError::new(
                WalkErrorKind::UnexpectedEntry,
                format!(
                    "cannot end {kind:?}, inside {:?} with {} items left",
                    container.kind, container.remaining
                ),
            )),
            None => Err(WalkError::new(
                WalkErrorKind::UnexpectedEntry,
                format!("cannot end {kind:?} outside of a container"),
            )),
        }
    }
}

fn entry_of(marker: Marker) -> Result<DataEntry> {
    let entry = match marker {
        Marker::Null => DataEntry::Nil,
        Marker::True | Marker::False => DataEntry::Bool,
        Marker::FixPos(_)
        | Marker::FixNeg(_)
        | Marker::U8
        | Marker::U16
        | Marker::U32
        | Marker::U64
        | Marker::I8
        | Marker::I16
        | Marker::I32
        | Marker::I64 => DataEntry::Int,
        Marker::F32 | Marker::F64 => DataEntry::Float,
        Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => DataEntry::Str,
        Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => DataEntry::Blob,
        Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => DataEntry::ArrayRoot,
        Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => DataEntry::MapRoot,
        other => {
            return Err(WalkError::new(
                WalkErrorKind::Unsupported,
                format!("unsupported marker {other:?}"),
            ))
        }
    };
    Ok(entry)
}

impl FormatReader for MsgPackReader<'_> {
    fn peek(&mut self) -> Result<DataEntry> {
        match self.containers.last() {
            Some(Container {
                kind: ContainerKind::Map,
                remaining: 0,
            }) => return Ok(DataEntry::MapEnd),
            Some(Container {
                kind: ContainerKind::Array,
                remaining: 0,
            }) => return Ok(DataEntry::ArrayEnd),
            None if self.root_read && self.input.is_empty() => return Ok(DataEntry::Ended),
            _ => {}
        }
        match self.input.first() {
            Some(byte) => entry_of(Marker::from_u8(*byte)),
            None => Err(WalkError::new(
                WalkErrorKind::UnexpectedEnd,
                "input ended in the middle of the document",
            )),
        }
    }

    fn read_nil(&mut self) -> Result<()> {
        self.expect(DataEntry::Nil)?;
        rmp::decode::read_nil(&mut self.input).map_err(WalkError::format)
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.expect(DataEntry::Bool)?;
        rmp::decode::read_bool(&mut self.input).map_err(WalkError::format)
    }

    fn read_int(&mut self) -> Result<i64> {
        self.expect(DataEntry::Int)?;
        rmp::decode::read_int(&mut self.input).map_err(WalkError::format)
    }

    fn read_float(&mut self) -> Result<f64> {
        self.expect(DataEntry::Float)?;
        match self.input.first().copied().map(Marker::from_u8) {
            Some(Marker::F32) => rmp::decode::read_f32(&mut self.input)
                .map(f64::from)
                .map_err(WalkError::format),
            _ => rmp::decode::read_f64(&mut self.input).map_err(WalkError::format),
        }
    }

    fn read_str(&mut self) -> Result<String> {
        self.expect(DataEntry::Str)?;
        let len = rmp::decode::read_str_len(&mut self.input).map_err(WalkError::format)?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(WalkError::format)
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        self.expect(DataEntry::Blob)?;
        let len = rmp::decode::read_bin_len(&mut self.input).map_err(WalkError::format)?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_map_root(&mut self) -> Result<usize> {
        self.expect(DataEntry::MapRoot)?;
        let len = rmp::decode::read_map_len(&mut self.input).map_err(WalkError::format)? as usize;
        self.containers.push(Container {
            kind: ContainerKind::Map,
            remaining: len * 2,
        });
        Ok(len)
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.end_container(ContainerKind::Map)
    }

    fn read_array_root(&mut self) -> Result<usize> {
        self.expect(DataEntry::ArrayRoot)?;
        let len = rmp::decode::read_array_len(&mut self.input).map_err(WalkError::format)? as usize;
        self.containers.push(Container {
            kind: ContainerKind::Array,
            remaining: len,
        });
        Ok(len)
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.end_container(ContainerKind::Array)
    }
}

/// MessagePack document writer
#[derive(Debug, Default)]
pub struct MsgPackWriter {
    output: Vec<u8>,
    open: Vec<ContainerKind>,
}

impl MsgPackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn close(&mut self, kind: ContainerKind) -> Result<()> {
        match self.open.last() {
            Some(open) if *open == kind => {
                self.open.pop();
                Ok(())
            }
            other => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("cannot close {kind:?}, open container is {other:?}"),
            )),
        }
    }
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        WalkError::new(
            WalkErrorKind::Unsupported,
            format!("length {len} exceeds the MessagePack limit"),
        )
    })
}

impl FormatWriter for MsgPackWriter {
    fn write_bool(&mut self, value: bool) -> Result<()> {
        rmp::encode::write_bool(&mut self.output, value).map_err(WalkError::format)
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        rmp::encode::write_sint(&mut self.output, value)
            .map(|_| ())
            .map_err(WalkError::format)
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        rmp::encode::write_f64(&mut self.output, value).map_err(WalkError::format)
    }

    fn write_str(&mut self, value: &str) -> Result<()> {
        rmp::encode::write_str(&mut self.output, value).map_err(WalkError::format)
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        rmp::encode::write_bin(&mut self.output, value).map_err(WalkError::format)
    }

    fn write_map_root(&mut self, len: usize) -> Result<()> {
        rmp::encode::write_map_len(&mut self.output, len_u32(len)?).map_err(WalkError::format)?;
        self.open.push(ContainerKind::Map);
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.close(ContainerKind::Map)
    }

    fn write_array_root(&mut self, len: usize) -> Result<()> {
        rmp::encode::write_array_len(&mut self.output, len_u32(len)?)
            .map_err(WalkError::format)?;
        self.open.push(ContainerKind::Array);
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        self.close(ContainerKind::Array)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if !self.open.is_empty() {
            return Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("{} containers still open", self.open.len()),
            ));
        }
        Ok(std::mem::take(&mut self.output))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut writer = MsgPackWriter::new();
        writer.write_map_root(2).unwrap();
        writer.write_str("speed").unwrap();
        writer.write_float(12.5).unwrap();
        writer.write_str("gears").unwrap();
        writer.write_array_root(2).unwrap();
        writer.write_int(1).unwrap();
        writer.write_int(-2).unwrap();
        writer.write_array_end().unwrap();
        writer.write_map_end().unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn reads_nested_document() {
        let bytes = sample();
        let mut reader = MsgPackReader::new(&bytes);
        assert_eq!(reader.read_map_root().unwrap(), 2);
        assert_eq!(reader.read_str().unwrap(), "speed");
        assert_eq!(reader.read_float().unwrap(), 12.5);
        assert_eq!(reader.read_str().unwrap(), "gears");
        assert_eq!(reader.read_array_root().unwrap(), 2);
        assert_eq!(reader.read_int().unwrap(), 1);
        assert_eq!(reader.read_int().unwrap(), -2);
        assert_eq!(reader.peek().unwrap(), DataEntry::ArrayEnd);
        reader.read_array_end().unwrap();
        assert_eq!(reader.peek().unwrap(), DataEntry::MapEnd);
        reader.read_map_end().unwrap();
        assert_eq!(reader.peek().unwrap(), DataEntry::Ended);
        reader.finish().unwrap();
    }

    #[test]
    fn truncated_document_fails() {
        let bytes = sample();
        let mut reader = MsgPackReader::new(&bytes[..bytes.len() - 1]);
        reader.read_map_root().unwrap();
        reader.read_str().unwrap();
        reader.read_float().unwrap();
        reader.read_str().unwrap();
        reader.read_array_root().unwrap();
        reader.read_int().unwrap();
        let err = reader.read_int().unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::UnexpectedEnd);
    }

    #[test]
    fn trailing_data_is_reported() {
        let mut bytes: Vec<u8> = Vec::new();
        rmp::encode::write_bool(&mut bytes, true).unwrap();
        rmp::encode::write_bool(&mut bytes, false).unwrap();
        let mut reader = MsgPackReader::new(&bytes);
        assert!(reader.read_bool().unwrap());
        let err = reader.finish().unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::TrailingData);
    }

    #[test]
    fn wrong_entry_is_rejected() {
        let bytes = sample();
        let mut reader = MsgPackReader::new(&bytes);
        let err = reader.read_array_root().unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::UnexpectedEntry);
    }

    #[test]
    fn unbalanced_writer_fails() {
        let mut writer = MsgPackWriter::new();
        writer.write_array_root(1).unwrap();
        writer.write_int(3).unwrap();
        assert!(writer.write_map_end().is_err());
        assert!(writer.finish().is_err());
    }
}
