// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Default handlers, one per property kind

use super::error::{WalkError, WalkErrorKind};
use super::format::DataEntry;
use super::property::ReadEntry;
use super::schema::PropertyKind;
use super::{
    recursive_deserialize, recursive_serialize, DeserializeContext, Deserializer,
    SerializeContext, Serializer,
};

type Result<T, E = WalkError> = std::result::Result<T, E>;

/// Register the default handler of every property kind
pub fn setup_deserialize_handlers(deserializer: &mut Deserializer) {
    deserializer.add_direct_handler(PropertyKind::Bool, deserialize_bool);
    deserializer.add_direct_handler(PropertyKind::Int, deserialize_int);
    deserializer.add_direct_handler(PropertyKind::Float, deserialize_float);
    deserializer.add_direct_handler(PropertyKind::Str, deserialize_str);
    deserializer.add_direct_handler(PropertyKind::Blob, deserialize_blob);
    deserializer.add_direct_handler(PropertyKind::Struct, deserialize_struct_value);
    deserializer.add_direct_handler(PropertyKind::Array, deserialize_array);
}

/// Register the default handler of every property kind
pub fn setup_serialize_handlers(serializer: &mut Serializer) {
    serializer.add_direct_handler(PropertyKind::Bool, serialize_bool);
    serializer.add_direct_handler(PropertyKind::Int, serialize_int);
    serializer.add_direct_handler(PropertyKind::Float, serialize_float);
    serializer.add_direct_handler(PropertyKind::Str, serialize_str);
    serializer.add_direct_handler(PropertyKind::Blob, serialize_blob);
    serializer.add_direct_handler(PropertyKind::Struct, serialize_struct_value);
    serializer.add_direct_handler(PropertyKind::Array, serialize_array);
}

/// Peek the next input entry. A nil value leaves the property at its default.
fn peek_value(ctx: &mut DeserializeContext<'_>) -> Result<Option<DataEntry>> {
    match ctx.reader.peek()? {
        DataEntry::Nil => {
            ctx.reader.read_nil()?;
            ctx.writer.write_default()?;
            Ok(None)
        }
        entry => Ok(Some(entry)),
    }
}

fn mismatch(expected: DataEntry, found: DataEntry) -> WalkError {
    WalkError::new(
        WalkErrorKind::TypeMismatch,
        format!("expected {expected:?}, found {found:?}"),
    )
}

fn deserialize_bool(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::Bool) => {
            let value = ctx.reader.read_bool()?;
            ctx.writer.write_bool(value)
        }
        Some(found) => Err(mismatch(DataEntry::Bool, found)),
    }
}

fn deserialize_int(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::Int) => {
            let value = ctx.reader.read_int()?;
            ctx.writer.write_int(value)
        }
        Some(found) => Err(mismatch(DataEntry::Int, found)),
    }
}

fn deserialize_float(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::Float) => {
            let value = ctx.reader.read_float()?;
            ctx.writer.write_float(value)
        }
        // Integral numbers are valid floats
        Some(DataEntry::Int) => {
            let value = ctx.reader.read_int()?;
            ctx.writer.write_float(value as f64)
        }
        Some(found) => Err(mismatch(DataEntry::Float, found)),
    }
}

fn deserialize_str(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::Str) => {
            let value = ctx.reader.read_str()?;
            ctx.writer.write_str(&value)
        }
        Some(found) => Err(mismatch(DataEntry::Str, found)),
    }
}

fn deserialize_blob(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::Blob) => {
            let value = ctx.reader.read_blob()?;
            ctx.writer.write_blob(&value)
        }
        Some(found) => Err(mismatch(DataEntry::Blob, found)),
    }
}

fn deserialize_struct_value(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::MapRoot) => {
            let len = ctx.reader.read_map_root()?;
            ctx.writer.write_struct_root()?;
            for _ in 0..len {
                let name = match ctx.reader.peek()? {
                    DataEntry::Str => ctx.reader.read_str()?,
                    found => return Err(mismatch(DataEntry::Str, found)),
                };
                ctx.writer.write_name(&name)?;
                recursive_deserialize(ctx)?;
            }
            ctx.reader.read_map_end()?;
            ctx.writer.write_struct_end()
        }
        Some(found) => Err(mismatch(DataEntry::MapRoot, found)),
    }
}

fn deserialize_array(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    match peek_value(ctx)? {
        None => Ok(()),
        Some(DataEntry::ArrayRoot) => {
            let len = ctx.reader.read_array_root()?;
            ctx.writer.write_array_root()?;
            for _ in 0..len {
                recursive_deserialize(ctx)?;
            }
            ctx.reader.read_array_end()?;
            ctx.writer.write_array_end()
        }
        Some(found) => Err(mismatch(DataEntry::ArrayRoot, found)),
    }
}

fn serialize_bool(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let value = ctx.reader.read_bool()?;
    ctx.writer.write_bool(value)
}

fn serialize_int(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let value = ctx.reader.read_int()?;
    ctx.writer.write_int(value)
}

fn serialize_float(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let value = ctx.reader.read_float()?;
    ctx.writer.write_float(value)
}

fn serialize_str(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let value = ctx.reader.read_str()?;
    ctx.writer.write_str(value)
}

fn serialize_blob(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let value = ctx.reader.read_blob()?;
    ctx.writer.write_blob(value)
}

fn serialize_struct_value(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let len = ctx.reader.read_struct_root()?;
    ctx.writer.write_map_root(len)?;
    while ctx.reader.peek_entry()? == ReadEntry::Name {
        let name = ctx.reader.read_name()?;
        ctx.writer.write_str(name)?;
        recursive_serialize(ctx)?;
    }
    ctx.reader.read_struct_end()?;
    ctx.writer.write_map_end()
}

fn serialize_array(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let len = ctx.reader.read_array_root()?;
    ctx.writer.write_array_root(len)?;
    while ctx.reader.peek_entry()? != ReadEntry::ArrayEnd {
        recursive_serialize(ctx)?;
    }
    ctx.reader.read_array_end()?;
    ctx.writer.write_array_end()
}
