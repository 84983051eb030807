// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Schema-driven walk between encoded documents and dynamic records
//!
//! A walk descends the record one property at a time. Every step peeks the property the
//! cursor is on, pushes it onto the property stack, lets the handler registered for its
//! kind consume the value, then pops and checks that the handler left the stack exactly
//! as it found it. A handler that pushes without popping, or pops more than it pushed,
//! aborts the walk with [`WalkErrorKind::TopPropertyChanged`].

mod error;
pub mod format;
mod handlers;
mod property;
mod schema;

pub use error::{WalkError, WalkErrorKind};
pub use handlers::{setup_deserialize_handlers, setup_serialize_handlers};
pub use property::{PropertyReader, PropertyWriter, ReadEntry};
pub use schema::{
    Datum, FieldSchema, FieldType, Property, PropertyKind, StructDatum, StructSchema,
};

use format::{FormatReader, FormatWriter};
use std::collections::HashMap;

type Result<T, E = WalkError> = std::result::Result<T, E>;

/// State of a deserialization: format input, record output and the property stack
pub struct DeserializeContext<'a> {
    pub reader: &'a mut dyn FormatReader,
    pub writer: &'a mut PropertyWriter,
    pub deserializer: &'a Deserializer,
    pub properties: Vec<Property>,
}

/// State of a serialization: record input, format output and the property stack
pub struct SerializeContext<'a, 'd> {
    pub reader: &'a mut PropertyReader<'d>,
    pub writer: &'a mut dyn FormatWriter,
    pub serializer: &'a Serializer,
    pub properties: Vec<Property>,
}

pub type DeserializeHandler = fn(&mut DeserializeContext<'_>) -> Result<()>;

pub type SerializeHandler = fn(&mut SerializeContext<'_, '_>) -> Result<()>;

/// Handler registry for deserialization, keyed by property kind
#[derive(Clone, Default)]
pub struct Deserializer {
    handlers: HashMap<PropertyKind, DeserializeHandler>,
}

impl Deserializer {
    /// Registry without any handlers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_handlers() -> Self {
        let mut deserializer = Self::new();
        setup_deserialize_handlers(&mut deserializer);
        deserializer
    }

    /// Register `handler` for `kind`, replacing any previous one
    pub fn add_direct_handler(&mut self, kind: PropertyKind, handler: DeserializeHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Dispatch to the handler of the property on top of the stack
    pub fn deserialize(&self, ctx: &mut DeserializeContext<'_>) -> Result<()> {
        let kind = top_kind(&ctx.properties)?;
        let handler = self.handlers.get(&kind).ok_or_else(|| no_handler(kind))?;
        handler(ctx)
    }
}

/// Handler registry for serialization, keyed by property kind
#[derive(Clone, Default)]
pub struct Serializer {
    handlers: HashMap<PropertyKind, SerializeHandler>,
}

impl Serializer {
    /// Registry without any handlers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_handlers() -> Self {
        let mut serializer = Self::new();
        setup_serialize_handlers(&mut serializer);
        serializer
    }

    /// Register `handler` for `kind`, replacing any previous one
    pub fn add_direct_handler(&mut self, kind: PropertyKind, handler: SerializeHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Dispatch to the handler of the property on top of the stack
    pub fn serialize(&self, ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
        let kind = top_kind(&ctx.properties)?;
        let handler = self.handlers.get(&kind).ok_or_else(|| no_handler(kind))?;
        handler(ctx)
    }
}

fn top_kind(properties: &[Property]) -> Result<PropertyKind> {
    properties.last().map(Property::kind).ok_or_else(|| {
        WalkError::new(WalkErrorKind::InvalidState, "property stack is empty")
    })
}

fn no_handler(kind: PropertyKind) -> WalkError {
    WalkError::new(
        WalkErrorKind::NoMatchingHandler,
        format!("no handler for {kind:?}"),
    )
}

fn pop_checked(properties: &mut Vec<Property>, pushed: &Property) -> Result<()> {
    match properties.pop() {
        Some(popped) if popped == *pushed => Ok(()),
        popped => Err(WalkError::top_property_changed(pushed, popped.as_ref())),
    }
}

/// Deserialize the property the record cursor is on, and everything below it
pub fn recursive_deserialize(ctx: &mut DeserializeContext<'_>) -> Result<()> {
    let property = ctx.writer.peek_write_property()?;
    ctx.properties.push(property);
    let deserializer = ctx.deserializer;
    deserializer
        .deserialize(ctx)
        .map_err(|e| e.within(&property))?;
    pop_checked(&mut ctx.properties, &property)
}

/// Serialize the property the record cursor is on, and everything below it
pub fn recursive_serialize(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
    let property = ctx.reader.peek_read_property()?;
    ctx.properties.push(property);
    let serializer = ctx.serializer;
    serializer
        .serialize(ctx)
        .map_err(|e| e.within(&property))?;
    pop_checked(&mut ctx.properties, &property)
}

/// Walk a complete document into a record of `schema`
///
/// Fields missing from the document keep their defaults. Anything following the root
/// value is an error.
pub fn deserialize_struct<R: FormatReader>(
    reader: &mut R,
    schema: &'static StructSchema,
    deserializer: &Deserializer,
) -> Result<Datum> {
    let mut writer = PropertyWriter::new(schema);
    let mut ctx = DeserializeContext {
        reader,
        writer: &mut writer,
        deserializer,
        properties: Vec::new(),
    };
    recursive_deserialize(&mut ctx)?;
    if let Some(property) = ctx.properties.last() {
        return Err(WalkError::new(
            WalkErrorKind::TopPropertyChanged,
            format!("'{property}' left on the property stack"),
        ));
    }
    ctx.reader.finish()?;
    writer.finish()
}

/// Walk a record of `schema` into a complete document
pub fn serialize_struct<W: FormatWriter>(
    datum: &Datum,
    schema: &'static StructSchema,
    writer: &mut W,
    serializer: &Serializer,
) -> Result<Vec<u8>> {
    let mut reader = PropertyReader::new(datum, schema);
    let mut ctx = SerializeContext {
        reader: &mut reader,
        writer,
        serializer,
        properties: Vec::new(),
    };
    recursive_serialize(&mut ctx)?;
    if let Some(property) = ctx.properties.last() {
        return Err(WalkError::new(
            WalkErrorKind::TopPropertyChanged,
            format!("'{property}' left on the property stack"),
        ));
    }
    ctx.writer.finish()
}

#[cfg(test)]
mod test {
    use super::format::{JsonReader, JsonWriter, MsgPackReader, MsgPackWriter};
    use super::*;

    static CABIN: StructSchema = StructSchema {
        name: "Cabin",
        fields: &[
            FieldSchema {
                name: "occupied",
                ty: FieldType::Bool,
            },
            FieldSchema {
                name: "badge",
                ty: FieldType::Blob,
            },
        ],
    };

    static VEHICLE: StructSchema = StructSchema {
        name: "Vehicle",
        fields: &[
            FieldSchema {
                name: "name",
                ty: FieldType::Str,
            },
            FieldSchema {
                name: "speed",
                ty: FieldType::Float,
            },
            FieldSchema {
                name: "wheels",
                ty: FieldType::Array(&FieldType::Int),
            },
            FieldSchema {
                name: "cabin",
                ty: FieldType::Struct(&CABIN),
            },
        ],
    };

    fn vehicle() -> Datum {
        let mut cabin = StructDatum::new(&CABIN);
        cabin.set("occupied", Datum::Bool(true));
        cabin.set("badge", Datum::Blob(vec![0xde, 0xad]));
        let mut vehicle = StructDatum::new(&VEHICLE);
        vehicle.set("name", Datum::Str("ego".into()));
        vehicle.set("speed", Datum::Float(13.25));
        vehicle.set(
            "wheels",
            Datum::Array(vec![Datum::Int(1), Datum::Int(2), Datum::Int(3), Datum::Int(4)]),
        );
        vehicle.set("cabin", Datum::Struct(cabin));
        Datum::Struct(vehicle)
    }

    #[test]
    fn nested_record_survives_msgpack() {
        let datum = vehicle();
        let bytes = serialize_struct(
            &datum,
            &VEHICLE,
            &mut MsgPackWriter::new(),
            &Serializer::with_default_handlers(),
        )
        .unwrap();
        let decoded = deserialize_struct(
            &mut MsgPackReader::new(&bytes),
            &VEHICLE,
            &Deserializer::with_default_handlers(),
        )
        .unwrap();
        assert_eq!(decoded, datum);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut reader = JsonReader::new(br#"{"speed": 7, "cabin": {"occupied": true}}"#).unwrap();
        let datum =
            deserialize_struct(&mut reader, &VEHICLE, &Deserializer::with_default_handlers())
                .unwrap();
        let vehicle = datum.as_struct().unwrap();
        assert_eq!(vehicle.get("speed"), Some(&Datum::Float(7.0)));
        assert_eq!(vehicle.get("name"), Some(&Datum::Str(String::new())));
        let cabin = vehicle.get("cabin").and_then(Datum::as_struct).unwrap();
        assert_eq!(cabin.get("occupied"), Some(&Datum::Bool(true)));
        assert_eq!(cabin.get("badge"), Some(&Datum::Blob(Vec::new())));
    }

    #[test]
    fn errors_carry_the_property_path() {
        let mut reader = JsonReader::new(br#"{"cabin": {"occupied": "yes"}}"#).unwrap();
        let err =
            deserialize_struct(&mut reader, &VEHICLE, &Deserializer::with_default_handlers())
                .unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::TypeMismatch);
        assert_eq!(err.path(), "Vehicle.cabin.occupied");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut reader = JsonReader::new(br#"{"name": "ego", "colour": "red"}"#).unwrap();
        let err =
            deserialize_struct(&mut reader, &VEHICLE, &Deserializer::with_default_handlers())
                .unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::UnknownField);
        assert!(err.message().contains("colour"), "{err}");
    }

    #[test]
    fn missing_handler_is_reported() {
        let mut reader = JsonReader::new(br#"{"name": "ego"}"#).unwrap();
        let err = deserialize_struct(&mut reader, &VEHICLE, &Deserializer::new()).unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::NoMatchingHandler);
    }

    fn leaking_str(ctx: &mut DeserializeContext<'_>) -> Result<()> {
        let value = ctx.reader.read_str()?;
        ctx.writer.write_str(&value)?;
        ctx.properties.push(Property::root(&CABIN));
        Ok(())
    }

    fn popping_str(ctx: &mut DeserializeContext<'_>) -> Result<()> {
        let value = ctx.reader.read_str()?;
        ctx.writer.write_str(&value)?;
        ctx.properties.pop();
        Ok(())
    }

    #[test]
    fn handler_leaving_a_property_behind_fails() {
        let mut deserializer = Deserializer::with_default_handlers();
        deserializer.add_direct_handler(PropertyKind::Str, leaking_str);
        let mut reader = JsonReader::new(br#"{"name": "ego"}"#).unwrap();
        let err = deserialize_struct(&mut reader, &VEHICLE, &deserializer).unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::TopPropertyChanged);
    }

    #[test]
    fn handler_popping_too_much_fails() {
        let mut deserializer = Deserializer::with_default_handlers();
        deserializer.add_direct_handler(PropertyKind::Str, popping_str);
        let mut reader = JsonReader::new(br#"{"name": "ego"}"#).unwrap();
        let err = deserialize_struct(&mut reader, &VEHICLE, &deserializer).unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::TopPropertyChanged);
    }

    fn leaking_int(ctx: &mut SerializeContext<'_, '_>) -> Result<()> {
        let value = ctx.reader.read_int()?;
        ctx.writer.write_int(value)?;
        ctx.properties.push(Property::root(&CABIN));
        Ok(())
    }

    #[test]
    fn serializer_checks_the_stack_too() {
        let mut serializer = Serializer::with_default_handlers();
        serializer.add_direct_handler(PropertyKind::Int, leaking_int);
        let err = serialize_struct(&vehicle(), &VEHICLE, &mut MsgPackWriter::new(), &serializer)
            .unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::TopPropertyChanged);
    }

    #[test]
    fn json_output_cannot_hold_blobs() {
        let err = serialize_struct(
            &vehicle(),
            &VEHICLE,
            &mut JsonWriter::new(),
            &Serializer::with_default_handlers(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::Unsupported);
        assert_eq!(err.path(), "Vehicle.cabin.badge");
    }
}
