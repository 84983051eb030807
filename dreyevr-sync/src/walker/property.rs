// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Schema-side cursors of a walk
//!
//! [`PropertyWriter`] is the target of a deserialization: it stages a [`Datum`] while
//! checking every write against the schema. [`PropertyReader`] is the source of a
//! serialization: it hands out the values of an existing [`Datum`] in schema order.

use super::error::{WalkError, WalkErrorKind};
use super::schema::{Datum, FieldType, Property, PropertyKind, StructDatum, StructSchema};

type Result<T, E = WalkError> = std::result::Result<T, E>;

enum WriteFrame {
    Root {
        schema: &'static StructSchema,
        value: Option<Datum>,
    },
    Struct {
        datum: StructDatum,
        field: Option<usize>,
    },
    Array {
        property: Property,
        elem: FieldType,
        items: Vec<Datum>,
    },
}

/// Writes values into a record staged against a schema
pub struct PropertyWriter {
    frames: Vec<WriteFrame>,
}

impl PropertyWriter {
    pub fn new(schema: &'static StructSchema) -> Self {
        Self {
            frames: vec![WriteFrame::Root {
                schema,
                value: None,
            }],
        }
    }

    /// Property the next value will be written to
    pub fn peek_write_property(&self) -> Result<Property> {
        match self.frames.last() {
            Some(WriteFrame::Root {
                schema,
                value: None,
            }) => Ok(Property::root(schema)),
            Some(WriteFrame::Root { value: Some(_), .. }) => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "root value already written",
            )),
            Some(WriteFrame::Struct {
                datum,
                field: Some(index),
            }) => Ok(Property::field(datum.schema(), *index)),
            Some(WriteFrame::Struct { datum, field: None }) => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("expecting a field name in '{}'", datum.schema().name),
            )),
            Some(WriteFrame::Array { property, elem, .. }) => {
                Ok(Property::element(property, *elem))
            }
            None => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "property writer already finished",
            )),
        }
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.expect(PropertyKind::Bool)?;
        self.put(Datum::Bool(value))
    }

    pub fn write_int(&mut self, value: i64) -> Result<()> {
        self.expect(PropertyKind::Int)?;
        self.put(Datum::Int(value))
    }

    pub fn write_float(&mut self, value: f64) -> Result<()> {
        self.expect(PropertyKind::Float)?;
        self.put(Datum::Float(value))
    }

    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.expect(PropertyKind::Str)?;
        self.put(Datum::Str(value.to_owned()))
    }

    pub fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.expect(PropertyKind::Blob)?;
        self.put(Datum::Blob(value.to_vec()))
    }

    /// Leave the next property at its default value
    pub fn write_default(&mut self) -> Result<()> {
        let property = self.peek_write_property()?;
        self.put(property.ty.default_datum())
    }

    pub fn write_struct_root(&mut self) -> Result<()> {
        let property = self.expect(PropertyKind::Struct)?;
        let FieldType::Struct(schema) = property.ty else {
            unreachable!("struct kind always carries a schema");
        };
        self.frames.push(WriteFrame::Struct {
            datum: StructDatum::new(schema),
            field: None,
        });
        Ok(())
    }

    /// Select the field the next value is written to
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        match self.frames.last_mut() {
            Some(WriteFrame::Struct {
                datum,
                field: field @ None,
            }) => {
                let schema = datum.schema();
                let index = schema.field_index(name).ok_or_else(|| {
                    WalkError::new(
                        WalkErrorKind::UnknownField,
                        format!("'{}' has no field '{name}'", schema.name),
                    )
                })?;
                *field = Some(index);
                Ok(())
            }
            Some(WriteFrame::Struct { datum, field: Some(index) }) => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!(
                    "field '{}' selected twice without a value",
                    datum.schema().fields[*index].name
                ),
            )),
            _ => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("field name '{name}' outside of a struct"),
            )),
        }
    }

    pub fn write_struct_end(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(WriteFrame::Struct { datum, field: None }) => self.put(Datum::Struct(datum)),
            Some(frame) => {
                self.frames.push(frame);
                Err(WalkError::new(
                    WalkErrorKind::InvalidState,
                    "struct end outside of a struct or before a field value",
                ))
            }
            None => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "property writer already finished",
            )),
        }
    }

    pub fn write_array_root(&mut self) -> Result<()> {
        let property = self.expect(PropertyKind::Array)?;
        let FieldType::Array(elem) = property.ty else {
            unreachable!("array kind always carries an element type");
        };
        self.frames.push(WriteFrame::Array {
            property,
            elem: *elem,
            items: Vec::new(),
        });
        Ok(())
    }

    pub fn write_array_end(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(WriteFrame::Array { items, .. }) => self.put(Datum::Array(items)),
            Some(frame) => {
                self.frames.push(frame);
                Err(WalkError::new(
                    WalkErrorKind::InvalidState,
                    "array end outside of an array",
                ))
            }
            None => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "property writer already finished",
            )),
        }
    }

    /// Take the completed root value
    pub fn finish(mut self) -> Result<Datum> {
        match self.frames.pop() {
            Some(WriteFrame::Root {
                value: Some(value), ..
            }) if self.frames.is_empty() => Ok(value),
            _ => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "record not completely written",
            )),
        }
    }

    fn expect(&self, kind: PropertyKind) -> Result<Property> {
        let property = self.peek_write_property()?;
        if property.kind() != kind {
            return Err(WalkError::new(
                WalkErrorKind::TypeMismatch,
                format!("'{property}' expects {:?}, got {kind:?}", property.kind()),
            ));
        }
        Ok(property)
    }

    fn put(&mut self, value: Datum) -> Result<()> {
        match self.frames.last_mut() {
            Some(WriteFrame::Root { value: slot, .. }) if slot.is_none() => {
                *slot = Some(value);
                Ok(())
            }
            Some(WriteFrame::Struct { datum, field }) => match field.take() {
                Some(index) => {
                    datum.set_index(index, value);
                    Ok(())
                }
                None => Err(WalkError::new(
                    WalkErrorKind::InvalidState,
                    "value written without a field name",
                )),
            },
            Some(WriteFrame::Array { items, .. }) => {
                items.push(value);
                Ok(())
            }
            _ => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "no property left to write",
            )),
        }
    }
}

/// Structural position of a [`PropertyReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEntry {
    Value(PropertyKind),
    Name,
    StructEnd,
    ArrayEnd,
    Ended,
}

enum ReadFrame<'d> {
    Root {
        schema: &'static StructSchema,
        datum: &'d Datum,
        done: bool,
    },
    Struct {
        datum: &'d StructDatum,
        next: usize,
        pending: Option<usize>,
    },
    Array {
        property: Property,
        elem: FieldType,
        items: &'d [Datum],
        next: usize,
    },
}

/// Reads the values of a record in schema order
pub struct PropertyReader<'d> {
    frames: Vec<ReadFrame<'d>>,
}

impl<'d> PropertyReader<'d> {
    pub fn new(datum: &'d Datum, schema: &'static StructSchema) -> Self {
        Self {
            frames: vec![ReadFrame::Root {
                schema,
                datum,
                done: false,
            }],
        }
    }

    /// Property the next value will be read from
    pub fn peek_read_property(&self) -> Result<Property> {
        self.current().map(|(property, _)| property)
    }

    pub fn peek_entry(&self) -> Result<ReadEntry> {
        let entry = match self.frames.last() {
            Some(ReadFrame::Root { done: true, .. }) | None => ReadEntry::Ended,
            Some(ReadFrame::Struct {
                datum,
                next,
                pending: None,
            }) => {
                if *next < datum.len() {
                    ReadEntry::Name
                } else {
                    ReadEntry::StructEnd
                }
            }
            Some(ReadFrame::Array { items, next, .. }) if *next >= items.len() => {
                ReadEntry::ArrayEnd
            }
            Some(_) => ReadEntry::Value(self.peek_read_property()?.kind()),
        };
        Ok(entry)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.current()? {
            (_, Datum::Bool(value)) => {
                self.advance();
                Ok(*value)
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    pub fn read_int(&mut self) -> Result<i64> {
        match self.current()? {
            (_, Datum::Int(value)) => {
                self.advance();
                Ok(*value)
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    pub fn read_float(&mut self) -> Result<f64> {
        match self.current()? {
            (_, Datum::Float(value)) => {
                self.advance();
                Ok(*value)
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    pub fn read_str(&mut self) -> Result<&'d str> {
        match self.current()? {
            (_, Datum::Str(value)) => {
                self.advance();
                Ok(value.as_str())
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    pub fn read_blob(&mut self) -> Result<&'d [u8]> {
        match self.current()? {
            (_, Datum::Blob(value)) => {
                self.advance();
                Ok(value.as_slice())
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    /// Enter a struct value. Returns the number of fields.
    pub fn read_struct_root(&mut self) -> Result<usize> {
        match self.current()? {
            (_, Datum::Struct(datum)) => {
                self.advance();
                self.frames.push(ReadFrame::Struct {
                    datum,
                    next: 0,
                    pending: None,
                });
                Ok(datum.len())
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    /// Move to the next field of the current struct and return its name
    pub fn read_name(&mut self) -> Result<&'static str> {
        match self.frames.last_mut() {
            Some(ReadFrame::Struct {
                datum,
                next,
                pending: pending @ None,
            }) if *next < datum.len() => {
                let name = datum.schema().fields[*next].name;
                *pending = Some(*next);
                *next += 1;
                Ok(name)
            }
            _ => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "no field name to read",
            )),
        }
    }

    pub fn read_struct_end(&mut self) -> Result<()> {
        match self.peek_entry()? {
            ReadEntry::StructEnd => {
                self.frames.pop();
                Ok(())
            }
            entry => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("expected struct end, found {entry:?}"),
            )),
        }
    }

    /// Enter an array value. Returns the number of elements.
    pub fn read_array_root(&mut self) -> Result<usize> {
        match self.current()? {
            (property, Datum::Array(items)) => {
                let FieldType::Array(elem) = property.ty else {
                    return Err(mismatch(&property, &Datum::Array(Vec::new())));
                };
                self.advance();
                self.frames.push(ReadFrame::Array {
                    property,
                    elem: *elem,
                    items,
                    next: 0,
                });
                Ok(items.len())
            }
            (property, datum) => Err(mismatch(&property, datum)),
        }
    }

    pub fn read_array_end(&mut self) -> Result<()> {
        match self.peek_entry()? {
            ReadEntry::ArrayEnd => {
                self.frames.pop();
                Ok(())
            }
            entry => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("expected array end, found {entry:?}"),
            )),
        }
    }

    fn current(&self) -> Result<(Property, &'d Datum)> {
        match self.frames.last() {
            Some(ReadFrame::Root {
                schema,
                datum,
                done: false,
            }) => Ok((Property::root(schema), *datum)),
            Some(ReadFrame::Struct {
                datum,
                pending: Some(index),
                ..
            }) => {
                let value = datum.get_index(*index).ok_or_else(|| {
                    WalkError::new(WalkErrorKind::InvalidState, "field index out of range")
                })?;
                Ok((Property::field(datum.schema(), *index), value))
            }
            Some(ReadFrame::Array {
                property,
                elem,
                items,
                next,
            }) if *next < items.len() => Ok((Property::element(property, *elem), &items[*next])),
            _ => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "no value at the current position",
            )),
        }
    }

    fn advance(&mut self) {
        match self.frames.last_mut() {
            Some(ReadFrame::Root { done, .. }) => *done = true,
            Some(ReadFrame::Struct { pending, .. }) => *pending = None,
            Some(ReadFrame::Array { next, .. }) => *next += 1,
            None => {}
        }
    }
}

fn mismatch(property: &Property, datum: &Datum) -> WalkError {
    WalkError::new(
        WalkErrorKind::TypeMismatch,
        format!(
            "'{property}' is {:?} but holds {:?}",
            property.kind(),
            datum.kind()
        ),
    )
}
