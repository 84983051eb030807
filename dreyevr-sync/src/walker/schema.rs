// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Reflective record description and the dynamic value tree records are staged in

use std::fmt::Display;

/// Kind of a property, used to select the handler for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    Str,
    Blob,
    Struct,
    Array,
}

/// Type of a schema field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Str,
    Blob,
    Struct(&'static StructSchema),
    Array(&'static FieldType),
}

impl FieldType {
    pub fn kind(&self) -> PropertyKind {
        match self {
            FieldType::Bool => PropertyKind::Bool,
            FieldType::Int => PropertyKind::Int,
            FieldType::Float => PropertyKind::Float,
            FieldType::Str => PropertyKind::Str,
            FieldType::Blob => PropertyKind::Blob,
            FieldType::Struct(_) => PropertyKind::Struct,
            FieldType::Array(_) => PropertyKind::Array,
        }
    }

    /// Value a field of this type holds before anything has been written to it
    pub fn default_datum(&self) -> Datum {
        match self {
            FieldType::Bool => Datum::Bool(false),
            FieldType::Int => Datum::Int(0),
            FieldType::Float => Datum::Float(0.0),
            FieldType::Str => Datum::Str(String::new()),
            FieldType::Blob => Datum::Blob(Vec::new()),
            FieldType::Struct(schema) => Datum::Struct(StructDatum::new(schema)),
            FieldType::Array(_) => Datum::Array(Vec::new()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub ty: FieldType,
}

/// Named, ordered set of fields
#[derive(Debug, PartialEq)]
pub struct StructSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSchema],
}

impl StructSchema {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// Identity of a node in the walked tree
///
/// The root property of a walk has an empty owner and the struct name as its name.
/// Array elements are named `element` and owned by the array property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Property {
    pub owner: &'static str,
    pub name: &'static str,
    pub ty: FieldType,
}

impl Property {
    pub const fn root(schema: &'static StructSchema) -> Self {
        Property {
            owner: "",
            name: schema.name,
            ty: FieldType::Struct(schema),
        }
    }

    pub fn field(schema: &'static StructSchema, index: usize) -> Self {
        let field = &schema.fields[index];
        Property {
            owner: schema.name,
            name: field.name,
            ty: field.ty,
        }
    }

    pub fn element(array: &Property, ty: FieldType) -> Self {
        Property {
            owner: array.name,
            name: "element",
            ty,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.ty.kind()
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.owner.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.owner, self.name)
        }
    }
}

/// Dynamic value of a schema-typed node
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Blob(Vec<u8>),
    Struct(StructDatum),
    Array(Vec<Datum>),
}

impl Datum {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Datum::Bool(_) => PropertyKind::Bool,
            Datum::Int(_) => PropertyKind::Int,
            Datum::Float(_) => PropertyKind::Float,
            Datum::Str(_) => PropertyKind::Str,
            Datum::Blob(_) => PropertyKind::Blob,
            Datum::Struct(_) => PropertyKind::Struct,
            Datum::Array(_) => PropertyKind::Array,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDatum> {
        match self {
            Datum::Struct(s) => Some(s),
            _ => None,
        }
    }
}

/// Field values of a struct, stored in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct StructDatum {
    schema: &'static StructSchema,
    values: Vec<Datum>,
}

impl StructDatum {
    /// Create a struct value with every field at its default
    pub fn new(schema: &'static StructSchema) -> Self {
        let values = schema
            .fields
            .iter()
            .map(|field| field.ty.default_datum())
            .collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &'static StructSchema {
        self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.schema
            .field_index(name)
            .and_then(|index| self.values.get(index))
    }

    pub fn get_index(&self, index: usize) -> Option<&Datum> {
        self.values.get(index)
    }

    /// Replace a field value. Returns false if the schema has no such field.
    pub fn set(&mut self, name: &str, value: Datum) -> bool {
        match self.schema.field_index(name) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_index(&mut self, index: usize, value: Datum) {
        self.values[index] = value;
    }
}
