// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use super::{DataEntry, FormatReader, FormatWriter, Result};
use crate::walker::error::{WalkError, WalkErrorKind};
use serde_json::{Map, Number, Value};
use std::collections::VecDeque;

#[derive(Debug)]
enum Token {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    MapRoot(usize),
    MapEnd,
    ArrayRoot(usize),
    ArrayEnd,
}

impl Token {
    fn entry(&self) -> DataEntry {
        match self {
            Token::Nil => DataEntry::Nil,
            Token::Bool(_) => DataEntry::Bool,
            Token::Int(_) => DataEntry::Int,
            Token::Float(_) => DataEntry::Float,
            Token::Str(_) => DataEntry::Str,
            Token::MapRoot(_) => DataEntry::MapRoot,
            Token::MapEnd => DataEntry::MapEnd,
            Token::ArrayRoot(_) => DataEntry::ArrayRoot,
            Token::ArrayEnd => DataEntry::ArrayEnd,
        }
    }
}

/// JSON document reader
///
/// The document is parsed by `serde_json` up front and replayed as a flat entry stream.
#[derive(Debug)]
pub struct JsonReader {
    tokens: VecDeque<Token>,
    trailing: bool,
}

impl JsonReader {
    pub fn new(input: &[u8]) -> Result<Self> {
        let mut stream = serde_json::Deserializer::from_slice(input).into_iter::<Value>();
        let root = match stream.next() {
            Some(Ok(root)) => root,
            Some(Err(e)) if e.is_eof() => {
                return Err(WalkError::new(WalkErrorKind::UnexpectedEnd, e.to_string()))
            }
            Some(Err(e)) => return Err(WalkError::format(e)),
            None => {
                return Err(WalkError::new(
                    WalkErrorKind::UnexpectedEnd,
                    "empty JSON document",
                ))
            }
        };
        let trailing = stream.next().is_some();

        let mut tokens = VecDeque::new();
        flatten(root, &mut tokens);
        Ok(Self { tokens, trailing })
    }

    fn next(&mut self, expected: DataEntry) -> Result<Token> {
        let entry = self.peek()?;
        if entry != expected {
            return Err(WalkError::new(
                WalkErrorKind::UnexpectedEntry,
                format!("expected {expected:?}, found {entry:?}"),
            ));
        }
        self.tokens.pop_front().ok_or_else(|| {
            WalkError::new(WalkErrorKind::UnexpectedEnd, "no entries left")
        })
    }
}

fn flatten(value: Value, tokens: &mut VecDeque<Token>) {
    match value {
        Value::Null => tokens.push_back(Token::Nil),
        Value::Bool(b) => tokens.push_back(Token::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => tokens.push_back(Token::Int(i)),
            None => tokens.push_back(Token::Float(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => tokens.push_back(Token::Str(s)),
        Value::Array(items) => {
            tokens.push_back(Token::ArrayRoot(items.len()));
            for item in items {
                flatten(item, tokens);
            }
            tokens.push_back(Token::ArrayEnd);
        }
        Value::Object(map) => {
            tokens.push_back(Token::MapRoot(map.len()));
            for (key, value) in map {
                tokens.push_back(Token::Str(key));
                flatten(value, tokens);
            }
            tokens.push_back(Token::MapEnd);
        }
    }
}

impl FormatReader for JsonReader {
    fn peek(&mut self) -> Result<DataEntry> {
        match self.tokens.front() {
            Some(token) => Ok(token.entry()),
            None if self.trailing => Err(WalkError::new(
                WalkErrorKind::TrailingData,
                "more JSON values after the document",
            )),
            None => Ok(DataEntry::Ended),
        }
    }

    fn read_nil(&mut self) -> Result<()> {
        self.next(DataEntry::Nil).map(|_| ())
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.next(DataEntry::Bool)? {
            Token::Bool(b) => Ok(b),
            token => Err(unexpected(token)),
        }
    }

    fn read_int(&mut self) -> Result<i64> {
        match self.next(DataEntry::Int)? {
            Token::Int(i) => Ok(i),
            token => Err(unexpected(token)),
        }
    }

    fn read_float(&mut self) -> Result<f64> {
        match self.next(DataEntry::Float)? {
            Token::Float(f) => Ok(f),
            token => Err(unexpected(token)),
        }
    }

    fn read_str(&mut self) -> Result<String> {
        match self.next(DataEntry::Str)? {
            Token::Str(s) => Ok(s),
            token => Err(unexpected(token)),
        }
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        Err(WalkError::new(
            WalkErrorKind::Unsupported,
            "JSON has no binary values",
        ))
    }

    fn read_map_root(&mut self) -> Result<usize> {
        match self.next(DataEntry::MapRoot)? {
            Token::MapRoot(len) => Ok(len),
            token => Err(unexpected(token)),
        }
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.next(DataEntry::MapEnd).map(|_| ())
    }

    fn read_array_root(&mut self) -> Result<usize> {
        match self.next(DataEntry::ArrayRoot)? {
            Token::ArrayRoot(len) => Ok(len),
            token => Err(unexpected(token)),
        }
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.next(DataEntry::ArrayEnd).map(|_| ())
    }
}

fn unexpected(token: Token) -> WalkError {
    WalkError::new(
        WalkErrorKind::UnexpectedEntry,
        format!("unexpected {:?}", token.entry()),
    )
}

#[derive(Debug)]
enum Frame {
    Map {
        map: Map<String, Value>,
        key: Option<String>,
    },
    Array(Vec<Value>),
}

/// JSON document writer
#[derive(Debug, Default)]
pub struct JsonWriter {
    frames: Vec<Frame>,
    root: Option<Value>,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, value: Value) -> Result<()> {
        match self.frames.last_mut() {
            Some(Frame::Map { key: key @ None, .. }) => match value {
                Value::String(name) => {
                    *key = Some(name);
                    Ok(())
                }
                other => Err(WalkError::new(
                    WalkErrorKind::Unsupported,
                    format!("JSON object keys must be strings, got {other}"),
                )),
            },
            Some(Frame::Map { map, key }) => {
                if let Some(name) = key.take() {
                    map.insert(name, value);
                }
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "document already has a root value",
            )),
        }
    }
}

impl FormatWriter for JsonWriter {
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put(Value::Bool(value))
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.put(Value::Number(value.into()))
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        let number = Number::from_f64(value).ok_or_else(|| {
            WalkError::new(
                WalkErrorKind::Unsupported,
                format!("{value} cannot be represented in JSON"),
            )
        })?;
        self.put(Value::Number(number))
    }

    fn write_str(&mut self, value: &str) -> Result<()> {
        self.put(Value::String(value.to_owned()))
    }

    fn write_blob(&mut self, _value: &[u8]) -> Result<()> {
        Err(WalkError::new(
            WalkErrorKind::Unsupported,
            "JSON has no binary values",
        ))
    }

    fn write_map_root(&mut self, _len: usize) -> Result<()> {
        self.frames.push(Frame::Map {
            map: Map::new(),
            key: None,
        });
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(Frame::Map { map, key: None }) => self.put(Value::Object(map)),
            Some(frame) => {
                self.frames.push(frame);
                Err(WalkError::new(
                    WalkErrorKind::InvalidState,
                    "map end outside of a map or after a dangling key",
                ))
            }
            None => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "map end outside of a map",
            )),
        }
    }

    fn write_array_root(&mut self, len: usize) -> Result<()> {
        self.frames.push(Frame::Array(Vec::with_capacity(len)));
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(Frame::Array(items)) => self.put(Value::Array(items)),
            Some(frame) => {
                self.frames.push(frame);
                Err(WalkError::new(
                    WalkErrorKind::InvalidState,
                    "array end outside of an array",
                ))
            }
            None => Err(WalkError::new(
                WalkErrorKind::InvalidState,
                "array end outside of an array",
            )),
        }
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if !self.frames.is_empty() {
            return Err(WalkError::new(
                WalkErrorKind::InvalidState,
                format!("{} containers still open", self.frames.len()),
            ));
        }
        let root = self.root.take().ok_or_else(|| {
            WalkError::new(WalkErrorKind::InvalidState, "nothing was written")
        })?;
        serde_json::to_vec(&root).map_err(WalkError::format)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_object_entries() {
        let mut reader = JsonReader::new(br#"{"a": [1, 2.5], "b": null, "c": true}"#).unwrap();
        assert_eq!(reader.read_map_root().unwrap(), 3);
        assert_eq!(reader.read_str().unwrap(), "a");
        assert_eq!(reader.read_array_root().unwrap(), 2);
        assert_eq!(reader.read_int().unwrap(), 1);
        assert_eq!(reader.peek().unwrap(), DataEntry::Float);
        assert_eq!(reader.read_float().unwrap(), 2.5);
        reader.read_array_end().unwrap();
        assert_eq!(reader.read_str().unwrap(), "b");
        reader.read_nil().unwrap();
        assert_eq!(reader.read_str().unwrap(), "c");
        assert!(reader.read_bool().unwrap());
        reader.read_map_end().unwrap();
        reader.finish().unwrap();
    }

    #[test]
    fn truncated_document_fails() {
        let err = JsonReader::new(br#"{"a": [1, 2"#).unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::UnexpectedEnd);
        let err = JsonReader::new(b"").unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::UnexpectedEnd);
    }

    #[test]
    fn trailing_value_is_reported() {
        let mut reader = JsonReader::new(b"1 2").unwrap();
        assert_eq!(reader.read_int().unwrap(), 1);
        let err = reader.finish().unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::TrailingData);
    }

    #[test]
    fn writes_nested_document() {
        let mut writer = JsonWriter::new();
        writer.write_map_root(2).unwrap();
        writer.write_str("name").unwrap();
        writer.write_str("carla").unwrap();
        writer.write_str("ids").unwrap();
        writer.write_array_root(1).unwrap();
        writer.write_int(4).unwrap();
        writer.write_array_end().unwrap();
        writer.write_map_end().unwrap();
        let bytes = writer.finish().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"name": "carla", "ids": [4]}));
    }

    #[test]
    fn blobs_are_unsupported() {
        let mut writer = JsonWriter::new();
        let err = writer.write_blob(&[1, 2]).unwrap_err();
        assert_eq!(err.kind(), WalkErrorKind::Unsupported);
    }
}
