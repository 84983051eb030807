// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use crate::walker::Property;
use std::fmt::Display;

/// What went wrong during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkErrorKind {
    /// The format reader produced an entry the handler cannot accept here
    UnexpectedEntry,
    /// Value type does not match the property type
    TypeMismatch,
    /// Input names a field the schema does not have
    UnknownField,
    /// Input ended in the middle of a value
    UnexpectedEnd,
    /// Input continues after the root value
    TrailingData,
    /// A handler left the property stack in a different state than it found it
    TopPropertyChanged,
    /// No handler registered for the property kind
    NoMatchingHandler,
    /// Cursor operation called in the wrong position
    InvalidState,
    /// Value cannot be represented in the wire format
    Unsupported,
    /// Error reported by the underlying codec
    Format,
}

/// Walk error with the path of the node it occurred in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    kind: WalkErrorKind,
    message: String,
    path: Vec<&'static str>,
}

impl WalkError {
    pub fn new(kind: WalkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub(crate) fn format(error: impl std::fmt::Debug) -> Self {
        Self::new(WalkErrorKind::Format, format!("{error:?}"))
    }

    pub(crate) fn top_property_changed(pushed: &Property, popped: Option<&Property>) -> Self {
        let message = match popped {
            Some(popped) => format!("pushed '{pushed}' but popped '{popped}'"),
            None => format!("pushed '{pushed}' but the property stack was empty"),
        };
        Self::new(WalkErrorKind::TopPropertyChanged, message)
    }

    pub fn kind(&self) -> WalkErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Dotted path from the root to the failing node, e.g. `StatusRecord.vehicle_status`
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Record that the error unwound through `property`
    pub(crate) fn within(mut self, property: &Property) -> Self {
        self.path.insert(0, property.name);
        self
    }
}

impl std::error::Error for WalkError {}

impl Display for WalkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{:?}: {}", self.kind, self.message)
        } else {
            write!(f, "{:?} at {}: {}", self.kind, self.path(), self.message)
        }
    }
}
