//! Shared types for tracesync
//!
//! This crate contains the trace record and the closed field vocabulary that the
//! query language resolves identifiers against.

mod format;

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub use format::{FormatError, RecordFormat, DEFAULT_FORMAT};

// ============================================================================
// Field Vocabulary
// ============================================================================

/// Type of a record field as seen by the query language
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Integer,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
        }
    }
}

/// A resolved field value, borrowed from its source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value<'a> {
    String(&'a str),
    Integer(i64),
}

impl Value<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::String(_) => FieldKind::String,
            Self::Integer(_) => FieldKind::Integer,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// Anything that can resolve a field name to a value
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Value<'_>>;
}

/// Static field schema of a record kind, used to bind identifiers before evaluation
pub trait FieldSchema {
    fn field_kind(name: &str) -> Option<FieldKind>;
}

impl<'v> FieldSource for HashMap<&str, Value<'v>> {
    fn field(&self, name: &str) -> Option<Value<'_>> {
        self.get(name).copied()
    }
}

/// Named fields of a trace record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    TaskId,
    Module,
    Timestamp,
    Message,
}

impl Field {
    pub const ALL: [Field; 4] = [Self::TaskId, Self::Module, Self::Timestamp, Self::Message];

    /// Identifier used for this field in filters and format templates
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskId => "task_id",
            Self::Module => "module",
            Self::Timestamp => "timestamp",
            Self::Message => "message",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "task_id" => Some(Self::TaskId),
            "module" => Some(Self::Module),
            "timestamp" => Some(Self::Timestamp),
            "message" => Some(Self::Message),
            _ => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Timestamp => FieldKind::Integer,
            _ => FieldKind::String,
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// A single trace record
///
/// Records are immutable once built; the store shares them behind `Arc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    task_id: String,
    module: String,
    timestamp: i64,
    message: String,
}

impl Record {
    /// Create a record, stripping newlines from the message
    pub fn new(
        task_id: impl Into<String>,
        module: impl Into<String>,
        timestamp: i64,
        message: impl Into<String>,
    ) -> Self {
        let mut message = message.into();
        message.retain(|c| c != '\n');
        Self {
            task_id: task_id.into(),
            module: module.into(),
            timestamp,
            message,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Typed getter for a named field
    pub fn get(&self, field: Field) -> Value<'_> {
        match field {
            Field::TaskId => Value::String(&self.task_id),
            Field::Module => Value::String(&self.module),
            Field::Timestamp => Value::Integer(self.timestamp),
            Field::Message => Value::String(&self.message),
        }
    }
}

impl FieldSource for Record {
    fn field(&self, name: &str) -> Option<Value<'_>> {
        Field::from_name(name).map(|field| self.get(field))
    }
}

impl FieldSchema for Record {
    fn field_kind(name: &str) -> Option<FieldKind> {
        Field::from_name(name).map(|field| field.kind())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.module, self.message)
    }
}
