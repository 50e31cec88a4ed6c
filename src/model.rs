// Core data model: the shapes that flow between parser, header layer, and
// the public facade.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A single coerced field value. Produced by `HeaderTyper`'s dynamic-typing
/// pass; untyped fields stay `Value::String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    /// ISO-8601 timestamp, already normalised to millisecond precision.
    Timestamp(String),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Timestamp(s) => Some(s),
            _ => None,
        }
    }

    /// Render for serialization purposes (unparse): empty string for null,
    /// otherwise the natural text form.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Timestamp(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::Null => String::new(),
        }
    }
}

/// One logical row of parsed data, after `HeaderTyper` projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// No header in effect: a positional sequence of fields.
    Positional(Vec<Value>),
    /// Header in effect: a name→value map. `__parsed_extra` holds fields
    /// beyond the header's width (see `TooManyFields`).
    Named(HashMap<String, Value>),
}

impl Row {
    pub fn len(&self) -> usize {
        match self {
            Row::Positional(v) => v.len(),
            Row::Named(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The reserved key under which extra fields (beyond the header's width)
/// are bucketed in header mode.
pub const PARSED_EXTRA_KEY: &str = "__parsed_extra";

/// Per-parse metadata, populated incrementally as chunks are consumed.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    /// The delimiter actually used (configured or guessed).
    pub delimiter: String,
    /// The line break actually used (configured or guessed): "\n", "\r", or "\r\n".
    pub linebreak: String,
    pub aborted: bool,
    pub truncated: bool,
    /// Byte offset into the concatenated input consumed so far.
    pub cursor: usize,
    /// Header row, if header mode is enabled.
    pub fields: Option<Vec<String>>,
    /// Disambiguated header name -> original header name.
    pub renamed_headers: HashMap<String, String>,
}

/// The accumulated (or per-chunk) result of a parse.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub rows: Vec<Row>,
    pub errors: Vec<ParseError>,
    pub meta: Meta,
}

impl ParseResult {
    pub fn merge(&mut self, mut other: ParseResult) {
        self.rows.append(&mut other.rows);
        self.errors.append(&mut other.errors);
        self.meta = other.meta;
    }
}

/// Identifies a field for `transform`/`dynamicTyping` purposes: by header
/// name once a header is known, otherwise by positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name(String),
    Index(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_display_string() {
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Boolean(true).to_display_string(), "true");
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(Value::Number(3.5).to_display_string(), "3.5");
        assert_eq!(Value::String("hi".into()).to_display_string(), "hi");
    }

    #[test]
    fn row_len() {
        assert_eq!(Row::Positional(vec![Value::Null, Value::Null]).len(), 2);
    }
}
