// Unparser (U): serializes row/object sequences back to delimited text.
//
// A single pass, unlike the parser's chunked streaming model — §4.6
// describes `unparse` as synchronous over a full in-memory data set.

use std::collections::HashMap;

use crate::config::{FormulaEscape, Quoting, SkipEmptyLines, UnparseConfig};
use crate::error::ConfigError;
use crate::model::{Row, Value};
use crate::strategy::encoding::{encode_utf8_to_target, EncodingTarget};

/// The shapes `unparse` accepts, per §4.6.
pub enum UnparseInput {
    /// Sequence of rows, either all positional or all named.
    Rows(Vec<Row>),
    /// `{fields, data}`: explicit header paired with rows of either shape.
    FieldsAndData { fields: Vec<String>, rows: Vec<Row> },
    /// A raw string, parsed as JSON and re-dispatched.
    Json(String),
}

/// Serialize `input` under `config`, producing delimited text (as bytes,
/// to support non-UTF-8 output encodings).
pub fn unparse(input: UnparseInput, config: &UnparseConfig) -> Result<Vec<u8>, ConfigError> {
    if let Some(columns) = &config.columns {
        if columns.is_empty() {
            return Err(ConfigError::EmptyColumns);
        }
    }

    let resolved = resolve_json(input)?;
    let (header, rows) = match resolved {
        UnparseInput::Rows(rows) => (derive_header(config, &rows), rows),
        UnparseInput::FieldsAndData { fields, rows } => {
            let header = config.columns.clone().or(Some(fields));
            (header, rows)
        }
        UnparseInput::Json(_) => unreachable!("resolve_json never returns Json"),
    };

    let delimiter = config.effective_delimiter();
    let newline: &[u8] = &config.newline;

    let mut out: Vec<u8> = Vec::new();

    if config.header {
        if let Some(names) = &header {
            write_record(
                &mut out,
                &names.iter().map(|n| n.as_str()).collect::<Vec<_>>(),
                config,
                delimiter,
            );
            out.extend_from_slice(newline);
        }
    }

    for row in &rows {
        let fields = row_to_fields(row, header.as_deref());
        if should_skip_empty(&fields, config.skip_empty_lines) {
            continue;
        }
        write_record(
            &mut out,
            &fields.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            config,
            delimiter,
        );
        out.extend_from_slice(newline);
    }

    // Trim the trailing newline: unparse produces a single block of text,
    // not a file with a forced final line terminator.
    if out.ends_with(newline) && !newline.is_empty() {
        out.truncate(out.len() - newline.len());
    }

    Ok(out)
}

/// Convenience wrapper returning a UTF-8 `String` (or re-encoding to
/// `target` first, for non-UTF-8 output).
pub fn unparse_to_string(
    input: UnparseInput,
    config: &UnparseConfig,
    target: EncodingTarget,
) -> Result<Vec<u8>, ConfigError> {
    let utf8 = unparse(input, config)?;
    Ok(encode_utf8_to_target(&utf8, target))
}

fn resolve_json(input: UnparseInput) -> Result<UnparseInput, ConfigError> {
    match input {
        UnparseInput::Json(s) => {
            let value: serde_json::Value = serde_json::from_str(&s)
                .map_err(|e| ConfigError::Invalid(format!("invalid JSON input: {e}")))?;
            json_to_input(value)
        }
        other => Ok(other),
    }
}

fn json_to_input(value: serde_json::Value) -> Result<UnparseInput, ConfigError> {
    use serde_json::Value as J;
    match value {
        J::Object(map) => {
            if let (Some(J::Array(fields)), Some(data)) = (map.get("fields"), map.get("data")) {
                let fields = fields
                    .iter()
                    .map(|f| f.as_str().unwrap_or_default().to_string())
                    .collect();
                let rows = json_array_to_rows(data.clone())?;
                Ok(UnparseInput::FieldsAndData { fields, rows })
            } else {
                Err(ConfigError::Invalid(
                    "object input must be {fields, data}".to_string(),
                ))
            }
        }
        J::Array(_) => Ok(UnparseInput::Rows(json_array_to_rows(value)?)),
        _ => Err(ConfigError::Invalid("unparse input must be an array or {fields, data} object".to_string())),
    }
}

fn json_array_to_rows(value: serde_json::Value) -> Result<Vec<Row>, ConfigError> {
    use serde_json::Value as J;
    let arr = match value {
        J::Array(a) => a,
        _ => return Err(ConfigError::Invalid("expected array of rows".to_string())),
    };
    arr.into_iter()
        .map(|row| match row {
            J::Array(items) => Ok(Row::Positional(items.into_iter().map(json_to_value).collect())),
            J::Object(map) => Ok(Row::Named(
                map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect(),
            )),
            _ => Err(ConfigError::Invalid("row must be an array or object".to_string())),
        })
        .collect()
}

fn json_to_value(value: serde_json::Value) -> Value {
    use serde_json::Value as J;
    match value {
        J::Null => Value::Null,
        J::Bool(b) => Value::Boolean(b),
        J::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        J::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    }
}

fn derive_header(config: &UnparseConfig, rows: &[Row]) -> Option<Vec<String>> {
    if let Some(columns) = &config.columns {
        return Some(columns.clone());
    }
    // `Row::Named` is a `HashMap`, which carries no column order of its
    // own, so "union of first object's keys" (§4.6) is resolved as a
    // stable alphabetical order rather than insertion order — the same
    // choice `row_to_fields` makes for a `Named` row with no header.
    rows.iter().find_map(|row| match row {
        Row::Named(map) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            Some(keys)
        }
        Row::Positional(_) => None,
    })
}

fn row_to_fields(row: &Row, header: Option<&[String]>) -> Vec<String> {
    match row {
        Row::Positional(values) => values.iter().map(|v| v.to_display_string()).collect(),
        Row::Named(map) => match header {
            Some(names) => names
                .iter()
                .map(|name| {
                    map.get(name)
                        .map(|v| v.to_display_string())
                        .unwrap_or_default()
                })
                .collect(),
            None => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                entries.into_iter().map(|(_, v)| v.to_display_string()).collect()
            }
        },
    }
}

fn should_skip_empty(fields: &[String], mode: SkipEmptyLines) -> bool {
    match mode {
        SkipEmptyLines::False => false,
        SkipEmptyLines::True => fields.len() == 1 && fields[0].is_empty(),
        SkipEmptyLines::Greedy => fields.iter().all(|f| f.trim().is_empty()),
    }
}

fn write_record(out: &mut Vec<u8>, fields: &[&str], config: &UnparseConfig, delimiter: &[u8]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(delimiter);
        }
        write_field(out, field, i, config, delimiter);
    }
}

fn write_field(out: &mut Vec<u8>, field: &str, index: usize, config: &UnparseConfig, delimiter: &[u8]) {
    let triggers = config.escape_formulae.triggers();
    let is_formula = triggers
        .map(|set| set.iter().any(|&t| field.as_bytes().first() == Some(&t)))
        .unwrap_or(false);

    let escaped_value = if is_formula {
        format!("'{field}")
    } else {
        field.to_string()
    };

    let forced_quote = is_formula || quoting_requires(config, &escaped_value, index);
    let needs_quote = forced_quote || field_needs_quote(&escaped_value, delimiter, config.quote_char);

    if !needs_quote {
        out.extend_from_slice(escaped_value.as_bytes());
        return;
    }

    out.push(config.quote_char);
    for &byte in escaped_value.as_bytes() {
        if byte == config.quote_char {
            out.push(config.escape_char);
        }
        out.push(byte);
    }
    out.push(config.quote_char);
}

fn quoting_requires(config: &UnparseConfig, value: &str, index: usize) -> bool {
    match &config.quotes {
        Quoting::All(all) => *all,
        Quoting::Predicate(predicate) => predicate(value, index),
        Quoting::PerColumn(flags) => flags.get(index).copied().unwrap_or(false),
    }
}

fn field_needs_quote(value: &str, delimiter: &[u8], quote_char: u8) -> bool {
    let bytes = value.as_bytes();
    bytes.contains(&quote_char)
        || bytes.contains(&b'\r')
        || bytes.contains(&b'\n')
        || (!delimiter.is_empty() && contains_subslice(bytes, delimiter))
        || value.starts_with(' ')
        || value.ends_with(' ')
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
