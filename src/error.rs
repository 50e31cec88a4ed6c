// Error taxonomy for the codec.
//
// Row-level parse problems (Quotes, Delimiter, FieldMismatch) are non-fatal:
// they ride alongside their row in `ParseResult::errors` and never stop a
// parse. Transport-level problems (Network, File, Worker) are fatal and
// surface through a `Sink::on_error` call, ending the parse. `ConfigError`
// fails synchronously at the facade, before any adapter is built.

use thiserror::Error;

/// Broad category of a row-level parse error. Mirrors the taxonomy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Quotes,
    Delimiter,
    FieldMismatch,
}

/// Specific code within an `ErrorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingQuotes,
    InvalidQuotes,
    UndetectableDelimiter,
    TooFewFields,
    TooManyFields,
}

/// A non-fatal, row-scoped parse error. Carries enough to report to the
/// user but never aborts the parse that produced it.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
    pub row: Option<usize>,
    pub index: Option<usize>,
}

impl ParseError {
    pub fn missing_quotes(row: usize, index: usize) -> Self {
        ParseError {
            kind: ErrorKind::Quotes,
            code: ErrorCode::MissingQuotes,
            message: "Quoted field unterminated at end of input".to_string(),
            row: Some(row),
            index: Some(index),
        }
    }

    pub fn invalid_quotes(row: usize, index: usize) -> Self {
        ParseError {
            kind: ErrorKind::Quotes,
            code: ErrorCode::InvalidQuotes,
            message: "Trailing data after closing quote".to_string(),
            row: Some(row),
            index: Some(index),
        }
    }

    pub fn undetectable_delimiter() -> Self {
        ParseError {
            kind: ErrorKind::Delimiter,
            code: ErrorCode::UndetectableDelimiter,
            message: "Could not detect a delimiter; defaulted to ','".to_string(),
            row: None,
            index: None,
        }
    }

    pub fn too_few_fields(row: usize) -> Self {
        ParseError {
            kind: ErrorKind::FieldMismatch,
            code: ErrorCode::TooFewFields,
            message: "Row has fewer fields than header".to_string(),
            row: Some(row),
            index: None,
        }
    }

    pub fn too_many_fields(row: usize) -> Self {
        ParseError {
            kind: ErrorKind::FieldMismatch,
            code: ErrorCode::TooManyFields,
            message: "Row has more fields than header".to_string(),
            row: Some(row),
            index: None,
        }
    }
}

/// Fatal, transport-level failure: delivered to `Sink::on_error`, ending
/// the parse. Never appears in `ParseResult::errors`.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("download error: {0}")]
    DownloadError(String),
    #[error("file read error: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("file size error: {0}")]
    FileSizeError(String),
    #[error("worker error: {0}")]
    WorkerError(String),
}

/// Synchronous configuration failure. Returned directly by the facade
/// before any adapter/streamer is constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("columns list must not be empty")]
    EmptyColumns,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind_and_code() {
        let e = ParseError::missing_quotes(2, 10);
        assert_eq!(e.kind, ErrorKind::Quotes);
        assert_eq!(e.code, ErrorCode::MissingQuotes);
        assert_eq!(e.row, Some(2));
    }

    #[test]
    fn undetectable_delimiter_has_no_row() {
        let e = ParseError::undetectable_delimiter();
        assert_eq!(e.kind, ErrorKind::Delimiter);
        assert!(e.row.is_none());
    }
}
