// Tokenizer/Parser (P): the character-level state machine that turns a
// text window into rows of raw string fields, a cursor, and a per-row
// error list.
//
// Grounded on the teacher's Cow-based zero-copy extraction
// (`core::field::extract_field_cow_with_escape`) for the common case
// where `quoteChar == escapeChar`, generalised to the fast/general split
// the teacher already draws between `strategy::direct` (single-byte,
// quote==escape) and `strategy::general` (arbitrary byte patterns) — here
// the split is single quote/escape byte vs. distinct quote/escape bytes.
// The explicit `State` enum mirrors the state-handler design in
// `johnlogsdon-rust-csv-parser`'s `CsvChunkParser` (states `StartOfField`,
// `InQuotedField`, `QuoteSeen`, ...), adapted to this spec's exact
// transition table and to operate on a byte window with pause/abort
// flags instead of one `char` at a time.

pub mod fast;

use std::borrow::Cow;

use crate::error::ParseError;
use crate::streamer::Flags;

/// States of the tokenizer's single-pass scan, named as in the transition
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    FieldStart,
    InUnquotedField,
    InQuotedField,
    AfterClosingQuote,
    RowEnd,
}

/// Settings the tokenizer needs to run one `tokenize` call. Everything
/// here is read-only for the duration of the call.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub delimiter: u8,
    pub quote_char: u8,
    pub escape_char: u8,
    /// `None` lets any of `\n`, `\r`, `\r\n` terminate a row (auto mode).
    /// `Some(pattern)` means only that exact byte sequence terminates a
    /// row — a `\r` that is part of a configured `\r\n` is data otherwise.
    pub newline: Option<Vec<u8>>,
    /// Resolved comment-line prefix, or `None` if comments are disabled
    /// (including the silent disable-on-collision case).
    pub comments: Option<Vec<u8>>,
    /// 0 means unlimited.
    pub preview: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        TokenizerConfig {
            delimiter: b',',
            quote_char: b'"',
            escape_char: b'"',
            newline: None,
            comments: None,
            preview: 0,
        }
    }
}

/// The result of one `Tokenizer::tokenize` call.
pub struct TokenizeOutcome<'a> {
    pub rows: Vec<Vec<Cow<'a, [u8]>>>,
    pub errors: Vec<ParseError>,
    /// `base_index + offset_just_past_last_complete_row`.
    pub cursor: usize,
    pub paused: bool,
    pub aborted: bool,
}

pub struct Tokenizer {
    pub config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Tokenizer { config }
    }

    /// Detect whether `text` contains the quote character — the fast-mode
    /// eligibility check from §4.1.
    pub fn contains_quote(&self, text: &[u8]) -> bool {
        memchr::memchr(self.config.quote_char, text).is_some()
    }

    /// `parse(text, baseIndex, ignoreLastRow)`. A single pass over `text`.
    /// `ignore_last_row = true` defers a trailing partial line: it is
    /// dropped from `rows` and not covered by `cursor`, so the caller can
    /// rebuild a `partialLine` for the next chunk.
    pub fn tokenize<'a>(
        &self,
        text: &'a [u8],
        base_index: usize,
        ignore_last_row: bool,
        flags: &Flags,
    ) -> TokenizeOutcome<'a> {
        let cfg = &self.config;
        let mut rows: Vec<Vec<Cow<'a, [u8]>>> = Vec::new();
        let mut errors = Vec::new();
        let mut row: Vec<Cow<'a, [u8]>> = Vec::new();

        let mut state = State::FieldStart;
        let mut pos = 0usize;
        let mut field_start = 0usize;
        // Offset just past the last fully emitted row.
        let mut last_row_end = 0usize;
        let mut paused = false;
        let mut aborted = false;
        // True only right at the start of a line (absolute start, or just
        // past a row terminator) — comments must not trigger mid-row after
        // an ordinary field-separating delimiter.
        let mut at_row_start = true;

        while pos < text.len() {
            if flags.is_aborted() {
                aborted = true;
                break;
            }
            if flags.is_paused() {
                paused = true;
                break;
            }

            // Comment lines: only recognised at column 0 of a line.
            if state == State::FieldStart && at_row_start {
                if let Some(prefix) = &cfg.comments {
                    if text[pos..].starts_with(prefix.as_slice()) {
                        // Skip to next line break (or EOF), emit nothing.
                        let skip_from = pos;
                        while pos < text.len() && self.newline_len(text, pos) == 0 {
                            pos += 1;
                        }
                        let nl = self.newline_len(text, pos);
                        pos += nl.max(0);
                        if nl == 0 {
                            // Reached EOF without a terminator: whole rest
                            // of the window is a comment; nothing more to do.
                            last_row_end = text.len();
                        } else {
                            last_row_end = pos;
                        }
                        field_start = pos;
                        at_row_start = true;
                        let _ = skip_from;
                        continue;
                    }
                }
            }

            let byte = text[pos];

            match state {
                State::FieldStart => {
                    if byte == cfg.quote_char {
                        state = State::InQuotedField;
                        pos += 1;
                        field_start = pos;
                        at_row_start = false;
                    } else if byte == cfg.delimiter {
                        row.push(Cow::Borrowed(&text[pos..pos]));
                        pos += 1;
                        field_start = pos;
                        at_row_start = false;
                    } else if let Some(nl) = self.newline_at(text, pos) {
                        row.push(Cow::Borrowed(&text[pos..pos]));
                        pos += nl;
                        rows.push(std::mem::take(&mut row));
                        last_row_end = pos;
                        field_start = pos;
                        at_row_start = true;
                        if cfg.preview > 0 && rows.len() >= cfg.preview {
                            return TokenizeOutcome {
                                rows,
                                errors,
                                cursor: base_index + last_row_end,
                                paused: false,
                                aborted: false,
                            };
                        }
                        state = State::FieldStart;
                    } else {
                        state = State::InUnquotedField;
                        pos += 1;
                        at_row_start = false;
                    }
                }
                State::InUnquotedField => {
                    if byte == cfg.delimiter {
                        row.push(Cow::Borrowed(&text[field_start..pos]));
                        pos += 1;
                        field_start = pos;
                        state = State::FieldStart;
                        at_row_start = false;
                    } else if let Some(nl) = self.newline_at(text, pos) {
                        row.push(Cow::Borrowed(&text[field_start..pos]));
                        pos += nl;
                        rows.push(std::mem::take(&mut row));
                        last_row_end = pos;
                        field_start = pos;
                        at_row_start = true;
                        if cfg.preview > 0 && rows.len() >= cfg.preview {
                            return TokenizeOutcome {
                                rows,
                                errors,
                                cursor: base_index + last_row_end,
                                paused: false,
                                aborted: false,
                            };
                        }
                        state = State::FieldStart;
                    } else {
                        pos += 1;
                    }
                }
                State::InQuotedField => {
                    if byte == cfg.escape_char
                        && pos + 1 < text.len()
                        && text[pos + 1] == cfg.quote_char
                    {
                        pos += 2;
                    } else if byte == cfg.quote_char {
                        state = State::AfterClosingQuote;
                        pos += 1;
                    } else {
                        pos += 1;
                    }
                }
                State::AfterClosingQuote => {
                    if byte == cfg.delimiter {
                        row.push(self.extract_quoted(text, field_start, pos - 1));
                        pos += 1;
                        field_start = pos;
                        state = State::FieldStart;
                        at_row_start = false;
                    } else if let Some(nl) = self.newline_at(text, pos) {
                        row.push(self.extract_quoted(text, field_start, pos - 1));
                        pos += nl;
                        rows.push(std::mem::take(&mut row));
                        last_row_end = pos;
                        field_start = pos;
                        at_row_start = true;
                        if cfg.preview > 0 && rows.len() >= cfg.preview {
                            return TokenizeOutcome {
                                rows,
                                errors,
                                cursor: base_index + last_row_end,
                                paused: false,
                                aborted: false,
                            };
                        }
                        state = State::FieldStart;
                    } else if byte == b' ' || byte == b'\t' {
                        // whitespace between closing quote and delimiter/newline: swallowed
                        pos += 1;
                    } else {
                        errors.push(ParseError::invalid_quotes(rows.len(), base_index + pos));
                        // Treat the remainder permissively: re-enter the quoted
                        // field so progress continues instead of derailing.
                        state = State::InQuotedField;
                    }
                }
                State::RowEnd => unreachable!("RowEnd is resolved inline, never held across iterations"),
            }
        }

        if aborted || paused {
            return TokenizeOutcome {
                rows,
                errors,
                cursor: base_index + last_row_end,
                paused,
                aborted,
            };
        }

        // EOF handling.
        match state {
            State::InQuotedField => {
                if !ignore_last_row {
                    errors.push(ParseError::missing_quotes(rows.len(), base_index + field_start));
                    row.push(Cow::Borrowed(&text[field_start..pos]));
                    rows.push(row);
                    last_row_end = pos;
                }
            }
            State::AfterClosingQuote => {
                if !ignore_last_row {
                    row.push(self.extract_quoted(text, field_start, pos.saturating_sub(1)));
                    rows.push(row);
                    last_row_end = pos;
                }
            }
            State::InUnquotedField => {
                if !ignore_last_row {
                    row.push(Cow::Borrowed(&text[field_start..pos]));
                    rows.push(row);
                    last_row_end = pos;
                }
            }
            State::FieldStart => {
                // Either we just ended on a clean row boundary (row already
                // empty/taken), or the window ended exactly at EOF with no
                // dangling field — nothing to flush either way.
            }
            State::RowEnd => {}
        }

        TokenizeOutcome {
            rows,
            errors,
            cursor: base_index + last_row_end,
            paused: false,
            aborted: false,
        }
    }

    /// Length of the newline sequence starting at `pos`, or `None`.
    fn newline_at(&self, text: &[u8], pos: usize) -> Option<usize> {
        let n = self.newline_len(text, pos);
        if n == 0 {
            None
        } else {
            Some(n)
        }
    }

    fn newline_len(&self, text: &[u8], pos: usize) -> usize {
        if let Some(pattern) = &self.config.newline {
            if text[pos..].starts_with(pattern.as_slice()) {
                pattern.len()
            } else {
                0
            }
        } else if text[pos] == b'\r' {
            if pos + 1 < text.len() && text[pos + 1] == b'\n' {
                2
            } else {
                1
            }
        } else if text[pos] == b'\n' {
            1
        } else {
            0
        }
    }

    /// Extract a quoted field's content from `[start, end)` (the span
    /// strictly between the opening and closing quote), unescaping any
    /// `escapeChar + quoteChar` sequences. Borrows when no unescaping is
    /// needed; the common case where `quoteChar == escapeChar` is
    /// equivalent to doubled-quote unescaping.
    fn extract_quoted<'a>(&self, text: &'a [u8], start: usize, end: usize) -> Cow<'a, [u8]> {
        if start >= end {
            return Cow::Borrowed(&[]);
        }
        let inner = &text[start..end];
        let escape = self.config.escape_char;
        let quote = self.config.quote_char;

        let needs_unescape = if escape == quote {
            memchr::memchr(escape, inner).is_some()
        } else {
            inner.windows(2).any(|w| w[0] == escape && w[1] == quote)
        };
        if !needs_unescape {
            return Cow::Borrowed(inner);
        }

        let mut out = Vec::with_capacity(inner.len());
        let mut i = 0;
        while i < inner.len() {
            if inner[i] == escape && i + 1 < inner.len() && inner[i + 1] == quote {
                out.push(quote);
                i += 2;
            } else {
                out.push(inner[i]);
                i += 1;
            }
        }
        Cow::Owned(out)
    }
}
