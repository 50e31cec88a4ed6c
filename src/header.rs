// HeaderTyper (H): wraps the Tokenizer, applies delimiter/newline
// guessing on first use, projects rows into header-named or positional
// records, and runs the dynamic-typing coercion pipeline.
//
// Grounded on `anonsourabh-RustyCSV`'s own layering (a strategy module
// wrapped by a thin decode/dispatch layer in `lib.rs`) generalised from
// "decode NIF term, dispatch to strategy, re-encode term" to "decode
// `Config`, dispatch to `Tokenizer`, project into `Row`". The
// per-field predicate memoisation table is grounded on REDESIGN FLAGS
// §9 ("Dynamic-typing function memoisation keyed by field: a per-parse
// map, populated on first use").

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::bytes::Regex as BytesRegex;

use crate::config::{Comments, Config, DynamicTyping, SkipEmptyLines};
use crate::core::Newlines;
use crate::error::ParseError;
use crate::heuristics;
use crate::model::{FieldKey, Meta, ParseResult, Row, Value, PARSED_EXTRA_KEY};
use crate::parser::{fast, Tokenizer, TokenizerConfig};
use crate::streamer::Flags;

/// Matches a JSON-style number, full-string. `1e10`, `-3.5`, `42` all match;
/// `1,000` and `abc` don't.
static NUMERIC_RE: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r"^-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?$").unwrap()
});

/// Strict ISO-8601 timestamp, full-string: date, optional time-of-day with
/// optional fractional seconds and offset/`Z`.
static ISO8601_RE: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(
        r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?)?$",
    )
    .unwrap()
});

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0; // 2^53 - 1

/// Per-parse state carried across successive `HeaderTyper::parse` calls
/// (one call per chunk): the header row, disambiguation map, and the
/// dynamic-typing predicate memo. Everything else in `Config` is
/// immutable for the life of the parse.
pub struct HeaderTyper {
    pub config: Config,
    tokenizer: Option<Tokenizer>,
    effective_delimiter: Option<u8>,
    effective_newline: Option<Newlines>,
    header: Option<Vec<String>>,
    renamed_headers: HashMap<String, String>,
    predicate_memo: HashMap<FieldKey, bool>,
    total_rows_seen: usize,
    bom_stripped: bool,
}

impl HeaderTyper {
    pub fn new(config: Config) -> Self {
        let effective_delimiter = config.delimiter;
        let effective_newline = config.newline.clone();
        HeaderTyper {
            config,
            tokenizer: None,
            effective_delimiter,
            effective_newline,
            header: None,
            renamed_headers: HashMap::new(),
            predicate_memo: HashMap::new(),
            total_rows_seen: 0,
            bom_stripped: false,
        }
    }

    pub fn effective_delimiter(&self) -> u8 {
        self.effective_delimiter.unwrap_or(b',')
    }

    /// `H.parse(text, baseIndex, ignoreLastRow)`: drive the tokenizer once
    /// over `text`, then project into named/positional rows with typing.
    pub fn parse(
        &mut self,
        mut text: &[u8],
        mut base_index: usize,
        ignore_last_row: bool,
        flags: &Flags,
    ) -> ParseResult {
        let mut leading_bom = false;
        if base_index == 0 && !self.bom_stripped {
            let (stripped, had_bom) = heuristics::strip_bom(text);
            if had_bom {
                text = stripped;
                base_index += crate::config::BYTE_ORDER_MARK.len_utf8();
                leading_bom = true;
            }
            self.bom_stripped = true;
        }

        let skip_empty = !matches!(self.config.skip_empty_lines, SkipEmptyLines::False);

        let mut delimiter_guess_error = None;
        if self.effective_delimiter.is_none() {
            let guess = heuristics::guess_delimiter_with_candidates(
                text,
                skip_empty,
                &self.config.delimiters_to_guess,
            );
            self.effective_delimiter = Some(guess.delimiter);
            delimiter_guess_error = guess.error;
        }
        if self.effective_newline.is_none() {
            let pattern = heuristics::guess_newline(text, self.config.quote_char);
            self.effective_newline = Some(Newlines::custom(vec![pattern]));
        }

        let delimiter = self.effective_delimiter();
        let newline_pattern = self
            .effective_newline
            .as_ref()
            .and_then(|nl| nl.patterns.first().cloned());
        let comments = self.config.comments.resolve(delimiter);

        let tok_cfg = TokenizerConfig {
            delimiter,
            quote_char: self.config.quote_char,
            escape_char: self.config.escape_char,
            newline: newline_pattern.clone(),
            comments,
            preview: self.config.preview,
        };

        let use_fast = self
            .config
            .fast_mode
            .unwrap_or_else(|| !memchr::memchr(self.config.quote_char, text).is_some());

        let (raw_rows, cursor, tok_errors) = if use_fast {
            let (rows, cursor) = fast::split_fast(text, &tok_cfg, base_index, ignore_last_row);
            (rows, cursor, Vec::new())
        } else {
            let tokenizer = self
                .tokenizer
                .get_or_insert_with(|| Tokenizer::new(tok_cfg.clone()));
            tokenizer.config = tok_cfg.clone();
            let outcome = tokenizer.tokenize(text, base_index, ignore_last_row, flags);
            (outcome.rows, outcome.cursor, outcome.errors)
        };

        let mut errors: Vec<ParseError> = tok_errors;
        if let Some(e) = delimiter_guess_error {
            errors.push(e);
        }

        self.project_rows(raw_rows, leading_bom, delimiter, newline_pattern, cursor, errors)
    }

    /// Project already-tokenized rows (header extraction, dynamic typing,
    /// mismatch detection) and build the `Meta` for this call. Factored out
    /// of `parse` so `parse_whole_parallel` — which tokenizes row ranges
    /// concurrently but must still project them through the same,
    /// sequential, stateful pipeline (header capture, duplicate-count,
    /// per-field predicate memo) — can reuse it.
    fn project_rows(
        &mut self,
        raw_rows: Vec<Vec<Cow<'_, [u8]>>>,
        leading_bom: bool,
        delimiter: u8,
        newline_pattern: Option<Vec<u8>>,
        cursor: usize,
        mut errors: Vec<ParseError>,
    ) -> ParseResult {
        let mut rows = Vec::with_capacity(raw_rows.len());

        for raw_row in raw_rows {
            let row_index = self.total_rows_seen;
            self.total_rows_seen += 1;

            let is_empty_row = raw_row.len() == 1 && raw_row[0].is_empty();
            if is_empty_row {
                match self.config.skip_empty_lines {
                    SkipEmptyLines::False => {}
                    SkipEmptyLines::True | SkipEmptyLines::Greedy => continue,
                }
            }

            let strings: Vec<String> = raw_row
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();

            if self.config.header && self.header.is_none() {
                self.header = Some(self.build_header(strings, leading_bom && row_index == 0));
                continue;
            }

            let row = if let Some(header) = self.header.clone() {
                self.project_named_row(strings, &header, row_index, &mut errors)
            } else {
                Row::Positional(
                    strings
                        .into_iter()
                        .enumerate()
                        .map(|(i, s)| self.type_value(s, &FieldKey::Index(i)))
                        .collect(),
                )
            };
            rows.push(row);
        }

        let meta = Meta {
            delimiter: (delimiter as char).to_string(),
            linebreak: String::from_utf8_lossy(
                newline_pattern.as_deref().unwrap_or(b"\n"),
            )
            .into_owned(),
            aborted: false,
            truncated: false,
            cursor,
            fields: self.header.clone(),
            renamed_headers: self.renamed_headers.clone(),
        };

        ParseResult { rows, errors, meta }
    }

    /// `parse_parallel`'s entry point: guess delimiter/newline exactly as
    /// `parse` would (single-threaded, over the whole buffer), find row
    /// boundaries with a quote-aware scan, tokenize each row's fields
    /// concurrently via rayon, then project the (order-preserved) results
    /// through the same sequential pipeline `parse` uses. Only valid for a
    /// whole in-memory buffer — there is no partial-line carry-over here.
    pub fn parse_whole_parallel(&mut self, mut text: &[u8]) -> ParseResult {
        let (stripped, had_bom) = heuristics::strip_bom(text);
        let leading_bom = had_bom;
        if had_bom {
            text = stripped;
        }

        let skip_empty = !matches!(self.config.skip_empty_lines, SkipEmptyLines::False);

        let mut delimiter_guess_error = None;
        if self.effective_delimiter.is_none() {
            let guess = heuristics::guess_delimiter_with_candidates(
                text,
                skip_empty,
                &self.config.delimiters_to_guess,
            );
            self.effective_delimiter = Some(guess.delimiter);
            delimiter_guess_error = guess.error;
        }
        if self.effective_newline.is_none() {
            let pattern = heuristics::guess_newline(text, self.config.quote_char);
            self.effective_newline = Some(Newlines::custom(vec![pattern]));
        }

        let delimiter = self.effective_delimiter();
        let newline_pattern = self
            .effective_newline
            .as_ref()
            .and_then(|nl| nl.patterns.first().cloned());
        let comments = self.config.comments.resolve(delimiter);

        let tok_cfg = TokenizerConfig {
            delimiter,
            quote_char: self.config.quote_char,
            escape_char: self.config.escape_char,
            newline: newline_pattern.clone(),
            comments,
            preview: 0, // preview isn't meaningful once row order is decided up front
        };

        let (raw_rows, cursor) = crate::strategy::parallel::tokenize_parallel(text, &tok_cfg);

        let mut errors = Vec::new();
        if let Some(e) = delimiter_guess_error {
            errors.push(e);
        }

        self.project_rows(raw_rows, leading_bom, delimiter, newline_pattern, cursor, errors)
    }

    fn build_header(&mut self, mut names: Vec<String>, strip_first_bom: bool) -> Vec<String> {
        if strip_first_bom {
            if let Some(first) = names.first_mut() {
                if let Some(stripped) = first.strip_prefix(crate::config::BYTE_ORDER_MARK) {
                    *first = stripped.to_string();
                }
            }
        }
        if let Some(transform) = &self.config.transform_header {
            for (i, name) in names.iter_mut().enumerate() {
                *name = transform(name, i);
            }
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut result = Vec::with_capacity(names.len());
        for name in names {
            let count = seen.entry(name.clone()).or_insert(0);
            if *count == 0 {
                *count += 1;
                result.push(name);
            } else {
                let mut candidate = format!("{name}_{count}");
                while seen.contains_key(&candidate) {
                    *count += 1;
                    candidate = format!("{name}_{count}");
                }
                *count += 1;
                self.renamed_headers.insert(candidate.clone(), name);
                seen.insert(candidate.clone(), 1);
                result.push(candidate);
            }
        }
        result
    }

    fn project_named_row(
        &mut self,
        strings: Vec<String>,
        header: &[String],
        row_index: usize,
        errors: &mut Vec<ParseError>,
    ) -> Row {
        let mut map = HashMap::with_capacity(header.len());
        let mut extra = Vec::new();

        for (i, value) in strings.into_iter().enumerate() {
            if let Some(name) = header.get(i) {
                let typed = self.type_value(value, &FieldKey::Name(name.clone()));
                map.insert(name.clone(), typed);
            } else {
                extra.push(Value::String(value));
            }
        }

        if !extra.is_empty() {
            errors.push(ParseError::too_many_fields(row_index));
            map.insert(
                PARSED_EXTRA_KEY.to_string(),
                Value::String(
                    serde_json::to_string(
                        &extra
                            .iter()
                            .map(|v| v.to_display_string())
                            .collect::<Vec<_>>(),
                    )
                    .unwrap_or_default(),
                ),
            );
        }
        if map.len() < header.len() && extra.is_empty() {
            errors.push(ParseError::too_few_fields(row_index));
            for name in header {
                map.entry(name.clone()).or_insert(Value::String(String::new()));
            }
        }

        Row::Named(map)
    }

    /// §4.2 dynamic typing pipeline, applied after `transform` and after
    /// header naming.
    fn type_value(&mut self, raw: String, key: &FieldKey) -> Value {
        let transformed = match &self.config.transform {
            Some(f) => f(&raw, key),
            None => raw,
        };

        let enabled = match &self.config.dynamic_typing {
            DynamicTyping::Disabled => false,
            DynamicTyping::Enabled => true,
            DynamicTyping::PerField(_) => self.config.dynamic_typing.enabled_for(key),
            DynamicTyping::Predicate(predicate) => {
                if let Some(&cached) = self.predicate_memo.get(key) {
                    cached
                } else {
                    let result = predicate(&transformed, key);
                    self.predicate_memo.insert(key.clone(), result);
                    result
                }
            }
        };

        if !enabled {
            return Value::String(transformed);
        }
        coerce(&transformed)
    }
}

/// The dynamic-typing coercion order from §4.2, steps 2-6 (step 1,
/// "disabled", is handled by the caller before this is reached).
fn coerce(s: &str) -> Value {
    match s {
        "true" | "TRUE" => return Value::Boolean(true),
        "false" | "FALSE" => return Value::Boolean(false),
        _ => {}
    }
    if NUMERIC_RE.is_match(s.as_bytes()) {
        if let Ok(n) = s.parse::<f64>() {
            if n.abs() <= MAX_SAFE_INTEGER {
                return Value::Number(n);
            }
        }
    }
    if ISO8601_RE.is_match(s.as_bytes()) {
        return Value::Timestamp(s.to_string());
    }
    if s.is_empty() {
        return Value::Null;
    }
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> Flags {
        Flags::default()
    }

    #[test]
    fn positional_rows_without_header() {
        let mut h = HeaderTyper::new(Config::default());
        let result = h.parse(b"a,b,c\nd,e,f\n", 0, false, &flags());
        assert_eq!(result.rows.len(), 2);
        assert!(matches!(result.rows[0], Row::Positional(_)));
        assert_eq!(result.meta.delimiter, ",");
    }

    #[test]
    fn header_projection_and_typing() {
        let cfg = Config {
            header: true,
            dynamic_typing: DynamicTyping::Enabled,
            ..Config::default()
        };
        let mut h = HeaderTyper::new(cfg);
        let result = h.parse(b"A,B,C\r\n1,2,3", 0, false, &flags());
        assert_eq!(result.rows.len(), 1);
        match &result.rows[0] {
            Row::Named(map) => {
                assert_eq!(map.get("A"), Some(&Value::Number(1.0)));
                assert_eq!(map.get("B"), Some(&Value::Number(2.0)));
            }
            _ => panic!("expected named row"),
        }
        assert_eq!(result.meta.fields, Some(vec!["A".into(), "B".into(), "C".into()]));
    }

    #[test]
    fn duplicate_headers_are_disambiguated() {
        let cfg = Config {
            header: true,
            ..Config::default()
        };
        let mut h = HeaderTyper::new(cfg);
        let result = h.parse(b"a,a,a\n1,2,3\n", 0, false, &flags());
        let fields = result.meta.fields.unwrap();
        assert_eq!(fields, vec!["a", "a_1", "a_2"]);
        assert_eq!(result.meta.renamed_headers.get("a_1"), Some(&"a".to_string()));
    }

    #[test]
    fn too_many_fields_bucketed_in_parsed_extra() {
        let cfg = Config {
            header: true,
            ..Config::default()
        };
        let mut h = HeaderTyper::new(cfg);
        let result = h.parse(b"a,b\n1,2,3,4\n", 0, false, &flags());
        assert_eq!(result.errors.len(), 1);
        match &result.rows[0] {
            Row::Named(map) => assert!(map.contains_key(PARSED_EXTRA_KEY)),
            _ => panic!(),
        }
    }

    #[test]
    fn too_few_fields_fills_empty_string() {
        let cfg = Config {
            header: true,
            ..Config::default()
        };
        let mut h = HeaderTyper::new(cfg);
        let result = h.parse(b"a,b,c\n1,2\n", 0, false, &flags());
        assert_eq!(result.errors.len(), 1);
        match &result.rows[0] {
            Row::Named(map) => assert_eq!(map.get("c"), Some(&Value::String(String::new()))),
            _ => panic!(),
        }
    }

    #[test]
    fn dynamic_typing_null_and_timestamp() {
        let cfg = Config {
            dynamic_typing: DynamicTyping::Enabled,
            ..Config::default()
        };
        let mut h = HeaderTyper::new(cfg);
        let result = h.parse(b",2024-01-02T03:04:05Z\n", 0, false, &flags());
        match &result.rows[0] {
            Row::Positional(v) => {
                assert_eq!(v[0], Value::Null);
                assert_eq!(v[1], Value::Timestamp("2024-01-02T03:04:05Z".into()));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn delimiter_guessed_when_unset() {
        let mut h = HeaderTyper::new(Config::default());
        let result = h.parse(b"a;b;c\nd;e;f\n", 0, false, &flags());
        assert_eq!(result.meta.delimiter, ";");
    }

    #[test]
    fn undetectable_delimiter_surfaces_as_error() {
        let mut h = HeaderTyper::new(Config::default());
        let result = h.parse(b"", 0, false, &flags());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, crate::error::ErrorCode::UndetectableDelimiter);
        assert_eq!(result.meta.delimiter, ",");
    }

    #[test]
    fn undetectable_delimiter_guessed_once_per_parse() {
        // The guess only runs on the first chunk; later chunks reuse the
        // already-decided delimiter and must not re-report the warning.
        let mut h = HeaderTyper::new(Config::default());
        let first = h.parse(b"", 0, true, &flags());
        assert_eq!(first.errors.len(), 1);
        let second = h.parse(b"a\n", 0, false, &flags());
        assert!(second.errors.is_empty());
    }

    #[test]
    fn parallel_whole_buffer_matches_sequential() {
        let input = b"a,\"b,c\",d\ne,f,g\n";
        let mut sequential = HeaderTyper::new(Config::default());
        let seq_result = sequential.parse(input, 0, false, &flags());

        let mut parallel = HeaderTyper::new(Config::default());
        let par_result = parallel.parse_whole_parallel(input);

        assert_eq!(par_result.rows, seq_result.rows);
        assert_eq!(par_result.meta.delimiter, seq_result.meta.delimiter);
    }

    #[test]
    fn parallel_whole_buffer_with_header_and_typing() {
        let cfg = Config {
            header: true,
            dynamic_typing: DynamicTyping::Enabled,
            ..Config::default()
        };
        let mut h = HeaderTyper::new(cfg);
        let result = h.parse_whole_parallel(b"A,B\r\n1,2\r\n3,4\r\n");
        assert_eq!(result.rows.len(), 2);
        match &result.rows[0] {
            Row::Named(map) => assert_eq!(map.get("A"), Some(&Value::Number(1.0))),
            _ => panic!("expected named row"),
        }
    }
}
