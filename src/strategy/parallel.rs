// Parallel whole-buffer parsing: find row boundaries with a single-threaded,
// quote-aware scan, then tokenize each row's fields concurrently via rayon.
//
// Grounded on `anonsourabh-RustyCSV`'s `strategy::parallel::parse_csv_parallel`
// (two-phase boundary-then-fields split), generalised from a fixed
// single-byte separator/escape pair to this crate's `TokenizerConfig`
// (arbitrary delimiter/quote/escape/newline/comments) by reusing
// `parser::Tokenizer::tokenize` per row instead of a bespoke field splitter.
// Only usable for a complete in-memory buffer: there is no `step` callback
// to preserve ordering for, and no partial-line carry-over to manage.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::parser::{Tokenizer, TokenizerConfig};
use crate::streamer::Flags;

/// Phase 1: scan `text` once, quote-aware, recording the byte offset each
/// row starts at. A quoted field's contents (including embedded
/// delimiters/newlines) are skipped rather than interpreted, since all
/// that's needed here is "where does the next row begin" — field-level
/// escaping is handled later, per row, by the tokenizer.
fn find_row_starts(text: &[u8], quote_char: u8, escape_char: u8) -> Vec<usize> {
    let mut starts = vec![0usize];
    let mut pos = 0usize;
    let mut in_quotes = false;

    while pos < text.len() {
        let byte = text[pos];
        if in_quotes {
            if byte == escape_char && pos + 1 < text.len() && text[pos + 1] == quote_char {
                pos += 2;
                continue;
            }
            if byte == quote_char {
                in_quotes = false;
            }
            pos += 1;
        } else if byte == quote_char {
            in_quotes = true;
            pos += 1;
        } else if byte == b'\n' {
            pos += 1;
            if pos < text.len() {
                starts.push(pos);
            }
        } else if byte == b'\r' {
            pos += 1;
            if pos < text.len() && text[pos] == b'\n' {
                pos += 1;
            }
            if pos < text.len() {
                starts.push(pos);
            }
        } else {
            pos += 1;
        }
    }
    starts
}

/// Tokenize `text` by splitting it into row ranges (single-threaded,
/// quote-aware) and then running `Tokenizer::tokenize` on each range in
/// parallel. Row order is preserved: rayon's `into_par_iter` over a `Vec`
/// is an indexed, order-preserving parallel iterator, and `.collect()`
/// into a `Vec` reassembles results in input order regardless of which
/// thread finished first.
pub fn tokenize_parallel<'a>(
    text: &'a [u8],
    cfg: &TokenizerConfig,
) -> (Vec<Vec<Cow<'a, [u8]>>>, usize) {
    if text.is_empty() {
        return (Vec::new(), 0);
    }

    let starts = find_row_starts(text, cfg.quote_char, cfg.escape_char);
    let ranges: Vec<(usize, usize)> = starts
        .windows(2)
        .map(|w| (w[0], w[1]))
        .chain(std::iter::once((*starts.last().unwrap(), text.len())))
        .collect();

    let flags = Flags::default();
    let rows: Vec<Vec<Cow<'a, [u8]>>> = ranges
        .into_par_iter()
        .flat_map(|(start, end)| {
            let tokenizer = Tokenizer::new(cfg.clone());
            let outcome = tokenizer.tokenize(&text[start..end], 0, false, &flags);
            outcome.rows.into_par_iter()
        })
        .collect();

    (rows, text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_rows_match_sequential_order() {
        let cfg = TokenizerConfig::default();
        let (rows, cursor) = tokenize_parallel(b"a,b,c\n1,2,3\n", &cfg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].as_ref(), b"a");
        assert_eq!(rows[1][2].as_ref(), b"3");
        assert_eq!(cursor, 12);
    }

    #[test]
    fn quoted_field_with_embedded_newline_stays_one_row() {
        let cfg = TokenizerConfig::default();
        let (rows, _) = tokenize_parallel(b"a,\"line1\nline2\",c\nd,e,f\n", &cfg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].as_ref(), b"line1\nline2");
    }

    #[test]
    fn no_trailing_newline_still_emits_last_row() {
        let cfg = TokenizerConfig::default();
        let (rows, _) = tokenize_parallel(b"a,b\nc,d", &cfg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1].as_ref(), b"d");
    }

    #[test]
    fn many_rows_preserve_order() {
        let mut input = Vec::new();
        for i in 0..500 {
            input.extend_from_slice(format!("{i},{},{}\n", i + 1, i + 2).as_bytes());
        }
        let cfg = TokenizerConfig::default();
        let (rows, _) = tokenize_parallel(&input, &cfg);
        assert_eq!(rows.len(), 500);
        assert_eq!(rows[0][0].as_ref(), b"0");
        assert_eq!(rows[499][0].as_ref(), b"499");
    }

    #[test]
    fn empty_input_yields_no_rows() {
        let cfg = TokenizerConfig::default();
        let (rows, cursor) = tokenize_parallel(b"", &cfg);
        assert!(rows.is_empty());
        assert_eq!(cursor, 0);
    }
}
