// Heuristics (X): stateless delimiter guessing, line-ending guessing, and
// BOM stripping.
//
// Grounded on `thaliaarchi-git-transform-repo` and `jqnatividad-csv-nose`
// for the precompiled-regex approach to scanning (REDESIGN FLAGS §9:
// "precompile once, expose as constants" for the ISO-date/numeric/quoted-
// region matchers the line-ending guess needs).

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::config::DEFAULT_DELIMITERS_TO_GUESS;
use crate::error::ParseError;

/// Up to this many bytes of the window are scanned for line-ending guessing.
const NEWLINE_GUESS_WINDOW: usize = 1024 * 1024;
/// Up to this many rows of the preview window are used for delimiter guessing.
const DELIMITER_GUESS_MAX_ROWS: usize = 10;

/// Result of `guess_delimiter`.
pub struct DelimiterGuess {
    pub delimiter: u8,
    pub error: Option<ParseError>,
}

/// §4.3: try each candidate in `delimiters_to_guess` over up to the first
/// `DELIMITER_GUESS_MAX_ROWS` rows, scoring by average field count and the
/// sum of absolute deltas between consecutive non-empty rows. Smallest
/// delta wins; ties broken by higher average; average must exceed 1.99 or
/// the guess fails and falls back to `,` with an `UndetectableDelimiter`
/// warning.
pub fn guess_delimiter(text: &[u8], skip_empty_lines: bool) -> DelimiterGuess {
    guess_delimiter_with_candidates(text, skip_empty_lines, DEFAULT_DELIMITERS_TO_GUESS)
}

pub fn guess_delimiter_with_candidates(
    text: &[u8],
    skip_empty_lines: bool,
    candidates: &[u8],
) -> DelimiterGuess {
    let preview = first_n_lines(text, DELIMITER_GUESS_MAX_ROWS);

    let mut best: Option<(u8, f64, f64)> = None; // (delimiter, delta, avg)
    for &candidate in candidates {
        let counts = naive_field_counts(preview, candidate, skip_empty_lines);
        if counts.is_empty() {
            continue;
        }
        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let delta: f64 = counts
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64).abs())
            .sum();

        let better = match &best {
            None => true,
            Some((_, best_delta, best_avg)) => {
                delta < *best_delta || (delta == *best_delta && avg > *best_avg)
            }
        };
        if better {
            best = Some((candidate, delta, avg));
        }
    }

    match best {
        Some((delimiter, _, avg)) if avg > 1.99 => DelimiterGuess {
            delimiter,
            error: None,
        },
        _ => DelimiterGuess {
            delimiter: b',',
            error: Some(ParseError::undetectable_delimiter()),
        },
    }
}

fn first_n_lines(text: &[u8], n: usize) -> &[u8] {
    let mut count = 0;
    let mut pos = 0;
    while pos < text.len() && count < n {
        match memchr::memchr(b'\n', &text[pos..]) {
            Some(off) => {
                pos += off + 1;
                count += 1;
            }
            None => {
                pos = text.len();
                break;
            }
        }
    }
    &text[..pos.min(text.len())]
}

/// Field counts per non-empty line, splitting naively on `delimiter`
/// (quote-unaware — the guess is a heuristic, not a parse).
fn naive_field_counts(text: &[u8], delimiter: u8, skip_empty_lines: bool) -> Vec<usize> {
    text.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !(skip_empty_lines && line.is_empty()))
        .map(|line| line.split(|&b| b == delimiter).count())
        .collect()
}

/// Regex matching the contents of a `"`-quoted field, for stripping quoted
/// regions before the line-ending guess scans for bare `\r`/`\n`. Built
/// per call since the quote character is configurable; a fixed-quote-char
/// fast path is cached below for the overwhelmingly common `"` case.
fn quoted_region_regex(quote_char: u8) -> Regex {
    let q = regex::escape(&(quote_char as char).to_string());
    Regex::new(&format!(r#"(?s){q}[^{q}]*{q}"#)).expect("quoted-region regex is well-formed")
}

static DEFAULT_QUOTED_REGION: LazyLock<Regex> = LazyLock::new(|| quoted_region_regex(b'"'));

fn strip_quoted_regions(text: &[u8], quote_char: u8) -> Vec<u8> {
    let re = if quote_char == b'"' {
        &*DEFAULT_QUOTED_REGION
    } else {
        &quoted_region_regex(quote_char)
    };
    re.replace_all(text, &b""[..]).into_owned()
}

/// §4.3: analyse up to the first `NEWLINE_GUESS_WINDOW` bytes, stripping
/// quoted regions first. No `\r` → `\n`. `\n` before the first `\r` → `\n`.
/// At least half of the segments following `\r` start with `\n` → `\r\n`,
/// otherwise `\r`.
pub fn guess_newline(text: &[u8], quote_char: u8) -> Vec<u8> {
    let window = &text[..text.len().min(NEWLINE_GUESS_WINDOW)];
    let stripped = strip_quoted_regions(window, quote_char);

    let first_cr = memchr::memchr(b'\r', &stripped);
    let first_lf = memchr::memchr(b'\n', &stripped);

    match (first_cr, first_lf) {
        (None, _) => b"\n".to_vec(),
        (Some(cr), Some(lf)) if lf < cr => b"\n".to_vec(),
        (Some(_), _) => {
            let segments: Vec<&[u8]> = stripped.split(|&b| b == b'\r').skip(1).collect();
            if segments.is_empty() {
                return b"\r".to_vec();
            }
            let starting_with_lf = segments
                .iter()
                .filter(|seg| seg.first() == Some(&b'\n'))
                .count();
            if starting_with_lf * 2 >= segments.len() {
                b"\r\n".to_vec()
            } else {
                b"\r".to_vec()
            }
        }
    }
}

/// §4.3: strip a leading U+FEFF byte-order mark. Returns the stripped
/// slice and whether a BOM was present (the caller needs this to also
/// strip a BOM that leaked into header column 0, if header column 0 was
/// sourced from byte 0 of the original, un-stripped buffer).
pub fn strip_bom(text: &[u8]) -> (&[u8], bool) {
    const BOM: &[u8] = "\u{FEFF}".as_bytes();
    if let Some(stripped) = text.strip_prefix(BOM) {
        (stripped, true)
    } else {
        (text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_comma() {
        let g = guess_delimiter(b"a,b,c\nd,e,f\ng,h,i\n", false);
        assert_eq!(g.delimiter, b',');
        assert!(g.error.is_none());
    }

    #[test]
    fn guesses_semicolon() {
        let g = guess_delimiter(b"a;b;c\nd;e;f\n", false);
        assert_eq!(g.delimiter, b';');
    }

    #[test]
    fn guesses_tab() {
        let g = guess_delimiter(b"a\tb\tc\nd\te\tf\n", false);
        assert_eq!(g.delimiter, b'\t');
    }

    #[test]
    fn falls_back_to_comma_on_empty_input() {
        let g = guess_delimiter(b"", false);
        assert_eq!(g.delimiter, b',');
        assert!(g.error.is_some());
    }

    #[test]
    fn falls_back_on_single_column_data() {
        let g = guess_delimiter(b"a\nb\nc\n", false);
        assert_eq!(g.delimiter, b',');
        assert!(g.error.is_some());
    }

    #[test]
    fn newline_guess_lf_only() {
        assert_eq!(guess_newline(b"a,b\nc,d\n", b'"'), b"\n");
    }

    #[test]
    fn newline_guess_crlf() {
        assert_eq!(guess_newline(b"a,b\r\nc,d\r\n", b'"'), b"\r\n");
    }

    #[test]
    fn newline_guess_bare_cr() {
        assert_eq!(guess_newline(b"a,b\rc,d\r", b'"'), b"\r");
    }

    #[test]
    fn newline_guess_ignores_cr_inside_quotes() {
        let input = b"a,\"line1\rline2\"\nc,d\n";
        assert_eq!(guess_newline(input, b'"'), b"\n");
    }

    #[test]
    fn strip_bom_present() {
        let input = "\u{FEFF}a,b".as_bytes();
        let (stripped, had_bom) = strip_bom(input);
        assert!(had_bom);
        assert_eq!(stripped, b"a,b");
    }

    #[test]
    fn strip_bom_absent() {
        let (stripped, had_bom) = strip_bom(b"a,b");
        assert!(!had_bom);
        assert_eq!(stripped, b"a,b");
    }
}
