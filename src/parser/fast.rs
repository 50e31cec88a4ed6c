// Fast-mode: a direct delimiter/newline splitter used when the text
// window is known not to contain the quote character. Must produce
// identical output to the state machine for that case — it simply can't
// handle quoted fields, which by construction aren't present.
//
// Grounded on the teacher's `strategy::direct` parsing (byte-by-byte scan,
// `Cow`-based field borrowing) with the quote-handling branches removed,
// since fast mode's entire reason to exist is skipping that machinery.

use std::borrow::Cow;

use super::TokenizerConfig;

/// Split `text` into rows of borrowed fields using only `delimiter` and
/// newline recognition — no quote awareness. Caller must have already
/// verified the window contains no `quote_char` (or that fast mode was
/// explicitly forced).
pub fn split_fast<'a>(
    text: &'a [u8],
    cfg: &TokenizerConfig,
    base_index: usize,
    ignore_last_row: bool,
) -> (Vec<Vec<Cow<'a, [u8]>>>, usize) {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut pos = 0usize;
    let mut field_start = 0usize;
    let mut last_row_end = 0usize;
    let mut at_row_start = true;

    let newline_len = |text: &[u8], pos: usize| -> usize {
        if let Some(pattern) = &cfg.newline {
            if text[pos..].starts_with(pattern.as_slice()) {
                return pattern.len();
            }
            0
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
    };

    while pos < text.len() {
        if at_row_start && row.is_empty() && field_start == pos {
            if let Some(prefix) = &cfg.comments {
                if text[pos..].starts_with(prefix.as_slice()) {
                    while pos < text.len() && newline_len(text, pos) == 0 {
                        pos += 1;
                    }
                    let nl = newline_len(text, pos);
                    pos += nl;
                    last_row_end = pos;
                    field_start = pos;
                    at_row_start = true;
                    continue;
                }
            }
        }

        let byte = text[pos];
        if byte == cfg.delimiter {
            row.push(Cow::Borrowed(&text[field_start..pos]));
            pos += 1;
            field_start = pos;
            at_row_start = false;
        } else {
            let nl = newline_len(text, pos);
            if nl > 0 {
                row.push(Cow::Borrowed(&text[field_start..pos]));
                pos += nl;
                rows.push(std::mem::take(&mut row));
                last_row_end = pos;
                field_start = pos;
                at_row_start = true;
                if cfg.preview > 0 && rows.len() >= cfg.preview {
                    return (rows, base_index + last_row_end);
                }
            } else {
                pos += 1;
                at_row_start = false;
            }
        }
    }

    // Mirrors the state-machine tokenizer: when `ignore_last_row` is set,
    // the whole in-progress row, including fields already closed off by a
    // delimiter, is deferred to the next chunk, not just the still-open
    // trailing field. `last_row_end` stays at the last fully terminated
    // row boundary set inside the loop above.
    if !ignore_last_row && (field_start < pos || !row.is_empty()) {
        row.push(Cow::Borrowed(&text[field_start..pos]));
        rows.push(row);
        last_row_end = pos;
    }

    (rows, base_index + last_row_end)
}
