// ChunkStreamer (C): drives repeated `HeaderTyper::parse` calls over
// successive chunks from an adapter, handling partial-line carry-over,
// pause/abort, preview cutoff, and result dispatch to a `Sink`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{Config, InputEncoding};
use crate::header::HeaderTyper;
use crate::model::{ParseResult, Row};

/// Cooperative pause/abort signal shared between a streamer and whatever
/// holds a handle to it. Checked once per tokenizer loop iteration so a
/// pause or abort takes effect within one scan step, not one chunk.
#[derive(Default)]
pub struct Flags {
    paused: AtomicBool,
    aborted: AtomicBool,
}

impl Flags {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }
}

/// A capability handle to a streamer's pause/abort flags, handed to
/// callers (e.g. a `Sink::on_row` implementation) who should be able to
/// halt the parse without holding the streamer itself.
pub struct ParserHandle<'a> {
    flags: &'a Flags,
}

impl<'a> ParserHandle<'a> {
    pub fn new(flags: &'a Flags) -> Self {
        ParserHandle { flags }
    }

    pub fn pause(&self) {
        self.flags.pause();
    }

    pub fn resume(&self) {
        self.flags.resume();
    }

    pub fn abort(&self) {
        self.flags.abort();
    }
}

/// Callback surface a streaming consumer implements. Every method has a
/// no-op default so a consumer only needs to override what it cares
/// about (most implement only `on_row` or only `on_chunk`).
pub trait Sink {
    fn on_row(&mut self, _row: &crate::model::Row, _handle: &ParserHandle<'_>) {}
    fn on_chunk(&mut self, _result: &ParseResult, _handle: &ParserHandle<'_>) {}
    fn on_complete(&mut self, _result: &ParseResult) {}
    fn on_error(&mut self, _error: &crate::error::FatalError) {}
}

/// Per-stream mutable state carried across chunks, mirroring the
/// `parseChunk` closure's captured variables.
#[derive(Default)]
struct StreamerState {
    partial_line: Vec<u8>,
    base_index: usize,
    row_count: usize,
    is_first_chunk: bool,
    finished: bool,
    halted: bool,
    /// Rows already tokenized (this chunk's scan ran to completion) but
    /// not yet dispatched to the sink, because `handle.pause()` fired
    /// partway through delivering them. Drained before any new chunk's
    /// rows are dispatched once `resume()` lifts the pause.
    pending_rows: VecDeque<Row>,
}

/// Drives `HeaderTyper::parse` over a sequence of chunks handed to
/// `feed`, accumulating (or streaming, via a `Sink`) the result.
pub struct ChunkStreamer {
    typer: HeaderTyper,
    state: StreamerState,
    flags: Flags,
    complete_results: ParseResult,
}

impl ChunkStreamer {
    pub fn new(config: Config) -> Self {
        ChunkStreamer {
            typer: HeaderTyper::new(config),
            state: StreamerState {
                is_first_chunk: true,
                ..StreamerState::default()
            },
            flags: Flags::default(),
            complete_results: ParseResult::default(),
        }
    }

    pub fn handle(&self) -> ParserHandle<'_> {
        ParserHandle::new(&self.flags)
    }

    /// `parseChunk`: feed one chunk of bytes. `is_last` marks the final
    /// chunk of the stream, so any trailing partial line is parsed rather
    /// than carried forward. Returns the rows/errors produced from this
    /// chunk only; `complete_results` (see `finish`) accumulates across
    /// all chunks fed so far.
    pub fn feed(&mut self, chunk: &[u8], is_last: bool, sink: &mut dyn Sink) -> ParseResult {
        // `halted` latches only on abort, which is permanent. A pause is
        // not sticky here: `self.flags.is_paused()` is the live signal, so
        // a `resume()` between calls is visible on the very next `feed`.
        if self.state.finished || self.state.halted {
            return ParseResult::default();
        }

        let handle = ParserHandle::new(&self.flags);

        // Drain rows tokenized on a prior chunk but not yet dispatched,
        // because that chunk's dispatch loop was paused partway through.
        if !self.state.pending_rows.is_empty() {
            while let Some(row) = self.state.pending_rows.pop_front() {
                sink.on_row(&row, &handle);
                if self.flags.is_aborted() || self.flags.is_paused() {
                    break;
                }
            }
            if self.flags.is_aborted() {
                self.state.halted = true;
                self.state.finished = true;
                sink.on_complete(&self.complete_results);
                return ParseResult::default();
            }
            if self.flags.is_paused() {
                // Still can't proceed to new bytes this call.
                return ParseResult::default();
            }
        } else if self.flags.is_paused() {
            return ParseResult::default();
        }

        let skip = if self.state.is_first_chunk {
            self.state.is_first_chunk = false;
            self.typer.config.skip_first_n_lines
        } else {
            0
        };

        let mut text = std::mem::take(&mut self.state.partial_line);
        match self.typer.config.encoding {
            InputEncoding::Utf8 => text.extend_from_slice(chunk),
            InputEncoding::Latin1 => {
                text.extend_from_slice(self.typer.config.encoding.decode(chunk).as_bytes())
            }
        }

        let text = if skip > 0 {
            skip_n_lines(&text, skip)
        } else {
            text
        };

        let ignore_last_row = !is_last;
        let mut result = self
            .typer
            .parse(&text, self.state.base_index, ignore_last_row, &self.flags);

        let consumed = result.meta.cursor - self.state.base_index;
        let leftover = consumed < text.len();
        if !is_last {
            self.state.partial_line = text[consumed.min(text.len())..].to_vec();
        }
        self.state.base_index = result.meta.cursor;
        self.state.row_count += result.rows.len();

        if self.flags.is_aborted() {
            result.meta.aborted = true;
        }

        // §8: preview yields at most `preview` rows and sets
        // `meta.truncated=true` if the input had more — either more bytes
        // left unconsumed in this window, or more chunks still to come.
        let preview = self.typer.config.preview;
        if preview > 0 && self.state.row_count >= preview && (leftover || !is_last) {
            result.meta.truncated = true;
        }

        // Errors and cursor/meta info ride along regardless of delivery
        // pacing; only row dispatch is gated by pause.
        self.complete_results.errors.extend(result.errors.iter().cloned());
        self.complete_results.meta = result.meta.clone();

        let mut delivered = 0;
        for row in &result.rows {
            sink.on_row(row, &handle);
            self.complete_results.rows.push(row.clone());
            delivered += 1;
            if self.flags.is_aborted() || self.flags.is_paused() {
                break;
            }
        }
        if delivered < result.rows.len() {
            self.state
                .pending_rows
                .extend(result.rows[delivered..].iter().cloned());
        }

        let aborted = self.flags.is_aborted();
        let paused = self.flags.is_paused();
        if aborted {
            self.state.halted = true;
        }

        sink.on_chunk(&result, &handle);

        let preview_done = self.typer.config.preview > 0
            && self.state.row_count >= self.typer.config.preview;

        if aborted || (!paused && (is_last || preview_done)) {
            self.state.finished = true;
            sink.on_complete(&self.complete_results);
        }

        result
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Whether the parse is currently paused via `ParserHandle::pause()`.
    /// Push-model adapters consult this to apply backpressure to their
    /// source while a `step`/`chunk` callback holds the parse paused.
    pub fn is_paused(&self) -> bool {
        self.flags.is_paused()
    }

    pub fn into_results(self) -> ParseResult {
        self.complete_results
    }
}

fn skip_n_lines(text: &[u8], n: usize) -> Vec<u8> {
    let mut pos = 0;
    let mut skipped = 0;
    while skipped < n {
        match memchr::memchr(b'\n', &text[pos..]) {
            Some(off) => {
                pos += off + 1;
                skipped += 1;
            }
            None => {
                pos = text.len();
                break;
            }
        }
    }
    text[pos..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    #[derive(Default)]
    struct Collector {
        rows_seen: usize,
        completed: bool,
    }

    impl Sink for Collector {
        fn on_row(&mut self, _row: &Row, _handle: &ParserHandle<'_>) {
            self.rows_seen += 1;
        }
        fn on_complete(&mut self, _result: &ParseResult) {
            self.completed = true;
        }
    }

    #[test]
    fn feeds_single_chunk() {
        let mut streamer = ChunkStreamer::new(Config::default());
        let mut sink = Collector::default();
        streamer.feed(b"a,b\nc,d\n", true, &mut sink);
        assert_eq!(sink.rows_seen, 2);
        assert!(sink.completed);
        assert!(streamer.is_finished());
    }

    #[test]
    fn carries_partial_line_across_chunks() {
        let mut streamer = ChunkStreamer::new(Config::default());
        let mut sink = Collector::default();
        streamer.feed(b"a,b\nc,", false, &mut sink);
        assert_eq!(sink.rows_seen, 1);
        streamer.feed(b"d\n", true, &mut sink);
        assert_eq!(sink.rows_seen, 2);
        assert!(sink.completed);
    }

    #[test]
    fn skip_first_n_lines_on_first_chunk_only() {
        let cfg = Config {
            skip_first_n_lines: 1,
            ..Config::default()
        };
        let mut streamer = ChunkStreamer::new(cfg);
        let mut sink = Collector::default();
        streamer.feed(b"ignored\na,b\n", true, &mut sink);
        assert_eq!(sink.rows_seen, 1);
    }

    #[test]
    fn abort_halts_before_completion() {
        let mut streamer = ChunkStreamer::new(Config::default());
        struct Aborter;
        impl Sink for Aborter {
            fn on_row(&mut self, _row: &Row, handle: &ParserHandle<'_>) {
                handle.abort();
            }
        }
        let mut sink = Aborter;
        let result = streamer.feed(b"a,b\nc,d\n", true, &mut sink);
        assert!(result.meta.aborted);
    }

    #[test]
    fn preview_cutoff_sets_truncated() {
        let cfg = Config {
            preview: 1,
            ..Config::default()
        };
        let mut streamer = ChunkStreamer::new(cfg);
        let mut sink = Collector::default();
        let result = streamer.feed(b"a,b\nc,d\n", true, &mut sink);
        assert_eq!(result.rows.len(), 1);
        assert!(result.meta.truncated);
    }

    #[test]
    fn no_truncation_when_preview_exceeds_row_count() {
        let cfg = Config {
            preview: 5,
            ..Config::default()
        };
        let mut streamer = ChunkStreamer::new(cfg);
        let mut sink = Collector::default();
        let result = streamer.feed(b"a,b\nc,d\n", true, &mut sink);
        assert_eq!(result.rows.len(), 2);
        assert!(!result.meta.truncated);
    }

    #[test]
    fn latin1_chunk_is_decoded_before_tokenizing() {
        use crate::config::InputEncoding;
        let cfg = Config {
            encoding: InputEncoding::Latin1,
            ..Config::default()
        };
        let mut streamer = ChunkStreamer::new(cfg);
        let mut sink = Collector::default();
        // Latin-1 0xE9 is U+00E9 (é), two UTF-8 bytes once decoded.
        let result = streamer.feed(&[b'a', b',', 0xE9, b'\n'], true, &mut sink);
        assert_eq!(result.rows.len(), 1);
        if let crate::model::Row::Positional(fields) = &result.rows[0] {
            assert_eq!(fields[1].to_display_string(), "é");
        } else {
            panic!("expected positional row");
        }
    }
}
