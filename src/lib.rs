// dsvkit: a forgiving, streaming CSV/DSV codec.
//
// No unwrap/expect in production code; fallible paths use `Result` and
// early return. `#[cfg(test)]` modules are exempt.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod adapter;
pub mod config;
pub mod core;
pub mod error;
pub mod header;
pub mod heuristics;
pub mod model;
pub mod parser;
pub mod strategy;
pub mod streamer;
pub mod unparse;

use std::path::PathBuf;

use adapter::duplex::DuplexGate;
use adapter::file::FileAdapter;
use adapter::push::PushAdapter;
use adapter::string::StringAdapter;
use adapter::Adapter;
use config::Config;
use error::FatalError;
use model::ParseResult;
use streamer::{ChunkStreamer, Sink};

pub use config::UnparseConfig;
pub use unparse::{unparse, UnparseInput};

/// A `Sink` that does nothing with rows/chunks as they arrive; used when
/// the caller only wants the accumulated `ParseResult` a synchronous
/// `parse`/`parse_str` call returns, not a streaming callback.
struct NoopSink;
impl Sink for NoopSink {}

/// The input shapes §4.7 dispatches on. `Sentinel` selects the duplex
/// (pipe-mode) adapter and is handled separately by `duplex()`, since it
/// returns a gateway rather than a `ParseResult`.
pub enum Input<'a> {
    /// In-memory text, parsed directly (after BOM strip).
    Str(&'a str),
    /// In-memory bytes, decoded per `Config::encoding` before parsing.
    Bytes(&'a [u8]),
    /// A local path, read in `Config::chunk_size`-byte slices.
    File(PathBuf),
    /// A URL, fetched via HTTP range requests. Requires the `http` feature.
    #[cfg(feature = "http")]
    Url(String),
}

/// §4.7 `parse(input, config)`: select an adapter for `input`'s shape,
/// drive it to completion with a no-op sink, and return the accumulated
/// result. Synchronous — this crate has no worker/isolate runtime, so the
/// `worker` config option from §6 has no effect here; callers wanting
/// streaming callbacks should drive a `ChunkStreamer`/`Adapter` pair
/// directly instead of going through this facade.
pub fn parse(input: Input<'_>, config: Config) -> Result<ParseResult, FatalError> {
    let config = config.normalized();
    let chunk_size = config.chunk_size;
    let mut streamer = ChunkStreamer::new(config);
    let mut sink = NoopSink;

    match input {
        Input::Str(s) => {
            let mut adapter = StringAdapter::new(s.as_bytes().to_vec(), chunk_size);
            adapter.stream(&mut streamer, &mut sink)?;
        }
        Input::Bytes(b) => {
            let mut adapter = StringAdapter::new(b.to_vec(), chunk_size);
            adapter.stream(&mut streamer, &mut sink)?;
        }
        Input::File(path) => {
            let mut adapter = FileAdapter::new(path, chunk_size);
            adapter.stream(&mut streamer, &mut sink)?;
        }
        #[cfg(feature = "http")]
        Input::Url(url) => {
            let mut adapter = adapter::network::NetworkAdapter::new(url, chunk_size);
            adapter.stream(&mut streamer, &mut sink)?;
        }
    }

    Ok(streamer.into_results())
}

/// Convenience entry for the overwhelmingly common case: parse an
/// in-memory string synchronously. Never fails — a string source has no
/// transport to fail; row-level problems ride in `ParseResult::errors`.
pub fn parse_str(input: &str, config: Config) -> ParseResult {
    let config = config.normalized();
    let mut streamer = ChunkStreamer::new(config);
    let mut sink = NoopSink;
    streamer.feed(input.as_bytes(), true, &mut sink);
    streamer.into_results()
}

/// Opt-in acceleration path for whole-buffer, in-memory parses: row
/// boundaries are found with a single-threaded quote-aware scan, then each
/// row's fields are tokenized concurrently across a rayon thread pool.
/// There is no streaming, no partial-line carry-over, and no `step`
/// callback — only a call that needs all rows together, with no ordering
/// dependency between how they're produced, benefits from this over
/// `parse_str`.
pub fn parse_parallel(input: &str, config: Config) -> ParseResult {
    let config = config.normalized();
    let mut typer = header::HeaderTyper::new(config);
    typer.parse_whole_parallel(input.as_bytes())
}

/// Drive a parse with a caller-supplied `Sink`, for callers who want
/// per-row/per-chunk callbacks (`Sink::on_row`/`on_chunk`) instead of only
/// the final accumulated result.
pub fn parse_with_sink(input: Input<'_>, config: Config, sink: &mut dyn Sink) -> Result<ParseResult, FatalError> {
    let config = config.normalized();
    let chunk_size = config.chunk_size;
    let mut streamer = ChunkStreamer::new(config);

    match input {
        Input::Str(s) => {
            let mut adapter = StringAdapter::new(s.as_bytes().to_vec(), chunk_size);
            adapter.stream(&mut streamer, sink)?;
        }
        Input::Bytes(b) => {
            let mut adapter = StringAdapter::new(b.to_vec(), chunk_size);
            adapter.stream(&mut streamer, sink)?;
        }
        Input::File(path) => {
            let mut adapter = FileAdapter::new(path, chunk_size);
            adapter.stream(&mut streamer, sink)?;
        }
        #[cfg(feature = "http")]
        Input::Url(url) => {
            let mut adapter = adapter::network::NetworkAdapter::new(url, chunk_size);
            adapter.stream(&mut streamer, sink)?;
        }
    }

    Ok(streamer.into_results())
}

/// §4.7's "a sentinel value selects the duplex adapter": returns a
/// readable-and-writable gateway rather than a `ParseResult`, for
/// pipe-style composition (e.g. feeding a network response body in as it
/// arrives while reading rows out as they're produced).
pub fn duplex(config: Config) -> DuplexGate {
    DuplexGate::new(config.normalized())
}

/// A push-stream gateway, for sources that deliver chunks through their
/// own event loop (`feed`/`end`/`fail`) rather than being pulled from.
pub fn push_stream(config: Config) -> PushAdapter {
    PushAdapter::new(config.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    #[test]
    fn parse_str_basic_rows() {
        let result = parse_str("a,b,c\nd,e,f\n", Config::default());
        assert_eq!(result.rows.len(), 2);
        assert!(result.errors.is_empty());
        assert_eq!(result.meta.delimiter, ",");
    }

    #[test]
    fn parse_dispatches_string_input() {
        let result = parse(Input::Str("a,b\n1,2\n"), Config::default()).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn parse_dispatches_bytes_input() {
        let result = parse(Input::Bytes(b"a,b\n1,2\n"), Config::default()).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn parse_file_not_found_is_fatal() {
        let err = parse(Input::File("/nonexistent/dsvkit-lib-test.csv".into()), Config::default());
        assert!(err.is_err());
    }

    #[test]
    fn header_mode_with_dynamic_typing() {
        let cfg = Config {
            header: true,
            dynamic_typing: config::DynamicTyping::Enabled,
            ..Config::default()
        };
        let result = parse_str("A,B,C\r\n1,2,3", cfg);
        assert_eq!(result.rows.len(), 1);
        match &result.rows[0] {
            Row::Named(map) => {
                assert_eq!(map.get("A").unwrap().to_display_string(), "1");
            }
            _ => panic!("expected named row"),
        }
    }

    #[test]
    fn parse_parallel_matches_parse_str() {
        let input = "a,b,c\nd,e,f\ng,h,i\n";
        let sequential = parse_str(input, Config::default());
        let parallel = parse_parallel(input, Config::default());
        assert_eq!(parallel.rows, sequential.rows);
    }

    #[test]
    fn unparse_roundtrip_simple() {
        use crate::model::Value;
        let rows = vec![
            Row::Positional(vec![Value::String("a".into()), Value::String("b,c".into())]),
        ];
        let out = unparse(UnparseInput::Rows(rows), &UnparseConfig::new()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "a,\"b,c\"");
    }
}
