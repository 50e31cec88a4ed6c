// Input Adapters (A): thin collaborators that push chunks into a
// `ChunkStreamer`. Pull-model sources (string, file, network) share the
// `Adapter` trait's drive loop; push-model sources (push-stream, duplex)
// are driven by the caller's own event delivery instead, since there is no
// "next chunk" to pull — they expose `feed`/`end` methods in their place.

pub mod duplex;
pub mod file;
#[cfg(feature = "http")]
pub mod network;
pub mod push;
pub mod string;

use crate::error::FatalError;
use crate::streamer::{ChunkStreamer, Sink};

/// A pull-model input source: owns enough state to produce successive
/// chunks on demand and feed each one into a `ChunkStreamer` until the
/// source is exhausted or the streamer halts (pause/abort/preview cutoff).
pub trait Adapter {
    /// Drive the streamer to completion. Returns once `Sink::on_complete`
    /// has fired, the source is exhausted, or a fatal transport error
    /// occurs (reported to `sink.on_error` before this returns `Ok`, per
    /// §7's "error fires, complete does not").
    fn stream(&mut self, streamer: &mut ChunkStreamer, sink: &mut dyn Sink) -> Result<(), FatalError>;
}
