// Push-stream adapter (§4.5): wraps a source that delivers chunks via its
// own event loop (data/end/error) rather than being pulled from. The
// caller forwards each event into `feed`/`end`/`fail`; this adapter applies
// backpressure by reporting whether the caller should pause its own source
// when the streamer is paused.

use std::collections::VecDeque;

use crate::config::Config;
use crate::error::FatalError;
use crate::streamer::{ChunkStreamer, Sink};

/// Queues chunks handed to `feed` and drains them into the streamer one at
/// a time. Unlike `Adapter::stream`, there is no loop to pull a next chunk
/// from — the source pushes, so control returns to the caller after each
/// `feed`/`end` call instead of running to completion in one call.
pub struct PushAdapter {
    streamer: ChunkStreamer,
    queue: VecDeque<Vec<u8>>,
    ended: bool,
}

impl PushAdapter {
    pub fn new(config: Config) -> Self {
        PushAdapter {
            streamer: ChunkStreamer::new(config),
            queue: VecDeque::new(),
            ended: false,
        }
    }

    /// Data event: queue a chunk and drain as much of the queue as the
    /// streamer's pause state allows.
    pub fn feed(&mut self, chunk: Vec<u8>, sink: &mut dyn Sink) {
        if self.ended || self.streamer.is_finished() {
            return;
        }
        self.queue.push_back(chunk);
        self.drain(sink);
    }

    /// End event: the source has no more data. Drains any queued chunks,
    /// then feeds a final empty chunk so the streamer parses its trailing
    /// partial line.
    pub fn end(&mut self, sink: &mut dyn Sink) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.drain(sink);
        if !self.streamer.is_finished() {
            self.streamer.feed(&[], true, sink);
        }
    }

    /// Error event: deliver a fatal transport error and stop draining.
    pub fn fail(&mut self, error: FatalError, sink: &mut dyn Sink) {
        self.ended = true;
        self.queue.clear();
        sink.on_error(&error);
    }

    /// Whether the underlying source should pause delivering events — true
    /// once the streamer itself has been paused (via a `Sink::on_row`
    /// callback calling `handle.pause()`) or has finished.
    pub fn should_pause_source(&self) -> bool {
        self.streamer.is_paused() || self.streamer.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.streamer.is_finished()
    }

    pub fn into_results(self) -> crate::model::ParseResult {
        self.streamer.into_results()
    }

    fn drain(&mut self, sink: &mut dyn Sink) {
        while let Some(chunk) = self.queue.pop_front() {
            self.streamer.feed(&chunk, false, sink);
            if self.streamer.is_finished() {
                self.queue.clear();
                return;
            }
        }
    }
}
