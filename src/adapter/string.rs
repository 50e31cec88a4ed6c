// String adapter (§4.5): slices a backing in-memory buffer by `chunk_size`
// bytes; `chunk_size == 0` feeds the whole buffer as a single chunk.

use crate::adapter::Adapter;
use crate::error::FatalError;
use crate::streamer::{ChunkStreamer, Sink};

pub struct StringAdapter {
    data: Vec<u8>,
    chunk_size: usize,
}

impl StringAdapter {
    pub fn new(data: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        StringAdapter {
            data: data.into(),
            chunk_size,
        }
    }
}

impl Adapter for StringAdapter {
    fn stream(&mut self, streamer: &mut ChunkStreamer, sink: &mut dyn Sink) -> Result<(), FatalError> {
        if self.chunk_size == 0 || self.data.is_empty() {
            streamer.feed(&self.data, true, sink);
            return Ok(());
        }

        let mut pos = 0;
        while pos < self.data.len() {
            let end = (pos + self.chunk_size).min(self.data.len());
            let is_last = end >= self.data.len();
            streamer.feed(&self.data[pos..end], is_last, sink);
            if is_last || streamer.is_finished() {
                return Ok(());
            }
            pos = end;
        }
        Ok(())
    }
}
