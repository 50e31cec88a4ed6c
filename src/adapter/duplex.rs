// Duplex adapter (§4.5): a readable-and-writable gateway for pipe-style
// composition. Writes arriving on the writable side (`write`) are parsed
// immediately and acknowledged; parsed rows are queued on the readable
// side (`read`) one row per item, terminated by `DuplexItem::End` once the
// writable side is closed.

use std::collections::VecDeque;

use crate::config::Config;
use crate::model::Row;
use crate::streamer::{ChunkStreamer, ParserHandle, Sink};

/// An item available on the readable side of a `DuplexGate`.
pub enum DuplexItem {
    Row(Row),
    End,
}

/// Buffers rows produced while draining a `write` call, so they can be
/// queued onto the gate's readable side rather than delivered through a
/// caller-supplied `Sink`.
#[derive(Default)]
struct Collector {
    rows: Vec<Row>,
}

impl Sink for Collector {
    fn on_row(&mut self, row: &Row, _handle: &ParserHandle<'_>) {
        self.rows.push(row.clone());
    }
}

pub struct DuplexGate {
    streamer: ChunkStreamer,
    readable: VecDeque<DuplexItem>,
    closed: bool,
}

impl DuplexGate {
    pub fn new(config: Config) -> Self {
        DuplexGate {
            streamer: ChunkStreamer::new(config),
            readable: VecDeque::new(),
            closed: false,
        }
    }

    /// Writable side: feed a chunk, invoke `ack` once it has been consumed
    /// (the flow-control acknowledgement §4.5 calls for), and queue any
    /// resulting rows onto the readable side.
    pub fn write(&mut self, chunk: &[u8], ack: impl FnOnce()) {
        if self.closed || self.streamer.is_finished() {
            ack();
            return;
        }
        let mut collector = Collector::default();
        self.streamer.feed(chunk, false, &mut collector);
        ack();
        self.readable.extend(collector.rows.into_iter().map(DuplexItem::Row));
        if self.streamer.is_finished() {
            self.readable.push_back(DuplexItem::End);
        }
    }

    /// Writable side: signal end of input. Parses any trailing partial
    /// line and pushes the readable side's terminator item.
    pub fn end(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.streamer.is_finished() {
            let mut collector = Collector::default();
            self.streamer.feed(&[], true, &mut collector);
            self.readable.extend(collector.rows.into_iter().map(DuplexItem::Row));
        }
        self.readable.push_back(DuplexItem::End);
    }

    /// Readable side: pop the next available item, if any.
    pub fn read(&mut self) -> Option<DuplexItem> {
        self.readable.pop_front()
    }

    pub fn into_results(self) -> crate::model::ParseResult {
        self.streamer.into_results()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_yields_rows_then_end() {
        let mut gate = DuplexGate::new(Config::default());
        let mut acked = false;
        gate.write(b"a,b\nc,d\n", || acked = true);
        assert!(acked);
        gate.end();

        let mut rows = Vec::new();
        loop {
            match gate.read() {
                Some(DuplexItem::Row(r)) => rows.push(r),
                Some(DuplexItem::End) => break,
                None => break,
            }
        }
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn partial_write_carries_into_end() {
        let mut gate = DuplexGate::new(Config::default());
        gate.write(b"a,b\nc,", || {});
        assert!(matches!(gate.read(), Some(DuplexItem::Row(_))));
        assert!(gate.read().is_none());
        gate.end();
        assert!(matches!(gate.read(), Some(DuplexItem::Row(_))));
        assert!(matches!(gate.read(), Some(DuplexItem::End)));
    }
}
