// Local-file adapter (§4.5): reads a file in `chunk_size`-byte slices; EOF
// (a zero-byte read) marks the last chunk.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::adapter::Adapter;
use crate::config::defaults;
use crate::error::FatalError;
use crate::streamer::{ChunkStreamer, Sink};

pub struct FileAdapter {
    path: PathBuf,
    chunk_size: usize,
}

impl FileAdapter {
    /// `chunk_size == 0` uses `Defaults::local_chunk_size`, snapshotted at
    /// construction time.
    pub fn new(path: impl AsRef<Path>, chunk_size: usize) -> Self {
        FileAdapter {
            path: path.as_ref().to_path_buf(),
            chunk_size: if chunk_size == 0 {
                defaults().local_chunk_size
            } else {
                chunk_size
            },
        }
    }
}

impl Adapter for FileAdapter {
    fn stream(&mut self, streamer: &mut ChunkStreamer, sink: &mut dyn Sink) -> Result<(), FatalError> {
        let mut file = File::open(&self.path)?;
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = file.read(&mut buf)?;
            let is_last = n == 0;
            streamer.feed(&buf[..n], is_last, sink);
            if is_last || streamer.is_finished() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::Row;
    use std::io::Write;

    #[derive(Default)]
    struct Collector {
        row_count: usize,
    }

    impl Sink for Collector {
        fn on_row(&mut self, _row: &Row, _handle: &crate::streamer::ParserHandle<'_>) {
            self.row_count += 1;
        }
    }

    #[test]
    fn reads_whole_file_in_chunks() {
        let mut tmp = std::env::temp_dir();
        tmp.push(format!("dsvkit_file_adapter_test_{}", std::process::id()));
        {
            let mut f = File::create(&tmp).unwrap();
            f.write_all(b"a,b\nc,d\ne,f\n").unwrap();
        }

        let mut adapter = FileAdapter::new(&tmp, 4);
        let mut streamer = ChunkStreamer::new(Config::default());
        let mut sink = Collector::default();
        adapter.stream(&mut streamer, &mut sink).unwrap();
        assert_eq!(sink.row_count, 3);

        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn missing_file_is_fatal() {
        let mut adapter = FileAdapter::new("/nonexistent/path/dsvkit-test.csv", 64);
        let mut streamer = ChunkStreamer::new(Config::default());
        let mut sink = Collector::default();
        assert!(adapter.stream(&mut streamer, &mut sink).is_err());
    }
}
