// Network/range adapter (§4.5): HTTP GET with `Range: bytes=start-end`
// when `chunk_size > 0`; total size is derived from the response's
// `Content-Range` header. Grounded on `ureq`'s blocking client, the HTTP
// stack already in the dependency tree for this shape of byte source.

use crate::adapter::Adapter;
use crate::config::defaults;
use crate::error::FatalError;
use crate::streamer::{ChunkStreamer, Sink};

pub struct NetworkAdapter {
    url: String,
    chunk_size: usize,
    headers: Vec<(String, String)>,
}

impl NetworkAdapter {
    /// `chunk_size == 0` uses `Defaults::remote_chunk_size`, snapshotted at
    /// construction time.
    pub fn new(url: impl Into<String>, chunk_size: usize) -> Self {
        NetworkAdapter {
            url: url.into(),
            chunk_size: if chunk_size == 0 {
                defaults().remote_chunk_size
            } else {
                chunk_size
            },
            headers: Vec::new(),
        }
    }

    /// Attach a custom request header (e.g. `Authorization`), passthrough
    /// per §4.5's `downloadRequestHeaders`.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn get(&self, range: Option<(u64, u64)>) -> Result<(Vec<u8>, Option<u64>), FatalError> {
        let mut req = ureq::get(&self.url);
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some((start, end)) = range {
            req = req.header("Range", format!("bytes={start}-{end}"));
        }

        let mut resp = req
            .call()
            .map_err(|e| FatalError::NetworkError(e.to_string()))?;

        let total = resp
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.rsplit('/').next())
            .and_then(|s| s.parse::<u64>().ok());

        let body = resp
            .body_mut()
            .read_to_vec()
            .map_err(|e| FatalError::NetworkError(e.to_string()))?;

        Ok((body, total))
    }
}

impl Adapter for NetworkAdapter {
    fn stream(&mut self, streamer: &mut ChunkStreamer, sink: &mut dyn Sink) -> Result<(), FatalError> {
        if self.chunk_size == 0 {
            let (body, _) = self.get(None)?;
            streamer.feed(&body, true, sink);
            return Ok(());
        }

        let mut start = 0u64;
        let mut total: Option<u64> = None;
        loop {
            let end = start + self.chunk_size as u64 - 1;
            let (body, content_total) = self.get(Some((start, end)))?;
            if total.is_none() {
                total = content_total;
            }
            let is_last = body.is_empty()
                || match total {
                    Some(t) => start + body.len() as u64 >= t,
                    None => true,
                };
            streamer.feed(&body, is_last, sink);
            if is_last || streamer.is_finished() {
                return Ok(());
            }
            start += body.len() as u64;
        }
    }
}
