//! stream/accumulator.rs
//! Ordered chunk buffer for the read direction.

use bytes::Bytes;

use crate::utils::concat_chunks;

/// Chunks are kept in arrival order and concatenated once, at end of stream.
#[derive(Debug, Default)]
pub struct Accumulator {
    chunks: Vec<Bytes>,
    len: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Consume the buffered chunks as one contiguous buffer.
    pub fn finish(&mut self) -> Bytes {
        let chunks = std::mem::take(&mut self.chunks);
        self.len = 0;
        match chunks.len() {
            0 => Bytes::new(),
            1 => chunks.into_iter().next().unwrap_or_default(),
            _ => concat_chunks(&chunks),
        }
    }

    /// Drop everything collected so far. Partial output never reaches the caller.
    pub fn discard(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }
}
