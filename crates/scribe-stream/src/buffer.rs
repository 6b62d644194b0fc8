use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use scribe_core::AudioChunk;

/// Audio held while the outbound stream is still connecting.
///
/// Writes are split into `chunk_size` pieces; a write whose length is not a
/// multiple of `chunk_size` is dropped whole. Once `capacity` chunks are held
/// the oldest chunk is overwritten.
pub struct PreConnectionBuffer {
    chunk_size: usize,
    chunks: HeapRb<AudioChunk>,
}

impl PreConnectionBuffer {
    pub fn new(chunk_size: usize, capacity: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunks: HeapRb::new(capacity.max(1)),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns `true` if the write was admitted.
    pub fn admit(&mut self, data: &[u8]) -> bool {
        if data.is_empty() || data.len() % self.chunk_size != 0 {
            tracing::trace!(len = data.len(), "dropping unaligned pre-connection write");
            return false;
        }
        for piece in data.chunks_exact(self.chunk_size) {
            if self
                .chunks
                .push_overwrite(AudioChunk {
                    data: piece.to_vec(),
                })
                .is_some()
            {
                tracing::trace!("pre-connection buffer full, oldest chunk overwritten");
            }
        }
        true
    }

    /// Remove and return every buffered chunk, oldest first.
    pub fn drain_all(&mut self) -> Vec<AudioChunk> {
        self.chunks.pop_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
